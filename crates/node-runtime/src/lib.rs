//! # Gambit Node Runtime
//!
//! Library half of the `node-runtime` binary.
//!
//! - `config` - [`NodeConfig`] from TOML and `GAMBIT_*` environment variables
//! - `runtime` - [`NodeRuntime`], which plays a whole room in one process

pub mod config;
pub mod runtime;

pub use config::{ConfigError, NodeConfig};
pub use runtime::NodeRuntime;
