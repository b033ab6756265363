//! # Shared Crypto
//!
//! ## Components
//!
//! | Module | Algorithm | Use Case |
//! |--------|-----------|----------|
//! | `hashing` | SHA-256 | Log entry content addressing |
//! | `signatures` | Ed25519 | Entry authorship, participant identity |
//!
//! ## Security Properties
//!
//! - **Ed25519**: deterministic nonces, no RNG dependency when signing
//! - Keys are validated as curve points when parsed off the wire

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod errors;
pub mod hashing;
pub mod signatures;

// Re-exports
pub use errors::CryptoError;
pub use hashing::{sha256, sha256_hex, Hash};
pub use signatures::{KeyPair, PublicKey, Signature};
