//! # Gambit Test Suite
//!
//! Cross-subsystem scenarios run over the in-memory control plane and
//! transport network.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── support.rs   # Room fixtures shared by the scenarios
//!     ├── mesh.rs      # Link failures, severed links, roster repair
//!     └── game.rs      # Moves agreed across the mesh
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p gb-tests
//! cargo test -p gb-tests integration::mesh::
//! ```

pub mod integration;
