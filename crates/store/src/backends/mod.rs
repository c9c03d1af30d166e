//! Document store backend implementations.
//!
//! # Available backends
//!
//! | Backend | Feature | Description |
//! |---------|---------|-------------|
//! | Memory | always compiled | In-process store for development and tests |
//! | MongoDB | `mongodb` | Document database, the production backend |
//!
//! # Example
//!
//! ```
//! use trellis_store::backends::memory::MemoryStore;
//!
//! let store = MemoryStore::new();
//! ```

pub mod memory;

#[cfg(feature = "mongodb")]
pub mod mongo;
