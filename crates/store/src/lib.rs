//! Trellis Document Store
//!
//! This crate provides tenant-scoped typed document storage for the Trellis
//! fleet backend. Strongly-typed records with numbered-field schemas are
//! converted to and from schemaless hierarchical documents by a generic
//! codec, and a typed collection abstraction layers per-tenant isolation,
//! identifier validation, and uniqueness constraints on top of a pluggable
//! storage backend.
//!
//! # Features
//!
//! - **Tag-keyed documents**: stored keys are stable numeric field tags, not
//!   field names, so renaming a field never breaks stored data
//! - **Merge-patch updates**: an encoded record only mentions its present
//!   fields, making every update a key-wise overwrite that leaves untouched
//!   fields alone
//! - **Tenant isolation**: every document is stamped with a domain and every
//!   lookup filters on it; cross-domain access is indistinguishable from the
//!   document not existing
//! - **Uniform result algebra**: every operation returns [`Result`] carrying
//!   a [`Status`] and one message, so failures compose with `?`
//!
//! # Backend Features
//!
//! The in-memory backend is always compiled. Enable MongoDB with a feature
//! flag in `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! trellis-store = { version = "0.1", features = ["mongodb"] }
//! ```
//!
//! # Architecture
//!
//! - [`error`] - The [`Status`] vocabulary and [`Error`]/[`Result`] algebra
//! - [`domain`] - The opaque tenant [`Domain`] type
//! - [`oid`] - Identifier validation and extraction
//! - [`schema`] - Static field tables describing storable record types
//! - [`codec`] - Record ↔ document conversion driven by the field tables
//! - [`backend`] - The [`DocumentStore`] trait and backend error type
//! - [`backends`] - Backend implementations (memory, MongoDB)
//! - [`collection`] - The typed, tenant-scoped [`Collection`] CRUD façade
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use trellis_store::backends::memory::MemoryStore;
//! use trellis_store::schema::{Field, FieldAccess, Record, ScalarAccess};
//! use trellis_store::{Collection, Domain};
//!
//! #[derive(Debug, Default, PartialEq)]
//! struct Sensor {
//!     label: Option<String>,
//! }
//!
//! static SENSOR_SCHEMA: [Field<Sensor>; 1] = [Field {
//!     tag: 1,
//!     name: "label",
//!     access: FieldAccess::Scalar(ScalarAccess::String {
//!         get: |r: &Sensor| r.label.as_deref(),
//!         set: |r: &mut Sensor, v| r.label = Some(v),
//!     }),
//! }];
//!
//! impl Record for Sensor {
//!     const NAME: &'static str = "Sensor";
//!
//!     fn schema() -> &'static [Field<Self>] {
//!         &SENSOR_SCHEMA
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> trellis_store::Result<()> {
//! let sensors = Collection::<Sensor>::new(Arc::new(MemoryStore::new()), "sensors");
//! let domain = Domain::new("greenhouse-12");
//!
//! let id = sensors
//!     .create(&domain, &Sensor { label: Some("intake ph".into()) })
//!     .await?;
//! let stored = sensors.get(&id, &domain).await?;
//! assert_eq!(stored.label.as_deref(), Some("intake ph"));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backend;
pub mod backends;
pub mod codec;
pub mod collection;
pub mod domain;
pub mod error;
pub mod oid;
pub mod schema;

// Re-export commonly used types at crate root
pub use backend::{DocumentStore, StoreError, UpdateOutcome};
pub use collection::Collection;
pub use domain::{DOMAIN_KEY, Domain};
pub use error::{Error, Result, Status};
pub use oid::ID_KEY;
pub use schema::Record;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
