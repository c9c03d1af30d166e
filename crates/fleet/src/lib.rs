//! Trellis Fleet Services
//!
//! This crate provides the domain layer of the Trellis fleet backend: typed
//! records for devices, configurations, and sensor measurements, plus the
//! transport-free services that operate on them through
//! [`trellis-store`](trellis_store) collections.
//!
//! # Features
//!
//! - **Domain scoping**: every handler resolves the caller's tenant domain
//!   first and operates only inside it
//! - **Sanitize/validate split**: callers never pick identifiers, writes are
//!   rejected before storage when a MAC is malformed or a cross-reference
//!   dangles
//! - **Uniform result algebra**: handlers return the
//!   [`Result`](trellis_store::Result) of `trellis-store`, so a frontend maps
//!   a handler outcome to its wire status without special cases
//!
//! # Architecture
//!
//! - [`records`] - The [`Device`](records::Device),
//!   [`Config`](records::Config), and [`Measurement`](records::Measurement)
//!   record types and their field tables
//! - [`auth`] - The [`DomainResolver`](auth::DomainResolver) seam between
//!   caller credentials and tenant domains
//! - [`config`] - Collection-name settings for a deployment
//! - [`services`] - The [`DeviceService`] and [`MeasurementService`] handlers
//!
//! # Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use trellis_fleet::auth::StaticDomainResolver;
//! use trellis_fleet::records::Device;
//! use trellis_fleet::services::device::{CreateDeviceRequest, DeviceQuery, GetDeviceRequest};
//! use trellis_fleet::{DeviceService, FleetConfig};
//! use trellis_store::backends::memory::MemoryStore;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> trellis_store::Result<()> {
//! let service = DeviceService::connect(
//!     Arc::new(MemoryStore::new()),
//!     &FleetConfig::default(),
//!     Arc::new(StaticDomainResolver::new("greenhouse-12")),
//! )
//! .await?;
//!
//! let enrolled = service
//!     .create_device(CreateDeviceRequest {
//!         device: Some(Device {
//!             mac: Some("aa:bb:cc:dd:ee:ff".to_string()),
//!             display_name: Some("east wall".to_string()),
//!             ..Device::default()
//!         }),
//!         ..CreateDeviceRequest::default()
//!     })
//!     .await?;
//! assert!(enrolled.uid.is_some());
//!
//! let by_mac = service
//!     .get_device(GetDeviceRequest {
//!         query: Some(DeviceQuery::Mac("aa:bb:cc:dd:ee:ff".to_string())),
//!         ..GetDeviceRequest::default()
//!     })
//!     .await?;
//! assert_eq!(by_mac.uid, enrolled.uid);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod auth;
pub mod config;
pub mod records;
pub mod services;

// Re-export commonly used types at crate root
pub use config::FleetConfig;
pub use services::device::DeviceService;
pub use services::measurements::MeasurementService;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
