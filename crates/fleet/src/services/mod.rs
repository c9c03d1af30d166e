//! Transport-free fleet services.
//!
//! Each service resolves the caller's [`Domain`](trellis_store::Domain)
//! through a [`DomainResolver`](crate::auth::DomainResolver), then works with
//! typed [`Collection`](trellis_store::Collection)s scoped to that domain.
//! Handlers take plain request structs and return
//! [`Result`](trellis_store::Result), so any frontend wires straight through.

pub mod device;
pub mod measurements;

pub use device::DeviceService;
pub use measurements::MeasurementService;
