//! Fleet record types.
//!
//! Every stored resource is a plain struct implementing
//! [`Record`](trellis_store::Record) through a static field table. Tags are
//! the persisted key space and must never be renumbered; Rust field names
//! are free to change.

mod config;
mod device;
mod measurement;

pub use config::{Config, DailySchedule, LightConfig, Luminaire, TimeOfDay};
pub use device::Device;
pub use measurement::{Atmosphere, Measurement, Solution};
