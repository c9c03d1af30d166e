//! Fleet service configuration.

use serde::Deserialize;

/// Names of the backend collections the fleet services use.
///
/// Every field has a default, so a partial configuration fragment
/// deserializes cleanly:
///
/// ```
/// use trellis_fleet::FleetConfig;
///
/// let config: FleetConfig =
///     serde_json::from_str(r#"{ "device_collection": "field-units" }"#).unwrap();
/// assert_eq!(config.device_collection, "field-units");
/// assert_eq!(config.config_collection, "configurations");
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct FleetConfig {
    /// Backing collection for device records.
    #[serde(default = "default_device_collection")]
    pub device_collection: String,

    /// Backing collection for configuration records.
    #[serde(default = "default_config_collection")]
    pub config_collection: String,

    /// Backing collection for measurement records.
    #[serde(default = "default_measurement_collection")]
    pub measurement_collection: String,
}

fn default_device_collection() -> String {
    "devices".to_string()
}

fn default_config_collection() -> String {
    "configurations".to_string()
}

fn default_measurement_collection() -> String {
    "measurements".to_string()
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            device_collection: default_device_collection(),
            config_collection: default_config_collection(),
            measurement_collection: default_measurement_collection(),
        }
    }
}
