//! Device inventory and configuration service.
//!
//! Transport-free: handlers own request structs and return [`Result`], so
//! any frontend (RPC, REST, embedded) wires straight through. Every
//! operation resolves the caller's domain first and works only inside it.
//!
//! Inputs go through a sanitize/validate split before they touch storage:
//! sanitation strips what callers may not set (the `uid` — identity comes
//! from the backend), validation rejects what the fleet cannot use (a
//! malformed MAC, a dangling configuration reference). The configuration
//! cross-reference check and the subsequent insert are two independent
//! round-trips; a concurrent delete of the configuration in that window is
//! an accepted weakness.

use std::sync::Arc;

use bson::doc;
use tracing::error;

use trellis_store::{Collection, DOMAIN_KEY, DocumentStore, Domain, Error, Result, Status, oid};

use crate::auth::{DomainResolver, RequestContext};
use crate::config::FleetConfig;
use crate::records::{Config, Device};

/// Addresses a device by identifier or by hardware address.
#[derive(Debug, Clone)]
pub enum DeviceQuery {
    /// The backend-assigned 24-hex identifier.
    Uid(String),
    /// The `XX:XX:XX:XX:XX:XX` hardware address.
    Mac(String),
}

/// Enrolls a new device.
#[derive(Debug, Clone, Default)]
pub struct CreateDeviceRequest {
    /// Caller credentials.
    pub context: RequestContext,
    /// The device to enroll. Any caller-supplied `uid` is discarded.
    pub device: Option<Device>,
}

/// Looks up one device.
#[derive(Debug, Clone, Default)]
pub struct GetDeviceRequest {
    /// Caller credentials.
    pub context: RequestContext,
    /// How to address the device; unset is an error.
    pub query: Option<DeviceQuery>,
}

/// Rewrites the set fields of an existing device.
#[derive(Debug, Clone, Default)]
pub struct UpdateDeviceRequest {
    /// Caller credentials.
    pub context: RequestContext,
    /// The patch. Its `uid` addresses the device to update; every other
    /// set field overwrites the stored value, unset fields are untouched.
    pub device: Option<Device>,
}

/// Removes a device.
#[derive(Debug, Clone, Default)]
pub struct DeleteDeviceRequest {
    /// Caller credentials.
    pub context: RequestContext,
    /// Identifier of the device to remove.
    pub device_uid: String,
}

/// Reserved listing surface.
#[derive(Debug, Clone, Default)]
pub struct ListDevicesRequest {
    /// Caller credentials.
    pub context: RequestContext,
}

/// Stores a new configuration.
#[derive(Debug, Clone, Default)]
pub struct CreateConfigRequest {
    /// Caller credentials.
    pub context: RequestContext,
    /// The configuration to store. Any caller-supplied `uid` is discarded.
    pub config: Option<Config>,
}

/// Looks up one configuration.
#[derive(Debug, Clone, Default)]
pub struct GetConfigRequest {
    /// Caller credentials.
    pub context: RequestContext,
    /// Identifier of the configuration to fetch.
    pub config_uid: String,
}

/// Rewrites the set fields of an existing configuration.
#[derive(Debug, Clone, Default)]
pub struct UpdateConfigRequest {
    /// Caller credentials.
    pub context: RequestContext,
    /// The patch. Its `uid` addresses the configuration to update.
    pub config: Option<Config>,
}

/// Removes a configuration.
#[derive(Debug, Clone, Default)]
pub struct DeleteConfigRequest {
    /// Caller credentials.
    pub context: RequestContext,
    /// Identifier of the configuration to remove.
    pub config_uid: String,
}

/// Reserved listing surface.
#[derive(Debug, Clone, Default)]
pub struct ListConfigsRequest {
    /// Caller credentials.
    pub context: RequestContext,
}

/// CRUD over devices and their configurations.
pub struct DeviceService {
    devices: Collection<Device>,
    configs: Collection<Config>,
    resolver: Arc<dyn DomainResolver>,
}

impl DeviceService {
    /// Builds the service over `store` and declares the unique index on the
    /// device MAC. An index the backend refuses is a deployment problem, not
    /// a caller problem, so refusal is `Internal`.
    pub async fn connect(
        store: Arc<dyn DocumentStore>,
        config: &FleetConfig,
        resolver: Arc<dyn DomainResolver>,
    ) -> Result<Self> {
        let devices = Collection::new(Arc::clone(&store), &config.device_collection);
        let configs = Collection::new(store, &config.config_collection);

        if !devices.create_unique_index(Device::MAC_TAG).await {
            return Err(Error::internal("could not declare the device mac index"));
        }

        Ok(Self {
            devices,
            configs,
            resolver,
        })
    }

    /// Enrolls a device and returns it with its assigned `uid`.
    pub async fn create_device(&self, request: CreateDeviceRequest) -> Result<Device> {
        let domain = self.resolver.resolve(&request.context).await?;

        let Some(device) = request.device else {
            return Err(Error::invalid_argument("empty request"));
        };

        let device = sanitize_device(device);
        self.validate_device(&device, &domain).await?;

        let uid = self.devices.create(&domain, &device).await?;
        self.reload_device(&uid, &domain).await
    }

    /// Fetches a device by identifier or by MAC.
    pub async fn get_device(&self, request: GetDeviceRequest) -> Result<Device> {
        let domain = self.resolver.resolve(&request.context).await?;

        match request.query {
            Some(DeviceQuery::Uid(uid)) => {
                if !oid::is_valid(&uid) {
                    return Err(Error::invalid_argument("invalid device uid"));
                }
                let mut device = self.devices.get(&uid, &domain).await?;
                device.uid = Some(uid);
                Ok(device)
            }
            Some(DeviceQuery::Mac(mac)) => {
                if !is_mac_address(&mac) {
                    return Err(Error::invalid_argument("invalid device mac"));
                }
                let mac_key = Device::MAC_TAG.to_string();
                let filter = doc! { DOMAIN_KEY: domain.as_str(), mac_key: mac };
                let (uid, mut device) = self.devices.get_matching_with_id(filter).await?;
                device.uid = Some(uid);
                Ok(device)
            }
            None => Err(Error::invalid_argument("filter not set")),
        }
    }

    /// Reserved; always `Unimplemented`.
    pub async fn list_devices(&self, _request: ListDevicesRequest) -> Result<()> {
        Err(Error::unimplemented("not yet implemented"))
    }

    /// Merge-patches the device addressed by the payload's `uid` and
    /// returns the updated record.
    pub async fn update_device(&self, request: UpdateDeviceRequest) -> Result<Device> {
        let domain = self.resolver.resolve(&request.context).await?;

        let Some(device) = request.device else {
            return Err(Error::invalid_argument("empty request"));
        };

        let uid = device.uid.clone().unwrap_or_default();
        if !oid::is_valid(&uid) {
            return Err(Error::invalid_argument("invalid device uid"));
        }

        let device = sanitize_device(device);
        self.validate_device(&device, &domain).await?;

        self.devices.update(&uid, &domain, &device).await?;
        self.reload_device(&uid, &domain).await
    }

    /// Removes a device.
    pub async fn delete_device(&self, request: DeleteDeviceRequest) -> Result<()> {
        let domain = self.resolver.resolve(&request.context).await?;
        self.devices.delete(&request.device_uid, &domain).await
    }

    /// Stores a configuration and returns it with its assigned `uid`.
    pub async fn create_config(&self, request: CreateConfigRequest) -> Result<Config> {
        let domain = self.resolver.resolve(&request.context).await?;

        let Some(config) = request.config else {
            return Err(Error::invalid_argument("empty request"));
        };

        let config = sanitize_config(config);
        let uid = self.configs.create(&domain, &config).await?;
        self.reload_config(&uid, &domain).await
    }

    /// Fetches a configuration by identifier.
    pub async fn get_config(&self, request: GetConfigRequest) -> Result<Config> {
        let domain = self.resolver.resolve(&request.context).await?;

        let mut config = self.configs.get(&request.config_uid, &domain).await?;
        config.uid = Some(request.config_uid);
        Ok(config)
    }

    /// Reserved; always `Unimplemented`.
    pub async fn list_configs(&self, _request: ListConfigsRequest) -> Result<()> {
        Err(Error::unimplemented("not yet implemented"))
    }

    /// Merge-patches the configuration addressed by the payload's `uid` and
    /// returns the updated record.
    pub async fn update_config(&self, request: UpdateConfigRequest) -> Result<Config> {
        let domain = self.resolver.resolve(&request.context).await?;

        let Some(config) = request.config else {
            return Err(Error::invalid_argument("empty request"));
        };

        let uid = config.uid.clone().unwrap_or_default();
        if !oid::is_valid(&uid) {
            return Err(Error::invalid_argument("invalid config uid"));
        }

        let config = sanitize_config(config);
        self.configs.update(&uid, &domain, &config).await?;
        self.reload_config(&uid, &domain).await
    }

    /// Removes a configuration.
    pub async fn delete_config(&self, request: DeleteConfigRequest) -> Result<()> {
        let domain = self.resolver.resolve(&request.context).await?;
        self.configs.delete(&request.config_uid, &domain).await
    }

    /// Rejects devices the fleet cannot use: a missing or malformed MAC,
    /// or a configuration reference that resolves to nothing in the
    /// caller's domain.
    async fn validate_device(&self, device: &Device, domain: &Domain) -> Result<()> {
        if !device.mac.as_deref().is_some_and(is_mac_address) {
            return Err(Error::invalid_argument("missing or invalid mac address"));
        }

        if let Some(config_uid) = &device.config_uid {
            if self.configs.contains(config_uid, domain).await.is_err() {
                return Err(Error::not_found("no such config"));
            }
        }

        Ok(())
    }

    /// Reads back a device that was written moments ago. Its absence means
    /// the backend lost or misplaced the write, which is reported as an
    /// internal fault, not a not-found.
    async fn reload_device(&self, uid: &str, domain: &Domain) -> Result<Device> {
        match self.devices.get(uid, domain).await {
            Ok(mut device) => {
                device.uid = Some(uid.to_string());
                Ok(device)
            }
            Err(err) if err.status() == Status::NotFound => {
                error!(domain = %domain, uid, "a device that was just written is gone");
                Err(Error::internal("written device could not be read back"))
            }
            Err(err) => Err(err),
        }
    }

    /// Reads back a configuration that was written moments ago; same
    /// contract as [`Self::reload_device`].
    async fn reload_config(&self, uid: &str, domain: &Domain) -> Result<Config> {
        match self.configs.get(uid, domain).await {
            Ok(mut config) => {
                config.uid = Some(uid.to_string());
                Ok(config)
            }
            Err(err) if err.status() == Status::NotFound => {
                error!(domain = %domain, uid, "a config that was just written is gone");
                Err(Error::internal("written config could not be read back"))
            }
            Err(err) => Err(err),
        }
    }
}

/// Strips what callers may not set: stored documents get their identity
/// from the backend, never from input.
fn sanitize_device(mut device: Device) -> Device {
    device.uid = None;
    device
}

fn sanitize_config(mut config: Config) -> Config {
    config.uid = None;
    config
}

/// Recognizes the canonical `XX:XX:XX:XX:XX:XX` hardware address form:
/// exactly 17 characters, hex pairs joined by colons.
fn is_mac_address(mac: &str) -> bool {
    mac.len() == 17
        && mac
            .bytes()
            .enumerate()
            .all(|(i, b)| if i % 3 == 2 { b == b':' } else { b.is_ascii_hexdigit() })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticDomainResolver;
    use async_trait::async_trait;
    use trellis_store::backends::memory::MemoryStore;

    struct DenyAll;

    #[async_trait]
    impl DomainResolver for DenyAll {
        async fn resolve(&self, _context: &RequestContext) -> Result<Domain> {
            Err(Error::unauthenticated("invalid auth token"))
        }
    }

    async fn service() -> DeviceService {
        DeviceService::connect(
            Arc::new(MemoryStore::new()),
            &FleetConfig::default(),
            Arc::new(StaticDomainResolver::new("testdomain")),
        )
        .await
        .unwrap()
    }

    fn sample_device() -> Device {
        Device {
            mac: Some("00:00:00:00:00:00".to_string()),
            display_name: Some("my device".to_string()),
            ..Device::default()
        }
    }

    #[test]
    fn test_mac_address_validation() {
        assert!(is_mac_address("00:00:00:00:00:00"));
        assert!(is_mac_address("aa:bb:cc:dd:ee:ff"));
        assert!(is_mac_address("AA:BB:CC:DD:EE:FF"));

        assert!(!is_mac_address(""));
        assert!(!is_mac_address("aa:bb:cc:dd:ee"));
        assert!(!is_mac_address("aa:bb:cc:dd:ee:ff:00"));
        assert!(!is_mac_address("aa-bb-cc-dd-ee-ff"));
        assert!(!is_mac_address("gg:bb:cc:dd:ee:ff"));
        assert!(!is_mac_address("aa:bb:cc:dd:ee:f"));
        assert!(!is_mac_address("aabb:cc:dd:ee:fff"));
    }

    #[test]
    fn test_sanitize_strips_the_uid() {
        let device = sanitize_device(Device {
            uid: Some("charliedelta".to_string()),
            ..sample_device()
        });
        assert_eq!(device.uid, None);
        assert_eq!(device.mac.as_deref(), Some("00:00:00:00:00:00"));

        let config = sanitize_config(Config {
            uid: Some("alphabravo".to_string()),
            ..Config::default()
        });
        assert_eq!(config.uid, None);
    }

    #[tokio::test]
    async fn test_empty_requests_are_invalid() {
        let service = service().await;

        let err = service
            .create_device(CreateDeviceRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Status::InvalidArgument);
        assert_eq!(err.message(), "empty request");

        let err = service
            .update_device(UpdateDeviceRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Status::InvalidArgument);

        let err = service
            .create_config(CreateConfigRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Status::InvalidArgument);
    }

    #[tokio::test]
    async fn test_get_device_requires_a_filter() {
        let service = service().await;

        let err = service
            .get_device(GetDeviceRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Status::InvalidArgument);
        assert_eq!(err.message(), "filter not set");
    }

    #[tokio::test]
    async fn test_get_device_rejects_malformed_addresses() {
        let service = service().await;

        let err = service
            .get_device(GetDeviceRequest {
                query: Some(DeviceQuery::Uid("not-an-oid".to_string())),
                ..GetDeviceRequest::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.status(), Status::InvalidArgument);
        assert_eq!(err.message(), "invalid device uid");

        let err = service
            .get_device(GetDeviceRequest {
                query: Some(DeviceQuery::Mac("not-a-mac".to_string())),
                ..GetDeviceRequest::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.status(), Status::InvalidArgument);
        assert_eq!(err.message(), "invalid device mac");
    }

    #[tokio::test]
    async fn test_create_device_requires_a_valid_mac() {
        let service = service().await;

        for mac in [None, Some(""), Some("aa-bb-cc-dd-ee-ff")] {
            let err = service
                .create_device(CreateDeviceRequest {
                    device: Some(Device {
                        mac: mac.map(str::to_string),
                        ..Device::default()
                    }),
                    ..CreateDeviceRequest::default()
                })
                .await
                .unwrap_err();
            assert_eq!(err.status(), Status::InvalidArgument, "mac {mac:?}");
            assert_eq!(err.message(), "missing or invalid mac address");
        }
    }

    #[tokio::test]
    async fn test_create_device_refuses_dangling_config_reference() {
        let service = service().await;

        let err = service
            .create_device(CreateDeviceRequest {
                device: Some(Device {
                    config_uid: Some("ffffffffffffffffffffffff".to_string()),
                    ..sample_device()
                }),
                ..CreateDeviceRequest::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.status(), Status::NotFound);
        assert_eq!(err.message(), "no such config");

        // A reference that is not even an identifier reads the same.
        let err = service
            .create_device(CreateDeviceRequest {
                device: Some(Device {
                    config_uid: Some("wigwam".to_string()),
                    ..sample_device()
                }),
                ..CreateDeviceRequest::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.status(), Status::NotFound);
        assert_eq!(err.message(), "no such config");
    }

    #[tokio::test]
    async fn test_list_surfaces_are_reserved() {
        let service = service().await;

        let err = service
            .list_devices(ListDevicesRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Status::Unimplemented);

        let err = service
            .list_configs(ListConfigsRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.status(), Status::Unimplemented);
    }

    #[tokio::test]
    async fn test_resolver_failure_propagates_unchanged() {
        let service = DeviceService::connect(
            Arc::new(MemoryStore::new()),
            &FleetConfig::default(),
            Arc::new(DenyAll),
        )
        .await
        .unwrap();

        let err = service
            .create_device(CreateDeviceRequest {
                device: Some(sample_device()),
                ..CreateDeviceRequest::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.status(), Status::Unauthenticated);
        assert_eq!(err.message(), "invalid auth token");

        let err = service
            .delete_device(DeleteDeviceRequest {
                device_uid: "662a2b4a9bd1e5c3a0f0a1b2".to_string(),
                ..DeleteDeviceRequest::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.status(), Status::Unauthenticated);
    }

    #[tokio::test]
    async fn test_update_device_validates_the_address_first() {
        let service = service().await;

        // No uid in the payload at all.
        let err = service
            .update_device(UpdateDeviceRequest {
                device: Some(sample_device()),
                ..UpdateDeviceRequest::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.status(), Status::InvalidArgument);
        assert_eq!(err.message(), "invalid device uid");
    }
}
