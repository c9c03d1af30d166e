//! End-to-end fleet service flows over the in-memory backend.
//!
//! These tests wire the device and measurement services the way a deployment
//! would: one shared document store, one service instance per caller domain.
//! Records travel the full encode/store/decode path, so the scenarios double
//! as coverage for the codec under realistic payloads.

use std::sync::Arc;

use trellis_fleet::FleetConfig;
use trellis_fleet::auth::StaticDomainResolver;
use trellis_fleet::records::{
    Atmosphere, Config, DailySchedule, Device, LightConfig, Luminaire, Measurement, TimeOfDay,
};
use trellis_fleet::services::device::{
    CreateConfigRequest, CreateDeviceRequest, DeleteDeviceRequest, DeviceQuery, DeviceService,
    GetConfigRequest, GetDeviceRequest, UpdateConfigRequest, UpdateDeviceRequest,
};
use trellis_fleet::services::measurements::{
    LatestMeasurementRequest, MeasurementService, RecordMeasurementRequest,
};
use trellis_store::backends::memory::MemoryStore;
use trellis_store::{DocumentStore, Status, oid};

// ============================================================================
// Helper Functions
// ============================================================================

fn shared_store() -> Arc<dyn DocumentStore> {
    Arc::new(MemoryStore::new())
}

/// Builds both services for one caller domain over the shared store.
async fn domain_services(
    store: &Arc<dyn DocumentStore>,
    domain: &str,
) -> (DeviceService, MeasurementService) {
    let resolver = Arc::new(StaticDomainResolver::new(domain));
    let devices = DeviceService::connect(
        Arc::clone(store),
        &FleetConfig::default(),
        resolver.clone(),
    )
    .await
    .unwrap();
    let measurements =
        MeasurementService::new(Arc::clone(store), &FleetConfig::default(), resolver);
    (devices, measurements)
}

fn device(mac: &str) -> Device {
    Device {
        mac: Some(mac.to_string()),
        display_name: Some("north bench".to_string()),
        ..Device::default()
    }
}

async fn enroll(devices: &DeviceService, mac: &str) -> Device {
    devices
        .create_device(CreateDeviceRequest {
            device: Some(device(mac)),
            ..CreateDeviceRequest::default()
        })
        .await
        .unwrap()
}

fn lighting_config() -> Config {
    Config {
        uid: None,
        display_name: Some("veg room".to_string()),
        light_config: Some(LightConfig {
            luminaires: vec![Luminaire {
                port: Some(1),
                use_pwm: Some(true),
                photo_period: vec![DailySchedule {
                    start: Some(TimeOfDay {
                        hour: Some(6),
                        minute: Some(0),
                        second: None,
                    }),
                    stop: Some(TimeOfDay {
                        hour: Some(22),
                        minute: Some(0),
                        second: None,
                    }),
                    intensity: Some(90),
                }],
            }],
        }),
    }
}

fn reading(source_uid: &str, timestamp: i64) -> Measurement {
    Measurement {
        source_uid: Some(source_uid.to_string()),
        timestamp: Some(timestamp),
        atmosphere: Some(Atmosphere {
            temperature: Some(23.8),
            humidity: Some(58.5),
        }),
        ..Measurement::default()
    }
}

// ============================================================================
// Provisioning Flow
// ============================================================================

/// Test the operator flow: store a configuration, enroll a device pointing
/// at it, then address the device by identifier and by hardware address.
#[tokio::test]
async fn test_provision_a_device_with_its_configuration() {
    let store = shared_store();
    let (devices, _) = domain_services(&store, "greenhouse-12").await;

    let config = devices
        .create_config(CreateConfigRequest {
            config: Some(lighting_config()),
            ..CreateConfigRequest::default()
        })
        .await
        .unwrap();
    let config_uid = config.uid.clone().unwrap();

    let enrolled = devices
        .create_device(CreateDeviceRequest {
            device: Some(Device {
                config_uid: Some(config_uid.clone()),
                ..device("aa:bb:cc:dd:ee:01")
            }),
            ..CreateDeviceRequest::default()
        })
        .await
        .unwrap();
    assert!(oid::is_valid(enrolled.uid.as_deref().unwrap()));
    assert_eq!(enrolled.config_uid.as_deref(), Some(config_uid.as_str()));

    // Both address forms resolve to the same record.
    let by_uid = devices
        .get_device(GetDeviceRequest {
            query: Some(DeviceQuery::Uid(enrolled.uid.clone().unwrap())),
            ..GetDeviceRequest::default()
        })
        .await
        .unwrap();
    assert_eq!(by_uid, enrolled);

    let by_mac = devices
        .get_device(GetDeviceRequest {
            query: Some(DeviceQuery::Mac("aa:bb:cc:dd:ee:01".to_string())),
            ..GetDeviceRequest::default()
        })
        .await
        .unwrap();
    assert_eq!(by_mac, enrolled);

    // The lighting plan survives storage in full depth.
    let stored = devices
        .get_config(GetConfigRequest {
            config_uid,
            ..GetConfigRequest::default()
        })
        .await
        .unwrap();
    assert_eq!(stored.display_name, lighting_config().display_name);
    assert_eq!(stored.light_config, lighting_config().light_config);
}

/// Test that the backend owns identifiers: whatever uid a caller writes
/// into a payload is discarded and replaced.
#[tokio::test]
async fn test_backend_owns_identifiers() {
    let store = shared_store();
    let (devices, _) = domain_services(&store, "greenhouse-12").await;

    let enrolled = devices
        .create_device(CreateDeviceRequest {
            device: Some(Device {
                uid: Some("masterkey".to_string()),
                ..device("aa:bb:cc:dd:ee:02")
            }),
            ..CreateDeviceRequest::default()
        })
        .await
        .unwrap();
    assert_ne!(enrolled.uid.as_deref(), Some("masterkey"));
    assert!(oid::is_valid(enrolled.uid.as_deref().unwrap()));

    let config = devices
        .create_config(CreateConfigRequest {
            config: Some(Config {
                uid: Some("masterkey".to_string()),
                ..lighting_config()
            }),
            ..CreateConfigRequest::default()
        })
        .await
        .unwrap();
    assert_ne!(config.uid.as_deref(), Some("masterkey"));
    assert!(oid::is_valid(config.uid.as_deref().unwrap()));
}

/// Test that a hardware address can exist once in the whole fleet, no
/// matter which domain tries to claim it or through which write path.
#[tokio::test]
async fn test_hardware_addresses_are_globally_unique() {
    let store = shared_store();
    let (domain_a, _) = domain_services(&store, "domain-a").await;
    let (domain_b, _) = domain_services(&store, "domain-b").await;

    let first = enroll(&domain_a, "00:00:00:00:00:00").await;

    // Same domain, same address.
    let err = domain_a
        .create_device(CreateDeviceRequest {
            device: Some(device("00:00:00:00:00:00")),
            ..CreateDeviceRequest::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.status(), Status::InvalidArgument);
    assert_eq!(err.message(), "unique key collision");

    // Another domain cannot claim it either.
    let err = domain_b
        .create_device(CreateDeviceRequest {
            device: Some(device("00:00:00:00:00:00")),
            ..CreateDeviceRequest::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.status(), Status::InvalidArgument);
    assert_eq!(err.message(), "unique key collision");

    // A different address is fine.
    enroll(&domain_b, "aa:bb:cc:dd:ee:04").await;

    // The update path is constrained the same way.
    let err = domain_a
        .update_device(UpdateDeviceRequest {
            device: Some(Device {
                uid: first.uid,
                mac: Some("aa:bb:cc:dd:ee:04".to_string()),
                ..Device::default()
            }),
            ..UpdateDeviceRequest::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.status(), Status::InvalidArgument);
    assert_eq!(err.message(), "unique key collision");
}

// ============================================================================
// Update and Delete Flows
// ============================================================================

/// Test that an update rewrites only what the patch carries and reads back
/// the merged record.
#[tokio::test]
async fn test_update_is_a_merge_patch_end_to_end() {
    let store = shared_store();
    let (devices, _) = domain_services(&store, "greenhouse-12").await;

    let enrolled = devices
        .create_device(CreateDeviceRequest {
            device: Some(Device {
                description: Some("drip irrigation controller".to_string()),
                timezone: Some("America/Montreal".to_string()),
                ..device("aa:bb:cc:dd:ee:05")
            }),
            ..CreateDeviceRequest::default()
        })
        .await
        .unwrap();

    let updated = devices
        .update_device(UpdateDeviceRequest {
            device: Some(Device {
                uid: enrolled.uid.clone(),
                mac: enrolled.mac.clone(),
                display_name: Some("north bench (recalibrated)".to_string()),
                ..Device::default()
            }),
            ..UpdateDeviceRequest::default()
        })
        .await
        .unwrap();
    assert_eq!(updated.uid, enrolled.uid);
    assert_eq!(updated.display_name.as_deref(), Some("north bench (recalibrated)"));
    assert_eq!(updated.mac, enrolled.mac);
    assert_eq!(updated.description.as_deref(), Some("drip irrigation controller"));
    assert_eq!(updated.timezone.as_deref(), Some("America/Montreal"));

    // Renaming a configuration leaves its lighting plan alone.
    let config = devices
        .create_config(CreateConfigRequest {
            config: Some(lighting_config()),
            ..CreateConfigRequest::default()
        })
        .await
        .unwrap();
    let renamed = devices
        .update_config(UpdateConfigRequest {
            config: Some(Config {
                uid: config.uid.clone(),
                display_name: Some("flower room".to_string()),
                light_config: None,
            }),
            ..UpdateConfigRequest::default()
        })
        .await
        .unwrap();
    assert_eq!(renamed.display_name.as_deref(), Some("flower room"));
    assert_eq!(renamed.light_config, config.light_config);
}

/// Test that a deleted device disappears from every read path and frees
/// its hardware address.
#[tokio::test]
async fn test_delete_flow() {
    let store = shared_store();
    let (devices, _) = domain_services(&store, "greenhouse-12").await;

    let enrolled = enroll(&devices, "aa:bb:cc:dd:ee:06").await;
    let uid = enrolled.uid.unwrap();

    devices
        .delete_device(DeleteDeviceRequest {
            device_uid: uid.clone(),
            ..DeleteDeviceRequest::default()
        })
        .await
        .unwrap();

    let err = devices
        .get_device(GetDeviceRequest {
            query: Some(DeviceQuery::Uid(uid.clone())),
            ..GetDeviceRequest::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.status(), Status::NotFound);
    assert_eq!(err.message(), "no such resource");

    let err = devices
        .get_device(GetDeviceRequest {
            query: Some(DeviceQuery::Mac("aa:bb:cc:dd:ee:06".to_string())),
            ..GetDeviceRequest::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.status(), Status::NotFound);

    let err = devices
        .delete_device(DeleteDeviceRequest {
            device_uid: uid,
            ..DeleteDeviceRequest::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.status(), Status::NotFound);

    // The address is free for a replacement unit.
    enroll(&devices, "aa:bb:cc:dd:ee:06").await;
}

// ============================================================================
// Tenant Isolation
// ============================================================================

/// Test that one domain can never observe or mutate another domain's fleet.
#[tokio::test]
async fn test_domains_are_isolated() {
    let store = shared_store();
    let (domain_a, _) = domain_services(&store, "domain-a").await;
    let (domain_b, _) = domain_services(&store, "domain-b").await;

    let enrolled = enroll(&domain_a, "aa:bb:cc:dd:ee:07").await;
    let device_uid = enrolled.uid.clone().unwrap();
    let config = domain_a
        .create_config(CreateConfigRequest {
            config: Some(lighting_config()),
            ..CreateConfigRequest::default()
        })
        .await
        .unwrap();

    // Domain B resolves nothing of domain A's, by either address form.
    let err = domain_b
        .get_device(GetDeviceRequest {
            query: Some(DeviceQuery::Uid(device_uid.clone())),
            ..GetDeviceRequest::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.status(), Status::NotFound);
    assert_eq!(err.message(), "no such resource");

    let err = domain_b
        .get_device(GetDeviceRequest {
            query: Some(DeviceQuery::Mac("aa:bb:cc:dd:ee:07".to_string())),
            ..GetDeviceRequest::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.status(), Status::NotFound);

    let err = domain_b
        .get_config(GetConfigRequest {
            config_uid: config.uid.unwrap(),
            ..GetConfigRequest::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.status(), Status::NotFound);

    let err = domain_b
        .delete_device(DeleteDeviceRequest {
            device_uid: device_uid.clone(),
            ..DeleteDeviceRequest::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.status(), Status::NotFound);

    // The failed cross-domain delete left domain A untouched.
    domain_a
        .get_device(GetDeviceRequest {
            query: Some(DeviceQuery::Uid(device_uid)),
            ..GetDeviceRequest::default()
        })
        .await
        .unwrap();
}

// ============================================================================
// Measurement Flow
// ============================================================================

/// Test ingestion and read-back: readings attach to an enrolled device and
/// the latest one wins.
#[tokio::test]
async fn test_measurement_flow() {
    let store = shared_store();
    let (devices, measurements) = domain_services(&store, "greenhouse-12").await;

    let enrolled = enroll(&devices, "aa:bb:cc:dd:ee:08").await;
    let device_uid = enrolled.uid.unwrap();

    let first = measurements
        .record_measurement(RecordMeasurementRequest {
            measurement: Some(reading(&device_uid, 1_700_000_000)),
            ..RecordMeasurementRequest::default()
        })
        .await
        .unwrap();
    let second = measurements
        .record_measurement(RecordMeasurementRequest {
            measurement: Some(reading(&device_uid, 1_700_000_060)),
            ..RecordMeasurementRequest::default()
        })
        .await
        .unwrap();
    assert_ne!(first, second);

    let latest = measurements
        .latest_measurement(LatestMeasurementRequest {
            source_uid: device_uid.clone(),
            ..LatestMeasurementRequest::default()
        })
        .await
        .unwrap();
    assert_eq!(latest.uid.as_deref(), Some(second.as_str()));
    assert_eq!(latest.source_uid.as_deref(), Some(device_uid.as_str()));
    assert_eq!(latest.timestamp, Some(1_700_000_060));
    assert_eq!(latest.atmosphere.unwrap().temperature, Some(23.8));
    assert_eq!(latest.solution, None);
}

/// Test that readings cannot be attributed to, or read back from, a device
/// in another domain.
#[tokio::test]
async fn test_measurement_source_is_domain_scoped() {
    let store = shared_store();
    let (devices_a, measurements_a) = domain_services(&store, "domain-a").await;
    let (_, measurements_b) = domain_services(&store, "domain-b").await;

    let enrolled = enroll(&devices_a, "aa:bb:cc:dd:ee:09").await;
    let device_uid = enrolled.uid.unwrap();

    measurements_a
        .record_measurement(RecordMeasurementRequest {
            measurement: Some(reading(&device_uid, 1_700_000_000)),
            ..RecordMeasurementRequest::default()
        })
        .await
        .unwrap();

    // Domain B cannot attribute a reading to A's device.
    let err = measurements_b
        .record_measurement(RecordMeasurementRequest {
            measurement: Some(reading(&device_uid, 1_700_000_060)),
            ..RecordMeasurementRequest::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.status(), Status::NotFound);
    assert_eq!(err.message(), "no such device");

    // Nor read A's data back out.
    let err = measurements_b
        .latest_measurement(LatestMeasurementRequest {
            source_uid: device_uid.clone(),
            ..LatestMeasurementRequest::default()
        })
        .await
        .unwrap_err();
    assert_eq!(err.status(), Status::NotFound);

    let latest = measurements_a
        .latest_measurement(LatestMeasurementRequest {
            source_uid: device_uid,
            ..LatestMeasurementRequest::default()
        })
        .await
        .unwrap();
    assert_eq!(latest.timestamp, Some(1_700_000_000));
}
