//! Measurement ingestion service.
//!
//! Devices report sensor readings; the service attributes each reading to an
//! enrolled device in the caller's domain and persists it to the measurement
//! collection. Read-back is deliberately narrow: the newest reading of one
//! device, which is what dashboards poll for.
//!
//! The source-device existence check and the insert are two independent
//! round-trips; a reading can slip in for a device deleted in that window.

use std::sync::Arc;

use bson::doc;
use chrono::Utc;

use trellis_store::{Collection, DOMAIN_KEY, DocumentStore, Domain, Error, Result, oid};

use crate::auth::{DomainResolver, RequestContext};
use crate::config::FleetConfig;
use crate::records::{Device, Measurement};

/// Ingests one sensor reading.
#[derive(Debug, Clone, Default)]
pub struct RecordMeasurementRequest {
    /// Caller credentials.
    pub context: RequestContext,
    /// The reading to store. Any caller-supplied `uid` is discarded; an
    /// absent `timestamp` is stamped with the ingestion instant.
    pub measurement: Option<Measurement>,
}

/// Fetches the newest reading reported by one device.
#[derive(Debug, Clone, Default)]
pub struct LatestMeasurementRequest {
    /// Caller credentials.
    pub context: RequestContext,
    /// Identifier of the device whose reading to fetch.
    pub source_uid: String,
}

/// Ingestion and read-back of device sensor readings.
pub struct MeasurementService {
    measurements: Collection<Measurement>,
    devices: Collection<Device>,
    resolver: Arc<dyn DomainResolver>,
}

impl MeasurementService {
    /// Builds the service over `store`. Unlike the device service there is
    /// no index to declare, so construction cannot fail.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        config: &FleetConfig,
        resolver: Arc<dyn DomainResolver>,
    ) -> Self {
        Self {
            measurements: Collection::new(Arc::clone(&store), &config.measurement_collection),
            devices: Collection::new(store, &config.device_collection),
            resolver,
        }
    }

    /// Stores a reading and returns its assigned identifier.
    pub async fn record_measurement(&self, request: RecordMeasurementRequest) -> Result<String> {
        let domain = self.resolver.resolve(&request.context).await?;

        let Some(measurement) = request.measurement else {
            return Err(Error::invalid_argument("empty request"));
        };

        let mut measurement = sanitize_measurement(measurement);
        self.validate_measurement(&measurement, &domain).await?;

        if measurement.timestamp.is_none() {
            measurement.timestamp = Some(Utc::now().timestamp());
        }

        self.measurements.create(&domain, &measurement).await
    }

    /// Fetches the most recent reading of one device.
    pub async fn latest_measurement(&self, request: LatestMeasurementRequest) -> Result<Measurement> {
        let domain = self.resolver.resolve(&request.context).await?;

        if !oid::is_valid(&request.source_uid) {
            return Err(Error::invalid_argument("invalid device uid"));
        }

        let source_key = Measurement::SOURCE_UID_TAG.to_string();
        let filter = doc! { DOMAIN_KEY: domain.as_str(), source_key: request.source_uid };
        let (uid, mut measurement) = self.measurements.get_latest_matching(filter).await?;
        measurement.uid = Some(uid);
        Ok(measurement)
    }

    /// Rejects readings the fleet cannot attribute: the source must be a
    /// well-formed identifier naming a device in the caller's domain.
    async fn validate_measurement(&self, measurement: &Measurement, domain: &Domain) -> Result<()> {
        let source = measurement.source_uid.as_deref().unwrap_or_default();
        if !oid::is_valid(source) {
            return Err(Error::invalid_argument("missing or invalid source uid"));
        }

        if self.devices.contains(source, domain).await.is_err() {
            return Err(Error::not_found("no such device"));
        }

        Ok(())
    }
}

/// Strips what callers may not set; identity comes from the backend.
fn sanitize_measurement(mut measurement: Measurement) -> Measurement {
    measurement.uid = None;
    measurement
}
