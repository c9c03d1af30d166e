//! Sensor measurement records.

use trellis_store::schema::{Field, FieldAccess, NestedRecord, Record, ScalarAccess};

/// One sensor reading reported by a device.
///
/// `source_uid` names the reporting [`Device`](super::Device); ingestion
/// refuses readings whose source is unknown in the caller's domain. A
/// measurement carries whichever sensor groups the device sampled; absent
/// groups stay absent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Measurement {
    /// Backend-assigned identifier. Ignored on input; populated on output.
    pub uid: Option<String>,
    /// Identifier of the device that produced the reading.
    pub source_uid: Option<String>,
    /// Sample instant, unix seconds. Stamped at ingestion when absent.
    pub timestamp: Option<i64>,
    /// Ambient air readings.
    pub atmosphere: Option<Atmosphere>,
    /// Nutrient solution readings.
    pub solution: Option<Solution>,
}

impl Measurement {
    /// Field tag of `source_uid`; the key measurement lookups filter on.
    pub const SOURCE_UID_TAG: u32 = 2;
}

/// Ambient air sensor group.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Atmosphere {
    /// Air temperature, degrees Celsius.
    pub temperature: Option<f64>,
    /// Relative humidity, percent.
    pub humidity: Option<f64>,
}

/// Nutrient solution sensor group.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Solution {
    /// Solution temperature, degrees Celsius.
    pub temperature: Option<f64>,
    /// Acidity.
    pub ph: Option<f64>,
    /// Electrical conductivity, mS/cm.
    pub ec: Option<f64>,
}

static MEASUREMENT_SCHEMA: [Field<Measurement>; 5] = [
    Field {
        tag: 1,
        name: "uid",
        access: FieldAccess::Scalar(ScalarAccess::String {
            get: |r: &Measurement| r.uid.as_deref(),
            set: |r: &mut Measurement, v| r.uid = Some(v),
        }),
    },
    Field {
        tag: Measurement::SOURCE_UID_TAG,
        name: "source_uid",
        access: FieldAccess::Scalar(ScalarAccess::String {
            get: |r: &Measurement| r.source_uid.as_deref(),
            set: |r: &mut Measurement, v| r.source_uid = Some(v),
        }),
    },
    Field {
        tag: 3,
        name: "timestamp",
        access: FieldAccess::Scalar(ScalarAccess::Int64 {
            get: |r: &Measurement| r.timestamp,
            set: |r: &mut Measurement, v| r.timestamp = Some(v),
        }),
    },
    Field {
        tag: 4,
        name: "atmosphere",
        access: FieldAccess::Nested {
            get: |r: &Measurement| r.atmosphere.as_ref().map(|a| a as &dyn NestedRecord),
            ensure: |r: &mut Measurement| {
                r.atmosphere.get_or_insert_with(Atmosphere::default) as &mut dyn NestedRecord
            },
        },
    },
    Field {
        tag: 5,
        name: "solution",
        access: FieldAccess::Nested {
            get: |r: &Measurement| r.solution.as_ref().map(|s| s as &dyn NestedRecord),
            ensure: |r: &mut Measurement| {
                r.solution.get_or_insert_with(Solution::default) as &mut dyn NestedRecord
            },
        },
    },
];

impl Record for Measurement {
    const NAME: &'static str = "Measurement";

    fn schema() -> &'static [Field<Self>] {
        &MEASUREMENT_SCHEMA
    }
}

static ATMOSPHERE_SCHEMA: [Field<Atmosphere>; 2] = [
    Field {
        tag: 1,
        name: "temperature",
        access: FieldAccess::Scalar(ScalarAccess::Double {
            get: |r: &Atmosphere| r.temperature,
            set: |r: &mut Atmosphere, v| r.temperature = Some(v),
        }),
    },
    Field {
        tag: 2,
        name: "humidity",
        access: FieldAccess::Scalar(ScalarAccess::Double {
            get: |r: &Atmosphere| r.humidity,
            set: |r: &mut Atmosphere, v| r.humidity = Some(v),
        }),
    },
];

impl Record for Atmosphere {
    const NAME: &'static str = "Atmosphere";

    fn schema() -> &'static [Field<Self>] {
        &ATMOSPHERE_SCHEMA
    }
}

static SOLUTION_SCHEMA: [Field<Solution>; 3] = [
    Field {
        tag: 1,
        name: "temperature",
        access: FieldAccess::Scalar(ScalarAccess::Double {
            get: |r: &Solution| r.temperature,
            set: |r: &mut Solution, v| r.temperature = Some(v),
        }),
    },
    Field {
        tag: 2,
        name: "ph",
        access: FieldAccess::Scalar(ScalarAccess::Double {
            get: |r: &Solution| r.ph,
            set: |r: &mut Solution, v| r.ph = Some(v),
        }),
    },
    Field {
        tag: 3,
        name: "ec",
        access: FieldAccess::Scalar(ScalarAccess::Double {
            get: |r: &Solution| r.ec,
            set: |r: &mut Solution, v| r.ec = Some(v),
        }),
    },
];

impl Record for Solution {
    const NAME: &'static str = "Solution";

    fn schema() -> &'static [Field<Self>] {
        &SOLUTION_SCHEMA
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_store::codec::{document_to_record, record_to_document};
    use trellis_store::schema::duplicate_tag;

    #[test]
    fn test_schemas_have_unique_tags() {
        assert_eq!(duplicate_tag::<Measurement>(), None);
        assert_eq!(duplicate_tag::<Atmosphere>(), None);
        assert_eq!(duplicate_tag::<Solution>(), None);
    }

    #[test]
    fn test_round_trip_with_one_sensor_group() {
        let measurement = Measurement {
            uid: None,
            source_uid: Some("662a2b4a9bd1e5c3a0f0a1b2".to_string()),
            timestamp: Some(1_700_000_000),
            atmosphere: Some(Atmosphere {
                temperature: Some(24.5),
                humidity: Some(61.0),
            }),
            solution: None,
        };

        let document = record_to_document(&measurement).unwrap();
        assert!(!document.contains_key("5"));

        let decoded: Measurement = document_to_record(&document).unwrap();
        assert_eq!(decoded, measurement);
        assert_eq!(decoded.solution, None);
    }

    #[test]
    fn test_source_uid_is_stored_under_its_tag() {
        let measurement = Measurement {
            source_uid: Some("662a2b4a9bd1e5c3a0f0a1b2".to_string()),
            ..Measurement::default()
        };
        let document = record_to_document(&measurement).unwrap();
        assert_eq!(
            document
                .get_str(Measurement::SOURCE_UID_TAG.to_string())
                .unwrap(),
            "662a2b4a9bd1e5c3a0f0a1b2"
        );
    }
}
