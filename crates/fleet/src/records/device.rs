//! Device inventory record.

use trellis_store::schema::{Field, FieldAccess, Record, ScalarAccess};

/// A piece of fleet hardware enrolled with the backend.
///
/// The `mac` is the device's stable hardware identity and is declared unique
/// across the whole device collection, domains included, when the device
/// service starts. `config_uid` cross-references a [`Config`](super::Config)
/// in the same domain. `timezone` is carried as an opaque IANA name; nothing
/// here computes offsets.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Device {
    /// Backend-assigned identifier. Ignored on input; populated on output.
    pub uid: Option<String>,
    /// Hardware address, `XX:XX:XX:XX:XX:XX`.
    pub mac: Option<String>,
    /// Operator-facing name.
    pub display_name: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
    /// IANA timezone name, kept opaque.
    pub timezone: Option<String>,
    /// Identifier of the configuration applied to this device.
    pub config_uid: Option<String>,
}

impl Device {
    /// Field tag of `mac`; the key of the collection-wide unique index.
    pub const MAC_TAG: u32 = 2;
}

static DEVICE_SCHEMA: [Field<Device>; 6] = [
    Field {
        tag: 1,
        name: "uid",
        access: FieldAccess::Scalar(ScalarAccess::String {
            get: |r: &Device| r.uid.as_deref(),
            set: |r: &mut Device, v| r.uid = Some(v),
        }),
    },
    Field {
        tag: Device::MAC_TAG,
        name: "mac",
        access: FieldAccess::Scalar(ScalarAccess::String {
            get: |r: &Device| r.mac.as_deref(),
            set: |r: &mut Device, v| r.mac = Some(v),
        }),
    },
    Field {
        tag: 3,
        name: "display_name",
        access: FieldAccess::Scalar(ScalarAccess::String {
            get: |r: &Device| r.display_name.as_deref(),
            set: |r: &mut Device, v| r.display_name = Some(v),
        }),
    },
    Field {
        tag: 4,
        name: "description",
        access: FieldAccess::Scalar(ScalarAccess::String {
            get: |r: &Device| r.description.as_deref(),
            set: |r: &mut Device, v| r.description = Some(v),
        }),
    },
    Field {
        tag: 5,
        name: "timezone",
        access: FieldAccess::Scalar(ScalarAccess::String {
            get: |r: &Device| r.timezone.as_deref(),
            set: |r: &mut Device, v| r.timezone = Some(v),
        }),
    },
    Field {
        tag: 6,
        name: "config_uid",
        access: FieldAccess::Scalar(ScalarAccess::String {
            get: |r: &Device| r.config_uid.as_deref(),
            set: |r: &mut Device, v| r.config_uid = Some(v),
        }),
    },
];

impl Record for Device {
    const NAME: &'static str = "Device";

    fn schema() -> &'static [Field<Self>] {
        &DEVICE_SCHEMA
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trellis_store::codec::{document_to_record, record_to_document};
    use trellis_store::schema::duplicate_tag;

    fn sample() -> Device {
        Device {
            uid: None,
            mac: Some("aa:bb:cc:dd:ee:ff".to_string()),
            display_name: Some("north bench".to_string()),
            description: Some("drip irrigation controller".to_string()),
            timezone: Some("America/Montreal".to_string()),
            config_uid: Some("662a2b4a9bd1e5c3a0f0a1b2".to_string()),
        }
    }

    #[test]
    fn test_schema_has_unique_tags() {
        assert_eq!(duplicate_tag::<Device>(), None);
    }

    #[test]
    fn test_mac_tag_points_at_the_mac_field() {
        let field = Device::schema()
            .iter()
            .find(|field| field.tag == Device::MAC_TAG)
            .unwrap();
        assert_eq!(field.name, "mac");
    }

    #[test]
    fn test_round_trip() {
        let device = sample();
        let document = record_to_document(&device).unwrap();
        assert_eq!(document.get_str("2").unwrap(), "aa:bb:cc:dd:ee:ff");
        assert_eq!(document_to_record::<Device>(&document).unwrap(), device);
    }

    #[test]
    fn test_absent_fields_stay_absent() {
        let device = Device {
            mac: Some("aa:bb:cc:dd:ee:ff".to_string()),
            ..Device::default()
        };
        let document = record_to_document(&device).unwrap();
        assert_eq!(document.keys().count(), 1);

        let decoded: Device = document_to_record(&document).unwrap();
        assert_eq!(decoded.display_name, None);
        assert_eq!(decoded.config_uid, None);
    }
}
