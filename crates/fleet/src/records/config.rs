//! Device configuration records.
//!
//! A [`Config`] describes how a device drives its attached hardware. The
//! interesting part is the lighting plan: a [`LightConfig`] holds one
//! [`Luminaire`] per output port, each with an ordered photo-period of
//! [`DailySchedule`] entries bounded by [`TimeOfDay`] marks. The nesting and
//! the repeated sub-records are what exercise the codec's recursion.

use trellis_store::schema::{Field, FieldAccess, NestedRecord, Record, ScalarAccess, push_default};

/// A named device configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Config {
    /// Backend-assigned identifier. Ignored on input; populated on output.
    pub uid: Option<String>,
    /// Operator-facing name.
    pub display_name: Option<String>,
    /// Lighting plan applied by devices using this configuration.
    pub light_config: Option<LightConfig>,
}

/// The lighting plan of a configuration.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LightConfig {
    /// One entry per driven luminaire, in port order.
    pub luminaires: Vec<Luminaire>,
}

/// One light output and its daily schedule.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Luminaire {
    /// Output port the luminaire is wired to.
    pub port: Option<u32>,
    /// Whether intensity is driven by PWM rather than on/off switching.
    pub use_pwm: Option<bool>,
    /// Ordered on-intervals over a day.
    pub photo_period: Vec<DailySchedule>,
}

/// One interval of a luminaire's photo-period.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DailySchedule {
    /// When the interval begins.
    pub start: Option<TimeOfDay>,
    /// When the interval ends.
    pub stop: Option<TimeOfDay>,
    /// Drive intensity during the interval, 0-100.
    pub intensity: Option<u32>,
}

/// A wall-clock instant within a day.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeOfDay {
    /// Hour, 0-23.
    pub hour: Option<u32>,
    /// Minute, 0-59.
    pub minute: Option<u32>,
    /// Second, 0-59.
    pub second: Option<u32>,
}

static CONFIG_SCHEMA: [Field<Config>; 3] = [
    Field {
        tag: 1,
        name: "uid",
        access: FieldAccess::Scalar(ScalarAccess::String {
            get: |r: &Config| r.uid.as_deref(),
            set: |r: &mut Config, v| r.uid = Some(v),
        }),
    },
    Field {
        tag: 2,
        name: "display_name",
        access: FieldAccess::Scalar(ScalarAccess::String {
            get: |r: &Config| r.display_name.as_deref(),
            set: |r: &mut Config, v| r.display_name = Some(v),
        }),
    },
    Field {
        tag: 3,
        name: "light_config",
        access: FieldAccess::Nested {
            get: |r: &Config| r.light_config.as_ref().map(|c| c as &dyn NestedRecord),
            ensure: |r: &mut Config| {
                r.light_config.get_or_insert_with(LightConfig::default) as &mut dyn NestedRecord
            },
        },
    },
];

impl Record for Config {
    const NAME: &'static str = "Config";

    fn schema() -> &'static [Field<Self>] {
        &CONFIG_SCHEMA
    }
}

static LIGHT_CONFIG_SCHEMA: [Field<LightConfig>; 1] = [Field {
    tag: 1,
    name: "luminaires",
    access: FieldAccess::RepeatedNested {
        get: |r: &LightConfig| r.luminaires.iter().map(|l| l as &dyn NestedRecord).collect(),
        push: |r: &mut LightConfig| push_default(&mut r.luminaires) as &mut dyn NestedRecord,
    },
}];

impl Record for LightConfig {
    const NAME: &'static str = "LightConfig";

    fn schema() -> &'static [Field<Self>] {
        &LIGHT_CONFIG_SCHEMA
    }
}

static LUMINAIRE_SCHEMA: [Field<Luminaire>; 3] = [
    Field {
        tag: 1,
        name: "port",
        access: FieldAccess::Scalar(ScalarAccess::UInt32 {
            get: |r: &Luminaire| r.port,
            set: |r: &mut Luminaire, v| r.port = Some(v),
        }),
    },
    Field {
        tag: 2,
        name: "use_pwm",
        access: FieldAccess::Scalar(ScalarAccess::Bool {
            get: |r: &Luminaire| r.use_pwm,
            set: |r: &mut Luminaire, v| r.use_pwm = Some(v),
        }),
    },
    Field {
        tag: 3,
        name: "photo_period",
        access: FieldAccess::RepeatedNested {
            get: |r: &Luminaire| r.photo_period.iter().map(|s| s as &dyn NestedRecord).collect(),
            push: |r: &mut Luminaire| push_default(&mut r.photo_period) as &mut dyn NestedRecord,
        },
    },
];

impl Record for Luminaire {
    const NAME: &'static str = "Luminaire";

    fn schema() -> &'static [Field<Self>] {
        &LUMINAIRE_SCHEMA
    }
}

static DAILY_SCHEDULE_SCHEMA: [Field<DailySchedule>; 3] = [
    Field {
        tag: 1,
        name: "start",
        access: FieldAccess::Nested {
            get: |r: &DailySchedule| r.start.as_ref().map(|t| t as &dyn NestedRecord),
            ensure: |r: &mut DailySchedule| {
                r.start.get_or_insert_with(TimeOfDay::default) as &mut dyn NestedRecord
            },
        },
    },
    Field {
        tag: 2,
        name: "stop",
        access: FieldAccess::Nested {
            get: |r: &DailySchedule| r.stop.as_ref().map(|t| t as &dyn NestedRecord),
            ensure: |r: &mut DailySchedule| {
                r.stop.get_or_insert_with(TimeOfDay::default) as &mut dyn NestedRecord
            },
        },
    },
    Field {
        tag: 3,
        name: "intensity",
        access: FieldAccess::Scalar(ScalarAccess::UInt32 {
            get: |r: &DailySchedule| r.intensity,
            set: |r: &mut DailySchedule, v| r.intensity = Some(v),
        }),
    },
];

impl Record for DailySchedule {
    const NAME: &'static str = "DailySchedule";

    fn schema() -> &'static [Field<Self>] {
        &DAILY_SCHEDULE_SCHEMA
    }
}

static TIME_OF_DAY_SCHEMA: [Field<TimeOfDay>; 3] = [
    Field {
        tag: 1,
        name: "hour",
        access: FieldAccess::Scalar(ScalarAccess::UInt32 {
            get: |r: &TimeOfDay| r.hour,
            set: |r: &mut TimeOfDay, v| r.hour = Some(v),
        }),
    },
    Field {
        tag: 2,
        name: "minute",
        access: FieldAccess::Scalar(ScalarAccess::UInt32 {
            get: |r: &TimeOfDay| r.minute,
            set: |r: &mut TimeOfDay, v| r.minute = Some(v),
        }),
    },
    Field {
        tag: 3,
        name: "second",
        access: FieldAccess::Scalar(ScalarAccess::UInt32 {
            get: |r: &TimeOfDay| r.second,
            set: |r: &mut TimeOfDay, v| r.second = Some(v),
        }),
    },
];

impl Record for TimeOfDay {
    const NAME: &'static str = "TimeOfDay";

    fn schema() -> &'static [Field<Self>] {
        &TIME_OF_DAY_SCHEMA
    }
}
