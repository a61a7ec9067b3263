//! Sample Model
//!
//! This module defines a single biometric reading and the enumerations describing what was
//! measured and how much the reading can be trusted.

use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::core::constants::OUTLIER_FLAG;

/// The biometric signal a stream carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SignalType {
    HeartRate,
    BloodPressureSystolic,
    BloodPressureDiastolic,
    RespiratoryRate,
    BodyTemperature,
    OxygenSaturation,
    BloodGlucose,
    Cortisol,
    SleepQuality,
    EegThetaPower,
    MotionActivity,
}

impl SignalType {
    /// Every known signal type, in declaration order.
    pub const ALL: [SignalType; 11] = [
        SignalType::HeartRate,
        SignalType::BloodPressureSystolic,
        SignalType::BloodPressureDiastolic,
        SignalType::RespiratoryRate,
        SignalType::BodyTemperature,
        SignalType::OxygenSaturation,
        SignalType::BloodGlucose,
        SignalType::Cortisol,
        SignalType::SleepQuality,
        SignalType::EegThetaPower,
        SignalType::MotionActivity,
    ];

    /// Unit used when a stream does not report its own.
    pub fn default_unit(&self) -> &'static str {
        match self {
            SignalType::HeartRate => "bpm",
            SignalType::BloodPressureSystolic | SignalType::BloodPressureDiastolic => "mmHg",
            SignalType::RespiratoryRate => "breaths/min",
            SignalType::BodyTemperature => "°C",
            SignalType::OxygenSaturation => "%",
            SignalType::BloodGlucose => "mg/dL",
            SignalType::Cortisol => "µg/dL",
            SignalType::SleepQuality => "score",
            SignalType::EegThetaPower => "µV²",
            SignalType::MotionActivity => "counts",
        }
    }
}

impl fmt::Display for SignalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignalType::HeartRate => "heartRate",
            SignalType::BloodPressureSystolic => "bloodPressureSystolic",
            SignalType::BloodPressureDiastolic => "bloodPressureDiastolic",
            SignalType::RespiratoryRate => "respiratoryRate",
            SignalType::BodyTemperature => "bodyTemperature",
            SignalType::OxygenSaturation => "oxygenSaturation",
            SignalType::BloodGlucose => "bloodGlucose",
            SignalType::Cortisol => "cortisol",
            SignalType::SleepQuality => "sleepQuality",
            SignalType::EegThetaPower => "eegThetaPower",
            SignalType::MotionActivity => "motionActivity",
        };
        f.write_str(name)
    }
}

/// Trust level attached to a sample.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    #[default]
    High,
    Medium,
    Low,
}

/// One biometric reading.
///
/// Samples are immutable once built. Reclassification (see
/// [`Sample::flagged_as_outlier`]) yields a tagged copy and leaves the original untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sample {
    id: Uuid,
    stream_id: String,
    signal_type: SignalType,
    value: f64,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
    quality: Quality,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    flags: Vec<String>,
}

impl Sample {
    /// Constructs a new high quality sample with a fresh id.
    pub fn new(
        stream_id: impl Into<String>,
        signal_type: SignalType,
        value: f64,
        timestamp: OffsetDateTime,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            stream_id: stream_id.into(),
            signal_type,
            value,
            timestamp,
            quality: Quality::High,
            flags: Vec::new(),
        }
    }

    /// Returns the same sample with a different quality tag.
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Returns a copy tagged as an outlier: quality low, `"outlier"` flag appended.
    pub fn flagged_as_outlier(&self) -> Self {
        let mut copy = self.clone();
        copy.quality = Quality::Low;
        if !copy.is_outlier() {
            copy.flags.push(OUTLIER_FLAG.to_owned());
        }
        copy
    }

    pub fn get_id(&self) -> Uuid {
        self.id
    }

    pub fn get_stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn get_signal_type(&self) -> SignalType {
        self.signal_type
    }

    pub fn get_value(&self) -> f64 {
        self.value
    }

    pub fn get_timestamp(&self) -> OffsetDateTime {
        self.timestamp
    }

    pub fn get_quality(&self) -> Quality {
        self.quality
    }

    pub fn get_flags(&self) -> &[String] {
        &self.flags
    }

    /// Checks whether the outlier filter rejected this sample.
    pub fn is_outlier(&self) -> bool {
        self.flags.iter().any(|f| f == OUTLIER_FLAG)
    }
}
