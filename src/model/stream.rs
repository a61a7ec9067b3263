//! Stream Model
//!
//! Metadata describing a named, typed source of samples, as handed out by the stream directory.

use serde::{Deserialize, Serialize};

use super::sample::SignalType;

/// A named, typed source of samples owned by one patient.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamMetadata {
    /// Unique id of the stream.
    pub id: String,
    /// Patient the stream belongs to.
    pub patient_id: String,
    /// Signal carried by the stream.
    pub signal_type: SignalType,
    /// Unit of the sample values.
    pub unit: String,
    /// Inactive streams are skipped on connect.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl StreamMetadata {
    /// Creates an active stream using the signal's default unit.
    pub fn new(id: impl Into<String>, patient_id: impl Into<String>, signal_type: SignalType) -> Self {
        Self {
            id: id.into(),
            patient_id: patient_id.into(),
            signal_type,
            unit: signal_type.default_unit().to_owned(),
            active: true,
        }
    }
}
