//! Session Snapshot
//!
//! Serializable view of a session: lifecycle state, stream summaries, the alert log and the
//! running counters. This is what gets written to disk and handed to consumers.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use time::OffsetDateTime;

use super::{alert::Alert, stream::StreamMetadata};
use crate::components::correlation::StreamCorrelation;

/// Lifecycle state of a session.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    /// Transient sub-state of `Connected` while a sample is ingested.
    Processing,
}

/// Running counters of a session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetrics {
    pub samples_processed: u64,
    pub alerts_generated: u64,
    /// Halved running average of ingest latency, in milliseconds.
    pub average_latency_ms: f64,
}

impl SessionMetrics {
    /// Accounts for one ingested sample.
    pub fn record(&mut self, elapsed: Duration, alerts: usize) {
        self.samples_processed += 1;
        self.alerts_generated += alerts as u64;
        self.average_latency_ms = (self.average_latency_ms + elapsed.as_secs_f64() * 1e3) / 2.0;
    }
}

/// One connected stream and the state of its buffer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamSummary {
    #[serde(flatten)]
    pub metadata: StreamMetadata,
    pub samples: usize,
    pub latest_value: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub patient_id: String,
    pub state: ConnectionState,
    pub streams: Vec<StreamSummary>,
    pub alerts: Vec<Alert>,
    pub metrics: SessionMetrics,
    pub correlations: Vec<StreamCorrelation>,
    pub last_error: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub taken_at: OffsetDateTime,
}
