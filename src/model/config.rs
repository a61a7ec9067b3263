//! Session Configuration
//!
//! Options recognised by a stream session. The JSON form uses camelCase keys; unknown keys
//! (such as the retired `normalizeData`) are ignored.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{collections::HashMap, fs, path::Path, time::Duration};

use super::{
    sample::SignalType,
    threshold::{ThresholdRule, ThresholdTable},
};
use crate::core::constants::{
    DEFAULT_ALERT_CAPACITY, DEFAULT_BUFFER_SIZE, DEFAULT_CONNECT_TIMEOUT_MS,
    DEFAULT_CORRELATION_MINUTES, DEFAULT_CORRELATION_POINTS, DEFAULT_OUTLIER_WINDOW,
    DEFAULT_OUTLIER_Z_SCORE, DEFAULT_SAMPLE_RATE, MAX_SAMPLE_RATE,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// Simulated feed rate in samples per minute.
    pub sample_rate: u32,
    /// Per-stream ring buffer capacity.
    pub buffer_size: usize,
    /// Correlation window in minutes, reported only.
    pub correlation_window: u32,
    /// Trailing points used for correlation.
    pub correlation_points: usize,
    /// Per-signal rule sets replacing the defaults.
    pub alert_thresholds: HashMap<SignalType, Vec<ThresholdRule>>,
    pub filter_outliers: bool,
    pub outlier_window: usize,
    pub outlier_z_score: f64,
    pub alert_capacity: usize,
    pub connect_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            buffer_size: DEFAULT_BUFFER_SIZE,
            correlation_window: DEFAULT_CORRELATION_MINUTES,
            correlation_points: DEFAULT_CORRELATION_POINTS,
            alert_thresholds: HashMap::new(),
            filter_outliers: true,
            outlier_window: DEFAULT_OUTLIER_WINDOW,
            outlier_z_score: DEFAULT_OUTLIER_Z_SCORE,
            alert_capacity: DEFAULT_ALERT_CAPACITY,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }
}

impl SessionConfig {
    /// Loads and validates a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::from_json(&json)
    }

    /// Parses and validates a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings the session could not run with.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(anyhow!("sampleRate must be positive"));
        }
        if self.sample_rate > MAX_SAMPLE_RATE {
            return Err(anyhow!("sampleRate must not exceed {} per minute", MAX_SAMPLE_RATE));
        }
        if self.buffer_size == 0 {
            return Err(anyhow!("bufferSize must be positive"));
        }
        if self.alert_capacity == 0 {
            return Err(anyhow!("alertCapacity must be positive"));
        }
        if self.outlier_window < 2 {
            return Err(anyhow!("outlierWindow must be at least 2"));
        }
        if !self.outlier_z_score.is_finite() || self.outlier_z_score <= 0.0 {
            return Err(anyhow!("outlierZScore must be a positive number"));
        }
        // surfaces malformed rules at load time
        self.threshold_table().map(|_| ())
    }

    /// Default thresholds with this configuration's overrides applied.
    pub fn threshold_table(&self) -> Result<ThresholdTable> {
        ThresholdTable::with_overrides(&self.alert_thresholds)
    }

    /// Interval between two simulated feed ticks, never shorter than 1 ms.
    pub fn feed_interval(&self) -> Duration {
        Duration::from_millis((60_000 / u64::from(self.sample_rate.max(1))).max(1))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
