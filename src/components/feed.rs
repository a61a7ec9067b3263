//! Simulated Sample Source
//!
//! Draws Gaussian readings around a resting baseline per signal type. A small share of readings
//! is pushed far from the baseline so that the alerting path gets exercised.

use rand::{rngs::StdRng, Rng, SeedableRng};
use std::f64::consts::PI;
use time::OffsetDateTime;

use crate::{
    api::controller::SampleSource,
    model::{
        sample::{Quality, Sample, SignalType},
        stream::StreamMetadata,
    },
};

/// Default share of readings that are drawn with an inflated spread.
const DEFAULT_ANOMALY_RATE: f64 = 0.02;
/// Spread multiplier for anomalous readings.
const ANOMALY_SPREAD: f64 = 5.0;

/// Resting mean and standard deviation of a signal.
fn baseline(signal_type: SignalType) -> (f64, f64) {
    match signal_type {
        SignalType::HeartRate => (72.0, 6.0),
        SignalType::BloodPressureSystolic => (115.0, 6.0),
        SignalType::BloodPressureDiastolic => (74.0, 4.0),
        SignalType::RespiratoryRate => (15.0, 1.5),
        SignalType::BodyTemperature => (36.8, 0.2),
        SignalType::OxygenSaturation => (97.5, 0.8),
        SignalType::BloodGlucose => (95.0, 10.0),
        SignalType::Cortisol => (14.0, 3.0),
        SignalType::SleepQuality => (75.0, 8.0),
        SignalType::EegThetaPower => (12.0, 3.0),
        SignalType::MotionActivity => (150.0, 50.0),
    }
}

#[derive(Debug, Clone)]
pub struct SimulatedSource {
    rng: StdRng,
    anomaly_rate: f64,
}

impl Default for SimulatedSource {
    fn default() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            anomaly_rate: DEFAULT_ANOMALY_RATE,
        }
    }
}

impl SimulatedSource {
    /// Creates a reproducible source.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            anomaly_rate: DEFAULT_ANOMALY_RATE,
        }
    }

    /// Sets the share of anomalous readings, clamped to `[0, 1]`.
    pub fn with_anomaly_rate(mut self, rate: f64) -> Self {
        self.anomaly_rate = rate.clamp(0.0, 1.0);
        self
    }

    /// Standard normal draw (Box-Muller).
    fn gaussian(&mut self) -> f64 {
        let u1: f64 = self.rng.gen_range(f64::EPSILON..1.0);
        let u2: f64 = self.rng.gen();
        (-2.0 * u1.ln()).sqrt() * (2.0 * PI * u2).cos()
    }
}

impl SampleSource for SimulatedSource {
    fn next_sample(&mut self, stream: &StreamMetadata, timestamp: OffsetDateTime) -> Sample {
        let (mean, std) = baseline(stream.signal_type);
        let anomalous = self.rng.gen_bool(self.anomaly_rate);
        let spread = if anomalous { std * ANOMALY_SPREAD } else { std };
        let value = (mean + self.gaussian() * spread).max(0.0);
        let quality = if anomalous { Quality::Medium } else { Quality::High };
        Sample::new(stream.id.clone(), stream.signal_type, value, timestamp).with_quality(quality)
    }
}
