//! Outlier Filter
//!
//! Rolling-window z-score filter run on every sample before it reaches the buffer. Samples far
//! from the recent mean are kept but tagged, so they are still stored and evaluated.

use log::debug;

use crate::{
    core::constants::{DEFAULT_OUTLIER_WINDOW, DEFAULT_OUTLIER_Z_SCORE},
    math::stats::mean_and_std,
    model::{buffer::RingBuffer, sample::Sample},
};

#[derive(Clone, Debug)]
pub struct OutlierFilter {
    window: usize,
    z_score: f64,
}

impl Default for OutlierFilter {
    fn default() -> Self {
        Self::new(DEFAULT_OUTLIER_WINDOW, DEFAULT_OUTLIER_Z_SCORE)
    }
}

impl OutlierFilter {
    pub fn new(window: usize, z_score: f64) -> Self {
        Self { window, z_score }
    }

    /// Classifies `sample` against the stream's history.
    ///
    /// Until the history holds `window` samples nothing is flagged. Afterwards the sample is
    /// tagged when it lies more than `z_score` population standard deviations from the mean of
    /// the last `window` values. Constant history flags any deviation.
    pub fn classify(&self, sample: Sample, history: &RingBuffer) -> Sample {
        if history.len() < self.window {
            return sample;
        }
        let recent = history.values(self.window);
        let Some((mean, std)) = mean_and_std(&recent) else {
            return sample;
        };
        let deviation = (sample.get_value() - mean).abs();
        if deviation > self.z_score * std {
            debug!(
                "outlier on {}: {} deviates {:.3} from mean {:.3} (std {:.3})",
                sample.get_stream_id(),
                sample.get_value(),
                deviation,
                mean,
                std
            );
            sample.flagged_as_outlier()
        } else {
            sample
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::sample::{Quality, SignalType};
    use time::OffsetDateTime;

    fn sample(value: f64) -> Sample {
        Sample::new("s1", SignalType::HeartRate, value, OffsetDateTime::now_utc())
    }

    #[test]
    fn test_cold_start_never_flags() {
        let filter = OutlierFilter::default();
        let mut history = RingBuffer::new(100);
        let values = [50.0, 5000.0, -300.0, 0.0, 1e9, 50.0, 51.0, 1e-9, 77.0, 12345.0];
        for value in values {
            let classified = filter.classify(sample(value), &history);
            assert!(!classified.is_outlier());
            assert_eq!(classified.get_quality(), Quality::High);
            history.append(classified);
        }
    }

    #[test]
    fn test_detects_spike_after_constant_history() {
        let filter = OutlierFilter::default();
        let mut history = RingBuffer::new(100);
        for _ in 0..10 {
            history.append(filter.classify(sample(50.0), &history));
        }
        let classified = filter.classify(sample(1000.0), &history);
        assert_eq!(classified.get_quality(), Quality::Low);
        assert!(classified.get_flags().contains(&"outlier".to_string()));
    }

    #[test]
    fn test_constant_history_accepts_identical_value() {
        let filter = OutlierFilter::default();
        let mut history = RingBuffer::new(100);
        for _ in 0..12 {
            history.append(sample(50.0));
        }
        assert!(!filter.classify(sample(50.0), &history).is_outlier());
        assert!(filter.classify(sample(50.1), &history).is_outlier());
    }

    #[test]
    fn test_within_spread_is_kept() {
        let filter = OutlierFilter::default();
        let mut history = RingBuffer::new(100);
        for i in 0..20 {
            history.append(sample(60.0 + (i % 5) as f64));
        }
        assert!(!filter.classify(sample(63.0), &history).is_outlier());
    }

    #[test]
    fn test_uses_only_trailing_window() {
        let filter = OutlierFilter::default();
        let mut history = RingBuffer::new(100);
        for _ in 0..10 {
            history.append(sample(1000.0));
        }
        for i in 0..10 {
            history.append(sample(50.0 + (i % 2) as f64));
        }
        assert!(filter.classify(sample(1000.0), &history).is_outlier());
    }
}
