//! Correlation Engine
//!
//! Pearson correlation between the recent windows of two streams. The windows are the last N
//! points of each buffer and are not aligned by timestamp, which is only meaningful when both
//! streams sample at the same rate and started together.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{
    core::constants::{DEFAULT_CORRELATION_POINTS, MIN_CORRELATION_SAMPLES},
    math::stats::pearson,
    model::buffer::RingBuffer,
};

/// Correlation of one unordered stream pair.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamCorrelation {
    pub stream_a: String,
    pub stream_b: String,
    pub coefficient: f64,
    /// Number of points the coefficient was computed over.
    pub points: usize,
}

#[derive(Clone, Debug)]
pub struct CorrelationEngine {
    window: usize,
}

impl Default for CorrelationEngine {
    fn default() -> Self {
        Self::new(DEFAULT_CORRELATION_POINTS)
    }
}

impl CorrelationEngine {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(MIN_CORRELATION_SAMPLES),
        }
    }

    /// Correlates the last `window` values of two buffers.
    ///
    /// # Returns
    /// `None` when either buffer holds fewer than ten samples or either window has no variance,
    /// otherwise the coefficient in `[-1, 1]`.
    pub fn correlate(&self, a: &RingBuffer, b: &RingBuffer) -> Option<f64> {
        self.correlate_with_points(a, b).map(|(r, _)| r)
    }

    fn correlate_with_points(&self, a: &RingBuffer, b: &RingBuffer) -> Option<(f64, usize)> {
        if a.len() < MIN_CORRELATION_SAMPLES || b.len() < MIN_CORRELATION_SAMPLES {
            return None;
        }
        let mut values_a = a.values(self.window);
        let mut values_b = b.values(self.window);
        let n = values_a.len().min(values_b.len());
        // keep the most recent n points of the longer window
        values_a.drain(..values_a.len() - n);
        values_b.drain(..values_b.len() - n);
        pearson(&values_a, &values_b).map(|r| (r, n))
    }

    /// Correlates every unordered pair of the given buffers.
    ///
    /// Pairs without a result are left out. Keys are ordered `(a, b)` with `a < b`.
    pub fn correlation_matrix<'a>(
        &self,
        buffers: impl IntoIterator<Item = (&'a str, &'a RingBuffer)>,
    ) -> BTreeMap<(String, String), StreamCorrelation> {
        let mut sorted: Vec<(&str, &RingBuffer)> = buffers.into_iter().collect();
        sorted.sort_by(|x, y| x.0.cmp(y.0));

        let mut matrix = BTreeMap::new();
        for (i, (id_a, buf_a)) in sorted.iter().enumerate() {
            for (id_b, buf_b) in &sorted[i + 1..] {
                if let Some((coefficient, points)) = self.correlate_with_points(buf_a, buf_b) {
                    matrix.insert(
                        (id_a.to_string(), id_b.to_string()),
                        StreamCorrelation {
                            stream_a: id_a.to_string(),
                            stream_b: id_b.to_string(),
                            coefficient,
                            points,
                        },
                    );
                }
            }
        }
        matrix
    }

    pub fn get_window(&self) -> usize {
        self.window
    }
}
