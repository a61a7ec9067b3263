//! Ring Buffer
//!
//! Fixed-capacity, append-only history of samples for one stream. Once the capacity is reached
//! every append evicts the oldest entry.

use std::collections::{vec_deque, VecDeque};

use super::sample::Sample;

/// Bounded FIFO sequence of samples.
#[derive(Clone, Debug)]
pub struct RingBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl RingBuffer {
    /// Creates an empty buffer. A capacity of zero is bumped to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            // large capacities are the norm, let the deque grow on demand
            samples: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Appends a sample, returning the evicted oldest sample if the buffer was full.
    pub fn append(&mut self, sample: Sample) -> Option<Sample> {
        self.samples.push_back(sample);
        if self.samples.len() > self.capacity {
            self.samples.pop_front()
        } else {
            None
        }
    }

    /// Returns the last `n` samples in insertion order, fewer if the buffer holds less.
    pub fn recent(&self, n: usize) -> vec_deque::Iter<'_, Sample> {
        let start = self.samples.len().saturating_sub(n);
        self.samples.range(start..)
    }

    /// Values of the last `n` samples in insertion order.
    pub fn values(&self, n: usize) -> Vec<f64> {
        self.recent(n).map(Sample::get_value).collect()
    }

    /// Returns the full ordered sequence.
    pub fn all(&self) -> vec_deque::Iter<'_, Sample> {
        self.samples.iter()
    }

    pub fn latest(&self) -> Option<&Sample> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::sample::SignalType;
    use time::OffsetDateTime;

    fn sample(value: f64) -> Sample {
        Sample::new("s1", SignalType::HeartRate, value, OffsetDateTime::now_utc())
    }

    #[test]
    fn test_append_below_capacity() {
        let mut buffer = RingBuffer::new(5);
        for i in 0..5 {
            assert!(buffer.append(sample(i as f64)).is_none());
        }
        assert_eq!(buffer.len(), 5);
    }

    #[test]
    fn test_buffer_bound_keeps_most_recent() {
        let mut buffer = RingBuffer::new(4);
        let mut evicted = Vec::new();
        for i in 0..10 {
            if let Some(old) = buffer.append(sample(i as f64)) {
                evicted.push(old.get_value());
            }
            assert!(buffer.len() <= buffer.capacity());
        }
        assert_eq!(buffer.values(usize::MAX), vec![6.0, 7.0, 8.0, 9.0]);
        assert_eq!(evicted, vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
    }

    #[test]
    fn test_recent_returns_fewer_when_short() {
        let mut buffer = RingBuffer::new(100);
        buffer.append(sample(1.0));
        buffer.append(sample(2.0));
        assert_eq!(buffer.recent(10).count(), 2);
        assert_eq!(buffer.values(1), vec![2.0]);
        assert_eq!(buffer.latest().map(Sample::get_value), Some(2.0));
    }

    #[test]
    fn test_zero_capacity_is_bumped() {
        let mut buffer = RingBuffer::new(0);
        buffer.append(sample(1.0));
        let evicted = buffer.append(sample(2.0));
        assert_eq!(evicted.map(|s| s.get_value()), Some(1.0));
        assert_eq!(buffer.len(), 1);
    }
}
