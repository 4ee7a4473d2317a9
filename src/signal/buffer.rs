use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

use crate::signal::MonitorError;
use crate::types::Sample;

/// Immutable copy of the buffered samples handed to one analysis cycle.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SignalWindow {
    samples: Vec<Sample>,
}

impl SignalWindow {
    pub fn new(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.value).collect()
    }

    pub fn timestamps(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.timestamp).collect()
    }

    /// Seconds between the first and last sample.
    pub fn span_seconds(&self) -> f64 {
        match (self.samples.first(), self.samples.last()) {
            (Some(first), Some(last)) => last.timestamp - first.timestamp,
            _ => 0.0,
        }
    }

    /// Average sample rate implied by the timestamps.
    pub fn sample_rate_hz(&self) -> Option<f64> {
        let span = self.span_seconds();
        if self.samples.len() < 2 || span <= 0.0 {
            return None;
        }
        Some((self.samples.len() - 1) as f64 / span)
    }
}

/// Rolling FIFO of the most recent samples.
pub struct SignalBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
    total_appended: u64,
}

impl SignalBuffer {
    pub fn with_capacity(capacity: usize) -> Result<Self, MonitorError> {
        if capacity == 0 {
            return Err(MonitorError::ZeroCapacity);
        }
        Ok(Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            total_appended: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples appended since the last clear, evicted ones included.
    pub fn total_appended(&self) -> u64 {
        self.total_appended
    }

    pub fn newest_timestamp(&self) -> Option<f64> {
        self.samples.back().map(|s| s.timestamp)
    }

    pub fn append(&mut self, sample: Sample) -> Result<(), MonitorError> {
        if !sample.is_finite() {
            return Err(MonitorError::NonFiniteSample);
        }
        if let Some(previous) = self.newest_timestamp() {
            if sample.timestamp <= previous {
                return Err(MonitorError::NonMonotonicTimestamp {
                    previous,
                    got: sample.timestamp,
                });
            }
        }
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
        self.total_appended += 1;
        Ok(())
    }

    pub fn snapshot(&self) -> SignalWindow {
        SignalWindow::new(self.samples.iter().copied().collect())
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.total_appended = 0;
    }
}

/// Handle shared between the producer and the analysis thread. Every
/// operation is one short critical section.
#[derive(Clone)]
pub struct SharedSignalBuffer {
    inner: Arc<Mutex<SignalBuffer>>,
}

impl SharedSignalBuffer {
    pub fn with_capacity(capacity: usize) -> Result<Self, MonitorError> {
        Ok(Self {
            inner: Arc::new(Mutex::new(SignalBuffer::with_capacity(capacity)?)),
        })
    }

    pub fn append(&self, sample: Sample) -> Result<(), MonitorError> {
        self.inner.lock().append(sample)
    }

    pub fn snapshot(&self) -> SignalWindow {
        self.inner.lock().snapshot()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn total_appended(&self) -> u64 {
        self.inner.lock().total_appended()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(buffer: &mut SignalBuffer, count: usize) {
        for i in 0..count {
            buffer
                .append(Sample::new(i as f64 * 0.2, i as f64))
                .unwrap();
        }
    }

    #[test]
    fn evicts_oldest_first() {
        let mut buffer = SignalBuffer::with_capacity(5).unwrap();
        fill(&mut buffer, 8);
        assert_eq!(buffer.len(), 5);
        assert_eq!(buffer.total_appended(), 8);
        let values = buffer.snapshot().values();
        assert_eq!(values, vec![3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn never_exceeds_capacity_and_stays_ordered() {
        let mut buffer = SignalBuffer::with_capacity(100).unwrap();
        fill(&mut buffer, 250);
        let window = buffer.snapshot();
        assert_eq!(window.len(), 100);
        let ts = window.timestamps();
        assert!(ts.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(window.samples()[0].value, 150.0);
    }

    #[test]
    fn rejects_non_monotonic_timestamp() {
        let mut buffer = SignalBuffer::with_capacity(4).unwrap();
        buffer.append(Sample::new(1.0, 5.0)).unwrap();
        let err = buffer.append(Sample::new(1.0, 5.1)).unwrap_err();
        assert!(matches!(err, MonitorError::NonMonotonicTimestamp { .. }));
        assert_eq!(buffer.len(), 1);
    }

    #[test]
    fn rejects_non_finite() {
        let mut buffer = SignalBuffer::with_capacity(4).unwrap();
        let err = buffer.append(Sample::new(0.0, f64::NAN)).unwrap_err();
        assert!(matches!(err, MonitorError::NonFiniteSample));
    }

    #[test]
    fn zero_capacity_is_an_error() {
        assert!(matches!(
            SignalBuffer::with_capacity(0),
            Err(MonitorError::ZeroCapacity)
        ));
    }

    #[test]
    fn snapshot_is_detached_from_buffer() {
        let mut buffer = SignalBuffer::with_capacity(10).unwrap();
        fill(&mut buffer, 3);
        let window = buffer.snapshot();
        buffer.append(Sample::new(10.0, 1.0)).unwrap();
        assert_eq!(window.len(), 3);
        assert_eq!(buffer.len(), 4);
    }

    #[test]
    fn window_span_and_rate() {
        let mut buffer = SignalBuffer::with_capacity(100).unwrap();
        fill(&mut buffer, 100);
        let window = buffer.snapshot();
        assert!((window.span_seconds() - 19.8).abs() < 1e-9);
        assert!((window.sample_rate_hz().unwrap() - 5.0).abs() < 1e-9);
        assert!(SignalWindow::default().sample_rate_hz().is_none());
    }

    #[test]
    fn clear_resets_counter() {
        let shared = SharedSignalBuffer::with_capacity(10).unwrap();
        shared.append(Sample::new(0.0, 1.0)).unwrap();
        shared.append(Sample::new(0.2, 1.0)).unwrap();
        assert_eq!(shared.total_appended(), 2);
        shared.clear();
        assert!(shared.is_empty());
        assert_eq!(shared.total_appended(), 0);
        // timestamps may restart after a clear
        shared.append(Sample::new(0.0, 1.0)).unwrap();
        assert_eq!(shared.len(), 1);
    }
}
