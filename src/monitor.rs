// src/monitor.rs
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::config::{ConfigError, MonitorConfig};
use crate::signal::{Analyzer, MonitorError, SampleSource, SharedSignalBuffer, SignalWindow};
use crate::types::{MonitorReport, RespirationEstimate, Sample};

#[derive(Debug, Default)]
struct Session {
    first_timestamp: Option<f64>,
    newest_timestamp: Option<f64>,
    warmup_skipped: u64,
}

/// Owns the shared window and publishes the latest report.
///
/// `append` is called from the producer, `analyze` from the analysis
/// tick. Locks are always taken in the order `latest`, `session`, buffer.
pub struct Monitor {
    analyzer: Analyzer,
    buffer: SharedSignalBuffer,
    session: Mutex<Session>,
    latest: Mutex<MonitorReport>,
    generation: AtomicU64,
}

impl Monitor {
    pub fn new(config: MonitorConfig) -> Result<Self, MonitorError> {
        config.validate()?;
        let buffer = SharedSignalBuffer::with_capacity(config.buffer.capacity)?;
        Ok(Self {
            analyzer: Analyzer::new(config),
            buffer,
            session: Mutex::new(Session::default()),
            latest: Mutex::new(MonitorReport::default()),
            generation: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        self.analyzer.config()
    }

    /// Adds one sample. Samples inside the warm-up period are counted but
    /// not buffered.
    pub fn append(&self, sample: Sample) -> Result<(), MonitorError> {
        if !sample.is_finite() {
            return Err(MonitorError::NonFiniteSample);
        }
        let mut session = self.session.lock();
        if let Some(previous) = session.newest_timestamp {
            if sample.timestamp <= previous {
                return Err(MonitorError::NonMonotonicTimestamp {
                    previous,
                    got: sample.timestamp,
                });
            }
        }
        let first = *session.first_timestamp.get_or_insert(sample.timestamp);
        let warmup = self.config().buffer.warmup_seconds;
        if sample.timestamp - first < warmup {
            session.warmup_skipped += 1;
        } else {
            self.buffer.append(sample)?;
        }
        session.newest_timestamp = Some(sample.timestamp);
        Ok(())
    }

    /// Runs one cycle on a snapshot and publishes the result.
    ///
    /// Returns `None` when a stop or reset happened while the snapshot was
    /// being analysed; the stale result is dropped.
    pub fn analyze(&self) -> Option<MonitorReport> {
        let (generation, window) = self.snapshot();
        let estimate = self.analyzer.analyze(&window);
        self.publish(generation, estimate)
    }

    /// Window plus the session generation it was taken under.
    pub(crate) fn snapshot(&self) -> (u64, SignalWindow) {
        let generation = self.generation.load(Ordering::Acquire);
        (generation, self.buffer.snapshot())
    }

    pub(crate) fn publish(
        &self,
        generation: u64,
        estimate: RespirationEstimate,
    ) -> Option<MonitorReport> {
        let mut latest = self.latest.lock();
        if self.generation.load(Ordering::Acquire) != generation {
            log::debug!("discarding analysis from an earlier session");
            return None;
        }
        let report = MonitorReport {
            estimate,
            samples_collected: self.samples_collected(),
        };
        *latest = report.clone();
        Some(report)
    }

    /// Most recent published report, with a live sample count.
    pub fn latest(&self) -> MonitorReport {
        let mut report = self.latest.lock().clone();
        report.samples_collected = self.samples_collected();
        report
    }

    /// Analyses the current window one last time, then clears everything.
    pub fn stop(&self) -> MonitorReport {
        let mut latest = self.latest.lock();
        let window = self.buffer.snapshot();
        let report = MonitorReport {
            estimate: self.analyzer.analyze(&window),
            samples_collected: self.samples_collected(),
        };
        log::info!(
            "monitor stopped after {} samples: {}",
            report.samples_collected,
            report.estimate.status.as_str()
        );
        self.reset_locked(&mut latest);
        report
    }

    pub fn reset(&self) {
        let mut latest = self.latest.lock();
        self.reset_locked(&mut latest);
    }

    fn reset_locked(&self, latest: &mut MonitorReport) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        let mut session = self.session.lock();
        *session = Session::default();
        self.buffer.clear();
        drop(session);
        *latest = MonitorReport::default();
    }

    /// Samples accepted this session, warm-up included.
    pub fn samples_collected(&self) -> u64 {
        let skipped = self.session.lock().warmup_skipped;
        skipped + self.buffer.total_appended()
    }

    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_ready(&self) -> bool {
        self.buffered_len() >= self.config().buffer.min_samples
    }

    /// Feeds a whole source through the monitor, analysing every
    /// `every_seconds` of sample time. Rejected samples are skipped.
    pub fn replay<S: SampleSource>(
        &self,
        source: &mut S,
        every_seconds: f64,
    ) -> Result<Vec<MonitorReport>, MonitorError> {
        if !(every_seconds > 0.0) {
            return Err(ConfigError::Validation(format!(
                "analysis interval must be > 0 (got {every_seconds})"
            ))
            .into());
        }
        let mut reports = Vec::new();
        let mut next_due: Option<f64> = None;
        while let Some(sample) = source.next_sample()? {
            if let Err(err) = self.append(sample) {
                log::warn!("skipping sample at t={:.3}: {err}", sample.timestamp);
                continue;
            }
            let due = next_due.get_or_insert(sample.timestamp + every_seconds);
            if sample.timestamp >= *due {
                while *due <= sample.timestamp {
                    *due += every_seconds;
                }
                reports.extend(self.analyze());
            }
        }
        Ok(reports)
    }
}
