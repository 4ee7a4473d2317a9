// src/types.rs
use serde::{Deserialize, Serialize};

use crate::signal::Rejection;

/// One brightness reading from the tracked chest region.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Monotonic seconds.
    pub timestamp: f64,
    /// Normalized brightness, nominally 0-10.
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: f64, value: f64) -> Self {
        Self { timestamp, value }
    }

    pub fn is_finite(&self) -> bool {
        self.timestamp.is_finite() && self.value.is_finite()
    }
}

/// A local maximum of the smoothed window, read as one breath.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Peak {
    pub index: usize,
    pub value: f64,
    pub timestamp: f64,
}

// Outcome of one analysis cycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EstimateStatus {
    Collecting,
    Insufficient,
    Irregular,
    OutOfRange,
    Valid,
}

impl EstimateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EstimateStatus::Collecting => "collecting",
            EstimateStatus::Insufficient => "insufficient",
            EstimateStatus::Irregular => "irregular",
            EstimateStatus::OutOfRange => "out_of_range",
            EstimateStatus::Valid => "valid",
        }
    }
}

// Coarse display bucket for a valid rate
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateCategory {
    Slow,
    Normal,
    Elevated,
}

/// Result of one analysis cycle. Rebuilt from scratch every cycle.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RespirationEstimate {
    pub rate_bpm: Option<f64>,
    pub status: EstimateStatus,
    pub category: Option<RateCategory>,
    pub peak_count: usize,
    pub window_span_seconds: f64,
    /// Human-readable reason when no rate is available.
    pub reason: Option<String>,
    /// FFT dominant frequency in breaths/min. Diagnostic only.
    pub spectral_rate_bpm: Option<f64>,
}

impl RespirationEstimate {
    pub fn valid(
        rate_bpm: f64,
        category: RateCategory,
        peak_count: usize,
        window_span_seconds: f64,
    ) -> Self {
        Self {
            rate_bpm: Some(rate_bpm),
            status: EstimateStatus::Valid,
            category: Some(category),
            peak_count,
            window_span_seconds,
            reason: None,
            spectral_rate_bpm: None,
        }
    }

    pub fn rejected(rejection: &Rejection, peak_count: usize, window_span_seconds: f64) -> Self {
        Self {
            rate_bpm: None,
            status: rejection.status(),
            category: None,
            peak_count,
            window_span_seconds,
            reason: Some(rejection.to_string()),
            spectral_rate_bpm: None,
        }
    }

    pub fn with_spectral_rate(mut self, spectral_rate_bpm: Option<f64>) -> Self {
        self.spectral_rate_bpm = spectral_rate_bpm;
        self
    }

    pub fn is_valid(&self) -> bool {
        self.status == EstimateStatus::Valid
    }
}

impl Default for RespirationEstimate {
    fn default() -> Self {
        Self {
            rate_bpm: None,
            status: EstimateStatus::Collecting,
            category: None,
            peak_count: 0,
            window_span_seconds: 0.0,
            reason: Some("no rate available yet".to_owned()),
            spectral_rate_bpm: None,
        }
    }
}

/// Shape polled by the display layer once per second.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MonitorReport {
    #[serde(flatten)]
    pub estimate: RespirationEstimate,
    pub samples_collected: u64,
}

// Commands sent to the engine threads
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MonitorCommand {
    Start,
    Stop,
    Shutdown,
}

// Messages the engine sends back
#[derive(Clone, Debug)]
pub enum MonitorEvent {
    Started,
    Report(MonitorReport),
    /// Summary computed on the last snapshot before the buffer was cleared.
    Stopped(MonitorReport),
    SourceExhausted,
}
