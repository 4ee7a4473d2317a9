use thiserror::Error;

use crate::types::EstimateStatus;

/// Failures at the input boundary of the monitor. The analysis pipeline
/// itself never returns these; it reports a [`Rejection`] instead.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("buffer capacity must be greater than zero")]
    ZeroCapacity,
    #[error("sample timestamp {got} is not after the newest buffered timestamp {previous}")]
    NonMonotonicTimestamp { previous: f64, got: f64 },
    #[error("sample contains a non-finite timestamp or value")]
    NonFiniteSample,
    #[error("trace line {line}: {reason}")]
    Trace { line: usize, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}

/// Why an analysis cycle produced no rate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Rejection {
    #[error("collecting samples ({have} of {need} needed)")]
    TooFewSamples { have: usize, need: usize },
    #[error("signal variation too small for peak detection (range {range:.3})")]
    FlatSignal { range: f64 },
    #[error("insufficient peaks for a reliable rate ({found} found, need {need})")]
    TooFewPeaks { found: usize, need: usize },
    #[error("too few consistent intervals after outlier removal ({remaining} left, need {need})")]
    TooFewIntervals { remaining: usize, need: usize },
    #[error("irregular breathing pattern (interval CV {cv:.3} above {limit:.2})")]
    IrregularIntervals { cv: f64, limit: f64 },
    #[error("rate {rate_bpm:.1} breaths/min outside plausible range {min_bpm}-{max_bpm}")]
    RateOutOfRange {
        rate_bpm: f64,
        min_bpm: f64,
        max_bpm: f64,
    },
}

impl Rejection {
    pub fn status(&self) -> EstimateStatus {
        match self {
            Rejection::TooFewSamples { .. } => EstimateStatus::Collecting,
            Rejection::FlatSignal { .. }
            | Rejection::TooFewPeaks { .. }
            | Rejection::TooFewIntervals { .. } => EstimateStatus::Insufficient,
            Rejection::IrregularIntervals { .. } => EstimateStatus::Irregular,
            Rejection::RateOutOfRange { .. } => EstimateStatus::OutOfRange,
        }
    }
}
