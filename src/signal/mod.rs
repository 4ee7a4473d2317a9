// src/signal/mod.rs
// Signal processing stages, from raw samples to a respiration estimate.
pub mod buffer;
pub mod error;
pub mod peaks;
pub mod pipeline;
pub mod quality;
pub mod rate;
pub mod smoothing;
pub mod source;
pub mod spectrum;
pub mod stats;
pub mod status;

pub use buffer::{SharedSignalBuffer, SignalBuffer, SignalWindow};
pub use error::{MonitorError, Rejection};
pub use peaks::{detect_peaks, PeakThresholds};
pub use pipeline::Analyzer;
pub use quality::{IntervalSet, QualityGate};
pub use rate::estimate_rate;
pub use smoothing::gaussian_smooth;
pub use source::{ManualSource, SampleSource, SyntheticBreathing, TraceFileSource};
pub use spectrum::{FrequencySpectrum, SpectrumBuilder};
pub use status::classify;
