//! Camera-free respiration rate estimation from a chest-brightness series.
//!
//! Samples flow through a bounded [`SignalBuffer`], are smoothed, reduced to
//! breath peaks, checked for rhythm regularity and turned into a rate with a
//! clinical category. [`Monitor`] wraps the pipeline with session state and
//! [`spawn_engine`] drives it from a sample source on background threads.

pub mod config;
pub mod engine;
pub mod monitor;
pub mod signal;
pub mod types;

pub use config::{ConfigError, MonitorConfig};
pub use engine::{spawn_engine, EngineHandle};
pub use monitor::Monitor;
pub use signal::{Analyzer, MonitorError, Rejection, SampleSource, SignalBuffer};
pub use types::{
    EstimateStatus, MonitorCommand, MonitorEvent, MonitorReport, RateCategory,
    RespirationEstimate, Sample,
};
