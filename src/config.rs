use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("TOML encode error: {0}")]
    TomlEncode(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Every tunable of the monitor. Missing TOML keys fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub buffer: BufferConfig,
    pub smoothing: SmoothingConfig,
    pub peaks: PeakConfig,
    pub quality: QualityConfig,
    pub rate: RateConfig,
    pub categories: CategoryBounds,
    pub schedule: ScheduleConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Window capacity in samples (100 = 20 s at 5 Hz).
    pub capacity: usize,
    /// Below this many buffered samples the cycle reports `Collecting`.
    pub min_samples: usize,
    /// Samples this close to the first sample of a session are ignored.
    pub warmup_seconds: f64,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            min_samples: 20,
            warmup_seconds: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    pub sigma: f64,
    /// Kernel radius in units of sigma.
    pub truncate: f64,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            sigma: 0.5,
            truncate: 4.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeakConfig {
    /// height threshold = mean + factor * std
    pub height_std_factor: f64,
    /// prominence threshold = factor * (max - min)
    pub prominence_range_factor: f64,
    /// Minimum index spacing between kept peaks.
    pub min_distance: usize,
}

impl Default for PeakConfig {
    fn default() -> Self {
        Self {
            height_std_factor: 0.1,
            prominence_range_factor: 0.3,
            min_distance: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    pub min_peaks: usize,
    /// Largest accepted coefficient of variation of the intervals.
    pub max_interval_cv: f64,
    /// Intervals further than this many std from the mean are dropped.
    pub outlier_std_factor: f64,
    pub min_intervals: usize,
    /// Raw windows with a smaller max-min range are rejected as flat.
    pub min_signal_range: f64,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            min_peaks: 5,
            max_interval_cv: 0.3,
            outlier_std_factor: 2.0,
            min_intervals: 4,
            min_signal_range: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateConfig {
    pub min_bpm: f64,
    pub max_bpm: f64,
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            min_bpm: 6.0,
            max_bpm: 40.0,
        }
    }
}

/// Cut points between Slow / Normal / Elevated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryBounds {
    pub slow_below: f64,
    pub elevated_above: f64,
}

impl Default for CategoryBounds {
    fn default() -> Self {
        // Adult resting norm.
        Self {
            slow_below: 12.0,
            elevated_above: 20.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    pub sample_rate_hz: f64,
    pub analysis_interval_ms: u64,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 5.0,
            analysis_interval_ms: 1000,
        }
    }
}

impl ScheduleConfig {
    pub fn sample_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.sample_rate_hz)
    }

    pub fn analysis_interval(&self) -> Duration {
        Duration::from_millis(self.analysis_interval_ms)
    }
}

impl MonitorConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: MonitorConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |msg: String| Err(ConfigError::Validation(msg));
        let floats = [
            ("buffer.warmup_seconds", self.buffer.warmup_seconds),
            ("smoothing.sigma", self.smoothing.sigma),
            ("smoothing.truncate", self.smoothing.truncate),
            ("peaks.height_std_factor", self.peaks.height_std_factor),
            ("peaks.prominence_range_factor", self.peaks.prominence_range_factor),
            ("quality.max_interval_cv", self.quality.max_interval_cv),
            ("quality.outlier_std_factor", self.quality.outlier_std_factor),
            ("quality.min_signal_range", self.quality.min_signal_range),
            ("rate.min_bpm", self.rate.min_bpm),
            ("rate.max_bpm", self.rate.max_bpm),
            ("categories.slow_below", self.categories.slow_below),
            ("categories.elevated_above", self.categories.elevated_above),
            ("schedule.sample_rate_hz", self.schedule.sample_rate_hz),
        ];
        if let Some((name, value)) = floats.iter().find(|(_, v)| !v.is_finite()) {
            return fail(format!("{name} must be finite (got {value})"));
        }
        if self.buffer.capacity == 0 {
            return fail("buffer.capacity must be > 0".into());
        }
        if self.buffer.min_samples < 3 || self.buffer.min_samples > self.buffer.capacity {
            return fail(format!(
                "buffer.min_samples must be in 3..={}",
                self.buffer.capacity
            ));
        }
        if !(self.buffer.warmup_seconds >= 0.0) {
            return fail("buffer.warmup_seconds must be >= 0".into());
        }
        if !(self.smoothing.sigma > 0.0) || !(self.smoothing.truncate > 0.0) {
            return fail("smoothing.sigma and smoothing.truncate must be > 0".into());
        }
        let radius = self.smoothing.truncate * self.smoothing.sigma + 0.5;
        if radius > self.buffer.capacity as f64 {
            return fail(format!(
                "smoothing kernel radius {radius:.0} exceeds buffer.capacity {}",
                self.buffer.capacity
            ));
        }
        if self.peaks.min_distance == 0 {
            return fail("peaks.min_distance must be >= 1".into());
        }
        if self.quality.min_peaks < 2 || self.quality.min_intervals == 0 {
            return fail("quality.min_peaks must be >= 2 and quality.min_intervals >= 1".into());
        }
        if !(self.quality.max_interval_cv > 0.0) || !(self.quality.outlier_std_factor > 0.0) {
            return fail("quality.max_interval_cv and quality.outlier_std_factor must be > 0".into());
        }
        let rate = &self.rate;
        if !(rate.min_bpm > 0.0 && rate.min_bpm < rate.max_bpm) {
            return fail(format!(
                "rate range {}-{} is not a valid interval",
                rate.min_bpm, rate.max_bpm
            ));
        }
        let bounds = &self.categories;
        if !(rate.min_bpm <= bounds.slow_below
            && bounds.slow_below <= bounds.elevated_above
            && bounds.elevated_above <= rate.max_bpm)
        {
            return fail(format!(
                "category bounds {}/{} must lie inside {}-{} in ascending order",
                bounds.slow_below, bounds.elevated_above, rate.min_bpm, rate.max_bpm
            ));
        }
        if !(self.schedule.sample_rate_hz > 0.0)
            || Duration::try_from_secs_f64(1.0 / self.schedule.sample_rate_hz).is_err()
        {
            return fail(format!(
                "schedule.sample_rate_hz {} does not give a usable sample period",
                self.schedule.sample_rate_hz
            ));
        }
        if self.schedule.analysis_interval_ms == 0 {
            return fail("schedule.analysis_interval_ms must be > 0".into());
        }
        Ok(())
    }
}
