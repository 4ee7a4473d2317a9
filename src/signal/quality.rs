use crate::config::QualityConfig;
use crate::signal::stats::{diffs, mean_std};
use crate::signal::Rejection;
use crate::types::Peak;

/// Inter-peak intervals (seconds) that survived the gate.
#[derive(Clone, Debug, PartialEq)]
pub struct IntervalSet {
    pub intervals: Vec<f64>,
    /// Coefficient of variation before outlier removal.
    pub cv: f64,
    pub dropped_outliers: usize,
}

impl IntervalSet {
    pub fn mean(&self) -> Option<f64> {
        mean_std(&self.intervals).map(|(mean, _)| mean)
    }
}

/// Decides whether a peak sequence is regular enough to yield a rate.
pub struct QualityGate<'a> {
    config: &'a QualityConfig,
}

impl<'a> QualityGate<'a> {
    pub fn new(config: &'a QualityConfig) -> Self {
        Self { config }
    }

    pub fn evaluate(&self, peaks: &[Peak]) -> Result<IntervalSet, Rejection> {
        if peaks.len() < self.config.min_peaks {
            return Err(Rejection::TooFewPeaks {
                found: peaks.len(),
                need: self.config.min_peaks,
            });
        }
        let times: Vec<f64> = peaks.iter().map(|p| p.timestamp).collect();
        let intervals = diffs(&times);
        let Some((mean, std)) = mean_std(&intervals) else {
            return Err(Rejection::TooFewIntervals {
                remaining: 0,
                need: self.config.min_intervals,
            });
        };
        let cv = if mean > 0.0 { std / mean } else { 0.0 };
        log::debug!(
            "intervals {:?} mean={:.3}s std={:.3}s cv={:.3}",
            intervals,
            mean,
            std,
            cv
        );
        if cv > self.config.max_interval_cv {
            return Err(Rejection::IrregularIntervals {
                cv,
                limit: self.config.max_interval_cv,
            });
        }

        let before = intervals.len();
        let kept: Vec<f64> = if std <= f64::EPSILON * mean.abs() {
            intervals
        } else {
            let limit = self.config.outlier_std_factor * std;
            intervals
                .into_iter()
                .filter(|i| (i - mean).abs() <= limit)
                .collect()
        };
        if kept.len() < self.config.min_intervals {
            return Err(Rejection::TooFewIntervals {
                remaining: kept.len(),
                need: self.config.min_intervals,
            });
        }
        Ok(IntervalSet {
            dropped_outliers: before - kept.len(),
            intervals: kept,
            cv,
        })
    }
}
