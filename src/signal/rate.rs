use crate::config::RateConfig;
use crate::signal::quality::IntervalSet;
use crate::signal::Rejection;

/// Breaths per minute from the mean of the filtered intervals, checked
/// against the physiological range.
pub fn estimate_rate(intervals: &IntervalSet, config: &RateConfig) -> Result<f64, Rejection> {
    let mean = intervals
        .mean()
        .filter(|m| *m > 0.0)
        .ok_or(Rejection::TooFewIntervals {
            remaining: intervals.intervals.len(),
            need: 1,
        })?;
    let rate_bpm = 60.0 / mean;
    if rate_bpm < config.min_bpm || rate_bpm > config.max_bpm {
        return Err(Rejection::RateOutOfRange {
            rate_bpm,
            min_bpm: config.min_bpm,
            max_bpm: config.max_bpm,
        });
    }
    Ok(rate_bpm)
}
