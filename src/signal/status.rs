use crate::config::CategoryBounds;
use crate::types::RateCategory;

/// Buckets a validated rate using the configured cut points.
pub fn classify(rate_bpm: f64, bounds: &CategoryBounds) -> RateCategory {
    if rate_bpm < bounds.slow_below {
        RateCategory::Slow
    } else if rate_bpm > bounds.elevated_above {
        RateCategory::Elevated
    } else {
        RateCategory::Normal
    }
}
