//! Adaptive local-maximum detection over one smoothed window.
//!
//! Thresholds are derived from the window itself on every call, so two
//! cycles over the same window always select the same peaks.

use crate::config::PeakConfig;
use crate::signal::stats::{mean_std, min_max};
use crate::types::Peak;

/// Per-window acceptance limits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PeakThresholds {
    pub height: f64,
    pub prominence: f64,
    pub min_distance: usize,
}

impl PeakThresholds {
    pub fn from_sequence(seq: &[f64], config: &PeakConfig) -> Option<Self> {
        let (mean, std) = mean_std(seq)?;
        let (lo, hi) = min_max(seq)?;
        Some(Self {
            height: mean + config.height_std_factor * std,
            prominence: config.prominence_range_factor * (hi - lo),
            min_distance: config.min_distance,
        })
    }
}

/// Height of `seq[peak]` above the higher of the two minima reached when
/// walking outward until a strictly taller sample (or the edge).
pub fn prominence(seq: &[f64], peak: usize) -> f64 {
    let height = seq[peak];
    let left_min = seq[..=peak]
        .iter()
        .rev()
        .take_while(|&&v| v <= height)
        .fold(height, |m, &v| m.min(v));
    let right_min = seq[peak..]
        .iter()
        .take_while(|&&v| v <= height)
        .fold(height, |m, &v| m.min(v));
    height - left_min.max(right_min)
}

/// Interior indices with `seq[i-1] < seq[i] >= seq[i+1]`.
fn local_maxima(seq: &[f64]) -> Vec<usize> {
    if seq.len() < 3 {
        return Vec::new();
    }
    (1..seq.len() - 1)
        .filter(|&i| seq[i - 1] < seq[i] && seq[i] >= seq[i + 1])
        .collect()
}

/// Keeps the tallest candidate of any group closer than `min_distance`.
/// Equal heights go to the earlier index.
fn enforce_spacing(seq: &[f64], candidates: &[usize], min_distance: usize) -> Vec<usize> {
    if min_distance <= 1 {
        return candidates.to_vec();
    }
    let mut priority: Vec<usize> = (0..candidates.len()).collect();
    priority.sort_by(|&a, &b| {
        seq[candidates[b]]
            .total_cmp(&seq[candidates[a]])
            .then(candidates[a].cmp(&candidates[b]))
    });
    let mut keep = vec![true; candidates.len()];
    for &slot in &priority {
        if !keep[slot] {
            continue;
        }
        let center = candidates[slot];
        for (other, &idx) in candidates.iter().enumerate() {
            if other != slot && keep[other] && idx.abs_diff(center) < min_distance {
                keep[other] = false;
            }
        }
    }
    candidates
        .iter()
        .zip(keep)
        .filter_map(|(&idx, kept)| kept.then_some(idx))
        .collect()
}

/// Finds breathing peaks in `seq`. `timestamps` must be parallel to `seq`.
/// An empty result is a normal outcome.
pub fn detect_peaks(seq: &[f64], timestamps: &[f64], config: &PeakConfig) -> Vec<Peak> {
    debug_assert_eq!(seq.len(), timestamps.len());
    let Some(thresholds) = PeakThresholds::from_sequence(seq, config) else {
        return Vec::new();
    };
    let candidates: Vec<usize> = local_maxima(seq)
        .into_iter()
        .filter(|&i| seq[i] >= thresholds.height)
        .filter(|&i| prominence(seq, i) >= thresholds.prominence)
        .collect();
    let kept = enforce_spacing(seq, &candidates, thresholds.min_distance);
    log::debug!(
        "peak thresholds height={:.3} prominence={:.3} candidates={} kept={}",
        thresholds.height,
        thresholds.prominence,
        candidates.len(),
        kept.len()
    );
    kept.into_iter()
        .map(|index| Peak {
            index,
            value: seq[index],
            timestamp: timestamps[index],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn timeline(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64 * 0.2).collect()
    }

    #[test]
    fn thresholds_follow_window_statistics() {
        let seq = [0.0, 2.0, 0.0, 2.0];
        let t = PeakThresholds::from_sequence(&seq, &PeakConfig::default()).unwrap();
        assert!((t.height - 1.1).abs() < 1e-12);
        assert!((t.prominence - 0.6).abs() < 1e-12);
        assert_eq!(t.min_distance, 2);
        assert!(PeakThresholds::from_sequence(&[], &PeakConfig::default()).is_none());
    }

    #[test]
    fn prominence_uses_higher_base() {
        let seq = [0.0, 5.0, 3.0, 4.0, 1.0];
        assert_eq!(prominence(&seq, 1), 4.0);
        // walking left from index 3 stops at the taller 5.0
        assert_eq!(prominence(&seq, 3), 1.0);
    }

    #[test]
    fn finds_sinusoid_crests() {
        let n = 100;
        let t = timeline(n);
        let seq: Vec<f64> = t.iter().map(|&t| (2.0 * PI * t / 4.0).sin()).collect();
        let peaks = detect_peaks(&seq, &t, &PeakConfig::default());
        let indices: Vec<usize> = peaks.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![5, 25, 45, 65, 85]);
        assert!((peaks[1].timestamp - 5.0).abs() < 1e-9);
    }

    #[test]
    fn shallow_bumps_are_rejected() {
        // two real crests with a tiny ripple on the way down
        let seq = [0.0, 4.0, 3.0, 3.2, 1.0, 0.0, 4.0, 0.0];
        let peaks = detect_peaks(&seq, &timeline(seq.len()), &PeakConfig::default());
        let indices: Vec<usize> = peaks.iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![1, 6]);
    }

    #[test]
    fn below_height_threshold_is_rejected() {
        let seq = [0.0, 10.0, 0.0, 1.0, 0.0, 10.0, 0.0];
        let peaks = detect_peaks(&seq, &timeline(seq.len()), &PeakConfig::default());
        assert!(peaks.iter().all(|p| p.value == 10.0));
    }

    #[test]
    fn spacing_keeps_taller_then_earlier() {
        let seq = [0.0, 5.0, 0.0, 6.0, 0.0, 6.0, 0.0, 0.0];
        let kept = enforce_spacing(&seq, &[1, 3, 5], 3);
        assert_eq!(kept, vec![3]);

        let tie = [0.0, 6.0, 0.0, 6.0, 0.0];
        assert_eq!(enforce_spacing(&tie, &[1, 3], 3), vec![1]);
        assert_eq!(enforce_spacing(&tie, &[1, 3], 2), vec![1, 3]);
    }

    #[test]
    fn plateau_reports_first_sample() {
        let seq = [0.0, 3.0, 3.0, 0.0];
        assert_eq!(local_maxima(&seq), vec![1]);
    }

    #[test]
    fn flat_and_short_inputs_have_no_peaks() {
        let cfg = PeakConfig::default();
        assert!(detect_peaks(&[2.0; 10], &timeline(10), &cfg).is_empty());
        assert!(detect_peaks(&[1.0, 2.0], &timeline(2), &cfg).is_empty());
        assert!(detect_peaks(&[], &[], &cfg).is_empty());
    }
}
