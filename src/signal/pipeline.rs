use crate::config::MonitorConfig;
use crate::signal::peaks::detect_peaks;
use crate::signal::quality::QualityGate;
use crate::signal::rate::estimate_rate;
use crate::signal::smoothing::gaussian_smooth;
use crate::signal::spectrum::dominant_rate_bpm;
use crate::signal::stats::min_max;
use crate::signal::status::classify;
use crate::signal::{Rejection, SignalWindow};
use crate::types::RespirationEstimate;

/// Runs one analysis cycle:
/// smoothing -> peak detection -> quality gate -> rate -> category.
///
/// Holds no state between cycles; the same window always gives the same
/// estimate.
#[derive(Clone, Debug)]
pub struct Analyzer {
    config: MonitorConfig,
}

impl Analyzer {
    pub fn new(config: MonitorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn analyze(&self, window: &SignalWindow) -> RespirationEstimate {
        let span = window.span_seconds();
        if window.len() < self.config.buffer.min_samples {
            let rejection = Rejection::TooFewSamples {
                have: window.len(),
                need: self.config.buffer.min_samples,
            };
            return RespirationEstimate::rejected(&rejection, 0, span);
        }

        let raw = window.values();
        let range = min_max(&raw).map(|(lo, hi)| hi - lo).unwrap_or(0.0);
        if range < self.config.quality.min_signal_range {
            return RespirationEstimate::rejected(&Rejection::FlatSignal { range }, 0, span);
        }

        let smoothed = gaussian_smooth(
            &raw,
            self.config.smoothing.sigma,
            self.config.smoothing.truncate,
        );
        let spectral = window.sample_rate_hz().and_then(|fs| {
            dominant_rate_bpm(&smoothed, fs, self.config.rate.min_bpm, self.config.rate.max_bpm)
        });
        let peaks = detect_peaks(&smoothed, &window.timestamps(), &self.config.peaks);
        let peak_count = peaks.len();

        let result = QualityGate::new(&self.config.quality)
            .evaluate(&peaks)
            .and_then(|intervals| {
                if intervals.dropped_outliers > 0 {
                    log::debug!("dropped {} outlier interval(s)", intervals.dropped_outliers);
                }
                estimate_rate(&intervals, &self.config.rate)
            });

        let estimate = match result {
            Ok(rate_bpm) => {
                let category = classify(rate_bpm, &self.config.categories);
                log::debug!(
                    "rate {:.1} bpm ({:?}) from {} peaks, spectral {:?}",
                    rate_bpm,
                    category,
                    peak_count,
                    spectral
                );
                RespirationEstimate::valid(rate_bpm, category, peak_count, span)
            }
            Err(rejection) => {
                log::debug!("cycle rejected: {rejection}");
                RespirationEstimate::rejected(&rejection, peak_count, span)
            }
        };
        estimate.with_spectral_rate(spectral)
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}
