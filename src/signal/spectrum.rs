use rustfft::{num_complex::Complex64, FftPlanner};

/// Magnitude spectrum of one window.
#[derive(Clone, Debug)]
pub struct FrequencySpectrum {
    pub sample_rate_hz: f64,
    pub frequencies_hz: Vec<f64>,
    pub magnitudes: Vec<f64>,
}

impl FrequencySpectrum {
    /// Strongest non-empty bin inside `[low_hz, high_hz]`, skipping DC.
    pub fn dominant_frequency(&self, low_hz: f64, high_hz: f64) -> Option<f64> {
        self.frequencies_hz
            .iter()
            .zip(&self.magnitudes)
            .skip(1)
            .filter(|(f, m)| **f >= low_hz && **f <= high_hz && **m > 1e-12)
            .fold(None, |best: Option<(f64, f64)>, (&f, &m)| match best {
                Some((_, best_m)) if best_m >= m => best,
                _ => Some((f, m)),
            })
            .map(|(f, _)| f)
    }
}

/// Computes zero-padded FFTs of a mean-removed sequence.
pub struct SpectrumBuilder {
    fft_size: usize,
}

impl SpectrumBuilder {
    pub fn with_size(fft_size: usize) -> Self {
        Self {
            fft_size: fft_size.max(2),
        }
    }

    /// Next power of two at least four times `len`, for finer bins on
    /// short windows.
    pub fn for_len(len: usize) -> Self {
        Self::with_size((len * 4).next_power_of_two())
    }

    pub fn compute(&self, values: &[f64], sample_rate_hz: f64) -> FrequencySpectrum {
        let mut planner = FftPlanner::<f64>::new();
        let fft = planner.plan_fft_forward(self.fft_size);
        let mean = if values.is_empty() {
            0.0
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        };
        let mut buffer: Vec<Complex64> = values
            .iter()
            .take(self.fft_size)
            .map(|v| Complex64::new(v - mean, 0.0))
            .collect();
        buffer.resize(self.fft_size, Complex64::new(0.0, 0.0));
        fft.process(&mut buffer);
        let half = self.fft_size / 2;
        let frequencies_hz = (0..half)
            .map(|k| k as f64 * sample_rate_hz / self.fft_size as f64)
            .collect();
        let magnitudes = buffer
            .iter()
            .take(half)
            .map(|c| c.norm() / self.fft_size as f64)
            .collect();
        FrequencySpectrum {
            sample_rate_hz,
            frequencies_hz,
            magnitudes,
        }
    }
}

/// Dominant breathing rate (breaths/min) within `[min_bpm, max_bpm]`.
pub fn dominant_rate_bpm(
    values: &[f64],
    sample_rate_hz: f64,
    min_bpm: f64,
    max_bpm: f64,
) -> Option<f64> {
    if values.len() < 4 || !(sample_rate_hz > 0.0) {
        return None;
    }
    SpectrumBuilder::for_len(values.len())
        .compute(values, sample_rate_hz)
        .dominant_frequency(min_bpm / 60.0, max_bpm / 60.0)
        .map(|hz| hz * 60.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn spectrum_has_half_size_bins() {
        let spectrum = SpectrumBuilder::with_size(64).compute(&[0.0; 32], 5.0);
        assert_eq!(spectrum.frequencies_hz.len(), 32);
        assert_eq!(spectrum.magnitudes.len(), 32);
        assert!((spectrum.frequencies_hz[1] - 5.0 / 64.0).abs() < 1e-12);
    }

    #[test]
    fn finds_breathing_tone() {
        let values: Vec<f64> = (0..150)
            .map(|i| 5.0 + (2.0 * PI * 0.25 * i as f64 / 5.0).sin())
            .collect();
        let bpm = dominant_rate_bpm(&values, 5.0, 6.0, 40.0).unwrap();
        // 1024-point FFT at 5 Hz gives ~0.3 bpm bins
        assert!((bpm - 15.0).abs() < 0.6, "got {bpm}");
    }

    #[test]
    fn flat_or_short_input_has_no_rate() {
        assert!(dominant_rate_bpm(&[1.0, 2.0], 5.0, 6.0, 40.0).is_none());
        assert!(dominant_rate_bpm(&[1.0; 50], 0.0, 6.0, 40.0).is_none());
        assert!(dominant_rate_bpm(&[1.0; 50], 5.0, 6.0, 40.0).is_none());
    }
}
