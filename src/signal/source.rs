use chrono::NaiveDateTime;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::collections::VecDeque;
use std::f64::consts::PI;
use std::fs;
use std::path::Path;

use crate::signal::MonitorError;
use crate::types::Sample;

/// Anything that can yield brightness samples on demand, such as the frame
/// grabber, a recorded trace, or a generator.
pub trait SampleSource {
    /// `Ok(None)` means the source is exhausted.
    fn next_sample(&mut self) -> Result<Option<Sample>, MonitorError>;
}

/// In-memory source useful for tests and deterministic playback.
pub struct ManualSource {
    queue: VecDeque<Sample>,
}

impl ManualSource {
    pub fn new(samples: impl IntoIterator<Item = Sample>) -> Self {
        Self {
            queue: samples.into_iter().collect(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.queue.len()
    }
}

impl SampleSource for ManualSource {
    fn next_sample(&mut self) -> Result<Option<Sample>, MonitorError> {
        Ok(self.queue.pop_front())
    }
}

/// Sinusoidal chest-brightness model with uniform noise.
pub struct SyntheticBreathing {
    rate_bpm: f64,
    sample_rate_hz: f64,
    baseline: f64,
    amplitude: f64,
    noise: f64,
    rng: StdRng,
    index: u64,
    limit: Option<u64>,
}

impl SyntheticBreathing {
    pub fn new(rate_bpm: f64, sample_rate_hz: f64) -> Self {
        Self {
            rate_bpm,
            sample_rate_hz,
            baseline: 5.0,
            amplitude: 1.0,
            noise: 0.0,
            rng: StdRng::seed_from_u64(0),
            index: 0,
            limit: None,
        }
    }

    pub fn with_noise(mut self, noise: f64, seed: u64) -> Self {
        self.noise = noise.abs();
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn with_amplitude(mut self, amplitude: f64) -> Self {
        self.amplitude = amplitude;
        self
    }

    /// Stop after `seconds` of signal.
    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.limit = Some((seconds * self.sample_rate_hz).round() as u64);
        self
    }
}

impl SampleSource for SyntheticBreathing {
    fn next_sample(&mut self) -> Result<Option<Sample>, MonitorError> {
        if self.limit.is_some_and(|limit| self.index >= limit) {
            return Ok(None);
        }
        let t = self.index as f64 / self.sample_rate_hz;
        self.index += 1;
        let phase = 2.0 * PI * self.rate_bpm / 60.0 * t;
        let jitter = if self.noise > 0.0 {
            self.rng.gen_range(-self.noise..=self.noise)
        } else {
            0.0
        };
        Ok(Some(Sample::new(
            t,
            self.baseline + self.amplitude * phase.sin() + jitter,
        )))
    }
}

const TRACE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"];

/// Replays a recorded `timestamp,brightness` trace.
///
/// The timestamp column is either seconds or a wall-clock
/// `YYYY-mm-dd HH:MM:SS.fff` stamp. Both are rebased so the first line is 0.
pub struct TraceFileSource {
    inner: ManualSource,
}

impl TraceFileSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, MonitorError> {
        let text = fs::read_to_string(path)?;
        Self::from_text(&text)
    }

    pub fn from_text(text: &str) -> Result<Self, MonitorError> {
        Ok(Self {
            inner: ManualSource::new(parse_trace(text)?),
        })
    }

    pub fn remaining(&self) -> usize {
        self.inner.remaining()
    }
}

impl SampleSource for TraceFileSource {
    fn next_sample(&mut self) -> Result<Option<Sample>, MonitorError> {
        self.inner.next_sample()
    }
}

#[derive(Clone, Copy)]
enum Stamp {
    Seconds(f64),
    Wall(NaiveDateTime),
}

impl Stamp {
    fn parse(field: &str) -> Option<Self> {
        if let Ok(seconds) = field.parse::<f64>() {
            return Some(Stamp::Seconds(seconds));
        }
        TRACE_DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(field, fmt).ok())
            .map(Stamp::Wall)
    }

    /// Seconds since `origin`. Wall-clock stamps are subtracted exactly
    /// before converting to float.
    fn seconds_since(self, origin: Stamp) -> Option<f64> {
        match (origin, self) {
            (Stamp::Seconds(a), Stamp::Seconds(b)) => Some(b - a),
            (Stamp::Wall(a), Stamp::Wall(b)) => {
                (b - a).num_microseconds().map(|us| us as f64 / 1e6)
            }
            _ => None,
        }
    }
}

pub fn parse_trace(text: &str) -> Result<Vec<Sample>, MonitorError> {
    let mut samples = Vec::new();
    let mut origin: Option<Stamp> = None;
    for (idx, raw) in text.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let err = |reason: &str| MonitorError::Trace {
            line: idx + 1,
            reason: reason.to_owned(),
        };
        let (stamp, value) = line
            .split_once(',')
            .ok_or_else(|| err("expected `timestamp,brightness`"))?;
        let stamp = Stamp::parse(stamp.trim()).ok_or_else(|| err("bad timestamp"))?;
        let value: f64 = value
            .trim()
            .parse()
            .map_err(|_| err("bad brightness value"))?;
        let start = *origin.get_or_insert(stamp);
        let timestamp = stamp
            .seconds_since(start)
            .ok_or_else(|| err("timestamp format differs from the first line"))?;
        samples.push(Sample::new(timestamp, value));
    }
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_source_drains_in_order() {
        let mut source = ManualSource::new(vec![Sample::new(0.0, 1.0), Sample::new(0.2, 2.0)]);
        assert_eq!(source.next_sample().unwrap().unwrap().value, 1.0);
        assert_eq!(source.next_sample().unwrap().unwrap().value, 2.0);
        assert!(source.next_sample().unwrap().is_none());
    }

    #[test]
    fn synthetic_source_is_periodic_and_bounded() {
        let mut source = SyntheticBreathing::new(15.0, 5.0).with_duration(2.0);
        let samples: Vec<Sample> = std::iter::from_fn(|| source.next_sample().unwrap()).collect();
        assert_eq!(samples.len(), 10);
        assert!((samples[5].timestamp - 1.0).abs() < 1e-12);
        // crest of a 4 s period at t = 1 s
        assert!((samples[5].value - 6.0).abs() < 1e-9);
    }

    #[test]
    fn synthetic_noise_is_seeded() {
        let take = |seed| {
            let mut s = SyntheticBreathing::new(15.0, 5.0).with_noise(0.2, seed);
            (0..20)
                .map(|_| s.next_sample().unwrap().unwrap().value)
                .collect::<Vec<_>>()
        };
        assert_eq!(take(7), take(7));
        assert_ne!(take(7), take(8));
    }

    #[test]
    fn parses_seconds_trace() {
        let samples = parse_trace("# t,v\n10.0, 5.0\n10.2,5.5\n\n10.4,5.1\n").unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].timestamp, 0.0);
        assert!((samples[2].timestamp - 0.4).abs() < 1e-9);
        assert_eq!(samples[1].value, 5.5);
    }

    #[test]
    fn parses_wall_clock_trace() {
        let text = "2025-03-01 10:00:00.000,24.1\n2025-03-01 10:00:00.200,24.3\n2025-03-01 10:00:01,24.0\n";
        let samples = parse_trace(text).unwrap();
        assert_eq!(samples.len(), 3);
        assert!((samples[1].timestamp - 0.2).abs() < 1e-9);
        assert!((samples[2].timestamp - 1.0).abs() < 1e-9);
    }

    #[test]
    fn malformed_line_reports_position() {
        let err = parse_trace("0.0,1.0\nnot a line\n").unwrap_err();
        match err {
            MonitorError::Trace { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error {other:?}"),
        }
        assert!(matches!(
            parse_trace("0.0,abc").unwrap_err(),
            MonitorError::Trace { line: 1, .. }
        ));
        assert!(matches!(
            parse_trace("0.0,1.0\n2025-03-01 10:00:00,1.0").unwrap_err(),
            MonitorError::Trace { line: 2, .. }
        ));
    }
}
