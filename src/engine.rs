// src/engine.rs
use crate::config::MonitorConfig;
use crate::monitor::Monitor;
use crate::signal::{MonitorError, SampleSource};
use crate::types::*;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

const SLEEP_SLICE: Duration = Duration::from_millis(10);

/// Handle to the producer and analysis threads.
pub struct EngineHandle {
    commands: Sender<MonitorCommand>,
    events: Receiver<MonitorEvent>,
    monitor: Arc<Monitor>,
    workers: Vec<JoinHandle<()>>,
}

impl EngineHandle {
    pub fn start(&self) {
        self.commands.send(MonitorCommand::Start).ok();
    }

    pub fn stop(&self) {
        self.commands.send(MonitorCommand::Stop).ok();
    }

    pub fn shutdown(&self) {
        self.commands.send(MonitorCommand::Shutdown).ok();
    }

    pub fn events(&self) -> &Receiver<MonitorEvent> {
        &self.events
    }

    pub fn latest(&self) -> MonitorReport {
        self.monitor.latest()
    }

    pub fn monitor(&self) -> &Monitor {
        &self.monitor
    }

    /// Sends `Shutdown` and waits for both threads.
    pub fn join(mut self) {
        self.shutdown();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                log::error!("engine thread panicked");
            }
        }
    }
}

pub fn spawn_engine<S>(config: MonitorConfig, source: S) -> Result<EngineHandle, MonitorError>
where
    S: SampleSource + Send + 'static,
{
    let monitor = Arc::new(Monitor::new(config)?);
    let sample_period = monitor.config().schedule.sample_period();
    let analysis_interval = monitor.config().schedule.analysis_interval();
    let running = Arc::new(AtomicBool::new(false));
    let shutdown = Arc::new(AtomicBool::new(false));
    // serialises Report sends against the Stop transition
    let gate = Arc::new(Mutex::new(()));
    let (tx_cmd, rx_cmd) = mpsc::channel();
    let (tx, rx) = mpsc::channel();

    let producer = {
        let monitor = Arc::clone(&monitor);
        let running = Arc::clone(&running);
        let shutdown = Arc::clone(&shutdown);
        let gate = Arc::clone(&gate);
        let tx = tx.clone();
        thread::Builder::new()
            .name("breath-producer".into())
            .spawn(move || {
                let flags = Flags {
                    running: &running,
                    shutdown: &shutdown,
                    gate: &gate,
                };
                run_producer(source, &monitor, &rx_cmd, &tx, flags, sample_period)
            })?
    };

    let analyzer = {
        let monitor = Arc::clone(&monitor);
        let running = Arc::clone(&running);
        let shutdown = Arc::clone(&shutdown);
        thread::Builder::new()
            .name("breath-analyzer".into())
            .spawn(move || {
                let flags = Flags {
                    running: &running,
                    shutdown: &shutdown,
                    gate: &gate,
                };
                run_analyzer(&monitor, &tx, flags, analysis_interval)
            })?
    };

    log::info!(
        "engine ready (sample period {:?}, analysis every {:?})",
        sample_period,
        analysis_interval
    );
    Ok(EngineHandle {
        commands: tx_cmd,
        events: rx,
        monitor,
        workers: vec![producer, analyzer],
    })
}

#[derive(Clone, Copy)]
struct Flags<'a> {
    running: &'a AtomicBool,
    shutdown: &'a AtomicBool,
    gate: &'a Mutex<()>,
}

fn run_producer<S: SampleSource>(
    mut source: S,
    monitor: &Monitor,
    rx_cmd: &Receiver<MonitorCommand>,
    tx: &Sender<MonitorEvent>,
    flags: Flags<'_>,
    sample_period: Duration,
) {
    let Flags {
        running, shutdown, ..
    } = flags;
    let mut exhausted = false;
    loop {
        // 1. commands
        loop {
            let cmd = match rx_cmd.try_recv() {
                Ok(cmd) => cmd,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => MonitorCommand::Shutdown,
            };
            match cmd {
                MonitorCommand::Start => {
                    if !running.swap(true, Ordering::AcqRel) {
                        log::info!("monitoring started");
                        tx.send(MonitorEvent::Started).ok();
                    }
                }
                MonitorCommand::Stop => {
                    let _gate = flags.gate.lock();
                    if running.swap(false, Ordering::AcqRel) {
                        let summary = monitor.stop();
                        tx.send(MonitorEvent::Stopped(summary)).ok();
                    }
                }
                MonitorCommand::Shutdown => {
                    running.store(false, Ordering::Release);
                    shutdown.store(true, Ordering::Release);
                    break;
                }
            }
        }
        if shutdown.load(Ordering::Acquire) {
            log::info!("producer shutting down");
            break;
        }

        // 2. one sample per tick
        if running.load(Ordering::Acquire) && !exhausted {
            match source.next_sample() {
                Ok(Some(sample)) => {
                    if let Err(err) = monitor.append(sample) {
                        log::warn!("sample rejected: {err}");
                    }
                }
                Ok(None) => {
                    exhausted = true;
                    log::info!("source exhausted");
                    tx.send(MonitorEvent::SourceExhausted).ok();
                }
                Err(err) => {
                    exhausted = true;
                    log::warn!("source failed: {err}");
                    tx.send(MonitorEvent::SourceExhausted).ok();
                }
            }
        }
        thread::sleep(sample_period);
    }
}

fn run_analyzer(
    monitor: &Monitor,
    tx: &Sender<MonitorEvent>,
    flags: Flags<'_>,
    interval: Duration,
) {
    loop {
        if !sleep_unless_shutdown(interval, flags.shutdown) {
            break;
        }
        if !flags.running.load(Ordering::Acquire) {
            continue;
        }
        let Some(report) = monitor.analyze() else {
            continue;
        };
        let _gate = flags.gate.lock();
        // a Stop may have landed while the cycle ran
        if !flags.running.load(Ordering::Acquire) {
            continue;
        }
        if tx.send(MonitorEvent::Report(report)).is_err() {
            break;
        }
    }
}

/// Sleeps in short slices; `false` once shutdown was requested.
fn sleep_unless_shutdown(total: Duration, shutdown: &AtomicBool) -> bool {
    let deadline = Instant::now() + total;
    loop {
        if shutdown.load(Ordering::Acquire) {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        thread::sleep(SLEEP_SLICE.min(deadline - now));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SyntheticBreathing;

    fn fast_config() -> MonitorConfig {
        let mut config = MonitorConfig::default();
        config.schedule.sample_rate_hz = 1000.0;
        config.schedule.analysis_interval_ms = 20;
        config
    }

    fn wait_for<F>(handle: &EngineHandle, timeout: Duration, mut pred: F) -> Option<MonitorEvent>
    where
        F: FnMut(&MonitorEvent) -> bool,
    {
        let deadline = Instant::now() + timeout;
        while let Some(left) = deadline.checked_duration_since(Instant::now()) {
            match handle.events().recv_timeout(left) {
                Ok(event) if pred(&event) => return Some(event),
                Ok(_) => continue,
                Err(_) => return None,
            }
        }
        None
    }

    #[test]
    fn engine_reports_valid_rate_then_stops() {
        let source = SyntheticBreathing::new(15.0, 5.0).with_noise(0.1, 3);
        let handle = spawn_engine(fast_config(), source).unwrap();
        handle.start();
        assert!(wait_for(&handle, Duration::from_secs(5), |e| matches!(e, MonitorEvent::Started)).is_some());

        let valid = wait_for(&handle, Duration::from_secs(10), |e| {
            matches!(e, MonitorEvent::Report(r) if r.estimate.is_valid())
        });
        let Some(MonitorEvent::Report(report)) = valid else {
            panic!("no valid report within timeout");
        };
        assert!((report.estimate.rate_bpm.unwrap() - 15.0).abs() < 2.0);

        handle.stop();
        let stopped = wait_for(&handle, Duration::from_secs(5), |e| {
            matches!(e, MonitorEvent::Stopped(_))
        });
        assert!(stopped.is_some());
        assert_eq!(handle.monitor().buffered_len(), 0);
        handle.join();
    }

    #[test]
    fn exhausted_source_is_reported() {
        let source = SyntheticBreathing::new(15.0, 5.0).with_duration(1.0);
        let handle = spawn_engine(fast_config(), source).unwrap();
        handle.start();
        let event = wait_for(&handle, Duration::from_secs(5), |e| {
            matches!(e, MonitorEvent::SourceExhausted)
        });
        assert!(event.is_some());
        assert_eq!(handle.latest().samples_collected, 5);
        handle.join();
    }

    #[test]
    fn no_report_follows_stopped() {
        let source = SyntheticBreathing::new(15.0, 5.0).with_noise(0.1, 5);
        let mut config = fast_config();
        config.schedule.analysis_interval_ms = 1;
        let handle = spawn_engine(config, source).unwrap();
        handle.start();
        assert!(wait_for(&handle, Duration::from_secs(5), |e| matches!(e, MonitorEvent::Report(_))).is_some());

        handle.stop();
        assert!(wait_for(&handle, Duration::from_secs(5), |e| matches!(e, MonitorEvent::Stopped(_))).is_some());
        let late = wait_for(&handle, Duration::from_millis(100), |e| matches!(e, MonitorEvent::Report(_)));
        assert!(late.is_none(), "report sent after stop: {late:?}");
        handle.join();
    }

    #[test]
    fn unusable_schedule_is_refused() {
        let mut config = fast_config();
        config.schedule.sample_rate_hz = 1e-30;
        let source = SyntheticBreathing::new(15.0, 5.0);
        assert!(matches!(
            spawn_engine(config, source),
            Err(MonitorError::Config(_))
        ));
    }

    #[test]
    fn idle_engine_collects_nothing() {
        let source = SyntheticBreathing::new(15.0, 5.0);
        let handle = spawn_engine(fast_config(), source).unwrap();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(handle.monitor().samples_collected(), 0);
        handle.join();
    }
}
