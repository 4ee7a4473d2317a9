// src/main.rs
use anyhow::{bail, Context, Result};
use breath_monitor::signal::{SyntheticBreathing, TraceFileSource};
use breath_monitor::{spawn_engine, Monitor, MonitorConfig, MonitorEvent, MonitorReport};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "breath-monitor", version, about = "Respiration rate from a brightness trace")]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a recorded `timestamp,brightness` trace
    Replay {
        file: PathBuf,
        #[arg(long)]
        config: Option<PathBuf>,
        /// Seconds of trace time between analyses
        #[arg(long, default_value_t = 1.0)]
        every: f64,
    },
    /// Run the threaded engine on a synthetic breathing signal
    Simulate {
        #[arg(long, default_value_t = 15.0)]
        rate: f64,
        #[arg(long, default_value_t = 60.0)]
        seconds: f64,
        #[arg(long, default_value_t = 0.1)]
        noise: f64,
        #[arg(long, default_value_t = 7)]
        seed: u64,
        /// Use the configured tick rates instead of 1 ms ticks
        #[arg(long)]
        realtime: bool,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the default configuration as TOML
    Config,
}

fn load_config(path: Option<&Path>) -> Result<MonitorConfig> {
    match path {
        Some(path) => MonitorConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(MonitorConfig::default()),
    }
}

fn print_report(report: &MonitorReport) -> Result<()> {
    println!("{}", serde_json::to_string(report)?);
    Ok(())
}

fn replay(file: &Path, config: Option<&Path>, every: f64) -> Result<()> {
    let config = load_config(config)?;
    let mut source = TraceFileSource::open(file)
        .with_context(|| format!("reading trace {}", file.display()))?;
    log::info!("replaying {} samples from {}", source.remaining(), file.display());
    let monitor = Monitor::new(config)?;
    for report in monitor.replay(&mut source, every)? {
        print_report(&report)?;
    }
    print_report(&monitor.stop())
}

fn simulate(
    rate: f64,
    seconds: f64,
    noise: f64,
    seed: u64,
    realtime: bool,
    config: Option<&Path>,
) -> Result<()> {
    let mut config = load_config(config)?;
    if !(seconds > 0.0) {
        bail!("--seconds must be positive");
    }
    let source_rate = config.schedule.sample_rate_hz;
    if !realtime {
        // keep the sample/analysis ratio, run ~200x faster
        let ratio = config.schedule.analysis_interval_ms as f64 / 1000.0 * source_rate;
        config.schedule.sample_rate_hz = 1000.0;
        config.schedule.analysis_interval_ms = ratio.round().max(1.0) as u64;
    }
    let source = SyntheticBreathing::new(rate, source_rate)
        .with_noise(noise, seed)
        .with_duration(seconds);
    let handle = spawn_engine(config, source)?;
    handle.start();

    let deadline = Instant::now() + Duration::from_secs_f64(seconds + 5.0);
    loop {
        let left = deadline.saturating_duration_since(Instant::now());
        match handle.events().recv_timeout(left) {
            Ok(MonitorEvent::Report(report)) => print_report(&report)?,
            Ok(MonitorEvent::SourceExhausted) => handle.stop(),
            Ok(MonitorEvent::Stopped(summary)) => {
                print_report(&summary)?;
                break;
            }
            Ok(MonitorEvent::Started) => log::info!("simulating {rate} bpm for {seconds} s"),
            Err(_) => {
                log::warn!("simulation timed out");
                break;
            }
        }
    }
    handle.join();
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.cmd {
        Commands::Replay {
            file,
            config,
            every,
        } => replay(&file, config.as_deref(), every),
        Commands::Simulate {
            rate,
            seconds,
            noise,
            seed,
            realtime,
            config,
        } => simulate(rate, seconds, noise, seed, realtime, config.as_deref()),
        Commands::Config => {
            print!("{}", MonitorConfig::default().to_toml_string()?);
            Ok(())
        }
    }
}
