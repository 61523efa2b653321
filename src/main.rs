//! APM Tracker CLI
//!
//! Feeds actions from a line stream or a synthetic generator into a rate
//! tracker and prints live statistics.
//!
//! Run with:  `RUST_LOG=debug apm-tracker watch`

use anyhow::{bail, Context, Result};
use apm_tracker::{
    collector::{ActionSource, ReaderCollector, SyntheticCollector, SyntheticConfig},
    config::{Config, SourceConfig},
    core::{
        create_shared_tracker, Clock, RateReport, ReportBuilder, SharedRateTracker, SystemClock,
    },
    session::{create_shared_log, SharedSessionLog},
    VERSION,
};
use chrono::Utc;
use clap::{Parser, Subcommand};
use crossbeam_channel::RecvTimeoutError;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

/// Bar glyphs for the text histogram, lowest first.
const SPARK_GLYPHS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

#[derive(Parser)]
#[command(name = "apm-tracker")]
#[command(version = VERSION)]
#[command(about = "Actions-per-minute tracker for keyboard and mouse input", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Count actions read line by line from a file or stdin
    Watch {
        /// File to read actions from (defaults to stdin)
        #[arg(long, short)]
        input: Option<PathBuf>,

        #[command(flatten)]
        display: DisplayArgs,
    },

    /// Drive the tracker with a synthetic action stream
    Simulate {
        /// Baseline actions per minute
        #[arg(long, default_value = "120")]
        apm: u32,

        /// Stop after this many seconds
        #[arg(long, default_value = "30")]
        duration_secs: u64,

        /// Rate multiplier during bursts
        #[arg(long, default_value = "3")]
        burst_multiplier: u32,

        #[command(flatten)]
        display: DisplayArgs,
    },

    /// Show configuration
    Config {
        /// Overwrite the config file with defaults
        #[arg(long)]
        reset: bool,
    },
}

#[derive(clap::Args)]
struct DisplayArgs {
    /// Input sources to count (keyboard, mouse, or all)
    #[arg(long)]
    sources: Option<String>,

    /// Refresh interval in milliseconds
    #[arg(long)]
    refresh_ms: Option<u64>,

    /// Print only the current rate on each refresh
    #[arg(long)]
    compact: bool,

    /// Write the final report as JSON to the export directory
    #[arg(long)]
    export: bool,
}

fn main() -> Result<()> {
    // Logs go to stderr so the live display owns stdout.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Watch { input, display } => cmd_watch(input, display),
        Commands::Simulate {
            apm,
            duration_secs,
            burst_multiplier,
            display,
        } => cmd_simulate(apm, duration_secs, burst_multiplier, display),
        Commands::Config { reset } => cmd_config(reset),
    }
}

fn cmd_watch(input: Option<PathBuf>, display: DisplayArgs) -> Result<()> {
    let config = resolve_config(&display)?;
    let collector_config = config.sources.collector_config();

    let mut source = match input {
        Some(path) => {
            let file = File::open(&path)
                .with_context(|| format!("Failed to open action input {}", path.display()))?;
            ReaderCollector::new(collector_config, BufReader::new(file))
        }
        None => {
            println!("Reading actions from stdin, one per line. Press Ctrl+C to stop.");
            ReaderCollector::from_stdin(collector_config)
        }
    };

    run_session(&mut source, &config, &display, None)
}

fn cmd_simulate(
    apm: u32,
    duration_secs: u64,
    burst_multiplier: u32,
    display: DisplayArgs,
) -> Result<()> {
    let config = resolve_config(&display)?;
    let synthetic = SyntheticConfig {
        actions_per_minute: apm,
        burst_multiplier,
        ..Default::default()
    };

    println!("Simulating {apm} APM for {duration_secs}s. Press Ctrl+C to stop early.");
    let mut source = SyntheticCollector::new(config.sources.collector_config(), synthetic);

    run_session(
        &mut source,
        &config,
        &display,
        Some(Duration::from_secs(duration_secs)),
    )
}

fn cmd_config(reset: bool) -> Result<()> {
    let config = if reset {
        let config = Config::default();
        config.save().context("Failed to save default configuration")?;
        println!("Configuration reset to defaults.");
        config
    } else {
        Config::load().context("Failed to load configuration")?
    };

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}

/// Load the config file and apply command-line overrides.
fn resolve_config(display: &DisplayArgs) -> Result<Config> {
    let mut config = Config::load().unwrap_or_else(|e| {
        tracing::warn!("Could not load configuration, using defaults: {e}");
        Config::default()
    });

    if let Some(ref sources) = display.sources {
        config.sources = SourceConfig::from_csv(sources);
    }
    if !config.sources.any_enabled() {
        bail!("At least one source must be enabled (keyboard or mouse)");
    }
    if let Some(ms) = display.refresh_ms {
        config.refresh_interval = Duration::from_millis(ms.max(1));
    }

    config
        .tracker
        .validate()
        .context("Invalid tracker settings")?;
    Ok(config)
}

/// Record actions from `source` until it finishes, the deadline passes, or
/// Ctrl+C is pressed, refreshing the display on a separate thread.
fn run_session(
    source: &mut dyn ActionSource,
    config: &Config,
    display: &DisplayArgs,
    deadline: Option<Duration>,
) -> Result<()> {
    let clock = SystemClock;
    let tracker = create_shared_tracker(config.tracker, clock.now_millis())?;
    let session_log = create_shared_log();
    let builder = Arc::new(ReportBuilder::new());

    tracing::info!(
        session = %builder.session_id(),
        capacity = config.tracker.capacity,
        window_ms = config.tracker.window_millis,
        "tracking session started"
    );

    let running = Arc::new(AtomicBool::new(true));
    ctrlc_handler(running.clone())?;

    source.start().context("Failed to start action source")?;

    let refresher = spawn_refresher(
        tracker.clone(),
        builder.clone(),
        session_log.clone(),
        running.clone(),
        config.refresh_interval,
        display.compact,
    )?;

    let receiver = source.receiver().clone();
    let started = Instant::now();

    while running.load(Ordering::SeqCst) {
        if deadline.is_some_and(|d| started.elapsed() >= d) {
            break;
        }

        match receiver.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => {
                session_log.record_action(event.kind);
                tracker.record_event(event.timestamp_millis());
            }
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                tracing::info!("action source finished");
                break;
            }
        }
    }

    running.store(false, Ordering::SeqCst);
    source.stop();
    tracker.stop();

    let counters = source.counters();
    session_log.record_filtered(counters.filtered());
    session_log.record_dropped(counters.dropped());
    if counters.dropped() > 0 {
        tracing::warn!(
            dropped = counters.dropped(),
            "actions were dropped because the channel was full"
        );
    }
    if refresher.join().is_err() {
        tracing::warn!("display thread panicked");
    }

    let report = builder.build(&tracker, clock.now_millis());
    println!();
    print_full(&report);

    if display.export {
        export_report(&report, config, &session_log)?;
    }

    println!();
    println!("{}", session_log.summary());
    Ok(())
}

fn spawn_refresher(
    tracker: SharedRateTracker,
    builder: Arc<ReportBuilder>,
    session_log: SharedSessionLog,
    running: Arc<AtomicBool>,
    interval: Duration,
    compact: bool,
) -> Result<thread::JoinHandle<()>> {
    let clock = SystemClock;
    thread::Builder::new()
        .name("apm-display".to_string())
        .spawn(move || {
            let mut next = Instant::now() + interval;
            while running.load(Ordering::SeqCst) {
                let now = Instant::now();
                if now < next {
                    // Wake often enough to notice shutdown
                    thread::sleep((next - now).min(Duration::from_millis(100)));
                    continue;
                }
                next += interval;

                let report = builder.build(&tracker, clock.now_millis());
                session_log.record_poll();
                if compact {
                    println!("{}", report.compact_line());
                } else {
                    println!(
                        "{} | {}",
                        report.summary_line().replace('\n', " | "),
                        sparkline(&report)
                    );
                }
            }
        })
        .context("Failed to spawn display thread")
}

fn print_full(report: &RateReport) {
    println!("{}", report.summary_line());
    println!(
        "Last {}s: [{}]",
        report.histogram.len() as i64 * report.histogram.bucket_width_millis / 1000,
        sparkline(report)
    );
    println!(
        "Per-bucket: mean {:.2}, std dev {:.2}, max {}, active {}/{}",
        report.histogram_stats.mean,
        report.histogram_stats.std_dev,
        report.histogram_stats.max,
        report.histogram_stats.active_buckets,
        report.histogram.len()
    );
    println!(
        "Buffered: {} of {} recorded",
        report.buffered_events, report.total_events
    );
}

/// Render the histogram oldest-to-newest, newest bucket on the right.
fn sparkline(report: &RateReport) -> String {
    let top = (SPARK_GLYPHS.len() - 1) as u32;
    report
        .histogram
        .bar_heights(top)
        .into_iter()
        .rev()
        .map(|h| SPARK_GLYPHS[h.min(top) as usize])
        .collect()
}

fn export_report(
    report: &RateReport,
    config: &Config,
    session_log: &SharedSessionLog,
) -> Result<()> {
    config
        .ensure_directories()
        .context("Failed to create export directory")?;

    let path = config.export_path.join(format!(
        "session_{}.json",
        Utc::now().format("%Y%m%d_%H%M%S")
    ));
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    std::fs::write(&path, json)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;

    session_log.record_report_exported();
    println!("Exported report to {path:?}");
    Ok(())
}

/// Set up Ctrl+C handler.
fn ctrlc_handler(running: Arc<AtomicBool>) -> Result<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .context("Error setting Ctrl+C handler")
}
