use anyhow::Context;
use clap::Parser;
use log::{error, info, warn};
use logmonitor::alerts::ConsoleSink;
use logmonitor::config::MonitorConfig;
use logmonitor::LogMonitor;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Command-line arguments for the access log monitor
#[derive(Parser, Debug)]
#[command(
    name = "logmonitor",
    about = "HTTP access log monitor - busiest sections and high traffic alerts",
    long_about = "Tails a Common Log Format access log, reports the most hit sections \
                  every interval, and raises an alert while the average request rate \
                  over the alert window stays at or above the threshold."
)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", help = "Configuration file path (TOML format)")]
    config: Option<PathBuf>,

    /// Access log to follow
    #[arg(short, long, value_name = "PATH")]
    file: Option<PathBuf>,

    /// Capacity of the event queue
    #[arg(long, value_name = "EVENTS")]
    bufsize: Option<usize>,

    /// Seconds between busiest-section reports
    #[arg(long, value_name = "SECS")]
    report_secs: Option<u64>,

    /// Width of the alert window in seconds
    #[arg(long, value_name = "SECS")]
    alert_secs: Option<u64>,

    /// Average requests per second that trigger an alert
    #[arg(long, value_name = "HITS")]
    alert_threshold: Option<u64>,

    /// Enable verbose logging
    #[arg(
        short,
        long,
        help = "Enable verbose logging output (sets RUST_LOG=debug)"
    )]
    verbose: bool,
}

impl Cli {
    /// Build the effective configuration: defaults, then the config file,
    /// then flags
    ///
    /// A missing config file is not an error; defaults are used instead.
    fn load_config(&self) -> anyhow::Result<MonitorConfig> {
        let mut config = match &self.config {
            Some(path) if path.exists() => MonitorConfig::from_file(path)
                .with_context(|| format!("loading {}", path.display()))?,
            Some(path) => {
                warn!(
                    "Configuration file {} not found, using defaults",
                    path.display()
                );
                MonitorConfig::default()
            }
            None => MonitorConfig::default(),
        };

        if let Some(file) = &self.file {
            config.log_file = file.clone();
        }
        if let Some(bufsize) = self.bufsize {
            config.buffer_size = bufsize;
        }
        if let Some(secs) = self.report_secs {
            config.report_interval_secs = secs;
        }
        if let Some(secs) = self.alert_secs {
            config.alert_window_secs = secs;
        }
        if let Some(threshold) = self.alert_threshold {
            config.alert_threshold = threshold;
        }

        config.validate()?;
        Ok(config)
    }
}

async fn run(config: MonitorConfig) -> anyhow::Result<()> {
    let (shutdown_tx, mut shutdown_rx) = mpsc::unbounded_channel();
    ctrlc::set_handler(move || {
        info!("Received interrupt signal (SIGINT), shutting down gracefully...");
        if let Err(e) = shutdown_tx.send(()) {
            error!("Failed to send shutdown signal: {}", e);
        }
    })
    .context("setting SIGINT handler")?;

    let sink = ConsoleSink::stdout(config.report_interval_secs);
    let monitor = LogMonitor::start(config, Box::new(sink)).context("starting monitor")?;

    info!("Log monitor is running. Press Ctrl+C to stop.");
    shutdown_rx.recv().await;

    let summary = monitor.close().await.context("shutting down monitor")?;
    info!(
        "Shutdown complete: {} events processed, {} too old for the alert window, \
         {} too old for the report, {} reports, {} alerts raised, {} cleared",
        summary.events_processed,
        summary.stale_for_alert,
        summary.stale_for_report,
        summary.reports_emitted,
        summary.alerts_raised,
        summary.alerts_cleared
    );
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    if cli.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }
    env_logger::init();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    println!("{}", config);
    info!("Starting log monitor on {}", config.log_file.display());

    if let Err(e) = run(config).await {
        error!("{:#}", e);
        std::process::exit(1);
    }
}
