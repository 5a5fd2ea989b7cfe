use crate::aggregator::{ReporterSummary, StatsReporter};
use crate::alerts::Sink;
use crate::collectors::FileTailer;
use crate::config::MonitorConfig;
use crate::error::{CollectorError, MonitorError};
use log::info;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Running log monitor: a file tailer feeding the stats reporter
///
/// The tailer thread and the reporter task are connected by a bounded queue
/// of `config.buffer_size` events. Must be started from within a tokio
/// runtime.
pub struct LogMonitor {
    config: MonitorConfig,
    tailer: FileTailer,
    reporter: JoinHandle<ReporterSummary>,
}

impl LogMonitor {
    /// Validate `config`, open the log file and start processing
    ///
    /// # Errors
    ///
    /// Returns `MonitorError::Config` for an invalid configuration and
    /// `MonitorError::Collector` if the log file cannot be followed. Nothing
    /// is left running on error.
    pub fn start(config: MonitorConfig, sink: Box<dyn Sink>) -> Result<Self, MonitorError> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.buffer_size);
        let tailer = FileTailer::start(&config.log_file, tx, config.poll_interval())?;
        let reporter = tokio::spawn(StatsReporter::new(&config, sink).run(rx));

        info!("LogMonitor started on {}", config.log_file.display());
        Ok(Self {
            config,
            tailer,
            reporter,
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Stop reading, let the reporter drain the queue, and wait for it
    ///
    /// Every event the tailer queued before stopping is processed before this
    /// returns.
    pub async fn close(self) -> Result<ReporterSummary, MonitorError> {
        let Self {
            mut tailer,
            reporter,
            ..
        } = self;

        // Joining the reader thread blocks
        tokio::task::spawn_blocking(move || tailer.stop())
            .await
            .map_err(|e| CollectorError::ThreadPanicked(e.to_string()))??;

        let summary = reporter.await?;
        info!(
            "LogMonitor closed after {} events ({} reports, {} alerts)",
            summary.events_processed, summary.reports_emitted, summary.alerts_raised
        );
        Ok(summary)
    }
}
