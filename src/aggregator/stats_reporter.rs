//! Stats engine: the single consumer of decoded log events
//!
//! The reporter owns every piece of traffic state. It waits on three sources
//! at once (the report tick, the alert clear alarm, and the event queue) and
//! handles exactly one of them per wake, so no state is ever shared or
//! locked.

use crate::aggregator::{BusiestSections, Clock};
use crate::alerts::{AlertTransition, Sink, TrafficAlert};
use crate::config::MonitorConfig;
use crate::events::{LogEvent, Timestamp};
use log::{debug, info};
use tokio::sync::mpsc::Receiver;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Counters describing a finished reporter run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReporterSummary {
    /// Events taken off the queue
    pub events_processed: u64,
    /// Events too old to enter the alert window
    pub stale_for_alert: u64,
    /// Events too old to count toward the open report
    pub stale_for_report: u64,
    /// Busiest-section reports handed to the sink
    pub reports_emitted: u64,
    pub alerts_raised: u64,
    pub alerts_cleared: u64,
}

/// Aggregation and alert engine
pub struct StatsReporter {
    /// Report cadence
    report_period: std::time::Duration,
    /// Events at least this old are left out of the open report
    report_interval: chrono::Duration,
    /// Events at least this old are left out of the alert window
    alert_window: chrono::Duration,
    busiest: BusiestSections,
    alert: TrafficAlert,
    clock: Clock,
    sink: Box<dyn Sink>,
    summary: ReporterSummary,
}

impl StatsReporter {
    /// Create a reporter for an already validated configuration
    pub fn new(config: &MonitorConfig, sink: Box<dyn Sink>) -> Self {
        Self::with_clock(config, sink, Clock::new())
    }

    /// Create a reporter that reads time from `clock`
    pub fn with_clock(config: &MonitorConfig, sink: Box<dyn Sink>, clock: Clock) -> Self {
        let alert_window = chrono::Duration::seconds(config.alert_window_secs as i64);
        Self {
            report_period: config.report_interval(),
            report_interval: chrono::Duration::seconds(config.report_interval_secs as i64),
            alert_window,
            busiest: BusiestSections::new(),
            alert: TrafficAlert::new(alert_window, config.alert_max().unwrap_or(usize::MAX)),
            clock,
            sink,
            summary: ReporterSummary::default(),
        }
    }

    /// Consume events until the queue is closed and drained
    ///
    /// The queue yields every buffered event before reporting closure, so no
    /// event sent before the last sender was dropped is lost.
    pub async fn run(mut self, mut events: Receiver<LogEvent>) -> ReporterSummary {
        let mut report_timer = interval_at(Instant::now() + self.report_period, self.report_period);
        report_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            "Stats reporter started (report every {:?}, alert at {} hits over {}s)",
            self.report_period,
            self.alert.alert_max(),
            self.alert_window.num_seconds()
        );

        loop {
            tokio::select! {
                biased;

                _ = report_timer.tick() => self.report(),
                _ = self.alert.clear_due() => {
                    let now = self.clock.now();
                    self.check_alert(now, true);
                }
                maybe_event = events.recv() => match maybe_event {
                    Some(event) => self.process(event),
                    None => break,
                },
            }
        }

        self.alert.stop();
        info!(
            "Stats reporter exiting: {} events, {} reports, {} alerts",
            self.summary.events_processed, self.summary.reports_emitted, self.summary.alerts_raised
        );
        self.summary
    }

    fn process(&mut self, event: LogEvent) {
        let now = self.clock.now();
        let age = now - event.timestamp;
        self.summary.events_processed += 1;

        if age < self.alert_window {
            self.alert.record(event.timestamp);
            self.check_alert(now, false);
        } else {
            self.summary.stale_for_alert += 1;
        }

        if age >= self.report_interval {
            debug!("Skipping stale event for report ({}s old): {}", age.num_seconds(), event);
            self.summary.stale_for_report += 1;
            return;
        }

        self.busiest.record(&event.section);
    }

    fn check_alert(&mut self, now: Timestamp, timer_fired: bool) {
        match self
            .alert
            .check(now, timer_fired, &self.clock, self.sink.as_mut())
        {
            Some(AlertTransition::Raised { hits, at }) => {
                info!("High traffic alert raised: {} hits at {}", hits, at);
                self.summary.alerts_raised += 1;
            }
            Some(AlertTransition::Cleared { hits, at }) => {
                info!("High traffic alert cleared: {} hits at {}", hits, at);
                self.summary.alerts_cleared += 1;
            }
            None => {}
        }
    }

    fn report(&mut self) {
        let sections = self.busiest.snapshot();
        debug!(
            "Reporting {} busiest of {} sections",
            sections.len(),
            self.busiest.section_count()
        );
        self.sink.report_busiest_sections(&sections);
        self.busiest.reset();
        self.summary.reports_emitted += 1;
    }
}
