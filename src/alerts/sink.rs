use crate::events::{SectionCount, Timestamp};
use log::warn;
use std::io::{self, Stdout, Write};

/// Destination for busiest-section reports and traffic alerts
///
/// Calls are made synchronously from the stats engine loop. Implementations
/// must not block for long and must handle their own failures: the engine
/// treats every call as infallible.
#[cfg_attr(test, mockall::automock)]
pub trait Sink: Send {
    /// Called once per reporting interval, with an empty slice when the
    /// interval saw no traffic
    fn report_busiest_sections(&mut self, sections: &[SectionCount]);

    /// Called when traffic over the alert window reaches the threshold
    fn set_alert(&mut self, hits: usize, at: Timestamp);

    /// Called when traffic over the alert window drops back below the
    /// threshold
    fn clear_alert(&mut self, hits: usize, at: Timestamp);
}

/// Sink that prints human-readable lines for an operator's terminal
pub struct ConsoleSink<W: Write + Send> {
    out: W,
    report_interval_secs: u64,
}

impl ConsoleSink<Stdout> {
    pub fn stdout(report_interval_secs: u64) -> Self {
        Self::new(io::stdout(), report_interval_secs)
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(out: W, report_interval_secs: u64) -> Self {
        Self {
            out,
            report_interval_secs,
        }
    }

    /// Consume the sink and hand back the writer
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_lines(&mut self, lines: &[String]) {
        let result = lines
            .iter()
            .try_for_each(|line| writeln!(self.out, "{}", line))
            .and_then(|_| self.out.flush());
        if let Err(e) = result {
            warn!("Failed to write to console sink: {}", e);
        }
    }
}

impl<W: Write + Send> Sink for ConsoleSink<W> {
    fn report_busiest_sections(&mut self, sections: &[SectionCount]) {
        let mut lines = Vec::with_capacity(sections.len() + 1);
        lines.push(format!(
            "Busiest sections (last {}s):",
            self.report_interval_secs
        ));
        if sections.is_empty() {
            lines.push("  no traffic".to_string());
        }
        for section in sections {
            lines.push(format!(
                "  section {}: {} hits",
                section.name, section.count
            ));
        }
        self.write_lines(&lines);
    }

    fn set_alert(&mut self, hits: usize, at: Timestamp) {
        self.write_lines(&[format!(
            "High traffic generated an alert - hits = {}, triggered at {}",
            hits,
            at.format("%Y-%m-%d %H:%M:%S%.3f UTC")
        )]);
    }

    fn clear_alert(&mut self, hits: usize, at: Timestamp) {
        self.write_lines(&[format!(
            "Alert cleared - hits = {}, cleared at {}",
            hits,
            at.format("%Y-%m-%d %H:%M:%S%.3f UTC")
        )]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn output(sink: ConsoleSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn test_report_lists_sections() {
        let mut sink = ConsoleSink::new(Vec::new(), 10);
        sink.report_busiest_sections(&[
            SectionCount::new("/api", 4),
            SectionCount::new("/report", 4),
        ]);

        assert_eq!(
            output(sink),
            "Busiest sections (last 10s):\n  section /api: 4 hits\n  section /report: 4 hits\n"
        );
    }

    #[test]
    fn test_empty_report_says_no_traffic() {
        let mut sink = ConsoleSink::new(Vec::new(), 10);
        sink.report_busiest_sections(&[]);

        assert_eq!(output(sink), "Busiest sections (last 10s):\n  no traffic\n");
    }

    #[test]
    fn test_alert_lines() {
        let at = Utc.with_ymd_and_hms(2018, 5, 9, 16, 0, 39).unwrap();
        let mut sink = ConsoleSink::new(Vec::new(), 10);
        sink.set_alert(1250, at);
        sink.clear_alert(900, at);

        assert_eq!(
            output(sink),
            "High traffic generated an alert - hits = 1250, triggered at 2018-05-09 16:00:39.000 UTC\n\
             Alert cleared - hits = 900, cleared at 2018-05-09 16:00:39.000 UTC\n"
        );
    }

    /// Writer that rejects every write
    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn test_write_failures_are_swallowed() {
        let mut sink = ConsoleSink::new(BrokenPipe, 10);
        sink.report_busiest_sections(&[SectionCount::new("/api", 1)]);
        sink.set_alert(1, Utc::now());
        sink.clear_alert(0, Utc::now());
    }
}
