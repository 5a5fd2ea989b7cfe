use crate::events::SectionCount;
use std::collections::{BTreeSet, HashMap};

/// Per-interval section hit counts with an incrementally maintained set of
/// the sections tied for the most hits
///
/// The busiest set only grows while an interval is open; it is replaced
/// wholesale when a section overtakes the maximum and emptied on `reset`.
#[derive(Debug, Default)]
pub struct BusiestSections {
    /// Hits per section since the last reset
    counts: HashMap<String, u64>,
    /// Sections whose count equals `max_count`
    busiest: BTreeSet<String>,
    /// Highest count in `counts`
    max_count: u64,
}

impl BusiestSections {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one hit for `section` and update the busiest set
    pub fn record(&mut self, section: &str) {
        let count = match self.counts.get_mut(section) {
            Some(count) => {
                *count += 1;
                *count
            }
            None => {
                self.counts.insert(section.to_string(), 1);
                1
            }
        };

        if self.busiest.is_empty() || count > self.max_count {
            self.busiest.clear();
            self.busiest.insert(section.to_string());
            self.max_count = count;
        } else if count == self.max_count && !self.busiest.contains(section) {
            self.busiest.insert(section.to_string());
        }
    }

    /// Busiest sections with their counts, ordered by name
    pub fn snapshot(&self) -> Vec<SectionCount> {
        self.busiest
            .iter()
            .map(|name| SectionCount::new(name.clone(), self.max_count))
            .collect()
    }

    /// Hits recorded for `section` in the open interval
    #[cfg(test)]
    fn count(&self, section: &str) -> u64 {
        self.counts.get(section).copied().unwrap_or(0)
    }

    pub fn max_count(&self) -> u64 {
        self.max_count
    }

    /// Number of distinct sections seen in the open interval
    pub fn section_count(&self) -> usize {
        self.counts.len()
    }

    /// Start a new interval
    pub fn reset(&mut self) {
        self.counts.clear();
        self.busiest.clear();
        self.max_count = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_n(tracker: &mut BusiestSections, section: &str, n: usize) {
        for _ in 0..n {
            tracker.record(section);
        }
    }

    #[test]
    fn test_single_busiest_section() {
        let mut tracker = BusiestSections::new();
        record_n(&mut tracker, "/api", 4);
        record_n(&mut tracker, "/report", 2);

        assert_eq!(tracker.snapshot(), vec![SectionCount::new("/api", 4)]);
    }

    #[test]
    fn test_tie_reports_all_sections() {
        let mut tracker = BusiestSections::new();
        record_n(&mut tracker, "/api", 3);
        record_n(&mut tracker, "/report", 3);

        assert_eq!(
            tracker.snapshot(),
            vec![
                SectionCount::new("/api", 3),
                SectionCount::new("/report", 3)
            ]
        );
    }

    #[test]
    fn test_overtaking_section_replaces_set() {
        let mut tracker = BusiestSections::new();
        tracker.record("/a");
        tracker.record("/b");
        tracker.record("/c");
        assert_eq!(tracker.snapshot().len(), 3);

        tracker.record("/b");
        assert_eq!(tracker.snapshot(), vec![SectionCount::new("/b", 2)]);
        assert_eq!(tracker.max_count(), 2);
    }

    #[test]
    fn test_interleaved_tie_is_not_duplicated() {
        let mut tracker = BusiestSections::new();
        for _ in 0..5 {
            tracker.record("/x");
            tracker.record("/y");
        }
        assert_eq!(
            tracker.snapshot(),
            vec![SectionCount::new("/x", 5), SectionCount::new("/y", 5)]
        );
    }

    #[test]
    fn test_reset_starts_fresh() {
        let mut tracker = BusiestSections::new();
        record_n(&mut tracker, "/api", 10);
        tracker.reset();

        assert!(tracker.snapshot().is_empty());
        assert_eq!(tracker.section_count(), 0);

        tracker.record("/report");
        assert_eq!(tracker.count("/api"), 0);
        assert_eq!(tracker.snapshot(), vec![SectionCount::new("/report", 1)]);
    }

    #[test]
    fn test_empty_snapshot() {
        assert!(BusiestSections::new().snapshot().is_empty());
    }
}
