//! Sorted sliding window of request timestamps
//!
//! The window keeps timestamps in ascending order so that the expired prefix
//! can be located with a binary search and dropped in one step. Expired
//! entries are only removed when a caller asks for an exact count.

use crate::events::Timestamp;
use chrono::Duration;
use std::collections::VecDeque;

/// Ascending sequence of request timestamps
#[derive(Debug, Default)]
pub struct SlidingWindow {
    timestamps: VecDeque<Timestamp>,
}

impl SlidingWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a timestamp, keeping the sequence non-decreasing
    ///
    /// Log lines usually arrive in order, so this is an append; a line that
    /// was written late is slotted in at its sorted position.
    pub fn insert(&mut self, timestamp: Timestamp) {
        match self.timestamps.back() {
            Some(&last) if timestamp < last => {
                let pos = self.timestamps.partition_point(|&t| t <= timestamp);
                self.timestamps.insert(pos, timestamp);
            }
            _ => self.timestamps.push_back(timestamp),
        }
    }

    /// Drop every timestamp that is at least `width` older than `now`
    ///
    /// Returns the number of timestamps retained.
    pub fn prune(&mut self, now: Timestamp, width: Duration) -> usize {
        let cutoff = now - width;
        let expired = self.timestamps.partition_point(|&t| t <= cutoff);
        self.timestamps.drain(..expired);
        self.timestamps.len()
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Timestamp at `index`, oldest first
    pub fn get(&self, index: usize) -> Option<Timestamp> {
        self.timestamps.get(index).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Timestamp> {
        self.timestamps.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_insert_in_order() {
        let mut window = SlidingWindow::new();
        let now = Utc::now();

        window.insert(now - Duration::seconds(3));
        window.insert(now - Duration::seconds(2));
        window.insert(now);

        assert_eq!(window.len(), 3);
        assert_eq!(window.get(0), Some(now - Duration::seconds(3)));
        assert_eq!(window.get(2), Some(now));
    }

    #[test]
    fn test_insert_late_arrival_keeps_order() {
        let mut window = SlidingWindow::new();
        let now = Utc::now();

        window.insert(now - Duration::seconds(5));
        window.insert(now);
        window.insert(now - Duration::seconds(2));
        window.insert(now - Duration::seconds(10));

        let collected: Vec<_> = window.iter().copied().collect();
        assert_eq!(
            collected,
            vec![
                now - Duration::seconds(10),
                now - Duration::seconds(5),
                now - Duration::seconds(2),
                now,
            ]
        );
    }

    #[test]
    fn test_prune_drops_expired_prefix() {
        let mut window = SlidingWindow::new();
        let now = Utc::now();

        for offset in [70, 65, 30, 10, 0] {
            window.insert(now - Duration::seconds(offset));
        }

        assert_eq!(window.prune(now, Duration::seconds(60)), 3);
        assert_eq!(window.get(0), Some(now - Duration::seconds(30)));
    }

    #[test]
    fn test_prune_boundary_is_exclusive_of_width() {
        let mut window = SlidingWindow::new();
        let now = Utc::now();

        // Exactly `width` old: expired
        window.insert(now - Duration::seconds(2));
        // Just inside the window: retained
        window.insert(now - Duration::seconds(2) + Duration::milliseconds(1));

        assert_eq!(window.prune(now, Duration::seconds(2)), 1);
    }

    #[test]
    fn test_prune_empty_window() {
        let mut window = SlidingWindow::new();
        assert_eq!(window.prune(Utc::now(), Duration::seconds(1)), 0);
        assert!(window.is_empty());
    }
}
