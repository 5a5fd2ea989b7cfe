//! Sliding-window high traffic detector
//!
//! The detector raises an alert the moment the number of requests inside the
//! alert window reaches `alert_max`, and clears it the moment the count drops
//! back below. Dropping below can only happen when an entry ages out, so the
//! detector keeps a one-shot alarm armed for the exact instant the oldest of
//! the most recent `alert_max` requests leaves the window.

use crate::aggregator::{Clock, SlidingWindow};
use crate::alerts::{Alarm, Sink};
use crate::events::Timestamp;
use chrono::Duration;

/// Alert state change produced by a check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertTransition {
    Raised { hits: usize, at: Timestamp },
    Cleared { hits: usize, at: Timestamp },
}

/// Two-state high traffic alert over a sliding window of request timestamps
#[derive(Debug)]
pub struct TrafficAlert {
    window: SlidingWindow,
    /// Width of the sliding window
    width: Duration,
    /// Hits within `width` that keep the alert raised
    alert_max: usize,
    active: bool,
    /// Fires when the window is next due to drop below `alert_max`
    clear_alarm: Alarm,
}

impl TrafficAlert {
    pub fn new(width: Duration, alert_max: usize) -> Self {
        Self {
            window: SlidingWindow::new(),
            width,
            alert_max,
            active: false,
            clear_alarm: Alarm::new(),
        }
    }

    /// Add one request to the window
    pub fn record(&mut self, timestamp: Timestamp) {
        self.window.insert(timestamp);
    }

    /// Re-evaluate the alert at `now`
    ///
    /// `timer_fired` is true when the check runs because the clear alarm went
    /// off, in which case the alarm is already spent.
    pub fn check(
        &mut self,
        now: Timestamp,
        timer_fired: bool,
        clock: &Clock,
        sink: &mut dyn Sink,
    ) -> Option<AlertTransition> {
        // Pruning can only shrink the window
        if self.window.len() < self.alert_max {
            return None;
        }

        let hits = self.window.prune(now, self.width);
        let mut transition = None;

        if hits >= self.alert_max {
            if !self.active {
                sink.set_alert(hits, now);
                self.active = true;
                transition = Some(AlertTransition::Raised { hits, at: now });
            } else if !timer_fired {
                self.clear_alarm.disarm();
            }
            if let Some(pivot) = self.window.get(hits - self.alert_max) {
                self.clear_alarm.arm(clock.instant_at(pivot + self.width));
            }
        } else if self.active {
            sink.clear_alert(hits, now);
            self.active = false;
            if !timer_fired {
                self.clear_alarm.disarm();
            }
            transition = Some(AlertTransition::Cleared { hits, at: now });
        }

        transition
    }

    /// Wait until the clear alarm goes off; pends forever while disarmed
    pub async fn clear_due(&mut self) {
        self.clear_alarm.fired().await
    }

    /// Cancel any pending clear check
    pub fn stop(&mut self) {
        self.clear_alarm.disarm();
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn alert_max(&self) -> usize {
        self.alert_max
    }

    /// Entries currently held, including any not yet pruned
    #[cfg(test)]
    fn window_len(&self) -> usize {
        self.window.len()
    }

    #[cfg(test)]
    fn clear_alarm_armed(&self) -> bool {
        self.clear_alarm.is_armed()
    }
}
