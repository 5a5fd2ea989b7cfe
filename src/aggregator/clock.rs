use crate::events::Timestamp;
use chrono::{DateTime, Utc};
use tokio::time::Instant;

/// Wall clock anchored to tokio's monotonic clock
///
/// Log timestamps are wall-clock times while alarms are scheduled on tokio's
/// `Instant`. Anchoring both to one origin makes the two convertible without
/// drift, and makes `now` follow virtual time when the tokio clock is paused.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    origin_wall: Timestamp,
    origin: Instant,
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock {
    /// Anchor a clock at the current wall time
    pub fn new() -> Self {
        Self::anchored_at(Utc::now())
    }

    /// Anchor a clock so that the current tokio instant reads as `origin_wall`
    pub fn anchored_at(origin_wall: Timestamp) -> Self {
        Self {
            origin_wall,
            origin: Instant::now(),
        }
    }

    pub fn now(&self) -> Timestamp {
        let elapsed = Instant::now().saturating_duration_since(self.origin);
        chrono::Duration::from_std(elapsed)
            .ok()
            .and_then(|elapsed| self.origin_wall.checked_add_signed(elapsed))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Tokio instant at which this clock will read `at`
    ///
    /// Timestamps already in the past map to the current instant.
    pub fn instant_at(&self, at: Timestamp) -> Instant {
        let now = Instant::now();
        match (at - self.origin_wall).to_std() {
            Ok(offset) => (self.origin + offset).max(now),
            Err(_) => now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_now_follows_paused_clock() {
        let origin = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = Clock::anchored_at(origin);

        assert_eq!(clock.now(), origin);
        tokio::time::advance(Duration::from_millis(1500)).await;
        assert_eq!(clock.now(), origin + chrono::Duration::milliseconds(1500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_now_saturates_instead_of_leaving_anchor() {
        let clock = Clock::anchored_at(DateTime::<Utc>::MAX_UTC - chrono::Duration::seconds(1));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(clock.now(), DateTime::<Utc>::MAX_UTC);
    }

    #[tokio::test(start_paused = true)]
    async fn test_instant_at_future_and_past() {
        let origin = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let clock = Clock::anchored_at(origin);
        let start = Instant::now();

        assert_eq!(
            clock.instant_at(origin + chrono::Duration::seconds(2)),
            start + Duration::from_secs(2)
        );
        assert_eq!(clock.instant_at(origin - chrono::Duration::seconds(5)), start);
    }
}
