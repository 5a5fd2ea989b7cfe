use std::future::pending;
use std::pin::Pin;
use tokio::time::{sleep_until, Instant, Sleep};

/// One-shot alarm that can be re-armed and disarmed from a select loop
///
/// The pending deadline lives inside the alarm rather than inside the
/// `select!` branch, so dropping a `fired()` future that lost the race keeps
/// the deadline armed. Disarming drops the underlying timer outright: once
/// `disarm` returns, no wake from the old deadline can be observed.
#[derive(Debug, Default)]
pub struct Alarm {
    sleep: Option<Pin<Box<Sleep>>>,
}

impl Alarm {
    /// Create a disarmed alarm
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the alarm for `deadline`, replacing any pending deadline
    pub fn arm(&mut self, deadline: Instant) {
        match self.sleep.as_mut() {
            Some(sleep) => sleep.as_mut().reset(deadline),
            None => self.sleep = Some(Box::pin(sleep_until(deadline))),
        }
    }

    /// Cancel the pending deadline; a no-op when nothing is armed
    pub fn disarm(&mut self) {
        self.sleep = None;
    }

    pub fn is_armed(&self) -> bool {
        self.sleep.is_some()
    }

    /// Deadline currently armed, if any
    pub fn deadline(&self) -> Option<Instant> {
        self.sleep.as_ref().map(|sleep| sleep.deadline())
    }

    /// Wait for the armed deadline, then disarm
    ///
    /// Never completes while the alarm is disarmed. Cancel safe.
    pub async fn fired(&mut self) {
        match self.sleep.as_mut() {
            Some(sleep) => {
                sleep.as_mut().await;
                self.sleep = None;
            }
            None => pending::<()>().await,
        }
    }
}
