/// High traffic alerting and report delivery
pub mod alarm;
pub mod sink;
pub mod traffic_alert;

pub use alarm::Alarm;
#[cfg(test)]
pub use sink::MockSink;
pub use sink::{ConsoleSink, Sink};
pub use traffic_alert::{AlertTransition, TrafficAlert};
