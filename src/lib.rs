/// Error types for the log monitor
pub mod error;

/// Access log records and section extraction
pub mod events;

/// Log file tailer feeding the stats engine
pub mod collectors;

/// Sliding window, busiest-section tracking and the stats engine
pub mod aggregator;

/// High traffic alert and report sinks
pub mod alerts;

/// Configuration management
pub mod config;

/// Wiring of the tailer, queue and stats engine
pub mod monitor;

// Re-export commonly used types
pub use error::{CollectorError, ConfigError, MonitorError, ParseError};
pub use events::{LogEvent, SectionCount, Timestamp};
pub use monitor::LogMonitor;
