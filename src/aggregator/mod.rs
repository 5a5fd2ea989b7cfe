/// Per-interval statistics and the stats engine that drives them
pub mod busiest;
pub mod clock;
pub mod sliding_window;
pub mod stats_reporter;

pub use busiest::BusiestSections;
pub use clock::Clock;
pub use sliding_window::SlidingWindow;
pub use stats_reporter::{ReporterSummary, StatsReporter};
