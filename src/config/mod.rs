/// Monitor configuration loaded from defaults, TOML, and CLI overrides
pub mod monitor_config;

pub use monitor_config::MonitorConfig;
