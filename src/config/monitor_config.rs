use crate::error::ConfigError;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Longest accepted report interval or alert window
const MAX_WINDOW_SECS: u64 = 365 * 24 * 60 * 60;

/// Runtime configuration for the log monitor
///
/// Every field has a default, so a TOML file only needs to list the values it
/// overrides:
///
/// ```toml
/// log_file = "/var/log/access.log"
/// alert_threshold = 20
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MonitorConfig {
    /// Access log to tail
    pub log_file: PathBuf,
    /// Capacity of the queue between the tailer and the stats engine
    pub buffer_size: usize,
    /// Length of one busiest-section reporting interval
    pub report_interval_secs: u64,
    /// Width of the sliding window the alert averages over
    pub alert_window_secs: u64,
    /// Average hits per second that count as high traffic
    pub alert_threshold: u64,
    /// How often the tailer re-reads the file without a change notification
    pub poll_interval_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            log_file: PathBuf::from("/tmp/access.log"),
            buffer_size: 256,
            report_interval_secs: 10,
            alert_window_secs: 120,
            alert_threshold: 10,
            poll_interval_ms: 500,
        }
    }
}

impl MonitorConfig {
    /// Load configuration from a TOML file, falling back to defaults for
    /// missing keys
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if the file cannot be read and
    /// `ConfigError::TomlError` if it is not valid TOML for this struct.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        let config: MonitorConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Check that every value is usable by the tailer and the stats engine
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_size == 0 {
            return Err(ConfigError::ValidationError(
                "buffer_size must be greater than 0".to_string(),
            ));
        }
        for (name, value) in [
            ("report_interval_secs", self.report_interval_secs),
            ("alert_window_secs", self.alert_window_secs),
        ] {
            if value == 0 || value > MAX_WINDOW_SECS {
                return Err(ConfigError::ValidationError(format!(
                    "{} must be between 1 and {}, got {}",
                    name, MAX_WINDOW_SECS, value
                )));
            }
        }
        if self.alert_threshold == 0 {
            return Err(ConfigError::ValidationError(
                "alert_threshold must be greater than 0".to_string(),
            ));
        }
        if self.alert_max().is_none() {
            return Err(ConfigError::ValidationError(format!(
                "alert_threshold {} over {}s overflows the hit counter",
                self.alert_threshold, self.alert_window_secs
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "poll_interval_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }

    pub fn alert_window(&self) -> Duration {
        Duration::from_secs(self.alert_window_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Absolute hit count over the alert window that raises the alert
    ///
    /// `None` when the product does not fit in a `usize`.
    pub fn alert_max(&self) -> Option<usize> {
        self.alert_threshold
            .checked_mul(self.alert_window_secs)
            .and_then(|max| usize::try_from(max).ok())
    }
}

impl fmt::Display for MonitorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "LogFile: {}", self.log_file.display())?;
        writeln!(f, "BufferSize: {}", self.buffer_size)?;
        writeln!(f, "ReportInterval: {}s", self.report_interval_secs)?;
        writeln!(f, "AlertWindow: {}s", self.alert_window_secs)?;
        writeln!(f, "AlertThreshold: {}/second", self.alert_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_are_valid() {
        let config = MonitorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.alert_max(), Some(1200));
        assert_eq!(config.report_interval(), Duration::from_secs(10));
        assert_eq!(config.alert_window(), Duration::from_secs(120));
    }

    #[test]
    fn test_from_file_partial_override() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "log_file = \"/var/log/nginx/access.log\"").unwrap();
        writeln!(file, "alert_threshold = 2").unwrap();
        writeln!(file, "alert_window_secs = 2").unwrap();

        let config = MonitorConfig::from_file(file.path()).unwrap();
        assert_eq!(config.log_file, PathBuf::from("/var/log/nginx/access.log"));
        assert_eq!(config.alert_max(), Some(4));
        assert_eq!(config.buffer_size, 256);
        assert_eq!(config.report_interval_secs, 10);
    }

    #[test]
    fn test_from_file_rejects_unknown_keys() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "alert_treshold = 2").unwrap();

        assert!(matches!(
            MonitorConfig::from_file(file.path()),
            Err(ConfigError::TomlError(_))
        ));
    }

    #[test]
    fn test_from_file_missing() {
        assert!(matches!(
            MonitorConfig::from_file(Path::new("/nonexistent/logmonitor.toml")),
            Err(ConfigError::ReadError(_))
        ));
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let cases: [fn(&mut MonitorConfig); 5] = [
            |c| c.buffer_size = 0,
            |c| c.report_interval_secs = 0,
            |c| c.alert_window_secs = 0,
            |c| c.alert_threshold = 0,
            |c| c.poll_interval_ms = 0,
        ];
        for mutate in cases {
            let mut config = MonitorConfig::default();
            mutate(&mut config);
            assert!(matches!(
                config.validate(),
                Err(ConfigError::ValidationError(_))
            ));
        }
    }

    #[test]
    fn test_validate_rejects_oversized_window() {
        let config = MonitorConfig {
            alert_window_secs: MAX_WINDOW_SECS + 1,
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_overflowing_threshold() {
        let config = MonitorConfig {
            alert_threshold: u64::MAX,
            ..MonitorConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_display_banner() {
        let banner = MonitorConfig::default().to_string();
        assert!(banner.contains("LogFile: /tmp/access.log"));
        assert!(banner.contains("AlertThreshold: 10/second"));
    }
}
