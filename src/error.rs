use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while decoding an access log line
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("Expected at least {expected} fields, got {actual}: {line}")]
    TooFewFields {
        expected: usize,
        actual: usize,
        line: String,
    },

    #[error("Invalid timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("Malformed request field '{0}'")]
    MalformedRequest(String),

    #[error("Invalid status code '{0}'")]
    InvalidStatus(String),
}

/// Errors that can occur in the log file collector
#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("Failed to open log file {path}: {source}")]
    FileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to watch log file: {0}")]
    Watch(#[from] notify::Error),

    #[error("Reader thread terminated unexpectedly: {0}")]
    ThreadPanicked(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

/// Errors that can stop the monitor from starting or shutting down cleanly
#[derive(Error, Debug)]
pub enum MonitorError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Collector(#[from] CollectorError),

    #[error("Stats reporter task failed: {0}")]
    ReporterJoin(#[from] tokio::task::JoinError),
}
