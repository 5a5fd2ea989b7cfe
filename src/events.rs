//! Core event types for the access log monitor
//!
//! This module defines the decoded access log entry that flows from the file
//! tailer into the stats engine, and the per-section hit count the engine
//! hands to its sink.

use crate::error::ParseError;
use chrono::{DateTime, Utc};
use std::fmt;

/// Timestamp type for consistent time handling across the application
pub type Timestamp = DateTime<Utc>;

/// Layout of the bracketed time field once the two halves are rejoined
const TIME_LAYOUT: &str = "%d/%b/%Y:%H:%M:%S %z";

/// Minimum number of whitespace-separated fields in a Common Log Format line
const MIN_FIELDS: usize = 10;

/// One decoded line of an HTTP access log
///
/// Only `timestamp` and `section` are interpreted by the stats engine; the
/// remaining fields are carried through for display and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEvent {
    /// When the request was served, normalised to UTC
    pub timestamp: Timestamp,
    /// Client address
    pub remote_addr: String,
    /// Authenticated user, `-` when absent
    pub user: String,
    /// HTTP method
    pub method: String,
    /// Full request path as logged
    pub path: String,
    /// HTTP protocol version
    pub protocol: String,
    /// Response status code
    pub status: u16,
    /// Response size in bytes, 0 when logged as `-`
    pub bytes: u64,
    /// First path segment, e.g. `/api` for `/api/user`
    pub section: String,
}

impl LogEvent {
    /// Build an event carrying only the fields the stats engine reads
    pub fn new(section: impl Into<String>, timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            remote_addr: String::new(),
            user: "-".to_string(),
            method: "GET".to_string(),
            path: String::new(),
            protocol: "HTTP/1.1".to_string(),
            status: 200,
            bytes: 0,
            section: section.into(),
        }
    }

    /// Decode one Common Log Format line
    ///
    /// Expected shape:
    /// `127.0.0.1 - james [09/May/2018:16:00:39 +0000] "GET /report HTTP/1.0" 200 123`
    ///
    /// # Errors
    ///
    /// Returns a `ParseError` when the line has too few fields or when the
    /// time, request, or status fields are malformed.
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < MIN_FIELDS {
            return Err(ParseError::TooFewFields {
                expected: MIN_FIELDS,
                actual: fields.len(),
                line: line.to_string(),
            });
        }

        let date = fields[3]
            .strip_prefix('[')
            .ok_or_else(|| ParseError::InvalidTimestamp(fields[3].to_string()))?;
        let zone = fields[4]
            .strip_suffix(']')
            .ok_or_else(|| ParseError::InvalidTimestamp(fields[4].to_string()))?;
        let time_str = format!("{} {}", date, zone);
        let timestamp = DateTime::parse_from_str(&time_str, TIME_LAYOUT)
            .map_err(|_| ParseError::InvalidTimestamp(time_str.clone()))?
            .with_timezone(&Utc);

        let method = fields[5]
            .strip_prefix('"')
            .filter(|m| !m.is_empty())
            .ok_or_else(|| ParseError::MalformedRequest(fields[5].to_string()))?;
        let path = fields[6];
        let protocol = fields[7]
            .strip_suffix('"')
            .ok_or_else(|| ParseError::MalformedRequest(fields[7].to_string()))?;

        let status = fields[8]
            .parse::<u16>()
            .map_err(|_| ParseError::InvalidStatus(fields[8].to_string()))?;
        let bytes = fields[9].parse::<u64>().unwrap_or(0);

        Ok(Self {
            timestamp,
            remote_addr: fields[0].to_string(),
            user: fields[2].to_string(),
            method: method.to_string(),
            path: path.to_string(),
            protocol: protocol.to_string(),
            status,
            bytes,
            section: section_of(path).to_string(),
        })
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}, {}, {}, {}",
            self.section, self.timestamp, self.method, self.path, self.status
        )
    }
}

/// Extract the section of a request path
///
/// The section is everything up to, but excluding, the second `/`. Query
/// strings and fragments never belong to the section.
pub fn section_of(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or(path);
    match path.char_indices().skip(1).find(|&(_, c)| c == '/') {
        Some((idx, _)) if idx > 1 => &path[..idx],
        _ => path,
    }
}

/// Hit count for one section within the open reporting interval
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionCount {
    /// Section name, e.g. `/api`
    pub name: String,
    /// Hits since the interval started
    pub count: u64,
}

impl SectionCount {
    pub fn new(name: impl Into<String>, count: u64) -> Self {
        Self {
            name: name.into(),
            count,
        }
    }
}

impl fmt::Display for SectionCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.count)
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use quickcheck::{Arbitrary, Gen};
    use quickcheck_macros::quickcheck;

    /// A request path built from simple alphanumeric segments
    #[derive(Debug, Clone)]
    struct RequestPath(Vec<String>);

    impl Arbitrary for RequestPath {
        fn arbitrary(g: &mut Gen) -> Self {
            let depth = usize::arbitrary(g) % 4 + 1;
            let alphabet: Vec<char> = "abcdefghijklmnopqrstuvwxyz0123456789".chars().collect();
            let segments = (0..depth)
                .map(|_| {
                    let len = usize::arbitrary(g) % 8 + 1;
                    (0..len)
                        .map(|_| *g.choose(&alphabet).unwrap_or(&'a'))
                        .collect()
                })
                .collect();
            RequestPath(segments)
        }
    }

    // Any path decodes to its first segment as the section
    #[quickcheck]
    fn prop_section_is_first_segment(path: RequestPath) -> bool {
        let full = format!("/{}", path.0.join("/"));
        let line = format!(
            r#"192.168.0.1 - - [09/May/2018:16:00:39 +0000] "GET {} HTTP/1.1" 200 10"#,
            full
        );
        match LogEvent::parse(&line) {
            Ok(event) => event.section == format!("/{}", path.0[0]) && event.path == full,
            Err(_) => false,
        }
    }

    // Arbitrary text never panics the decoder
    #[quickcheck]
    fn prop_parse_never_panics(line: String) -> bool {
        let _ = LogEvent::parse(&line);
        true
    }
}
