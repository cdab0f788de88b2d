//! Line-oriented JSON logger
//!
//! Each event becomes one JSON object on one line: `event` first, then
//! `severity`, then the caller's fields sorted by key. Nothing is written
//! until a threshold is set with [`Logger::set_level`].

use std::collections::BTreeMap;
use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicU8, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Trace = 0,
    Info = 1,
    Warn = 2,
    Error = 3,
    Fatal = 4,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Fatal => "FATAL",
        }
    }

    /// Parses a level name; `"off"` yields `Ok(None)`
    pub fn parse_level(name: &str) -> Result<Option<Severity>, String> {
        match name.to_ascii_lowercase().as_str() {
            "off" => Ok(None),
            "trace" => Ok(Some(Severity::Trace)),
            "info" => Ok(Some(Severity::Info)),
            "warn" => Ok(Some(Severity::Warn)),
            "error" => Ok(Some(Severity::Error)),
            "fatal" => Ok(Some(Severity::Fatal)),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const LEVEL_OFF: u8 = u8::MAX;

static THRESHOLD: AtomicU8 = AtomicU8::new(LEVEL_OFF);

/// Process-wide structured logger
pub struct Logger;

impl Logger {
    /// Sets the minimum severity written, or `None` to disable logging
    pub fn set_level(level: Option<Severity>) {
        THRESHOLD.store(level.map_or(LEVEL_OFF, |s| s as u8), Ordering::Relaxed);
    }

    pub fn enabled(severity: Severity) -> bool {
        let threshold = THRESHOLD.load(Ordering::Relaxed);
        threshold != LEVEL_OFF && severity as u8 >= threshold
    }

    /// Writes one event; errors and fatals go to stderr
    pub fn log(severity: Severity, event: &str, fields: &[(&str, &str)]) {
        if !Self::enabled(severity) {
            return;
        }
        let line = render(severity, event, fields);
        // a failed log write never fails the operation being logged
        let _ = if severity >= Severity::Error {
            io::stderr().lock().write_all(line.as_bytes())
        } else {
            io::stdout().lock().write_all(line.as_bytes())
        };
    }
}

/// Renders one newline-terminated log line
pub(crate) fn render(severity: Severity, event: &str, fields: &[(&str, &str)]) -> String {
    let sorted: BTreeMap<&str, &str> = fields.iter().copied().collect();

    let mut line = String::with_capacity(128);
    line.push_str("{\"event\":");
    line.push_str(&quote(event));
    line.push_str(",\"severity\":\"");
    line.push_str(severity.as_str());
    line.push('"');
    for (key, value) in sorted {
        line.push(',');
        line.push_str(&quote(key));
        line.push(':');
        line.push_str(&quote(value));
    }
    line.push_str("}\n");
    line
}

fn quote(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Trace < Severity::Info);
        assert!(Severity::Warn < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(Severity::parse_level("off"), Ok(None));
        assert_eq!(Severity::parse_level("WARN"), Ok(Some(Severity::Warn)));
        assert!(Severity::parse_level("verbose").is_err());
    }

    #[test]
    fn test_render_is_one_json_line() {
        let line = render(
            Severity::Info,
            "QUERY_EXECUTED",
            &[("rows", "3"), ("plan", "Limit")],
        );
        assert!(line.ends_with('\n'));
        assert_eq!(line.matches('\n').count(), 1);

        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["event"], "QUERY_EXECUTED");
        assert_eq!(parsed["severity"], "INFO");
        assert_eq!(parsed["rows"], "3");
    }

    #[test]
    fn test_render_orders_fields() {
        let a = render(Severity::Trace, "E", &[("zebra", "1"), ("apple", "2")]);
        let b = render(Severity::Trace, "E", &[("apple", "2"), ("zebra", "1")]);
        assert_eq!(a, b);
        assert!(a.find("\"event\"").unwrap() < a.find("\"severity\"").unwrap());
        assert!(a.find("apple").unwrap() < a.find("zebra").unwrap());
    }

    #[test]
    fn test_render_escapes_values() {
        let line = render(Severity::Warn, "E", &[("sargs", "{eq: ['O\"Neil']}\n")]);
        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed["sargs"], "{eq: ['O\"Neil']}\n");
    }

    #[test]
    fn test_silent_when_off() {
        Logger::set_level(None);
        assert!(!Logger::enabled(Severity::Fatal));
    }
}
