//! Engine configuration
//!
//! JSON file, every field optional:
//!
//! ```json
//! { "notablescan": false, "journal_path": "data/strata.journal",
//!   "journal_sync": true, "log_level": "off" }
//! ```
//!
//! All configuration errors are fatal.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::observability::{log_event_with_fields, Event, Severity};

/// Config error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorCode {
    /// File could not be read
    StrataConfigIo,
    /// Not valid JSON for the schema
    StrataConfigParse,
    /// Parsed but rejected by validation
    StrataConfigInvalid,
}

impl ConfigErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            Self::StrataConfigIo => "STRATA_CONFIG_IO",
            Self::StrataConfigParse => "STRATA_CONFIG_PARSE",
            Self::StrataConfigInvalid => "STRATA_CONFIG_INVALID",
        }
    }
}

/// Configuration error
#[derive(Debug, Clone)]
pub struct ConfigError {
    code: ConfigErrorCode,
    message: String,
}

impl ConfigError {
    fn new(code: ConfigErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn io(path: &Path, reason: impl fmt::Display) -> Self {
        Self::new(
            ConfigErrorCode::StrataConfigIo,
            format!("Failed to read config '{}': {}", path.display(), reason),
        )
    }

    pub fn parse(reason: impl fmt::Display) -> Self {
        Self::new(
            ConfigErrorCode::StrataConfigParse,
            format!("Invalid config JSON: {}", reason),
        )
    }

    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::new(ConfigErrorCode::StrataConfigInvalid, reason)
    }

    pub fn code(&self) -> ConfigErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Always true
    pub fn is_fatal(&self) -> bool {
        true
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[FATAL] {}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for ConfigError {}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Engine-wide settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Default for statements that do not set `notablescan` themselves
    #[serde(default)]
    pub notablescan: bool,

    /// Mutation journal file; no journal when absent
    #[serde(default)]
    pub journal_path: Option<PathBuf>,

    /// fsync after every journal append
    #[serde(default = "default_journal_sync")]
    pub journal_sync: bool,

    /// One of off, trace, info, warn, error, fatal
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_journal_sync() -> bool {
    true
}

fn default_log_level() -> String {
    "off".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            notablescan: false,
            journal_path: None,
            journal_sync: default_journal_sync(),
            log_level: default_log_level(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        let config = Self::from_json(&content)?;
        log_event_with_fields(
            Event::ConfigLoaded,
            &[("path", &path.display().to_string())],
        );
        Ok(config)
    }

    /// Parse and validate configuration text
    pub fn from_json(content: &str) -> ConfigResult<Self> {
        let config: EngineConfig = serde_json::from_str(content).map_err(ConfigError::parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.log_severity()?;

        if let Some(path) = &self.journal_path {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::invalid("journal_path must not be empty"));
            }
            if path.is_dir() {
                return Err(ConfigError::invalid(format!(
                    "journal_path '{}' is a directory",
                    path.display()
                )));
            }
        }
        Ok(())
    }

    /// Logger threshold; `None` means logging is off
    pub fn log_severity(&self) -> ConfigResult<Option<Severity>> {
        Severity::parse_level(&self.log_level).map_err(ConfigError::invalid)
    }

    pub fn with_notablescan(mut self, notablescan: bool) -> Self {
        self.notablescan = notablescan;
        self
    }

    pub fn with_journal(mut self, path: impl Into<PathBuf>) -> Self {
        self.journal_path = Some(path.into());
        self
    }

    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_defaults() {
        let config = EngineConfig::from_json("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert!(!config.notablescan);
        assert!(config.journal_sync);
        assert_eq!(config.log_severity().unwrap(), None);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"{{"notablescan": true, "journal_path": "strata.journal", "log_level": "warn"}}"#
        )
        .unwrap();

        let config = EngineConfig::load(file.path()).unwrap();
        assert!(config.notablescan);
        assert_eq!(config.journal_path, Some(PathBuf::from("strata.journal")));
        assert_eq!(config.log_severity().unwrap(), Some(Severity::Warn));
    }

    #[test]
    fn test_missing_file() {
        let err = EngineConfig::load(Path::new("/nonexistent/strata.json")).unwrap_err();
        assert_eq!(err.code(), ConfigErrorCode::StrataConfigIo);
        assert!(err.is_fatal());
    }

    #[test]
    fn test_invalid_json_and_unknown_fields() {
        let err = EngineConfig::from_json("{not json").unwrap_err();
        assert_eq!(err.code(), ConfigErrorCode::StrataConfigParse);

        let err = EngineConfig::from_json(r#"{"data_dir": "/tmp"}"#).unwrap_err();
        assert_eq!(err.code(), ConfigErrorCode::StrataConfigParse);
    }

    #[test]
    fn test_validation() {
        let err = EngineConfig::from_json(r#"{"log_level": "loud"}"#).unwrap_err();
        assert_eq!(err.code(), ConfigErrorCode::StrataConfigInvalid);
        assert!(err.to_string().starts_with("[FATAL] STRATA_CONFIG_INVALID"));

        let dir = TempDir::new().unwrap();
        let config = EngineConfig::default().with_journal(dir.path());
        assert!(config.validate().is_err());
    }
}
