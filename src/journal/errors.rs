//! Journal error types
//!
//! Error codes:
//! - STRATA_JOURNAL_IO (ERROR)
//! - STRATA_JOURNAL_SERIALIZATION (ERROR)
//! - STRATA_JOURNAL_CORRUPTION (FATAL)

use std::fmt;
use std::io;

/// Severity levels for journal errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Operation failed, journal contents are intact
    Error,
    /// Journal contents cannot be trusted
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Journal error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalErrorCode {
    /// Reading or writing the journal file failed
    StrataJournalIo,
    /// A record could not be encoded
    StrataJournalSerialization,
    /// Checksum, sequence or framing mismatch
    StrataJournalCorruption,
}

impl JournalErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            JournalErrorCode::StrataJournalIo => "STRATA_JOURNAL_IO",
            JournalErrorCode::StrataJournalSerialization => "STRATA_JOURNAL_SERIALIZATION",
            JournalErrorCode::StrataJournalCorruption => "STRATA_JOURNAL_CORRUPTION",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            JournalErrorCode::StrataJournalCorruption => Severity::Fatal,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for JournalErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Journal error with context
#[derive(Debug)]
pub struct JournalError {
    code: JournalErrorCode,
    message: String,
    line: Option<usize>,
    source: Option<io::Error>,
}

impl JournalError {
    /// Create an I/O error
    pub fn io(message: impl Into<String>, source: io::Error) -> Self {
        Self {
            code: JournalErrorCode::StrataJournalIo,
            message: message.into(),
            line: None,
            source: Some(source),
        }
    }

    /// Create an error for a poisoned writer lock
    pub fn lock_poisoned() -> Self {
        Self {
            code: JournalErrorCode::StrataJournalIo,
            message: "journal writer lock poisoned".into(),
            line: None,
            source: None,
        }
    }

    /// Create a serialization error
    pub fn serialization(reason: impl Into<String>) -> Self {
        Self {
            code: JournalErrorCode::StrataJournalSerialization,
            message: reason.into(),
            line: None,
            source: None,
        }
    }

    /// Create a corruption error at a 1-based line number
    pub fn corruption(line: usize, reason: impl Into<String>) -> Self {
        Self {
            code: JournalErrorCode::StrataJournalCorruption,
            message: format!("Corruption at line {}: {}", line, reason.into()),
            line: Some(line),
            source: None,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> JournalErrorCode {
        self.code
    }

    /// Returns the severity level
    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    /// Returns the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the offending line, if any
    pub fn line(&self) -> Option<usize> {
        self.line
    }

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        self.code.severity() == Severity::Fatal
    }
}

impl fmt::Display for JournalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)?;
        if let Some(ref source) = self.source {
            write!(f, " (caused by: {})", source)?;
        }
        Ok(())
    }
}

impl std::error::Error for JournalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e as &(dyn std::error::Error + 'static))
    }
}

/// Result type for journal operations
pub type JournalResult<T> = Result<T, JournalError>;
