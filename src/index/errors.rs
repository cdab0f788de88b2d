//! Index error types
//!
//! Error codes:
//! - STRATA_INDEX_INVALID_KEY (FATAL)
//! - STRATA_INDEX_KEY_EVALUATION (FATAL)

use std::fmt;

use crate::expr::ExprError;

/// Severity levels for index errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The row cannot be indexed; the indexed expression is broken for it
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Index-specific error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexErrorCode {
    /// Every key component evaluated to null
    StrataIndexInvalidKey,
    /// An indexed expression failed to evaluate
    StrataIndexKeyEvaluation,
}

impl IndexErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            IndexErrorCode::StrataIndexInvalidKey => "STRATA_INDEX_INVALID_KEY",
            IndexErrorCode::StrataIndexKeyEvaluation => "STRATA_INDEX_KEY_EVALUATION",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        Severity::Fatal // All index errors are FATAL
    }
}

impl fmt::Display for IndexErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Index error type with full context
#[derive(Debug, Clone, PartialEq)]
pub struct IndexError {
    /// Error code
    code: IndexErrorCode,
    /// Human-readable message
    message: String,
    /// Index name
    index: String,
}

impl IndexError {
    /// Create an invalid key error
    pub fn invalid_key(index: impl Into<String>) -> Self {
        let index = index.into();
        Self {
            code: IndexErrorCode::StrataIndexInvalidKey,
            message: format!("Every key component of index '{}' evaluated to null", index),
            index,
        }
    }

    /// Create a key evaluation error
    pub fn key_evaluation(index: impl Into<String>, source: &ExprError) -> Self {
        let index = index.into();
        Self {
            code: IndexErrorCode::StrataIndexKeyEvaluation,
            message: format!("Failed to evaluate key of index '{}': {}", index, source),
            index,
        }
    }

    /// Returns the error code
    pub fn code(&self) -> IndexErrorCode {
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

    /// Returns the index name
    pub fn index(&self) -> &str {
        &self.index
    }

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        true // All index errors are FATAL
    }
}

impl fmt::Display for IndexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for IndexError {}

/// Result type for index operations
pub type IndexResult<T> = Result<T, IndexError>;
