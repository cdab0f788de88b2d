//! Planner error types
//!
//! Error codes:
//! - STRATA_PLANNER_QUERY_INVALID (REJECT)
//! - STRATA_PLANNER_TABLE_SCAN_FORBIDDEN (REJECT)
//! - STRATA_PLANNER_UNKNOWN_TABLE (FATAL)

use std::fmt;

/// Severity levels for planner errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Client request rejected
    Reject,
    /// Programmer or configuration error; not retried
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Planner error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerErrorCode {
    /// Malformed query structure
    StrataPlannerQueryInvalid,
    /// No index applies and table scans are forbidden
    StrataPlannerTableScanForbidden,
    /// Query names an undeclared table
    StrataPlannerUnknownTable,
}

impl PlannerErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            PlannerErrorCode::StrataPlannerQueryInvalid => "STRATA_PLANNER_QUERY_INVALID",
            PlannerErrorCode::StrataPlannerTableScanForbidden => {
                "STRATA_PLANNER_TABLE_SCAN_FORBIDDEN"
            }
            PlannerErrorCode::StrataPlannerUnknownTable => "STRATA_PLANNER_UNKNOWN_TABLE",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            PlannerErrorCode::StrataPlannerUnknownTable => Severity::Fatal,
            _ => Severity::Reject,
        }
    }
}

impl fmt::Display for PlannerErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Planner error type with full context
#[derive(Debug, Clone)]
pub struct PlannerError {
    /// Error code
    code: PlannerErrorCode,
    /// Human-readable message
    message: String,
    /// Table name if applicable
    table: Option<String>,
}

impl PlannerError {
    /// Create a query invalid error
    pub fn query_invalid(reason: impl Into<String>) -> Self {
        Self {
            code: PlannerErrorCode::StrataPlannerQueryInvalid,
            message: reason.into(),
            table: None,
        }
    }

    /// Create a table scan forbidden error
    pub fn table_scan_forbidden(table: impl Into<String>) -> Self {
        let t = table.into();
        Self {
            code: PlannerErrorCode::StrataPlannerTableScanForbidden,
            message: format!("Query on '{}' resulted in a table scan", t),
            table: Some(t),
        }
    }

    /// Create an unknown table error
    pub fn unknown_table(table: impl Into<String>) -> Self {
        let t = table.into();
        Self {
            code: PlannerErrorCode::StrataPlannerUnknownTable,
            message: format!("Unknown table '{}'", t),
            table: Some(t),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> PlannerErrorCode {
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

    /// Returns the table name if applicable
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        self.code.severity() == Severity::Fatal
    }
}

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for PlannerError {}

/// Result type for planner operations
pub type PlannerResult<T> = Result<T, PlannerError>;
