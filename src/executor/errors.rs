//! Executor error types
//!
//! Error codes:
//! - STRATA_EXECUTOR_TABLE_SCAN_FORBIDDEN (REJECT)
//! - STRATA_EXECUTOR_UNKNOWN_TABLE (FATAL)
//! - STRATA_EXECUTOR_UNKNOWN_INDEX (FATAL)
//! - STRATA_EXECUTOR_INVALID_INDEX_KEY (FATAL)
//! - STRATA_EXECUTOR_AGGREGATE_EVALUATION (ERROR)
//! - STRATA_EXECUTOR_EXPRESSION (ERROR)
//! - STRATA_EXECUTOR_STORAGE (ERROR)
//! - STRATA_EXECUTOR_MUTATION_CONTEXT (FATAL)

use std::fmt;

use crate::expr::ExprError;
use crate::storage::{StorageError, StorageErrorCode};

/// Severity levels for executor errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Refused before any row was read
    Reject,
    /// Operation failed but system is healthy
    Error,
    /// Programmer or configuration error; not retried
    Fatal,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Error => write!(f, "ERROR"),
            Severity::Fatal => write!(f, "FATAL"),
        }
    }
}

/// Executor error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorErrorCode {
    /// A table scan was pulled while table scans are forbidden
    StrataExecutorTableScanForbidden,
    /// Plan references an undeclared table
    StrataExecutorUnknownTable,
    /// Plan references an undeclared index
    StrataExecutorUnknownIndex,
    /// A mutated tuple produced an all-null index key
    StrataExecutorInvalidIndexKey,
    /// Aggregate input was null or not numeric
    StrataExecutorAggregateEvaluation,
    /// Expression evaluation failed
    StrataExecutorExpression,
    /// Storage refused the operation
    StrataExecutorStorage,
    /// Mutation node pulled through a read-only stream
    StrataExecutorMutationContext,
}

impl ExecutorErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            ExecutorErrorCode::StrataExecutorTableScanForbidden => {
                "STRATA_EXECUTOR_TABLE_SCAN_FORBIDDEN"
            }
            ExecutorErrorCode::StrataExecutorUnknownTable => "STRATA_EXECUTOR_UNKNOWN_TABLE",
            ExecutorErrorCode::StrataExecutorUnknownIndex => "STRATA_EXECUTOR_UNKNOWN_INDEX",
            ExecutorErrorCode::StrataExecutorInvalidIndexKey => "STRATA_EXECUTOR_INVALID_INDEX_KEY",
            ExecutorErrorCode::StrataExecutorAggregateEvaluation => {
                "STRATA_EXECUTOR_AGGREGATE_EVALUATION"
            }
            ExecutorErrorCode::StrataExecutorExpression => "STRATA_EXECUTOR_EXPRESSION",
            ExecutorErrorCode::StrataExecutorStorage => "STRATA_EXECUTOR_STORAGE",
            ExecutorErrorCode::StrataExecutorMutationContext => "STRATA_EXECUTOR_MUTATION_CONTEXT",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            ExecutorErrorCode::StrataExecutorTableScanForbidden => Severity::Reject,
            ExecutorErrorCode::StrataExecutorAggregateEvaluation
            | ExecutorErrorCode::StrataExecutorExpression
            | ExecutorErrorCode::StrataExecutorStorage => Severity::Error,
            _ => Severity::Fatal,
        }
    }
}

impl fmt::Display for ExecutorErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Executor error type with full context
#[derive(Debug)]
pub struct ExecutorError {
    /// Error code
    code: ExecutorErrorCode,
    /// Human-readable message
    message: String,
}

impl ExecutorError {
    fn new(code: ExecutorErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create a table scan forbidden error
    pub fn table_scan_forbidden(table: &str) -> Self {
        Self::new(
            ExecutorErrorCode::StrataExecutorTableScanForbidden,
            format!("Query on '{}' resulted in a table scan", table),
        )
    }

    /// Create an aggregate evaluation error
    pub fn aggregate_evaluation(aggregate: &str, reason: impl Into<String>) -> Self {
        Self::new(
            ExecutorErrorCode::StrataExecutorAggregateEvaluation,
            format!("{}: {}", aggregate, reason.into()),
        )
    }

    /// Create a mutation context error
    pub fn mutation_context(kind: &str) -> Self {
        Self::new(
            ExecutorErrorCode::StrataExecutorMutationContext,
            format!("{} mutates storage and must be executed, not streamed", kind),
        )
    }

    /// Returns the error code
    pub fn code(&self) -> ExecutorErrorCode {
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

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        self.code.severity() == Severity::Fatal
    }
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for ExecutorError {}

impl From<StorageError> for ExecutorError {
    fn from(err: StorageError) -> Self {
        let code = match err.code() {
            StorageErrorCode::StrataStorageUnknownTable => {
                ExecutorErrorCode::StrataExecutorUnknownTable
            }
            StorageErrorCode::StrataStorageUnknownIndex => {
                ExecutorErrorCode::StrataExecutorUnknownIndex
            }
            StorageErrorCode::StrataStorageInvalidIndexKey => {
                ExecutorErrorCode::StrataExecutorInvalidIndexKey
            }
            _ => ExecutorErrorCode::StrataExecutorStorage,
        };
        Self::new(code, err.to_string())
    }
}

impl From<ExprError> for ExecutorError {
    fn from(err: ExprError) -> Self {
        Self::new(ExecutorErrorCode::StrataExecutorExpression, err.to_string())
    }
}

/// Result type for executor operations
pub type ExecutorResult<T> = Result<T, ExecutorError>;
