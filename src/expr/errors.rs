//! Expression error types
//!
//! Error codes:
//! - STRATA_EXPR_UNKNOWN_FUNCTION (REJECT)
//! - STRATA_EXPR_INVALID_ARGUMENT (ERROR)
//! - STRATA_EXPR_AGGREGATE_CONTEXT (ERROR)

use std::fmt;

/// Severity levels for expression errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Expression rejected while being built
    Reject,
    /// Evaluation failed for the current tuple
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Expression error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprErrorCode {
    /// Function name is not a known scalar or aggregate function
    StrataExprUnknownFunction,
    /// Function called with the wrong arity or argument type
    StrataExprInvalidArgument,
    /// Aggregate evaluated outside an aggregation node
    StrataExprAggregateContext,
}

impl ExprErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            ExprErrorCode::StrataExprUnknownFunction => "STRATA_EXPR_UNKNOWN_FUNCTION",
            ExprErrorCode::StrataExprInvalidArgument => "STRATA_EXPR_INVALID_ARGUMENT",
            ExprErrorCode::StrataExprAggregateContext => "STRATA_EXPR_AGGREGATE_CONTEXT",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            ExprErrorCode::StrataExprUnknownFunction => Severity::Reject,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for ExprErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Expression error with context
#[derive(Debug, Clone, PartialEq)]
pub struct ExprError {
    code: ExprErrorCode,
    message: String,
}

impl ExprError {
    /// Create an unknown function error
    pub fn unknown_function(name: impl Into<String>) -> Self {
        Self {
            code: ExprErrorCode::StrataExprUnknownFunction,
            message: format!("Unknown function '{}'", name.into()),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self {
            code: ExprErrorCode::StrataExprInvalidArgument,
            message: reason.into(),
        }
    }

    /// Create an aggregate context error
    pub fn aggregate_context(expr: impl Into<String>) -> Self {
        Self {
            code: ExprErrorCode::StrataExprAggregateContext,
            message: format!("Aggregate '{}' cannot be evaluated per tuple", expr.into()),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> ExprErrorCode {
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

    /// Expression errors never corrupt state
    pub fn is_fatal(&self) -> bool {
        false
    }
}

impl fmt::Display for ExprError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for ExprError {}

/// Result type for expression evaluation
pub type ExprResult<T> = Result<T, ExprError>;
