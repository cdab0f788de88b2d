//! # Strata Errors
//!
//! Crate-level error wrapping every subsystem error.

use thiserror::Error;

use crate::config::ConfigError;
use crate::executor::ExecutorError;
use crate::expr::ExprError;
use crate::index::IndexError;
use crate::journal::JournalError;
use crate::planner::PlannerError;
use crate::storage::StorageError;

/// Result type for engine operations
pub type StrataResult<T> = Result<T, StrataError>;

/// Any failure surfaced by the engine facade
///
/// Display is the subsystem's `[SEVERITY] CODE: message` line.
#[derive(Debug, Error)]
pub enum StrataError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Journal(#[from] JournalError),

    #[error("{0}")]
    Storage(#[from] StorageError),

    #[error("{0}")]
    Index(#[from] IndexError),

    #[error("{0}")]
    Expr(#[from] ExprError),

    #[error("{0}")]
    Planner(#[from] PlannerError),

    #[error("{0}")]
    Executor(#[from] ExecutorError),
}

impl StrataError {
    /// Stable `STRATA_*` code of the underlying error
    pub fn code(&self) -> &'static str {
        match self {
            StrataError::Config(e) => e.code().code(),
            StrataError::Journal(e) => e.code().code(),
            StrataError::Storage(e) => e.code().code(),
            StrataError::Index(e) => e.code().code(),
            StrataError::Expr(e) => e.code().code(),
            StrataError::Planner(e) => e.code().code(),
            StrataError::Executor(e) => e.code().code(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        match self {
            StrataError::Config(e) => e.is_fatal(),
            StrataError::Journal(e) => e.is_fatal(),
            StrataError::Storage(e) => e.is_fatal(),
            StrataError::Index(e) => e.is_fatal(),
            StrataError::Expr(e) => e.is_fatal(),
            StrataError::Planner(e) => e.is_fatal(),
            StrataError::Executor(e) => e.is_fatal(),
        }
    }
}
