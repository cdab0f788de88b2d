//! Storage error types
//!
//! Error codes:
//! - STRATA_STORAGE_UNKNOWN_TABLE (FATAL)
//! - STRATA_STORAGE_UNKNOWN_INDEX (FATAL)
//! - STRATA_STORAGE_DUPLICATE (REJECT)
//! - STRATA_STORAGE_ROW_NOT_FOUND (REJECT)
//! - STRATA_STORAGE_INVALID_INDEX_KEY (FATAL)
//! - STRATA_STORAGE_JOURNAL_FAILED (ERROR)
//! - STRATA_STORAGE_REPLAY_MISMATCH (FATAL)

use std::fmt;

use crate::expr::RowId;
use crate::index::IndexError;
use crate::journal::JournalError;

/// Severity levels for storage errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Request rejected, storage unchanged
    Reject,
    /// Operation failed, storage unchanged
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

/// Storage error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorCode {
    /// Table is not declared
    StrataStorageUnknownTable,
    /// Index is not declared
    StrataStorageUnknownIndex,
    /// Table or index name already declared
    StrataStorageDuplicate,
    /// Row id is out of range or tombstoned
    StrataStorageRowNotFound,
    /// A tuple produced an all-null or unevaluable index key
    StrataStorageInvalidIndexKey,
    /// The journal sink refused the mutation record
    StrataStorageJournalFailed,
    /// A replayed record does not fit the current table state
    StrataStorageReplayMismatch,
}

impl StorageErrorCode {
    /// Returns the string code
    pub fn code(&self) -> &'static str {
        match self {
            StorageErrorCode::StrataStorageUnknownTable => "STRATA_STORAGE_UNKNOWN_TABLE",
            StorageErrorCode::StrataStorageUnknownIndex => "STRATA_STORAGE_UNKNOWN_INDEX",
            StorageErrorCode::StrataStorageDuplicate => "STRATA_STORAGE_DUPLICATE",
            StorageErrorCode::StrataStorageRowNotFound => "STRATA_STORAGE_ROW_NOT_FOUND",
            StorageErrorCode::StrataStorageInvalidIndexKey => "STRATA_STORAGE_INVALID_INDEX_KEY",
            StorageErrorCode::StrataStorageJournalFailed => "STRATA_STORAGE_JOURNAL_FAILED",
            StorageErrorCode::StrataStorageReplayMismatch => "STRATA_STORAGE_REPLAY_MISMATCH",
        }
    }

    /// Returns the severity level for this error
    pub fn severity(&self) -> Severity {
        match self {
            StorageErrorCode::StrataStorageDuplicate
            | StorageErrorCode::StrataStorageRowNotFound => Severity::Reject,
            StorageErrorCode::StrataStorageJournalFailed => Severity::Error,
            _ => Severity::Fatal,
        }
    }
}

impl fmt::Display for StorageErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Storage error with context
#[derive(Debug)]
pub struct StorageError {
    code: StorageErrorCode,
    message: String,
    row_id: Option<RowId>,
}

impl StorageError {
    fn new(code: StorageErrorCode, message: String) -> Self {
        Self {
            code,
            message,
            row_id: None,
        }
    }

    /// Create an unknown table error
    pub fn unknown_table(table: &str) -> Self {
        Self::new(
            StorageErrorCode::StrataStorageUnknownTable,
            format!("Unknown table '{}'", table),
        )
    }

    /// Create an unknown index error
    pub fn unknown_index(index: &str) -> Self {
        Self::new(
            StorageErrorCode::StrataStorageUnknownIndex,
            format!("Unknown index '{}'", index),
        )
    }

    /// Create a duplicate declaration error
    pub fn duplicate(kind: &str, name: &str) -> Self {
        Self::new(
            StorageErrorCode::StrataStorageDuplicate,
            format!("{} '{}' already exists", kind, name),
        )
    }

    /// Create a row not found error
    pub fn row_not_found(table: &str, row_id: Option<RowId>) -> Self {
        let message = match row_id {
            Some(id) => format!("Row {} not found in table '{}'", id, table),
            None => format!("Tuple for table '{}' carries no row id", table),
        };
        Self {
            code: StorageErrorCode::StrataStorageRowNotFound,
            message,
            row_id,
        }
    }

    /// Create an invalid index key error
    pub fn invalid_index_key(source: &IndexError) -> Self {
        Self::new(
            StorageErrorCode::StrataStorageInvalidIndexKey,
            source.message().to_string(),
        )
    }

    /// Create a journal failure error
    pub fn journal_failed(source: &JournalError) -> Self {
        Self::new(
            StorageErrorCode::StrataStorageJournalFailed,
            format!("Journal append failed: {}", source),
        )
    }

    /// Create a replay mismatch error
    pub fn replay_mismatch(table: &str, row_id: RowId, reason: impl Into<String>) -> Self {
        Self {
            code: StorageErrorCode::StrataStorageReplayMismatch,
            message: format!(
                "Cannot replay row {} of table '{}': {}",
                row_id,
                table,
                reason.into()
            ),
            row_id: Some(row_id),
        }
    }

    /// Returns the error code
    pub fn code(&self) -> StorageErrorCode {
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

    /// Returns the row id if applicable
    pub fn row_id(&self) -> Option<RowId> {
        self.row_id
    }

    /// Returns whether this is a fatal error
    pub fn is_fatal(&self) -> bool {
        self.code.severity() == Severity::Fatal
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.code.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for StorageError {}

impl From<IndexError> for StorageError {
    fn from(err: IndexError) -> Self {
        StorageError::invalid_index_key(&err)
    }
}

impl From<JournalError> for StorageError {
    fn from(err: JournalError) -> Self {
        StorageError::journal_failed(&err)
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            StorageErrorCode::StrataStorageUnknownTable.code(),
            "STRATA_STORAGE_UNKNOWN_TABLE"
        );
        assert_eq!(
            StorageErrorCode::StrataStorageInvalidIndexKey.code(),
            "STRATA_STORAGE_INVALID_INDEX_KEY"
        );
        assert_eq!(
            StorageErrorCode::StrataStorageReplayMismatch.code(),
            "STRATA_STORAGE_REPLAY_MISMATCH"
        );
    }

    #[test]
    fn test_severity() {
        assert!(StorageError::unknown_table("t").is_fatal());
        assert!(StorageError::unknown_index("i").is_fatal());
        assert!(!StorageError::row_not_found("t", Some(3)).is_fatal());
        assert!(!StorageError::duplicate("Table", "t").is_fatal());
    }

    #[test]
    fn test_from_index_error() {
        let err: StorageError = IndexError::invalid_key("users_idx_name").into();
        assert_eq!(err.code(), StorageErrorCode::StrataStorageInvalidIndexKey);
        assert!(err.message().contains("users_idx_name"));
    }

    #[test]
    fn test_error_display() {
        let err = StorageError::row_not_found("users", Some(42));
        let display = format!("{}", err);
        assert!(display.contains("REJECT"));
        assert!(display.contains("STRATA_STORAGE_ROW_NOT_FOUND"));
        assert_eq!(err.row_id(), Some(42));
    }
}
