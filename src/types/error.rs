//! Error types for the reconciler
//!
//! This module defines every error that can surface while ingesting sources or
//! running a reconciliation. Errors are descriptive so they can be shown to
//! an operator as-is.
//!
//! # Error Categories
//!
//! - **Structural errors** ([`ReconError`]): file too large, wrong format,
//!   missing columns, undecodable bytes. Fatal to that source's ingestion.
//! - **Row validation errors** ([`ValidationError`] with a row number): one
//!   row failed a field check; the row is dropped, parsing continues.
//! - **Run errors** ([`RunError`]): the terminal failure of a whole run.

use super::run::RunId;
use super::transaction::Source;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// File-level and execution failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReconError {
    /// File not found at the specified path
    #[error("File not found: {path}")]
    FileNotFound {
        /// The path that was not found
        path: String,
    },

    /// I/O error while reading a source or writing output
    #[error("I/O error: {message}")]
    Io {
        /// Description of the I/O error
        message: String,
    },

    /// Source exceeds the configured byte ceiling
    ///
    /// Checked before any parsing is attempted.
    #[error("File size of {size} bytes exceeds the {limit} byte limit")]
    FileTooLarge {
        /// Actual size in bytes
        size: u64,
        /// Configured maximum
        limit: u64,
    },

    /// Source does not declare itself as CSV
    #[error("File '{name}' must be a CSV file")]
    UnsupportedFormat {
        /// Declared file name
        name: String,
    },

    /// Source bytes could not be decoded or lexed
    #[error("CSV parsing error{}: {message}", line.map(|l| format!(" at line {}", l)).unwrap_or_default())]
    Unreadable {
        /// Line number where the failure was detected (if available)
        line: Option<u64>,
        /// Description of the failure
        message: String,
    },

    /// A quoted field was never closed
    #[error("CSV parsing error: unterminated quoted field starting at line {line}")]
    UnterminatedQuote {
        /// Line on which the quote was opened
        line: u64,
    },

    /// Header row lacks one or more mandatory columns
    #[error("Missing required columns: {}", columns.join(", "))]
    MissingColumns {
        /// Names of the missing columns, in schema order
        columns: Vec<String>,
    },

    /// Source parsed cleanly but held no transactions
    #[error("No valid transactions found")]
    EmptySource,

    /// A stage's execution context failed unexpectedly
    #[error("{stage} stage failed: {message}")]
    StageFailed {
        /// Stage label
        stage: String,
        /// Failure description
        message: String,
    },
}

impl From<std::io::Error> for ReconError {
    fn from(error: std::io::Error) -> Self {
        ReconError::Io {
            message: error.to_string(),
        }
    }
}

impl From<csv::Error> for ReconError {
    fn from(error: csv::Error) -> Self {
        let line = error.position().map(|pos| pos.line());

        ReconError::Unreadable {
            line,
            message: error.to_string(),
        }
    }
}

impl From<csv_async::Error> for ReconError {
    fn from(error: csv_async::Error) -> Self {
        ReconError::Unreadable {
            line: None,
            message: error.to_string(),
        }
    }
}

impl ReconError {
    /// Create a MissingColumns error
    pub fn missing_columns<S: AsRef<str>>(columns: &[S]) -> Self {
        ReconError::MissingColumns {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
        }
    }

    /// Create a StageFailed error
    pub fn stage_failed(stage: &str, message: impl Into<String>) -> Self {
        ReconError::StageFailed {
            stage: stage.to_string(),
            message: message.into(),
        }
    }

    /// Attach a source label, producing a structural ValidationError
    pub fn for_source(&self, source: Source) -> ValidationError {
        ValidationError {
            source,
            message: self.to_string(),
            row: None,
        }
    }
}

/// A problem found while ingesting one source
///
/// Structural problems carry no row number; row-level problems carry the
/// 1-based row number, where the header is row 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub source: Source,
    pub message: String,
    pub row: Option<u64>,
}

impl ValidationError {
    /// Create a row-level error
    pub fn row(source: Source, row: u64, message: impl Into<String>) -> Self {
        ValidationError {
            source,
            message: message.into(),
            row: Some(row),
        }
    }

    /// True for file-level errors
    pub fn is_structural(&self) -> bool {
        self.row.is_none()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.row {
            Some(row) => write!(f, "{} file, row {}: {}", self.source, row, self.message),
            None => write!(f, "{} file: {}", self.source, self.message),
        }
    }
}

/// Terminal failure of a reconciliation run
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RunError {
    /// One source failed validation; `errors` is never empty
    #[error("{side} file rejected with {} validation error(s)", errors.len())]
    Rejected {
        side: Source,
        errors: Vec<ValidationError>,
    },

    /// A stage's execution context failed
    #[error("{stage} stage failed: {message}")]
    StageFailed { stage: String, message: String },

    /// The run was cancelled or superseded by a newer run
    #[error("Reconciliation run {run} was cancelled")]
    Cancelled { run: RunId },
}

impl RunError {
    /// Reject a source with a single structural error
    pub fn structural(side: Source, error: &ReconError) -> Self {
        RunError::Rejected {
            side,
            errors: vec![error.for_source(side)],
        }
    }

    /// Validation errors carried by this failure, if any
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            RunError::Rejected { errors, .. } => errors,
            _ => &[],
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunError::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::file_not_found(
        ReconError::FileNotFound { path: "internal.csv".to_string() },
        "File not found: internal.csv"
    )]
    #[case::io_error(
        ReconError::Io { message: "Permission denied".to_string() },
        "I/O error: Permission denied"
    )]
    #[case::too_large(
        ReconError::FileTooLarge { size: 2048, limit: 1024 },
        "File size of 2048 bytes exceeds the 1024 byte limit"
    )]
    #[case::unsupported_format(
        ReconError::UnsupportedFormat { name: "ledger.xlsx".to_string() },
        "File 'ledger.xlsx' must be a CSV file"
    )]
    #[case::unreadable_with_line(
        ReconError::Unreadable { line: Some(3), message: "invalid UTF-8".to_string() },
        "CSV parsing error at line 3: invalid UTF-8"
    )]
    #[case::unreadable_without_line(
        ReconError::Unreadable { line: None, message: "invalid UTF-8".to_string() },
        "CSV parsing error: invalid UTF-8"
    )]
    #[case::unterminated_quote(
        ReconError::UnterminatedQuote { line: 7 },
        "CSV parsing error: unterminated quoted field starting at line 7"
    )]
    #[case::missing_columns(
        ReconError::missing_columns(&["amount", "status"]),
        "Missing required columns: amount, status"
    )]
    #[case::empty_source(ReconError::EmptySource, "No valid transactions found")]
    #[case::stage_failed(
        ReconError::stage_failed("reconcile", "worker panicked"),
        "reconcile stage failed: worker panicked"
    )]
    fn test_error_display(#[case] error: ReconError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[rstest]
    #[case::row(
        ValidationError::row(Source::Internal, 4, "amount must be a valid number"),
        "internal file, row 4: amount must be a valid number"
    )]
    #[case::structural(
        ReconError::EmptySource.for_source(Source::Provider),
        "provider file: No valid transactions found"
    )]
    fn test_validation_error_display(#[case] error: ValidationError, #[case] expected: &str) {
        assert_eq!(error.to_string(), expected);
    }

    #[test]
    fn test_structural_run_error_has_single_error() {
        let error = RunError::structural(Source::Internal, &ReconError::EmptySource);
        assert_eq!(error.validation_errors().len(), 1);
        assert!(error.validation_errors()[0].is_structural());
        assert_eq!(
            error.to_string(),
            "internal file rejected with 1 validation error(s)"
        );
    }

    #[test]
    fn test_cancelled_run_error() {
        let error = RunError::Cancelled { run: RunId(3) };
        assert!(error.is_cancelled());
        assert!(error.validation_errors().is_empty());
        assert_eq!(error.to_string(), "Reconciliation run #3 was cancelled");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Permission denied");
        let error: ReconError = io_error.into();
        assert!(matches!(error, ReconError::Io { .. }));
        assert_eq!(error.to_string(), "I/O error: Permission denied");
    }
}
