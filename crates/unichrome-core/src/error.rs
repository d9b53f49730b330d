//! Error types for Unichrome.
//!
//! This module provides a unified error type for all Unichrome operations.
//! Every failure is surfaced to the calling thread; there is no global
//! error state.

use thiserror::Error;

/// Result type alias for Unichrome operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Unichrome operations.
///
/// Each variant includes a descriptive error message suitable for end-users.
/// Error codes follow the pattern `UNI-XXX` for easy debugging.
#[derive(Error, Debug)]
pub enum Error {
    /// Collection already exists (UNI-001).
    #[error("[UNI-001] Collection '{0}' already exists")]
    CollectionExists(String),

    /// Collection not found (UNI-002).
    #[error("[UNI-002] Collection '{0}' not found")]
    CollectionNotFound(String),

    /// Document not found (UNI-003).
    #[error("[UNI-003] Document with ID '{0}' not found")]
    DocumentNotFound(i32),

    /// Collection name is not usable as a file-name stem (UNI-004).
    #[error("[UNI-004] Invalid collection name '{0}'")]
    InvalidCollectionName(String),

    /// Dimension mismatch (UNI-005).
    #[error("[UNI-005] Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        actual: usize,
    },

    /// Graph version advanced while a traversal was in flight (UNI-006).
    ///
    /// Recovered internally by retrying the search; surfaced only after
    /// the retry budget is exhausted.
    #[error("[UNI-006] Graph changed during search")]
    GraphChanged,

    /// Invalid search filter (UNI-007).
    #[error("[UNI-007] Invalid filter: {0}")]
    InvalidFilter(String),

    /// IO error (UNI-008).
    #[error("[UNI-008] IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error (UNI-009).
    #[error("[UNI-009] Serialization error: {0}")]
    Serialization(String),

    /// Embedding provider failure, propagated unchanged (UNI-010).
    #[error("[UNI-010] Embedding error: {0}")]
    Embedding(String),
}

impl Error {
    /// Returns the error code (e.g., "UNI-001").
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::CollectionExists(_) => "UNI-001",
            Self::CollectionNotFound(_) => "UNI-002",
            Self::DocumentNotFound(_) => "UNI-003",
            Self::InvalidCollectionName(_) => "UNI-004",
            Self::DimensionMismatch { .. } => "UNI-005",
            Self::GraphChanged => "UNI-006",
            Self::InvalidFilter(_) => "UNI-007",
            Self::Io(_) => "UNI-008",
            Self::Serialization(_) => "UNI-009",
            Self::Embedding(_) => "UNI-010",
        }
    }

    /// Returns true if this error is transient and the operation can be
    /// retried as-is.
    ///
    /// Only [`Error::GraphChanged`] qualifies; it is retried internally by
    /// the search path.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::GraphChanged)
    }
}

#[cfg(test)]
mod error_tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(Error::CollectionExists("a".into()).code(), "UNI-001");
        assert_eq!(
            Error::DimensionMismatch {
                expected: 4,
                actual: 3
            }
            .code(),
            "UNI-005"
        );
        assert_eq!(Error::GraphChanged.code(), "UNI-006");
    }

    #[test]
    fn only_graph_changed_is_transient() {
        assert!(Error::GraphChanged.is_transient());
        assert!(!Error::DocumentNotFound(7).is_transient());
        assert!(!Error::InvalidFilter("op".into()).is_transient());
    }

    #[test]
    fn messages_carry_context() {
        let err = Error::DimensionMismatch {
            expected: 768,
            actual: 512,
        };
        let msg = err.to_string();
        assert!(msg.contains("768"));
        assert!(msg.contains("512"));
    }
}
