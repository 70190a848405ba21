//! Error types for storage operations.

use crate::criteria::Condition;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not execute a query.
    ///
    /// Always carries the resolved native query text for diagnosis.
    #[error("query \"{query}\" returned error: {message}")]
    QueryFailed {
        /// The native query as sent to the driver, with placeholders
        /// interpolated where the dialect uses them.
        query: String,
        /// The underlying driver failure.
        message: String,
    },

    /// A criteria condition the backend cannot translate.
    #[error("the {condition} operator is not supported by the {backend} backend")]
    UnsupportedCondition {
        /// Backend name.
        backend: &'static str,
        /// The offending condition.
        condition: Condition,
    },

    /// A request the backend cannot execute.
    #[error("unsupported operation: {message}")]
    Unsupported {
        /// Description of the unsupported request.
        message: String,
    },

    /// The storage connection has been closed.
    #[error("storage connection is closed")]
    Closed,
}

impl StorageError {
    /// Creates a query failure error.
    pub fn query_failed(query: impl Into<String>, message: impl Into<String>) -> Self {
        Self::QueryFailed {
            query: query.into(),
            message: message.into(),
        }
    }

    /// Creates an unsupported operation error.
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }
}
