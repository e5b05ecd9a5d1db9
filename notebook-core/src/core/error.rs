//! Error types for the Notebook core library.

use thiserror::Error;

use crate::core::document::CollectionPath;
use crate::core::model::EntityKind;

/// Failures raised by a [`DocumentStore`](crate::DocumentStore) implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store could not be reached or refused the call.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// An update targeted a record that does not exist.
    #[error("No record {id} in {collection}")]
    NotFound { collection: String, id: String },

    /// The opened file is not a Notebook database.
    #[error("Invalid database: {0}")]
    InvalidDatabase(String),

    /// A SQLite operation failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Stored fields could not be (de)serialised as JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// An I/O operation on the filesystem failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// All errors that can occur within the Notebook core library.
#[derive(Debug, Error)]
pub enum NotebookError {
    /// Caller input was rejected before anything was written.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// The operation referenced an entity that does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    /// The session may not touch the requested owner's hierarchy.
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// A single store call failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// A stored record is missing a required field or has the wrong type.
    #[error("Malformed record {id} in {collection}: {reason}")]
    MalformedRecord {
        collection: CollectionPath,
        id: String,
        reason: String,
    },

    /// A cascade stopped at a failing delete; `completed` steps had succeeded.
    #[error("Cascade interrupted after {completed} of {total} deletes (failed on {failed_id}): {source}")]
    CascadeInterrupted {
        completed: usize,
        total: usize,
        failed_id: String,
        #[source]
        source: StoreError,
    },

    /// A cascade was cancelled between steps.
    #[error("Cascade cancelled after {completed} of {total} deletes")]
    CascadeCancelled { completed: usize, total: usize },
}

/// Convenience alias that pins the error type to [`NotebookError`].
pub type Result<T> = std::result::Result<T, NotebookError>;

impl NotebookError {
    /// Shorthand for a [`NotebookError::NotFound`].
    pub(crate) fn not_found(kind: EntityKind, id: &str) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Returns `true` when retrying the same call could succeed.
    ///
    /// Interrupted and cancelled cascades are retryable because every
    /// store delete is idempotent.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Store(StoreError::Unavailable(_))
                | Self::CascadeInterrupted { .. }
                | Self::CascadeCancelled { .. }
        )
    }

    /// Returns a short, human-readable message suitable for display to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::NotFound { kind, .. } => format!("{kind} no longer exists"),
            Self::Authorization(_) => "Access denied".to_string(),
            Self::Store(e) => format!("Failed to save: {e}"),
            Self::MalformedRecord { collection, .. } => {
                format!("Stored data in {collection} is damaged")
            }
            Self::CascadeInterrupted {
                completed, total, ..
            } => format!("Delete stopped after {completed} of {total} items. Try again."),
            Self::CascadeCancelled { completed, total } => {
                format!("Delete cancelled after {completed} of {total} items")
            }
        }
    }
}
