//! Storer error types.

use vertex_swarm_api::StoreError;

/// Errors from the redb backend.
#[derive(Debug, thiserror::Error)]
pub enum StorerError {
    /// Database error.
    #[error("database error: {0}")]
    Database(String),

    /// The store has been closed.
    #[error("store closed")]
    Closed,
}

/// Result type for storer operations.
pub type StorerResult<T> = Result<T, StorerError>;

impl From<StorerError> for StoreError {
    fn from(err: StorerError) -> Self {
        match err {
            StorerError::Database(message) => StoreError::Database(message),
            StorerError::Closed => StoreError::Closed,
        }
    }
}

macro_rules! database_error_from {
    ($($err:ty),+ $(,)?) => {$(
        impl From<$err> for StorerError {
            fn from(err: $err) -> Self {
                Self::Database(err.to_string())
            }
        }
    )+};
}

database_error_from!(
    redb::DatabaseError,
    redb::TransactionError,
    redb::TableError,
    redb::StorageError,
    redb::CommitError,
);
