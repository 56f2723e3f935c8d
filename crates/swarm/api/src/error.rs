//! Error types for local chunk storage.
//!
//! Each variant carries typed data rather than a formatted string where the
//! caller might want to act on it.

use vertex_swarm_primitives::ChunkAddress;

/// Error type for [`ChunkStore`](crate::ChunkStore) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Chunk not present in local storage.
    #[error("chunk not found: {0}")]
    NotFound(ChunkAddress),

    /// The store has been closed.
    #[error("store closed")]
    Closed,

    /// Backend failure.
    #[error("database error: {0}")]
    Database(String),

    /// Stored or supplied chunk data is unusable.
    #[error("invalid chunk {address}: {reason}")]
    InvalidChunk {
        /// Address of the offending chunk.
        address: ChunkAddress,
        /// Why the chunk was rejected.
        reason: String,
    },
}

impl StoreError {
    /// Returns true if this is a local-storage miss.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Result type for local storage operations.
pub type StoreResult<T> = core::result::Result<T, StoreError>;
