//! Netstore error types.

use vertex_swarm_api::StoreError;
use vertex_swarm_primitives::ChunkAddress;

/// Errors surfaced by [`NetStore`](crate::NetStore) operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetStoreError {
    /// Local storage failed. Passed through unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The caller's cancellation token fired before the chunk was delivered.
    #[error("fetch cancelled, addr {address}")]
    Cancelled {
        /// Address that was being waited for.
        address: ChunkAddress,
    },

    /// The caller's deadline passed before the chunk was delivered.
    #[error("context deadline exceeded, addr {address}")]
    DeadlineExceeded {
        /// Address that was being waited for.
        address: ChunkAddress,
    },

    /// Every tracked fetcher has active waiters and none can be evicted.
    #[error("too many in-flight fetches: capacity {capacity}")]
    TooManyFetches {
        /// Configured registry capacity.
        capacity: usize,
    },

    /// The fetcher registry cannot be built with a zero capacity.
    #[error("fetcher capacity must be non-zero")]
    InvalidCapacity,
}

impl NetStoreError {
    /// Returns true if the caller gave up waiting (cancellation or deadline).
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Cancelled { .. } | Self::DeadlineExceeded { .. })
    }

    /// Address the error refers to, if any.
    pub fn address(&self) -> Option<&ChunkAddress> {
        match self {
            Self::Cancelled { address } | Self::DeadlineExceeded { address } => Some(address),
            Self::Store(StoreError::NotFound(address)) => Some(address),
            Self::Store(StoreError::InvalidChunk { address, .. }) => Some(address),
            _ => None,
        }
    }
}

/// Result type for netstore operations.
pub type NetStoreResult<T> = Result<T, NetStoreError>;
