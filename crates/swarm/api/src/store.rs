//! Local chunk storage.

use auto_impl::auto_impl;
use vertex_swarm_primitives::{Chunk, ChunkAddress};

use crate::StoreResult;

/// Synchronous local persistence of content-addressed chunks.
///
/// Implementations must be thread-safe. Operations are not retried by callers;
/// an error is surfaced as is.
#[auto_impl(&, Arc, Box)]
pub trait ChunkStore: Send + Sync {
    /// Store a chunk.
    ///
    /// Storing an address that is already present is a no-op.
    fn put(&self, chunk: &Chunk) -> StoreResult<()>;

    /// Retrieve a chunk.
    ///
    /// Returns [`StoreError::NotFound`](crate::StoreError::NotFound) when the
    /// address is not stored.
    fn get(&self, address: &ChunkAddress) -> StoreResult<Chunk>;

    /// Close the store. Subsequent operations fail with
    /// [`StoreError::Closed`](crate::StoreError::Closed).
    fn close(&self) -> StoreResult<()>;
}
