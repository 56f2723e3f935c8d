//! In-memory chunk store.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::trace;
use vertex_swarm_api::{ChunkStore, StoreError, StoreResult};
use vertex_swarm_primitives::{Chunk, ChunkAddress};

/// Chunk store backed by a `HashMap`.
#[derive(Debug)]
pub struct MemoryChunkStore {
    /// `None` once closed.
    chunks: RwLock<Option<HashMap<ChunkAddress, Chunk>>>,
}

impl Default for MemoryChunkStore {
    fn default() -> Self {
        Self {
            chunks: RwLock::new(Some(HashMap::new())),
        }
    }
}

impl MemoryChunkStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored chunks, zero once closed.
    pub fn len(&self) -> usize {
        self.chunks.read().as_ref().map_or(0, HashMap::len)
    }

    /// Whether the store holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the address is stored.
    pub fn contains(&self, address: &ChunkAddress) -> bool {
        self.chunks
            .read()
            .as_ref()
            .is_some_and(|chunks| chunks.contains_key(address))
    }
}

impl ChunkStore for MemoryChunkStore {
    fn put(&self, chunk: &Chunk) -> StoreResult<()> {
        let mut guard = self.chunks.write();
        let chunks = guard.as_mut().ok_or(StoreError::Closed)?;
        chunks
            .entry(*chunk.address())
            .or_insert_with(|| chunk.clone());
        trace!(address = %chunk.address(), "stored chunk in memory");
        Ok(())
    }

    fn get(&self, address: &ChunkAddress) -> StoreResult<Chunk> {
        let guard = self.chunks.read();
        let chunks = guard.as_ref().ok_or(StoreError::Closed)?;
        chunks
            .get(address)
            .cloned()
            .ok_or(StoreError::NotFound(*address))
    }

    fn close(&self) -> StoreResult<()> {
        self.chunks.write().take();
        Ok(())
    }
}
