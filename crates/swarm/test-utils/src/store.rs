//! Local store with injectable write failures.

use std::sync::atomic::{AtomicBool, Ordering};

use vertex_swarm_api::{ChunkStore, StoreError, StoreResult};
use vertex_swarm_primitives::{Chunk, ChunkAddress};
use vertex_swarm_storer::MemoryChunkStore;

/// [`MemoryChunkStore`] whose puts fail while [`set_fail_puts`](Self::set_fail_puts) is on.
#[derive(Debug, Default)]
pub struct FailingChunkStore {
    inner: MemoryChunkStore,
    fail_puts: AtomicBool,
}

impl FailingChunkStore {
    /// Create an empty store that accepts writes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle write failures.
    pub fn set_fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    /// Whether the address is stored.
    pub fn contains(&self, address: &ChunkAddress) -> bool {
        self.inner.contains(address)
    }
}

impl ChunkStore for FailingChunkStore {
    fn put(&self, chunk: &Chunk) -> StoreResult<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StoreError::Database("injected write failure".to_string()));
        }
        self.inner.put(chunk)
    }

    fn get(&self, address: &ChunkAddress) -> StoreResult<Chunk> {
        self.inner.get(address)
    }

    fn close(&self) -> StoreResult<()> {
        self.inner.close()
    }
}
