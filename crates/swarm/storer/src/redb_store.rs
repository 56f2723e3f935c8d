//! redb-based chunk storage backend.
//!
//! This module provides [`RedbChunkStore`], a persistent chunk store
//! backed by the redb embedded database.

use std::path::Path;

use parking_lot::RwLock;
use redb::{Database, ReadableTable, TableDefinition};
use tracing::debug;
use vertex_swarm_api::{ChunkStore, StoreError, StoreResult};
use vertex_swarm_primitives::{Chunk, ChunkAddress};

use crate::{StorerError, StorerResult};

/// Chunk payloads keyed by their 32-byte address.
const CHUNKS_TABLE: TableDefinition<&[u8; 32], &[u8]> = TableDefinition::new("chunks");

/// redb-based chunk store.
///
/// Uses redb for ACID-compliant persistent storage of chunks.
/// Thread-safe for concurrent reads and writes. The database handle is
/// dropped on [`close`](ChunkStore::close).
pub struct RedbChunkStore {
    db: RwLock<Option<Database>>,
}

impl RedbChunkStore {
    /// Open or create a chunk store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> StorerResult<Self> {
        let db = Database::create(path)?;

        // Ensure the chunks table exists
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(CHUNKS_TABLE)?;
        }
        write_txn.commit()?;

        debug!("Opened redb chunk store");
        Ok(Self {
            db: RwLock::new(Some(db)),
        })
    }

    /// Number of stored chunks.
    pub fn count(&self) -> StorerResult<u64> {
        let guard = self.db.read();
        let db = guard.as_ref().ok_or(StorerError::Closed)?;
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(CHUNKS_TABLE)?;
        // Count by iterating
        let mut count = 0u64;
        for entry in table.iter()? {
            entry?;
            count += 1;
        }
        Ok(count)
    }

    fn put_inner(&self, chunk: &Chunk) -> StorerResult<()> {
        let guard = self.db.read();
        let db = guard.as_ref().ok_or(StorerError::Closed)?;
        let write_txn = db.begin_write()?;
        {
            let mut table = write_txn.open_table(CHUNKS_TABLE)?;
            // First write wins
            let key = chunk.address().as_bytes();
            let value: &[u8] = chunk.data();
            if table.get(key)?.is_none() {
                table.insert(key, value)?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    fn get_inner(&self, address: &ChunkAddress) -> StorerResult<Option<Chunk>> {
        let guard = self.db.read();
        let db = guard.as_ref().ok_or(StorerError::Closed)?;
        let read_txn = db.begin_read()?;
        let table = read_txn.open_table(CHUNKS_TABLE)?;
        Ok(table
            .get(address.as_bytes())?
            .map(|value| Chunk::with_address(*address, value.value().to_vec())))
    }
}

impl ChunkStore for RedbChunkStore {
    fn put(&self, chunk: &Chunk) -> StoreResult<()> {
        self.put_inner(chunk).map_err(StoreError::from)
    }

    fn get(&self, address: &ChunkAddress) -> StoreResult<Chunk> {
        self.get_inner(address)?.ok_or(StoreError::NotFound(*address))
    }

    fn close(&self) -> StoreResult<()> {
        if self.db.write().take().is_some() {
            debug!("Closed redb chunk store");
        }
        Ok(())
    }
}
