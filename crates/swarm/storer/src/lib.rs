//! Local chunk storage backends.
//!
//! Two implementations of [`ChunkStore`](vertex_swarm_api::ChunkStore):
//!
//! - [`MemoryChunkStore`] - a map behind a lock, for light nodes and tests
//! - [`RedbChunkStore`] - persistent storage in a redb database
//!
//! Both keep the first write for an address and refuse every operation once
//! closed.

mod error;
mod memory;
mod redb_store;

pub use error::*;
pub use memory::MemoryChunkStore;
pub use redb_store::RedbChunkStore;
