//! Request-deduplicating chunk retrieval.
//!
//! [`NetStore`] extends a local [`ChunkStore`](vertex_swarm_api::ChunkStore)
//! with network retrieval. When a chunk is missing locally, every concurrent
//! caller for that address shares one fetcher: one network fetch handle, one
//! delivery, and a lifetime that ends the moment the last waiting caller
//! finishes, whether it was satisfied or gave up.
//!
//! # Usage
//!
//! ```ignore
//! let netstore = NetStore::new(MemoryChunkStore::new(), factory, 1024)?;
//!
//! // Blocking form: local hit or wait for delivery.
//! let chunk = netstore.retrieve(&address, &FetchRequest::new(cancel)).await?;
//!
//! // Elsewhere, a chunk arrives from the network.
//! netstore.put(&chunk)?;
//! ```

mod args;
mod error;
mod fetcher;
mod metrics;
mod registry;
mod request;
mod store;

pub use args::*;
pub use error::*;
pub use request::*;
pub use store::*;
