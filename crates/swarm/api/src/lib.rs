//! Swarm API - collaborator interfaces for the netstore.
//!
//! The netstore coordinates chunk retrieval between two collaborators it does
//! not implement itself:
//!
//! - [`ChunkStore`] - synchronous local persistence of content-addressed chunks
//! - [`NetFetcher`] / [`NetFetcherFactory`] - the network fetch mechanism,
//!   constructed per address and triggered fire-and-forget
//!
//! # Design Principles
//!
//! - Traits define *what*, implementations define *how*
//! - No wire protocol or peer selection concepts leak into the API
//! - A fetch handle's lifetime is a [`CancellationToken`] owned by the caller
//!   of the factory; the handle must stop network activity once it fires

#![warn(missing_docs)]

mod config;
mod error;
mod fetcher;
mod peers;
mod store;

pub use config::*;
pub use error::*;
pub use fetcher::*;
pub use peers::*;
pub use store::*;

// Re-export primitive types for convenience
pub use tokio_util::sync::CancellationToken;
pub use vertex_swarm_primitives::{Chunk, ChunkAddress, OverlayAddress};
