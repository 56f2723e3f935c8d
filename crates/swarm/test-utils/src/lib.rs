//! Test utilities for the Swarm netstore.
//!
//! - [`MockNetFetcherFactory`] - records every network fetch handle it builds
//!   and every trigger issued on them
//! - [`FailingChunkStore`] - a memory store whose writes can be made to fail
//! - chunk and overlay helpers, [`wait_until`] and [`init_tracing`]

mod fetcher;
mod store;

pub use fetcher::*;
pub use store::*;

use std::time::Duration;

use rand::Rng;
use tracing_subscriber::EnvFilter;
use vertex_swarm_primitives::{Chunk, OverlayAddress};

/// A deterministic chunk whose payload is derived from `n`.
pub fn chunk_with(n: u8) -> Chunk {
    Chunk::new(format!("chunk data {n}").into_bytes())
}

/// A chunk with a random payload of `len` bytes.
pub fn random_chunk(len: usize) -> Chunk {
    let mut data = vec![0u8; len];
    rand::rng().fill(data.as_mut_slice());
    Chunk::new(data)
}

/// A deterministic overlay address.
pub fn overlay(n: u8) -> OverlayAddress {
    let mut bytes = [0u8; 32];
    bytes[0] = n;
    OverlayAddress::new(bytes)
}

/// Poll `condition` until it holds, panicking after five seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met within 5s"
        );
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

/// Install a fmt subscriber honouring `RUST_LOG`, once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
