//! Core primitive types for the Swarm netstore.
//!
//! This crate provides the addressing and chunk types shared by the local
//! store, the fetch coordination layer and the network fetch collaborator,
//! kept separate to avoid circular dependencies.

use core::fmt;

use alloy_primitives::B256;

mod chunk;

pub use chunk::*;

/// Content address of a chunk: keccak256 of the payload.
///
/// The address is the sole key for local storage and for in-flight fetches.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChunkAddress(pub B256);

impl ChunkAddress {
    /// Create an address from raw bytes.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(B256::new(bytes))
    }

    /// Raw address bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0.0
    }
}

impl From<B256> for ChunkAddress {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl From<[u8; 32]> for ChunkAddress {
    fn from(value: [u8; 32]) -> Self {
        Self::new(value)
    }
}

impl AsRef<[u8]> for ChunkAddress {
    fn as_ref(&self) -> &[u8] {
        self.0.as_slice()
    }
}

impl fmt::Display for ChunkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for ChunkAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ChunkAddress").field(&self.0).finish()
    }
}

/// Overlay address of a peer in the Swarm network.
///
/// Used as a hint when a fetch is requested on behalf of a peer, or when a
/// peer is already known to hold the chunk.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OverlayAddress(pub B256);

impl OverlayAddress {
    /// Create an overlay address from raw bytes.
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(B256::new(bytes))
    }
}

impl From<B256> for OverlayAddress {
    fn from(value: B256) -> Self {
        Self(value)
    }
}

impl fmt::Display for OverlayAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for OverlayAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OverlayAddress").field(&self.0).finish()
    }
}
