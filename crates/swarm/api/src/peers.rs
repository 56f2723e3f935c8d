//! Concurrent peer membership shared between a fetcher and its network handle.

use std::sync::Arc;

use dashmap::DashSet;
use vertex_swarm_primitives::OverlayAddress;

/// Set of peers already involved in fetching one chunk.
///
/// Peers that asked us for the chunk are recorded here so the network
/// mechanism does not solicit them in turn. Cloning shares the same set; it
/// supports concurrent insert, remove and iteration without an outer lock.
#[derive(Debug, Clone, Default)]
pub struct PeerSet {
    inner: Arc<DashSet<OverlayAddress>>,
}

impl PeerSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a peer. Returns false if it was already present.
    pub fn insert(&self, peer: OverlayAddress) -> bool {
        self.inner.insert(peer)
    }

    /// Remove a peer. Returns false if it was not present.
    pub fn remove(&self, peer: &OverlayAddress) -> bool {
        self.inner.remove(peer).is_some()
    }

    /// Whether the peer is present.
    pub fn contains(&self, peer: &OverlayAddress) -> bool {
        self.inner.contains(peer)
    }

    /// Number of peers.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Point-in-time copy of the members.
    pub fn snapshot(&self) -> Vec<OverlayAddress> {
        self.inner.iter().map(|peer| *peer).collect()
    }
}
