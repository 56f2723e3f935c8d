//! Mock network fetch collaborator.

use std::sync::Arc;

use parking_lot::Mutex;
use vertex_swarm_api::{CancellationToken, NetFetcher, NetFetcherFactory, PeerSet};
use vertex_swarm_primitives::{ChunkAddress, OverlayAddress};

/// A trigger issued on a network fetch handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchTrigger {
    /// Broad pull.
    Request {
        /// Chunk address.
        address: ChunkAddress,
    },
    /// Targeted pull from `source`.
    Offer {
        /// Chunk address.
        address: ChunkAddress,
        /// Peer believed to hold the chunk.
        source: OverlayAddress,
    },
}

impl FetchTrigger {
    /// Address the trigger was issued for.
    pub fn address(&self) -> &ChunkAddress {
        match self {
            Self::Request { address } | Self::Offer { address, .. } => address,
        }
    }
}

/// What the factory was given when building a handle.
#[derive(Debug, Clone)]
pub struct CreatedFetcher {
    /// Chunk address.
    pub address: ChunkAddress,
    /// Lifetime token handed to the handle.
    pub lifetime: CancellationToken,
    /// Peer set shared with the coordinator.
    pub peers: PeerSet,
}

#[derive(Debug, Default)]
struct Log {
    created: Mutex<Vec<CreatedFetcher>>,
    triggers: Mutex<Vec<(FetchTrigger, CancellationToken)>>,
}

impl Log {
    fn record(&self, trigger: FetchTrigger, cancel: &CancellationToken) {
        self.triggers.lock().push((trigger, cancel.clone()));
    }
}

/// Factory recording every handle it builds and every trigger they receive.
///
/// Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct MockNetFetcherFactory {
    log: Arc<Log>,
}

impl MockNetFetcherFactory {
    /// Create a factory with an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle for `address` that logs into this factory without being
    /// recorded as created.
    pub fn handle(&self, address: ChunkAddress) -> MockNetFetcher {
        MockNetFetcher {
            address,
            log: self.log.clone(),
        }
    }

    /// Handles built so far, in creation order.
    pub fn created(&self) -> Vec<CreatedFetcher> {
        self.log.created.lock().clone()
    }

    /// Number of handles built so far.
    pub fn created_count(&self) -> usize {
        self.log.created.lock().len()
    }

    /// Triggers issued so far, in order.
    pub fn triggers(&self) -> Vec<FetchTrigger> {
        self.log
            .triggers
            .lock()
            .iter()
            .map(|(trigger, _)| trigger.clone())
            .collect()
    }

    /// Cancellation tokens the triggers were issued with, in order.
    pub fn trigger_tokens(&self) -> Vec<CancellationToken> {
        self.log
            .triggers
            .lock()
            .iter()
            .map(|(_, cancel)| cancel.clone())
            .collect()
    }

    /// Number of triggers issued so far.
    pub fn trigger_count(&self) -> usize {
        self.log.triggers.lock().len()
    }

    /// Number of triggers issued for `address`.
    pub fn triggers_for(&self, address: &ChunkAddress) -> usize {
        self.log
            .triggers
            .lock()
            .iter()
            .filter(|(trigger, _)| trigger.address() == address)
            .count()
    }
}

impl NetFetcherFactory for MockNetFetcherFactory {
    fn new_fetcher(
        &self,
        lifetime: CancellationToken,
        address: ChunkAddress,
        peers: PeerSet,
    ) -> Box<dyn NetFetcher> {
        self.log.created.lock().push(CreatedFetcher {
            address,
            lifetime,
            peers,
        });
        Box::new(self.handle(address))
    }
}

/// Network fetch handle that only records triggers.
#[derive(Debug, Clone)]
pub struct MockNetFetcher {
    address: ChunkAddress,
    log: Arc<Log>,
}

impl NetFetcher for MockNetFetcher {
    fn request(&self, cancel: &CancellationToken) {
        let trigger = FetchTrigger::Request {
            address: self.address,
        };
        self.log.record(trigger, cancel);
    }

    fn offer(&self, cancel: &CancellationToken, source: OverlayAddress) {
        let trigger = FetchTrigger::Offer {
            address: self.address,
            source,
        };
        self.log.record(trigger, cancel);
    }
}
