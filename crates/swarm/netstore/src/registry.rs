//! Bounded registry of in-flight fetchers.
//!
//! The registry maps chunk addresses to their [`Fetcher`] and is the single
//! mutual-exclusion domain of the netstore: create-or-reuse decisions, local
//! store access around them, delivery, and retirement all happen while holding
//! its lock. Waiter counting stays outside the lock.
//!
//! Capacity is enforced by evicting idle fetchers, least recently used first.
//! A fetcher with waiters is never evicted; when every entry has waiters a new
//! fetcher is refused with [`NetStoreError::TooManyFetches`]. A running count
//! of idle fetchers lets a full registry refuse without scanning, and busy
//! entries passed over by a scan are promoted so the next scan skips them.

use std::{
    num::NonZeroUsize,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use lru::LruCache;
use parking_lot::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use vertex_swarm_api::{NetFetcherFactory, PeerSet};
use vertex_swarm_primitives::ChunkAddress;

use crate::{NetStoreError, NetStoreResult, fetcher::Fetcher, metrics::NetStoreMetrics};

/// Address to fetcher map, bounded by capacity.
pub(crate) struct FetcherRegistry {
    fetchers: Mutex<Fetchers>,
    capacity: NonZeroUsize,
    /// Tracked fetchers with no waiters. Maintained by the fetchers themselves.
    idle: Arc<AtomicUsize>,
    metrics: NetStoreMetrics,
}

/// State behind the registry lock.
struct Fetchers {
    /// Unbounded so eviction only ever happens through [`RegistryGuard::make_room`].
    cache: LruCache<ChunkAddress, Arc<Fetcher>>,
    next_id: u64,
}

impl FetcherRegistry {
    /// Create a registry holding at most `capacity` fetchers.
    pub(crate) fn new(capacity: usize, metrics: NetStoreMetrics) -> NetStoreResult<Arc<Self>> {
        let capacity = NonZeroUsize::new(capacity).ok_or(NetStoreError::InvalidCapacity)?;
        Ok(Arc::new(Self {
            fetchers: Mutex::new(Fetchers {
                cache: LruCache::unbounded(),
                next_id: 0,
            }),
            capacity,
            idle: Arc::default(),
            metrics,
        }))
    }

    /// Take the registry lock.
    pub(crate) fn lock(self: &Arc<Self>) -> RegistryGuard<'_> {
        RegistryGuard {
            registry: self,
            fetchers: self.fetchers.lock(),
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.capacity.get()
    }

    /// Number of tracked fetchers nobody waits on. May briefly overstate
    /// while a waiter is leaving.
    pub(crate) fn idle(&self) -> usize {
        self.idle.load(Ordering::Acquire)
    }
}

/// Exclusive access to the registry.
pub(crate) struct RegistryGuard<'a> {
    registry: &'a Arc<FetcherRegistry>,
    fetchers: MutexGuard<'a, Fetchers>,
}

impl RegistryGuard<'_> {
    /// Number of tracked fetchers.
    pub(crate) fn len(&self) -> usize {
        self.fetchers.cache.len()
    }

    /// Look up the fetcher for `address`, marking it recently used.
    pub(crate) fn get(&mut self, address: &ChunkAddress) -> Option<Arc<Fetcher>> {
        self.fetchers.cache.get(address).cloned()
    }

    /// Look up the fetcher for `address` without touching LRU order.
    pub(crate) fn peek(&self, address: &ChunkAddress) -> Option<&Arc<Fetcher>> {
        self.fetchers.cache.peek(address)
    }

    /// Return the fetcher for `address`, creating it if none is tracked.
    ///
    /// A new fetcher gets a fresh lifetime token and peer set, and a network
    /// fetch handle built from both by `factory`. The factory runs under the
    /// registry lock and must not call back into the netstore.
    pub(crate) fn obtain_or_create(
        &mut self,
        address: &ChunkAddress,
        factory: &dyn NetFetcherFactory,
    ) -> NetStoreResult<Arc<Fetcher>> {
        if let Some(fetcher) = self.get(address) {
            trace!(%address, fetcher = fetcher.id(), "reusing fetcher");
            return Ok(fetcher);
        }

        self.make_room()?;

        let lifetime = CancellationToken::new();
        let peers = PeerSet::new();
        let net_fetcher = factory.new_fetcher(lifetime.clone(), *address, peers.clone());

        let id = self.fetchers.next_id;
        self.fetchers.next_id += 1;

        let fetcher = Arc::new(Fetcher::new(
            id,
            *address,
            net_fetcher,
            lifetime,
            peers,
            Arc::downgrade(self.registry),
            self.registry.idle.clone(),
            self.registry.metrics.clone(),
        ));
        self.registry.idle.fetch_add(1, Ordering::AcqRel);
        self.fetchers.cache.put(*address, fetcher.clone());

        debug!(%address, fetcher = id, in_flight = self.len(), "created fetcher");
        self.registry.metrics.inc_fetchers_created();
        self.registry.metrics.set_in_flight(self.len());
        Ok(fetcher)
    }

    /// Retire `fetcher` if no caller waits on it: drop its entry and cancel
    /// its lifetime. Returns whether it was retired by this call.
    pub(crate) fn retire(&mut self, fetcher: &Fetcher) -> bool {
        if !fetcher.try_retire() {
            return false;
        }

        // The address may already belong to a newer fetcher.
        let address = fetcher.address();
        if self
            .peek(address)
            .is_some_and(|current| current.id() == fetcher.id())
        {
            self.fetchers.cache.pop(address);
        }

        debug!(%address, fetcher = fetcher.id(), in_flight = self.len(), "retired fetcher");
        self.registry.metrics.inc_fetchers_retired();
        self.registry.metrics.set_in_flight(self.len());
        true
    }

    /// Evict idle fetchers, least recently used first, until one more fits.
    fn make_room(&mut self) -> NetStoreResult<()> {
        while self.len() >= self.registry.capacity() {
            let candidate = if self.registry.idle() == 0 {
                None
            } else {
                self.find_idle()
            };

            let Some(fetcher) = candidate else {
                debug!(capacity = self.registry.capacity(), "fetcher registry full");
                return Err(NetStoreError::TooManyFetches {
                    capacity: self.registry.capacity(),
                });
            };

            // A waiter may join between the scan and the retire; rescan then.
            if self.retire(&fetcher) {
                debug!(
                    address = %fetcher.address(),
                    fetcher = fetcher.id(),
                    "evicted idle fetcher"
                );
                self.registry.metrics.inc_fetchers_evicted();
            }
        }
        Ok(())
    }

    /// Least recently used idle fetcher. Busy entries passed over on the way
    /// are promoted.
    fn find_idle(&mut self) -> Option<Arc<Fetcher>> {
        let mut busy = Vec::new();
        let mut found = None;
        for (address, fetcher) in self.fetchers.cache.iter().rev() {
            if fetcher.is_idle() {
                found = Some(fetcher.clone());
                break;
            }
            busy.push(*address);
        }
        for address in &busy {
            self.fetchers.cache.promote(address);
        }
        found
    }
}
