//! Per-address fetch coordination.
//!
//! One [`Fetcher`] exists per missing chunk address while anyone is interested
//! in it. It owns the network fetch handle for that address, a one-shot
//! delivery signal observed by every waiter, and a waiter count whose return
//! to zero retires the fetcher and cancels its lifetime.

use std::sync::{
    Arc, Weak,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use vertex_swarm_api::{NetFetcher, PeerSet};
use vertex_swarm_primitives::{Chunk, ChunkAddress, OverlayAddress};

use crate::{
    FetchRequest, NetStoreError, NetStoreResult, metrics::NetStoreMetrics,
    registry::FetcherRegistry,
};

/// High bit of the waiter count, set once the fetcher is retired.
const RETIRED: usize = 1 << (usize::BITS - 1);

/// Fetch state for one chunk address.
pub(crate) struct Fetcher {
    /// Monotonic id, for log correlation and registry identity.
    id: u64,
    address: ChunkAddress,
    /// `None` until delivery, then the chunk. Set at most once.
    delivered: watch::Sender<Option<Chunk>>,
    /// Callers currently waiting, plus the [`RETIRED`] flag.
    waiters: AtomicUsize,
    /// Whether the blind network request has been issued.
    requested: AtomicBool,
    peers: PeerSet,
    lifetime: CancellationToken,
    net_fetcher: Box<dyn NetFetcher>,
    registry: Weak<FetcherRegistry>,
    /// Registry-wide count of fetchers with no waiters that are not retired.
    idle: Arc<AtomicUsize>,
    metrics: NetStoreMetrics,
}

impl Fetcher {
    pub(crate) fn new(
        id: u64,
        address: ChunkAddress,
        net_fetcher: Box<dyn NetFetcher>,
        lifetime: CancellationToken,
        peers: PeerSet,
        registry: Weak<FetcherRegistry>,
        idle: Arc<AtomicUsize>,
        metrics: NetStoreMetrics,
    ) -> Self {
        let (delivered, _) = watch::channel(None);
        Self {
            id,
            address,
            delivered,
            waiters: AtomicUsize::new(0),
            requested: AtomicBool::new(false),
            peers,
            lifetime,
            net_fetcher,
            registry,
            idle,
            metrics,
        }
    }

    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn address(&self) -> &ChunkAddress {
        &self.address
    }

    /// Number of callers currently waiting.
    pub(crate) fn waiters(&self) -> usize {
        self.waiters.load(Ordering::Acquire) & !RETIRED
    }

    /// True when no caller waits and the fetcher is not retired.
    pub(crate) fn is_idle(&self) -> bool {
        self.waiters.load(Ordering::Acquire) == 0
    }

    pub(crate) fn is_retired(&self) -> bool {
        self.waiters.load(Ordering::Acquire) & RETIRED != 0
    }

    /// The delivered chunk, if delivery happened.
    pub(crate) fn delivered_chunk(&self) -> Option<Chunk> {
        self.delivered.borrow().clone()
    }

    /// Deliver the chunk to every current and future waiter.
    ///
    /// Only the first call has an effect; it returns true.
    pub(crate) fn deliver(&self, chunk: Chunk) -> bool {
        let first = self.delivered.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(chunk);
            true
        });
        if first {
            debug!(address = %self.address, fetcher = self.id, "chunk delivered");
            self.metrics.inc_deliveries();
        }
        first
    }

    /// Register a waiter. Returns `None` once the fetcher is retired.
    ///
    /// The waiter leaves when the guard is dropped.
    pub(crate) fn join(&self) -> Option<WaiterGuard<'_>> {
        let previous = self
            .waiters
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n & RETIRED == 0).then_some(n + 1)
            })
            .ok()?;
        if previous == 0 {
            self.idle.fetch_sub(1, Ordering::AcqRel);
        }
        Some(WaiterGuard { fetcher: self })
    }

    /// Mark the fetcher retired and cancel its lifetime, provided nobody waits.
    ///
    /// Succeeds at most once. The registry drops its entry alongside, under
    /// its lock.
    pub(crate) fn try_retire(&self) -> bool {
        if self
            .waiters
            .compare_exchange(0, RETIRED, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return false;
        }
        self.idle.fetch_sub(1, Ordering::AcqRel);
        self.lifetime.cancel();
        true
    }

    fn leave(&self) {
        // Counted idle before the waiter count can reach zero; the count may
        // overstate briefly but never understates.
        self.idle.fetch_add(1, Ordering::AcqRel);
        if self.waiters.fetch_sub(1, Ordering::AcqRel) != 1 {
            self.idle.fetch_sub(1, Ordering::AcqRel);
            return;
        }
        trace!(address = %self.address, fetcher = self.id, "last waiter left");
        match self.registry.upgrade() {
            Some(registry) => {
                registry.lock().retire(self);
            }
            None => {
                self.try_retire();
            }
        }
    }

    /// Trigger the network fetch and wait for delivery, cancellation or the
    /// deadline, whichever comes first.
    pub(crate) async fn wait(
        &self,
        _waiter: WaiterGuard<'_>,
        request: &FetchRequest,
    ) -> NetStoreResult<Chunk> {
        let _peer = request.peer.map(|peer| PeerGuard::new(&self.peers, peer));

        match request.source {
            Some(source) => {
                trace!(address = %self.address, fetcher = self.id, %source, "offer fetch");
                self.net_fetcher.offer(&request.cancel, source);
            }
            None => {
                // One request serves every blind waiter; bound it by the fetcher lifetime.
                if !self.requested.swap(true, Ordering::AcqRel) {
                    trace!(address = %self.address, fetcher = self.id, "request fetch");
                    self.net_fetcher.request(&self.lifetime);
                }
            }
        }

        let mut delivered = self.delivered.subscribe();
        let delivery = async move {
            delivered
                .wait_for(Option::is_some)
                .await
                .ok()
                .and_then(|slot| (*slot).clone())
        };
        let deadline = async {
            match request.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        trace!(address = %self.address, fetcher = self.id, "waiting for delivery");
        tokio::select! {
            biased;

            chunk = delivery => match chunk {
                Some(chunk) => {
                    trace!(address = %self.address, fetcher = self.id, "fetch done");
                    Ok(chunk)
                }
                None => Err(NetStoreError::Cancelled { address: self.address }),
            },
            _ = request.cancel.cancelled() => {
                debug!(address = %self.address, fetcher = self.id, "fetch cancelled");
                self.metrics.inc_fetch_timeouts();
                Err(NetStoreError::Cancelled { address: self.address })
            }
            _ = deadline => {
                debug!(address = %self.address, fetcher = self.id, "fetch deadline exceeded");
                self.metrics.inc_fetch_timeouts();
                Err(NetStoreError::DeadlineExceeded { address: self.address })
            }
        }
    }
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("id", &self.id)
            .field("address", &self.address)
            .field("waiters", &self.waiters())
            .field("retired", &self.is_retired())
            .finish_non_exhaustive()
    }
}

/// A caller registered as waiting on a [`Fetcher`].
pub(crate) struct WaiterGuard<'a> {
    fetcher: &'a Fetcher,
}

impl Drop for WaiterGuard<'_> {
    fn drop(&mut self) {
        self.fetcher.leave();
    }
}

/// Keeps the requesting peer in the shared peer set while its call lasts.
struct PeerGuard<'a> {
    peers: &'a PeerSet,
    peer: OverlayAddress,
}

impl<'a> PeerGuard<'a> {
    fn new(peers: &'a PeerSet, peer: OverlayAddress) -> Self {
        peers.insert(peer);
        Self { peers, peer }
    }
}

impl Drop for PeerGuard<'_> {
    fn drop(&mut self) {
        self.peers.remove(&self.peer);
    }
}
