//! NetStore: local chunk storage extended with deduplicated network retrieval.

use std::sync::Arc;

use tracing::{debug, trace};
use vertex_swarm_api::{ChunkStore, NetFetcherFactory, NetStoreConfig, StoreError};
use vertex_swarm_primitives::{Chunk, ChunkAddress};

use crate::{
    FetchRequest, NetStoreResult, fetcher::Fetcher, metrics::NetStoreMetrics,
    registry::FetcherRegistry,
};

/// Local chunk store extended with network retrieval.
///
/// Lookups that miss local storage share one fetcher per address; a
/// [`put`](Self::put) stores the chunk and wakes everyone waiting for it.
/// Cloning is cheap and shares the same store and registry.
pub struct NetStore<S> {
    inner: Arc<NetStoreInner<S>>,
}

struct NetStoreInner<S> {
    store: S,
    registry: Arc<FetcherRegistry>,
    factory: Box<dyn NetFetcherFactory>,
    metrics: NetStoreMetrics,
}

impl<S> Clone for NetStore<S> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<S> std::fmt::Debug for NetStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetStore")
            .field("capacity", &self.inner.registry.capacity())
            .finish_non_exhaustive()
    }
}

/// Result of a local lookup.
pub enum Lookup<S> {
    /// The chunk is stored locally.
    Found(Chunk),
    /// The chunk is not stored locally; `fetch` waits for it.
    Missing {
        /// The local-store miss.
        miss: StoreError,
        /// Handle to wait for the chunk.
        fetch: FetchHandle<S>,
    },
}

impl<S> std::fmt::Debug for Lookup<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Found(chunk) => f.debug_tuple("Found").field(chunk).finish(),
            Self::Missing { miss, fetch } => f
                .debug_struct("Missing")
                .field("miss", miss)
                .field("fetch", fetch)
                .finish(),
        }
    }
}

impl<S: ChunkStore> Lookup<S> {
    /// The chunk, if it was found locally.
    pub fn chunk(&self) -> Option<&Chunk> {
        match self {
            Self::Found(chunk) => Some(chunk),
            Self::Missing { .. } => None,
        }
    }

    /// A handle that yields the chunk, immediately if it was found locally.
    pub fn into_handle(self) -> FetchHandle<S> {
        match self {
            Self::Found(chunk) => FetchHandle::ready(chunk),
            Self::Missing { fetch, .. } => fetch,
        }
    }
}

/// Waits for a chunk on behalf of one caller.
///
/// Invoking [`fetch`](Self::fetch) joins the shared fetcher for the address
/// for as long as the call lasts; dropping the future leaves it. Dropping a
/// handle that was never invoked retires the fetcher unless someone else is
/// waiting on it.
pub struct FetchHandle<S> {
    state: HandleState<S>,
}

enum HandleState<S> {
    Ready(Chunk),
    Pending(Pending<S>),
}

/// Interest in a fetcher that has not necessarily been joined.
struct Pending<S> {
    netstore: NetStore<S>,
    fetcher: Arc<Fetcher>,
}

impl<S> Drop for Pending<S> {
    fn drop(&mut self) {
        // Refused while anyone waits, and a no-op once retired.
        self.netstore.inner.registry.lock().retire(&self.fetcher);
    }
}

impl<S> std::fmt::Debug for FetchHandle<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.state {
            HandleState::Ready(chunk) => f.debug_tuple("Ready").field(chunk.address()).finish(),
            HandleState::Pending(pending) => {
                f.debug_tuple("Pending").field(&pending.fetcher).finish()
            }
        }
    }
}

impl<S: ChunkStore> FetchHandle<S> {
    fn ready(chunk: Chunk) -> Self {
        Self {
            state: HandleState::Ready(chunk),
        }
    }

    fn pending(netstore: NetStore<S>, fetcher: Arc<Fetcher>) -> Self {
        Self {
            state: HandleState::Pending(Pending { netstore, fetcher }),
        }
    }

    /// Address this handle waits for.
    pub fn address(&self) -> &ChunkAddress {
        match &self.state {
            HandleState::Ready(chunk) => chunk.address(),
            HandleState::Pending(pending) => pending.fetcher.address(),
        }
    }

    /// Whether the chunk is already at hand.
    pub fn is_ready(&self) -> bool {
        matches!(self.state, HandleState::Ready(_))
    }

    /// Wait for the chunk until it is delivered or `request` gives up.
    pub async fn fetch(self, request: &FetchRequest) -> NetStoreResult<Chunk> {
        let mut pending = match self.state {
            HandleState::Ready(chunk) => return Ok(chunk),
            HandleState::Pending(pending) => pending,
        };

        loop {
            let fetcher = &pending.fetcher;
            if let Some(waiter) = fetcher.join() {
                return fetcher.wait(waiter, request).await;
            }

            // Retired before we joined: delivered, evicted, or abandoned.
            if let Some(chunk) = fetcher.delivered_chunk() {
                return Ok(chunk);
            }
            trace!(
                address = %fetcher.address(),
                fetcher = fetcher.id(),
                "fetcher retired, resolving again"
            );
            match pending.netstore.resolve(fetcher.address())? {
                Resolved::Local(chunk) => return Ok(chunk),
                Resolved::Fetch { fetcher: next, .. } => pending.fetcher = next,
            }
        }
    }

    /// Like [`fetch`](Self::fetch), reporting only success or failure.
    pub async fn wait(self, request: &FetchRequest) -> NetStoreResult<()> {
        self.fetch(request).await.map(drop)
    }
}

enum Resolved {
    Local(Chunk),
    Fetch { fetcher: Arc<Fetcher>, miss: StoreError },
}

impl<S: ChunkStore> NetStore<S> {
    /// Create a netstore over `store`, tracking at most `capacity` in-flight
    /// fetchers. `factory` builds the network fetch handle for each one.
    pub fn new(
        store: S,
        factory: impl NetFetcherFactory + 'static,
        capacity: usize,
    ) -> NetStoreResult<Self> {
        let metrics = NetStoreMetrics::default();
        let registry = FetcherRegistry::new(capacity, metrics.clone())?;
        debug!(capacity, "created netstore");
        Ok(Self {
            inner: Arc::new(NetStoreInner {
                store,
                registry,
                factory: Box::new(factory),
                metrics,
            }),
        })
    }

    /// Create a netstore from configuration.
    pub fn from_config(
        store: S,
        factory: impl NetFetcherFactory + 'static,
        config: &impl NetStoreConfig,
    ) -> NetStoreResult<Self> {
        Self::new(store, factory, config.fetchers_capacity())
    }

    /// The underlying local store.
    pub fn local_store(&self) -> &S {
        &self.inner.store
    }

    /// Store a chunk locally, then deliver it to the fetcher waiting for it,
    /// if any.
    ///
    /// Nothing is delivered when the local write fails.
    pub fn put(&self, chunk: &Chunk) -> NetStoreResult<()> {
        let address = chunk.address();
        trace!(%address, "put chunk");

        let mut fetchers = self.inner.registry.lock();
        self.inner.store.put(chunk)?;

        if let Some(fetcher) = fetchers.get(address) {
            fetcher.deliver(chunk.clone());
            // No-op while callers still wait; the last one out retires it.
            fetchers.retire(&fetcher);
        }
        Ok(())
    }

    /// Look a chunk up locally.
    ///
    /// On a miss the fetcher for the address is obtained, created if needed,
    /// and returned as a handle alongside the miss. Nothing is fetched from
    /// the network until the handle is invoked.
    pub fn get(&self, address: &ChunkAddress) -> NetStoreResult<Lookup<S>> {
        Ok(match self.resolve(address)? {
            Resolved::Local(chunk) => Lookup::Found(chunk),
            Resolved::Fetch { fetcher, miss } => Lookup::Missing {
                miss,
                fetch: FetchHandle::pending(self.clone(), fetcher),
            },
        })
    }

    /// Get a chunk, waiting for network delivery if it is not stored locally.
    pub async fn retrieve(
        &self,
        address: &ChunkAddress,
        request: &FetchRequest,
    ) -> NetStoreResult<Chunk> {
        self.get(address)?.into_handle().fetch(request).await
    }

    /// `None` if the chunk is stored locally, otherwise a handle that waits
    /// for it.
    pub fn has(&self, address: &ChunkAddress) -> NetStoreResult<Option<FetchHandle<S>>> {
        Ok(match self.resolve(address)? {
            Resolved::Local(_) => None,
            Resolved::Fetch { fetcher, .. } => Some(FetchHandle::pending(self.clone(), fetcher)),
        })
    }

    /// Close the local store.
    ///
    /// Fetchers are not touched; they retire as their waiters leave.
    pub fn close(&self) -> NetStoreResult<()> {
        debug!("closing netstore");
        self.inner.store.close()?;
        Ok(())
    }

    /// Number of fetchers currently tracked.
    pub fn in_flight(&self) -> usize {
        self.inner.registry.lock().len()
    }

    /// Number of callers currently waiting for `address`.
    pub fn waiting(&self, address: &ChunkAddress) -> usize {
        self.inner
            .registry
            .lock()
            .peek(address)
            .map_or(0, |fetcher| fetcher.waiters())
    }

    fn resolve(&self, address: &ChunkAddress) -> NetStoreResult<Resolved> {
        let mut fetchers = self.inner.registry.lock();
        match self.inner.store.get(address) {
            Ok(chunk) => {
                trace!(%address, "local hit");
                self.inner.metrics.inc_local_hits();
                Ok(Resolved::Local(chunk))
            }
            Err(miss) if miss.is_not_found() => {
                self.inner.metrics.inc_local_misses();
                let fetcher = fetchers.obtain_or_create(address, &*self.inner.factory)?;
                Ok(Resolved::Fetch { fetcher, miss })
            }
            Err(err) => Err(err.into()),
        }
    }
}
