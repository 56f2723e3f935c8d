//! Network fetch collaborator.
//!
//! A [`NetFetcher`] is built once per in-flight chunk address by a
//! [`NetFetcherFactory`]. Its triggers are fire-and-forget: the chunk itself
//! arrives later through a put into the netstore from elsewhere in the node.

use auto_impl::auto_impl;
use tokio_util::sync::CancellationToken;
use vertex_swarm_primitives::{ChunkAddress, OverlayAddress};

use crate::PeerSet;

/// Per-address network fetch handle.
#[auto_impl(&, Arc, Box)]
pub trait NetFetcher: Send + Sync {
    /// Broad pull: ask the network whether anyone has the chunk.
    ///
    /// Issued once per handle on behalf of every caller without a source
    /// hint, so `cancel` is the handle's lifetime token rather than any one
    /// caller's.
    fn request(&self, cancel: &CancellationToken);

    /// Targeted pull from a peer known to hold the chunk.
    ///
    /// `cancel` is the token of the caller that supplied the hint.
    fn offer(&self, cancel: &CancellationToken, source: OverlayAddress);
}

/// Constructor for per-address [`NetFetcher`] handles.
///
/// `lifetime` is cancelled exactly once, when no caller waits for the chunk
/// any longer; the handle must abandon outstanding network I/O then. `peers`
/// is shared with the coordinator and lists peers that must not be asked.
#[auto_impl(&, Arc, Box)]
pub trait NetFetcherFactory: Send + Sync {
    /// Build a fetch handle for `address`.
    fn new_fetcher(
        &self,
        lifetime: CancellationToken,
        address: ChunkAddress,
        peers: PeerSet,
    ) -> Box<dyn NetFetcher>;
}

/// Closures of the right shape act as factories.
pub struct FnNetFetcherFactory<F>(pub F);

impl<F> NetFetcherFactory for FnNetFetcherFactory<F>
where
    F: Fn(CancellationToken, ChunkAddress, PeerSet) -> Box<dyn NetFetcher> + Send + Sync,
{
    fn new_fetcher(
        &self,
        lifetime: CancellationToken,
        address: ChunkAddress,
        peers: PeerSet,
    ) -> Box<dyn NetFetcher> {
        (self.0)(lifetime, address, peers)
    }
}

/// A fetch handle that never contacts the network.
///
/// Useful for nodes that only ever receive chunks by push.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNetFetcher;

impl NetFetcher for NoopNetFetcher {
    fn request(&self, _cancel: &CancellationToken) {}

    fn offer(&self, _cancel: &CancellationToken, _source: OverlayAddress) {}
}

impl NetFetcherFactory for NoopNetFetcher {
    fn new_fetcher(
        &self,
        _lifetime: CancellationToken,
        _address: ChunkAddress,
        _peers: PeerSet,
    ) -> Box<dyn NetFetcher> {
        Box::new(Self)
    }
}
