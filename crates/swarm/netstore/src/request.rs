//! Per-caller fetch parameters.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use vertex_swarm_primitives::OverlayAddress;

/// What a caller brings to a wait: its own cancellation, an optional
/// deadline, and optional peer hints for the network fetch.
///
/// Cancellation is scoped to this caller; other callers waiting on the same
/// chunk are unaffected.
#[derive(Debug, Clone, Default)]
pub struct FetchRequest {
    /// Cancelled when the caller gives up.
    pub cancel: CancellationToken,
    /// Point in time after which the caller gives up.
    pub deadline: Option<Instant>,
    /// Peer on whose behalf the chunk is requested. It is excluded from the
    /// peers the network fetch may ask.
    pub peer: Option<OverlayAddress>,
    /// Peer known to hold the chunk. Turns the fetch into an offer.
    pub source: Option<OverlayAddress>,
}

impl FetchRequest {
    /// A blind request bound to `cancel`.
    pub fn new(cancel: CancellationToken) -> Self {
        Self {
            cancel,
            ..Default::default()
        }
    }

    /// Give up after `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Give up at `deadline`.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Record the requesting peer.
    pub fn with_peer(mut self, peer: OverlayAddress) -> Self {
        self.peer = Some(peer);
        self
    }

    /// Record a peer known to hold the chunk.
    pub fn with_source(mut self, source: OverlayAddress) -> Self {
        self.source = Some(source);
        self
    }
}
