//! NetStore CLI arguments.

use clap::Args;
use serde::{Deserialize, Serialize};
use vertex_swarm_api::NetStoreConfig;

/// Default capacity of the in-flight fetcher registry.
pub const DEFAULT_FETCHERS_CAPACITY: usize = 5_000_000;

/// NetStore configuration arguments.
#[derive(Debug, Args, Clone, Serialize, Deserialize)]
#[command(next_help_heading = "NetStore")]
#[serde(default)]
pub struct NetStoreArgs {
    /// Maximum number of in-flight chunk fetches tracked at once.
    #[arg(long = "netstore.fetchers-capacity", default_value_t = DEFAULT_FETCHERS_CAPACITY)]
    pub fetchers_capacity: usize,
}

impl Default for NetStoreArgs {
    fn default() -> Self {
        Self {
            fetchers_capacity: DEFAULT_FETCHERS_CAPACITY,
        }
    }
}

impl NetStoreConfig for NetStoreArgs {
    fn fetchers_capacity(&self) -> usize {
        self.fetchers_capacity
    }
}
