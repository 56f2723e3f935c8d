//! NetStore Metrics

use metrics::{Counter, Gauge};

/// NetStore Metrics
#[derive(Clone, Debug)]
pub(crate) struct NetStoreMetrics {
    /// Number of lookups answered by local storage
    local_hits_total: Counter,
    /// Number of lookups that missed local storage
    local_misses_total: Counter,
    /// Number of fetchers created
    fetchers_created_total: Counter,
    /// Number of fetchers retired after their last waiter left
    fetchers_retired_total: Counter,
    /// Number of idle fetchers evicted under capacity pressure
    fetchers_evicted_total: Counter,
    /// Number of chunks delivered to a fetcher
    deliveries_total: Counter,
    /// Number of waits that ended by cancellation or deadline
    fetch_timeouts_total: Counter,
    /// Fetchers currently tracked
    fetchers_in_flight: Gauge,
}

impl Default for NetStoreMetrics {
    fn default() -> Self {
        Self {
            local_hits_total: metrics::counter!("netstore.local_hits_total"),
            local_misses_total: metrics::counter!("netstore.local_misses_total"),
            fetchers_created_total: metrics::counter!("netstore.fetchers_created_total"),
            fetchers_retired_total: metrics::counter!("netstore.fetchers_retired_total"),
            fetchers_evicted_total: metrics::counter!("netstore.fetchers_evicted_total"),
            deliveries_total: metrics::counter!("netstore.deliveries_total"),
            fetch_timeouts_total: metrics::counter!("netstore.fetch_timeouts_total"),
            fetchers_in_flight: metrics::gauge!("netstore.fetchers_in_flight"),
        }
    }
}

impl NetStoreMetrics {
    pub(crate) fn inc_local_hits(&self) {
        self.local_hits_total.increment(1);
    }

    pub(crate) fn inc_local_misses(&self) {
        self.local_misses_total.increment(1);
    }

    pub(crate) fn inc_fetchers_created(&self) {
        self.fetchers_created_total.increment(1);
    }

    pub(crate) fn inc_fetchers_retired(&self) {
        self.fetchers_retired_total.increment(1);
    }

    pub(crate) fn inc_fetchers_evicted(&self) {
        self.fetchers_evicted_total.increment(1);
    }

    pub(crate) fn inc_deliveries(&self) {
        self.deliveries_total.increment(1);
    }

    pub(crate) fn inc_fetch_timeouts(&self) {
        self.fetch_timeouts_total.increment(1);
    }

    pub(crate) fn set_in_flight(&self, fetchers: usize) {
        self.fetchers_in_flight.set(fetchers as f64);
    }
}
