//! Configuration traits for netstore components.
//!
//! CLI args implement these traits directly; constructors receive
//! `impl ConfigTrait` and extract what they need.

/// Configuration for the netstore fetch coordination layer.
pub trait NetStoreConfig {
    /// Maximum number of in-flight fetchers tracked at once.
    fn fetchers_capacity(&self) -> usize;
}
