//! Market Metadata Cache
//!
//! Concurrent registry mapping `(exchange, native code)` to the market
//! descriptor loaded at bootstrap. Stream handlers read it on every frame to
//! resolve display names; the bootstrap loader writes it once per exchange.
//!
//! # Design
//!
//! The registry is partitioned per exchange so that lookups borrow the
//! native code as `&str` and bulk operations (`list_native_codes`, `clear`)
//! touch only one venue. Each partition is a sharded concurrent map, so every
//! operation is individually atomic and callers need no external locking.

use std::sync::Arc;

use dashmap::DashMap;

use super::market::{Exchange, MarketDescriptor};

/// Composite identity of one cached market.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Venue the code belongs to.
    pub exchange: Exchange,
    /// Venue's own instrument identifier (`KRW-BTC`, `BTCUSDT`).
    pub native_code: String,
}

impl CacheKey {
    /// Create a key.
    #[must_use]
    pub fn new(exchange: Exchange, native_code: impl Into<String>) -> Self {
        Self {
            exchange,
            native_code: native_code.into(),
        }
    }
}

/// Shared handle to the metadata cache.
pub type SharedMetadataCache = Arc<MarketMetadataCache>;

/// Concurrent `(exchange, native code)` → descriptor registry.
#[derive(Debug)]
pub struct MarketMetadataCache {
    partitions: [DashMap<String, Arc<MarketDescriptor>>; Exchange::COUNT],
}

impl Default for MarketMetadataCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MarketMetadataCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            partitions: std::array::from_fn(|_| DashMap::new()),
        }
    }

    fn partition(&self, exchange: Exchange) -> &DashMap<String, Arc<MarketDescriptor>> {
        &self.partitions[exchange.index()]
    }

    /// Insert or replace the descriptor for a market. Last write wins.
    pub fn put(
        &self,
        exchange: Exchange,
        native_code: impl Into<String>,
        descriptor: MarketDescriptor,
    ) {
        self.partition(exchange)
            .insert(native_code.into(), Arc::new(descriptor));
    }

    /// Insert or replace using a composite key.
    pub fn put_key(&self, key: CacheKey, descriptor: MarketDescriptor) {
        self.put(key.exchange, key.native_code, descriptor);
    }

    /// Look up a descriptor. Absence is a normal outcome.
    #[must_use]
    pub fn find(&self, exchange: Exchange, native_code: &str) -> Option<Arc<MarketDescriptor>> {
        self.partition(exchange)
            .get(native_code)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Snapshot of every native code cached for an exchange, in ascending order.
    #[must_use]
    pub fn list_native_codes(&self, exchange: Exchange) -> Vec<String> {
        let mut codes: Vec<String> = self
            .partition(exchange)
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        codes.sort_unstable();
        codes
    }

    /// Remove every market cached for an exchange.
    pub fn clear(&self, exchange: Exchange) {
        self.partition(exchange).clear();
    }

    /// Number of markets cached for an exchange.
    #[must_use]
    pub fn len(&self, exchange: Exchange) -> usize {
        self.partition(exchange).len()
    }

    /// Check whether an exchange has no cached markets.
    #[must_use]
    pub fn is_empty(&self, exchange: Exchange) -> bool {
        self.partition(exchange).is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================
