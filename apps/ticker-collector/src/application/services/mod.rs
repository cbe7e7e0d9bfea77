//! Application Services
//!
//! Services that orchestrate domain logic and coordinate between ports.
//!
//! - `MarketBootstrapper`: Loads an exchange's market list into the metadata
//!   cache and publishes any initial snapshots the catalog carries.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::StreamExt;

use crate::application::ports::{CatalogError, MarketCatalog, TickerSink};
use crate::domain::market::Exchange;
use crate::domain::metadata::SharedMetadataCache;

/// Snapshot writes in flight at once during bootstrap.
const SNAPSHOT_CONCURRENCY: usize = 32;

/// Outcome of one bootstrap run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Exchange that was loaded.
    pub exchange: Exchange,
    /// Markets now in the cache.
    pub markets: usize,
    /// Snapshots accepted by the sink.
    pub snapshots_saved: usize,
    /// Snapshots the sink rejected.
    pub snapshots_failed: usize,
}

/// Loads market metadata for an exchange.
pub struct MarketBootstrapper {
    cache: SharedMetadataCache,
    sink: Arc<dyn TickerSink>,
}

impl MarketBootstrapper {
    /// Create a bootstrapper writing into `cache` and `sink`.
    #[must_use]
    pub fn new(cache: SharedMetadataCache, sink: Arc<dyn TickerSink>) -> Self {
        Self { cache, sink }
    }

    /// Replace the cached markets of the catalog's exchange.
    ///
    /// The catalog is fetched first; the cache partition is only cleared and
    /// refilled once the fetch succeeded, so a failed fetch leaves the
    /// previous contents in place. Snapshot failures are counted, not fatal.
    ///
    /// # Errors
    ///
    /// Returns the catalog error if the market list cannot be fetched.
    pub async fn load(
        &self,
        catalog: &dyn MarketCatalog,
    ) -> Result<BootstrapReport, CatalogError> {
        let exchange = catalog.exchange();
        let listings = catalog.fetch_markets().await?;

        self.cache.clear(exchange);

        let mut snapshots = Vec::new();
        for listing in listings {
            if let Some(snapshot) = listing.snapshot {
                snapshots.push(snapshot);
            }
            self.cache.put(exchange, listing.native_code, listing.descriptor);
        }

        let saved = AtomicUsize::new(0);
        let failed = AtomicUsize::new(0);
        futures_util::stream::iter(snapshots)
            .for_each_concurrent(SNAPSHOT_CONCURRENCY, |tick| {
                let saved = &saved;
                let failed = &failed;
                async move {
                    match self.sink.save(&tick).await {
                        Ok(()) => {
                            saved.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => {
                            tracing::debug!(
                                %exchange,
                                base = %tick.base_asset,
                                error = %e,
                                "Snapshot write failed"
                            );
                            failed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            })
            .await;

        let report = BootstrapReport {
            exchange,
            markets: self.cache.len(exchange),
            snapshots_saved: saved.into_inner(),
            snapshots_failed: failed.into_inner(),
        };

        tracing::info!(
            %exchange,
            markets = report.markets,
            snapshots_saved = report.snapshots_saved,
            snapshots_failed = report.snapshots_failed,
            "Market metadata loaded"
        );

        Ok(report)
    }
}

// =============================================================================
// Tests
// =============================================================================
