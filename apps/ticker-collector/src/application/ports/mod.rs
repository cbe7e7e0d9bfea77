//! Port Interfaces
//!
//! Defines the interfaces (ports) for external systems following
//! the Hexagonal Architecture pattern. These are the contracts that
//! infrastructure adapters must implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - `TickerSink`: Accepts canonical ticks for downstream consumers (Redis)
//! - `MarketCatalog`: Lists tradable markets of an exchange (REST)
//!
//! ## Driver Ports (Inbound)
//!
//! - `ExchangeTickerStream`: A long-lived exchange stream started by `main`

use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::market::{CanonicalTick, Exchange, MarketDescriptor};

// =============================================================================
// Ticker Sink
// =============================================================================

/// Sink errors.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The tick could not be serialized.
    #[error("failed to serialize tick: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The backing store rejected or failed the write.
    #[error("sink backend error: {0}")]
    Backend(String),
}

/// Destination for canonical ticks.
///
/// `save` is fire-and-forget from the stream's point of view: a failure is
/// logged and counted, never retried, and never stalls the stream.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TickerSink: Send + Sync {
    /// Store the latest tick for its market, replacing the previous one.
    async fn save(&self, tick: &CanonicalTick) -> Result<(), SinkError>;
}

// =============================================================================
// Market Catalog
// =============================================================================

/// Catalog errors.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("catalog request failed: {0}")]
    Request(String),

    /// The venue answered with a non-success status.
    #[error("catalog returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
    },

    /// The response body could not be decoded.
    #[error("catalog response could not be decoded: {0}")]
    Decode(String),
}

/// One tradable market as listed by a venue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketListing {
    /// Venue code (`KRW-BTC`, `BTCUSDT`).
    pub native_code: String,
    /// Descriptor to cache under the code.
    pub descriptor: MarketDescriptor,
    /// Initial tick, when the listing endpoint already carries prices.
    pub snapshot: Option<CanonicalTick>,
}

/// Source of an exchange's market list.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketCatalog: Send + Sync {
    /// Exchange this catalog lists.
    fn exchange(&self) -> Exchange;

    /// Fetch every tracked market.
    async fn fetch_markets(&self) -> Result<Vec<MarketListing>, CatalogError>;
}

// =============================================================================
// Exchange Stream
// =============================================================================

/// A persistent ticker stream for one exchange.
#[async_trait]
pub trait ExchangeTickerStream: Send + Sync {
    /// Exchange this stream connects to.
    fn exchange(&self) -> Exchange;

    /// Connect and stream until cancelled, reconnecting on every failure.
    async fn connect(self: Arc<Self>);
}
