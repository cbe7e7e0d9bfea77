#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Ticker Collector - Exchange Price Ingestion
//!
//! Maintains one persistent WebSocket connection per exchange (Upbit,
//! Bithumb, Binance), normalizes every ticker into a canonical record and
//! writes the latest record of each market to Redis with a freshness TTL.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Core market types and price math
//!   - `market`: Exchanges, market descriptors, the canonical tick
//!   - `metadata`: Concurrent native code → descriptor registry
//!   - `normalize`: Symbol conventions and change-rate derivations
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Interfaces for the sink, market catalogs and streams
//!   - `services`: Market metadata bootstrap
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `exchange`: WebSocket streams and per-venue wire protocols
//!   - `catalog`: REST market lists
//!   - `sink`: Redis writer
//!   - `config`: Configuration and dependency injection
//!   - `health`: Health check HTTP endpoint
//!
//! # Data Flow
//!
//! ```text
//! REST catalogs ──► Metadata cache ◄─────────────┐
//!                                                │ lookup
//! Upbit WS   ──┐                                 │
//! Bithumb WS ──┼──► Decode ──► Normalize ────────┴──► Redis
//! Binance WS ──┘                         <prefix>:<EXCHANGE>:<BASE>/<QUOTE>
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Core market types with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::market::{CanonicalTick, Exchange, MarketDescriptor};
pub use domain::metadata::{MarketMetadataCache, SharedMetadataCache};

// Ports and services
pub use application::ports::{
    CatalogError, ExchangeTickerStream, MarketCatalog, MarketListing, SinkError, TickerSink,
};
pub use application::services::{BootstrapReport, MarketBootstrapper};

// Infrastructure config
pub use infrastructure::config::{
    CollectorConfig, ConfigError, ExchangeEndpoints, ServerSettings, SinkSettings, StreamSettings,
};

// Exchange streams
pub use infrastructure::exchange::{
    BinanceProtocol, ConnectionState, FeedState, KrwProtocol, ReconnectConfig, ReconnectPolicy,
    StreamConfig, StreamHandler,
};

// Adapters
pub use infrastructure::catalog::HttpMarketCatalog;
pub use infrastructure::sink::RedisTickerSink;

// Health server
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
