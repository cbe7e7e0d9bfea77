//! Domain Layer - Core ticker types and business logic.
//!
//! This layer contains the exchange-agnostic market model, the concurrent
//! metadata registry and the pure price math. Nothing here performs I/O.

/// Exchanges, market descriptors and the canonical tick.
pub mod market;

/// Concurrent (exchange, native code) → descriptor registry.
pub mod metadata;

/// Pure normalization math shared by every venue.
pub mod normalize;
