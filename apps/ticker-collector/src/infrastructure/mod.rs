//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// REST market catalogs used at bootstrap.
pub mod catalog;

/// Configuration and dependency injection.
pub mod config;

/// Exchange WebSocket streams (Upbit, Bithumb, Binance).
pub mod exchange;

/// Health check HTTP endpoint.
pub mod health;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// Redis ticker sink.
pub mod sink;

/// OpenTelemetry tracing integration.
pub mod telemetry;
