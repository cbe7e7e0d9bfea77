//! Configuration Module
//!
//! Configuration loading for the collector service.

mod settings;

pub use settings::{
    CollectorConfig, ConfigError, DEFAULT_BINANCE_REST_URL, DEFAULT_BINANCE_WS_URL,
    DEFAULT_BITHUMB_REST_URL, DEFAULT_BITHUMB_WS_URL, DEFAULT_UPBIT_REST_URL,
    DEFAULT_UPBIT_WS_URL, ExchangeEndpoints, ServerSettings, SinkSettings, StreamSettings,
};
