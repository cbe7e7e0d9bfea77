//! Collector Configuration Settings
//!
//! Configuration types for the ticker collector, loaded from environment variables.

use std::time::Duration;

use crate::domain::market::Exchange;

/// Default Upbit WebSocket endpoint.
pub const DEFAULT_UPBIT_WS_URL: &str = "wss://api.upbit.com/websocket/v1";
/// Default Upbit market list endpoint.
pub const DEFAULT_UPBIT_REST_URL: &str = "https://api.upbit.com/v1/market/all";
/// Default Bithumb WebSocket endpoint.
pub const DEFAULT_BITHUMB_WS_URL: &str = "wss://ws-api.bithumb.com/websocket/v1";
/// Default Bithumb market list endpoint.
pub const DEFAULT_BITHUMB_REST_URL: &str = "https://api.bithumb.com/v1/market/all";
/// Default Binance all-market ticker stream.
pub const DEFAULT_BINANCE_WS_URL: &str = "wss://stream.binance.com:9443/ws/!ticker@arr";
/// Default Binance 24h ticker endpoint.
pub const DEFAULT_BINANCE_REST_URL: &str = "https://api.binance.com/api/v3/ticker/24hr";

/// Redis sink settings.
#[derive(Debug, Clone)]
pub struct SinkSettings {
    /// Redis connection URL.
    pub redis_url: String,
    /// Key prefix (`<prefix>:<EXCHANGE>:<BASE>/<QUOTE>`).
    pub key_prefix: String,
    /// Time-to-live of every written key.
    pub ttl: Duration,
}

impl Default for SinkSettings {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            key_prefix: "ticker".to_string(),
            ttl: Duration::from_secs(30),
        }
    }
}

/// WebSocket and REST endpoints of one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeEndpoints {
    /// Ticker stream URL.
    pub ws_url: String,
    /// Market catalog URL.
    pub rest_url: String,
}

impl ExchangeEndpoints {
    /// Built-in endpoints for an exchange.
    #[must_use]
    pub fn default_for(exchange: Exchange) -> Self {
        let (ws_url, rest_url) = match exchange {
            Exchange::Upbit => (DEFAULT_UPBIT_WS_URL, DEFAULT_UPBIT_REST_URL),
            Exchange::Bithumb => (DEFAULT_BITHUMB_WS_URL, DEFAULT_BITHUMB_REST_URL),
            Exchange::Binance => (DEFAULT_BINANCE_WS_URL, DEFAULT_BINANCE_REST_URL),
        };
        Self {
            ws_url: ws_url.to_string(),
            rest_url: rest_url.to_string(),
        }
    }

    fn from_env(exchange: Exchange) -> Self {
        let defaults = Self::default_for(exchange);
        let name = exchange.as_str();
        Self {
            ws_url: parse_env_string(&format!("{name}_WS_URL"), defaults.ws_url),
            rest_url: parse_env_string(&format!("{name}_REST_URL"), defaults.rest_url),
        }
    }
}

/// Stream processing and reconnection settings.
#[derive(Debug, Clone)]
pub struct StreamSettings {
    /// Ticket sent in the KRW venues' subscription handshake.
    pub subscription_ticket: String,
    /// Maximum frames/tickers processed concurrently per stream.
    pub max_in_flight: usize,
    /// Initial reconnection delay.
    pub reconnect_delay_initial: Duration,
    /// Maximum reconnection delay.
    pub reconnect_delay_max: Duration,
    /// Reconnection delay multiplier for exponential backoff.
    pub reconnect_delay_multiplier: f64,
    /// Jitter fraction applied to every delay.
    pub reconnect_jitter: f64,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            subscription_ticket: "ticker-collector".to_string(),
            max_in_flight: 32,
            reconnect_delay_initial: Duration::from_secs(1),
            reconnect_delay_max: Duration::from_secs(60),
            reconnect_delay_multiplier: 2.0,
            reconnect_jitter: 0.1,
        }
    }
}

/// Server port settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// Health check and metrics HTTP port.
    pub health_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { health_port: 8083 }
    }
}

/// Complete collector configuration.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Redis sink settings.
    pub sink: SinkSettings,
    /// Upbit endpoints.
    pub upbit: ExchangeEndpoints,
    /// Bithumb endpoints.
    pub bithumb: ExchangeEndpoints,
    /// Binance endpoints.
    pub binance: ExchangeEndpoints,
    /// Stream settings.
    pub stream: StreamSettings,
    /// Server port settings.
    pub server: ServerSettings,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            sink: SinkSettings::default(),
            upbit: ExchangeEndpoints::default_for(Exchange::Upbit),
            bithumb: ExchangeEndpoints::default_for(Exchange::Bithumb),
            binance: ExchangeEndpoints::default_for(Exchange::Binance),
            stream: StreamSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

impl CollectorConfig {
    /// Create configuration from environment variables.
    ///
    /// Every key is optional. Unparseable values fall back to the default,
    /// except for keys with a validity rule, which are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the TTL, in-flight limit,
    /// multiplier or jitter is out of range.
    pub fn from_env() -> Result<Self, ConfigError> {
        let sink_defaults = SinkSettings::default();
        let ttl_secs = parse_env_u64("TICKER_REDIS_TTL_SECONDS", sink_defaults.ttl.as_secs());
        if ttl_secs == 0 {
            return Err(ConfigError::InvalidValue {
                key: "TICKER_REDIS_TTL_SECONDS".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        let sink = SinkSettings {
            redis_url: parse_env_string("REDIS_URL", sink_defaults.redis_url),
            key_prefix: parse_env_string("TICKER_REDIS_KEY_PREFIX", sink_defaults.key_prefix),
            ttl: Duration::from_secs(ttl_secs),
        };

        let stream_defaults = StreamSettings::default();
        let stream = StreamSettings {
            subscription_ticket: parse_env_string(
                "COLLECTOR_SUBSCRIPTION_TICKET",
                stream_defaults.subscription_ticket,
            ),
            max_in_flight: parse_env_usize(
                "COLLECTOR_MAX_IN_FLIGHT",
                stream_defaults.max_in_flight,
            ),
            reconnect_delay_initial: parse_env_duration_millis(
                "COLLECTOR_RECONNECT_DELAY_INITIAL_MS",
                stream_defaults.reconnect_delay_initial,
            ),
            reconnect_delay_max: parse_env_duration_secs(
                "COLLECTOR_RECONNECT_DELAY_MAX_SECS",
                stream_defaults.reconnect_delay_max,
            ),
            reconnect_delay_multiplier: parse_env_f64(
                "COLLECTOR_RECONNECT_DELAY_MULTIPLIER",
                stream_defaults.reconnect_delay_multiplier,
            ),
            reconnect_jitter: parse_env_f64(
                "COLLECTOR_RECONNECT_JITTER",
                stream_defaults.reconnect_jitter,
            ),
        };
        stream.validate()?;

        let server = ServerSettings {
            health_port: parse_env_u16(
                "COLLECTOR_HEALTH_PORT",
                ServerSettings::default().health_port,
            ),
        };

        Ok(Self {
            sink,
            upbit: ExchangeEndpoints::from_env(Exchange::Upbit),
            bithumb: ExchangeEndpoints::from_env(Exchange::Bithumb),
            binance: ExchangeEndpoints::from_env(Exchange::Binance),
            stream,
            server,
        })
    }

    /// Endpoints configured for an exchange.
    #[must_use]
    pub const fn endpoints(&self, exchange: Exchange) -> &ExchangeEndpoints {
        match exchange {
            Exchange::Upbit => &self.upbit,
            Exchange::Bithumb => &self.bithumb,
            Exchange::Binance => &self.binance,
        }
    }
}

impl StreamSettings {
    /// Check the values that have a validity rule.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_in_flight == 0 {
            return Err(ConfigError::InvalidValue {
                key: "COLLECTOR_MAX_IN_FLIGHT".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if !(self.reconnect_delay_multiplier.is_finite() && self.reconnect_delay_multiplier >= 1.0)
        {
            return Err(ConfigError::InvalidValue {
                key: "COLLECTOR_RECONNECT_DELAY_MULTIPLIER".to_string(),
                reason: "must be at least 1.0".to_string(),
            });
        }
        if !(0.0..1.0).contains(&self.reconnect_jitter) {
            return Err(ConfigError::InvalidValue {
                key: "COLLECTOR_RECONNECT_JITTER".to_string(),
                reason: "must be in [0.0, 1.0)".to_string(),
            });
        }
        Ok(())
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable has a value outside its valid range.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue {
        /// Environment variable name.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },
}

fn parse_env_string(key: &str, default: String) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or(default)
}

fn parse_env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_f64(key: &str, default: f64) -> f64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_env_duration_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_secs)
}

fn parse_env_duration_millis(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}
