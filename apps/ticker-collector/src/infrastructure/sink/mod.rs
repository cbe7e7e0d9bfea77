//! Redis Ticker Sink
//!
//! Stores the latest canonical tick of every market as a JSON string under
//! `<prefix>:<EXCHANGE>:<BASE>/<QUOTE>`, with a TTL so that a silent feed
//! ages out instead of serving stale prices.

use std::time::Duration;

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::application::ports::{SinkError, TickerSink};
use crate::domain::market::CanonicalTick;
use crate::infrastructure::config::SinkSettings;

/// Redis-backed [`TickerSink`].
///
/// The [`ConnectionManager`] multiplexes all writes over one connection and
/// reconnects on its own; it is cheap to clone per call.
#[derive(Clone)]
pub struct RedisTickerSink {
    connection: ConnectionManager,
    key_prefix: String,
    ttl_secs: u64,
}

impl std::fmt::Debug for RedisTickerSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisTickerSink")
            .field("key_prefix", &self.key_prefix)
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl RedisTickerSink {
    /// Connect to Redis using the configured URL.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Backend`] if the URL is invalid or the first
    /// connection cannot be established.
    pub async fn connect(settings: &SinkSettings) -> Result<Self, SinkError> {
        let client = redis::Client::open(settings.redis_url.as_str())
            .map_err(|e| SinkError::Backend(e.to_string()))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| SinkError::Backend(e.to_string()))?;

        tracing::info!(
            key_prefix = %settings.key_prefix,
            ttl_secs = settings.ttl.as_secs(),
            "Connected to Redis"
        );

        Ok(Self::new(connection, settings.key_prefix.clone(), settings.ttl))
    }

    /// Wrap an existing connection.
    #[must_use]
    pub fn new(connection: ConnectionManager, key_prefix: String, ttl: Duration) -> Self {
        Self {
            connection,
            key_prefix,
            ttl_secs: ttl_seconds(ttl),
        }
    }
}

/// Whole seconds for `SET EX`, never below one.
fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

#[async_trait]
impl TickerSink for RedisTickerSink {
    async fn save(&self, tick: &CanonicalTick) -> Result<(), SinkError> {
        let key = tick.sink_key(&self.key_prefix);
        let payload = serde_json::to_string(tick)?;

        let mut connection = self.connection.clone();
        connection
            .set_ex::<_, _, ()>(&key, payload, self.ttl_secs)
            .await
            .map_err(|e| SinkError::Backend(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_is_whole_seconds() {
        assert_eq!(ttl_seconds(Duration::from_secs(30)), 30);
        assert_eq!(ttl_seconds(Duration::from_millis(2500)), 2);
    }

    #[test]
    fn sub_second_ttl_rounds_up_to_one() {
        assert_eq!(ttl_seconds(Duration::from_millis(200)), 1);
    }
}
