//! Reconnection Policy
//!
//! Implements exponential backoff with jitter for WebSocket reconnection,
//! plus the retry loop every stream handler runs its connection inside.
//! The loop never gives up: only cancellation ends it.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use super::state::{ConnectionState, FeedState};
use crate::infrastructure::metrics;

/// Configuration for reconnection behavior.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Initial delay before first reconnection attempt.
    pub initial_delay: Duration,
    /// Maximum delay between reconnection attempts.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff (e.g., 2.0 doubles delay each attempt).
    pub multiplier: f64,
    /// Jitter factor as a fraction (e.g., 0.1 = ±10% randomization).
    pub jitter_factor: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl ReconnectConfig {
    /// Create a new configuration with custom values.
    #[must_use]
    pub const fn new(
        initial_delay: Duration,
        max_delay: Duration,
        multiplier: f64,
        jitter_factor: f64,
    ) -> Self {
        Self {
            initial_delay,
            max_delay,
            multiplier,
            jitter_factor,
        }
    }

    /// Create configuration from `StreamSettings`.
    #[must_use]
    pub const fn from_stream_settings(settings: &crate::StreamSettings) -> Self {
        Self {
            initial_delay: settings.reconnect_delay_initial,
            max_delay: settings.reconnect_delay_max,
            multiplier: settings.reconnect_delay_multiplier,
            jitter_factor: settings.reconnect_jitter,
        }
    }
}

/// Reconnection policy implementing exponential backoff with jitter.
///
/// # Example
///
/// ```rust
/// use ticker_collector::infrastructure::exchange::reconnect::{ReconnectConfig, ReconnectPolicy};
/// use std::time::Duration;
///
/// let config = ReconnectConfig { jitter_factor: 0.0, ..ReconnectConfig::default() };
/// let mut policy = ReconnectPolicy::new(config);
///
/// assert_eq!(policy.next_delay(), Duration::from_secs(1));
/// assert_eq!(policy.next_delay(), Duration::from_secs(2));
///
/// // Simulate a connection that reached streaming
/// policy.reset();
/// assert_eq!(policy.next_delay(), Duration::from_secs(1));
/// ```
#[derive(Debug)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    current_delay: Duration,
    attempt_count: u64,
}

impl ReconnectPolicy {
    /// Create a new reconnection policy.
    #[must_use]
    pub const fn new(config: ReconnectConfig) -> Self {
        let initial_delay = config.initial_delay;
        Self {
            config,
            current_delay: initial_delay,
            attempt_count: 0,
        }
    }

    /// Get the next delay duration, applying exponential backoff with jitter.
    pub fn next_delay(&mut self) -> Duration {
        self.attempt_count += 1;

        let delay_with_jitter = self.apply_jitter(self.current_delay);

        #[allow(clippy::cast_precision_loss)]
        let scaled = (self.current_delay.as_millis() as f64 * self.config.multiplier).round();
        let next_millis = if scaled.is_finite() && scaled > 0.0 {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            {
                scaled as u128
            }
        } else {
            0
        };
        let capped = next_millis.min(self.config.max_delay.as_millis());
        self.current_delay = Duration::from_millis(u64::try_from(capped).unwrap_or(u64::MAX));

        delay_with_jitter
    }

    /// Reset the policy after a connection reached streaming.
    pub const fn reset(&mut self) {
        self.current_delay = self.config.initial_delay;
        self.attempt_count = 0;
    }

    /// Attempts since the last reset.
    #[must_use]
    pub const fn attempt_count(&self) -> u64 {
        self.attempt_count
    }

    fn apply_jitter(&self, duration: Duration) -> Duration {
        if self.config.jitter_factor <= 0.0 {
            return duration;
        }

        #[allow(clippy::cast_precision_loss)]
        let base_millis = duration.as_millis() as f64;
        let jitter_range = base_millis * self.config.jitter_factor;
        let mut rng = rand::rng();
        let jitter: f64 = rng.random_range(-jitter_range..=jitter_range);
        let adjusted_millis = (base_millis + jitter).max(1.0);

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let adjusted_u64 = adjusted_millis as u64;
        Duration::from_millis(adjusted_u64)
    }
}

/// Run `session` forever, reconnecting with backoff after every termination.
///
/// Each call to `session` is one connection attempt. The feed state moves to
/// `Connecting` before the call; the session itself marks `Streaming` once
/// its handshake succeeded. Whatever the outcome, the state returns to
/// `Disconnected` and the next attempt waits for the policy's delay. A session
/// that reached `Streaming` resets the backoff.
///
/// Returns only when `cancel` fires.
pub async fn run_with_backoff<F, Fut, E>(
    feed: &FeedState,
    policy: &mut ReconnectPolicy,
    cancel: &CancellationToken,
    mut session: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    let exchange = feed.exchange();

    loop {
        if cancel.is_cancelled() {
            feed.set_state(ConnectionState::Disconnected);
            return;
        }

        feed.set_state(ConnectionState::Connecting);

        let outcome = tokio::select! {
            () = cancel.cancelled() => {
                feed.set_state(ConnectionState::Disconnected);
                return;
            }
            outcome = session() => outcome,
        };

        let reached_streaming = feed.get_state() == ConnectionState::Streaming;
        feed.set_state(ConnectionState::Disconnected);

        match outcome {
            Ok(()) => tracing::info!(%exchange, "Connection closed by peer"),
            Err(e) => tracing::warn!(%exchange, error = %e, "Connection error"),
        }

        if reached_streaming {
            policy.reset();
        }

        let delay = policy.next_delay();
        let attempt = policy.attempt_count();
        feed.increment_reconnect_attempts();
        metrics::record_reconnect(exchange);

        #[allow(clippy::cast_possible_truncation)]
        let delay_ms = delay.as_millis() as u64;
        tracing::info!(%exchange, attempt, delay_ms, "Reconnecting");

        tokio::select! {
            () = cancel.cancelled() => {
                tracing::info!(%exchange, "Cancelled during reconnect delay");
                return;
            }
            () = tokio::time::sleep(delay) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::time::Instant;

    use super::*;
    use crate::domain::market::Exchange;

    fn no_jitter() -> ReconnectConfig {
        ReconnectConfig {
            jitter_factor: 0.0,
            ..ReconnectConfig::default()
        }
    }

    #[test]
    fn default_config_values() {
        let config = ReconnectConfig::default();
        assert_eq!(config.initial_delay, Duration::from_secs(1));
        assert_eq!(config.max_delay, Duration::from_secs(60));
        assert!((config.multiplier - 2.0).abs() < f64::EPSILON);
        assert!((config.jitter_factor - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn policy_exponential_backoff() {
        let mut policy = ReconnectPolicy::new(ReconnectConfig {
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
            jitter_factor: 0.0,
        });

        assert_eq!(policy.next_delay(), Duration::from_millis(100));
        assert_eq!(policy.next_delay(), Duration::from_millis(200));
        assert_eq!(policy.next_delay(), Duration::from_millis(400));
        assert_eq!(policy.next_delay(), Duration::from_millis(800));
    }

    #[test]
    fn policy_caps_at_sixty_seconds() {
        let mut policy = ReconnectPolicy::new(no_jitter());
        let delays: Vec<u64> = (0..10).map(|_| policy.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16, 32, 60, 60, 60, 60]);
    }

    #[test]
    fn policy_reset() {
        let mut policy = ReconnectPolicy::new(no_jitter());

        let _ = policy.next_delay();
        let _ = policy.next_delay();
        assert_eq!(policy.attempt_count(), 2);

        policy.reset();

        assert_eq!(policy.attempt_count(), 0);
        assert_eq!(policy.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn policy_jitter_bounds() {
        for _ in 0..100 {
            let mut policy = ReconnectPolicy::new(ReconnectConfig {
                initial_delay: Duration::from_millis(1000),
                max_delay: Duration::from_secs(10),
                multiplier: 2.0,
                jitter_factor: 0.1,
            });

            let millis = policy.next_delay().as_millis();
            assert!(millis >= 900, "delay {millis}ms is below minimum 900ms");
            assert!(millis <= 1100, "delay {millis}ms is above maximum 1100ms");
        }
    }

    #[test]
    fn policy_never_exhausts() {
        let mut policy = ReconnectPolicy::new(no_jitter());
        for _ in 0..10_000 {
            assert!(policy.next_delay() <= Duration::from_secs(60));
        }
        assert_eq!(policy.attempt_count(), 10_000);
    }

    #[tokio::test(start_paused = true)]
    async fn consecutive_failures_follow_backoff_sequence() {
        let feed = FeedState::new(Exchange::Binance);
        let mut policy = ReconnectPolicy::new(no_jitter());
        let cancel = CancellationToken::new();
        let mut attempts: Vec<Instant> = Vec::new();

        let stop = cancel.clone();
        run_with_backoff(&feed, &mut policy, &cancel, || {
            attempts.push(Instant::now());
            if attempts.len() == 10 {
                stop.cancel();
            }
            std::future::ready(Err::<(), _>("connection refused"))
        })
        .await;

        assert_eq!(attempts.len(), 10);
        let gaps: Vec<Duration> = attempts.windows(2).map(|w| w[1] - w[0]).collect();
        let expected = [1, 2, 4, 8, 16, 32, 60, 60, 60];
        for (gap, secs) in gaps.iter().zip(expected) {
            let want = Duration::from_secs(secs);
            assert!(
                *gap >= want && *gap < want + Duration::from_millis(50),
                "gap {gap:?} expected ~{want:?}"
            );
        }
        assert_eq!(feed.get_reconnect_attempts(), 9);
        assert_eq!(feed.get_state(), ConnectionState::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn streaming_session_resets_backoff() {
        let feed = Arc::new(FeedState::new(Exchange::Upbit));
        let mut policy = ReconnectPolicy::new(no_jitter());
        let cancel = CancellationToken::new();
        let mut attempts: Vec<Instant> = Vec::new();

        let stop = cancel.clone();
        let session_feed = Arc::clone(&feed);
        run_with_backoff(&feed, &mut policy, &cancel, || {
            attempts.push(Instant::now());
            let call = attempts.len();
            // Calls 1-3 fail before streaming; call 4 streams and then drops.
            if call == 4 {
                session_feed.set_state(ConnectionState::Streaming);
            }
            if call == 5 {
                stop.cancel();
            }
            std::future::ready(Err::<(), _>("reset by peer"))
        })
        .await;

        let gaps: Vec<u64> = attempts
            .windows(2)
            .map(|w| (w[1] - w[0]).as_secs())
            .collect();
        assert_eq!(gaps, vec![1, 2, 4, 1]);
    }

    #[tokio::test]
    async fn cancelled_before_start_never_connects() {
        let feed = FeedState::new(Exchange::Bithumb);
        let mut policy = ReconnectPolicy::new(no_jitter());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let mut calls = 0;
        run_with_backoff(&feed, &mut policy, &cancel, || {
            calls += 1;
            std::future::ready(Ok::<(), &str>(()))
        })
        .await;

        assert_eq!(calls, 0);
    }
}
