//! Feed State Tracking
//!
//! Per-exchange connection state and counters, shared between the stream
//! handler that updates them and the health server that reports them.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::market::Exchange;
use crate::infrastructure::metrics;

/// Connection lifecycle of one exchange stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No live connection; waiting out a backoff delay or not started.
    Disconnected,
    /// Opening the socket or sending the subscription handshake.
    Connecting,
    /// Handshake complete, frames are flowing.
    Streaming,
}

impl ConnectionState {
    /// Lower-case name used in health output.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Streaming => "streaming",
        }
    }
}

/// Tracks the state of an upstream exchange connection.
#[derive(Debug)]
pub struct FeedState {
    exchange: Exchange,
    state: parking_lot::RwLock<ConnectionState>,
    last_streaming_at: parking_lot::RwLock<Option<DateTime<Utc>>>,
    reconnect_attempts: AtomicU64,
    frames_received: AtomicU64,
    ticks_published: AtomicU64,
    ticks_dropped: AtomicU64,
}

impl FeedState {
    /// Create a disconnected feed state.
    #[must_use]
    pub const fn new(exchange: Exchange) -> Self {
        Self {
            exchange,
            state: parking_lot::RwLock::new(ConnectionState::Disconnected),
            last_streaming_at: parking_lot::RwLock::new(None),
            reconnect_attempts: AtomicU64::new(0),
            frames_received: AtomicU64::new(0),
            ticks_published: AtomicU64::new(0),
            ticks_dropped: AtomicU64::new(0),
        }
    }

    /// Exchange this state belongs to.
    #[must_use]
    pub const fn exchange(&self) -> Exchange {
        self.exchange
    }

    /// Set the connection state.
    pub fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
        if state == ConnectionState::Streaming {
            *self.last_streaming_at.write() = Some(Utc::now());
        }
        metrics::set_connection_state(self.exchange, state);
    }

    /// Get the current connection state.
    #[must_use]
    pub fn get_state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// When the feed last reached `Streaming`.
    #[must_use]
    pub fn last_streaming_at(&self) -> Option<DateTime<Utc>> {
        *self.last_streaming_at.read()
    }

    /// Increment reconnect attempts.
    pub fn increment_reconnect_attempts(&self) {
        self.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one inbound frame.
    pub fn record_frame(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one tick accepted by the sink.
    pub fn record_published(&self) {
        self.ticks_published.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one dropped frame or tick.
    pub fn record_dropped(&self) {
        self.ticks_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Get reconnect attempts count.
    #[must_use]
    pub fn get_reconnect_attempts(&self) -> u64 {
        self.reconnect_attempts.load(Ordering::Relaxed)
    }

    /// Get frames received count.
    #[must_use]
    pub fn get_frames_received(&self) -> u64 {
        self.frames_received.load(Ordering::Relaxed)
    }

    /// Get ticks published count.
    #[must_use]
    pub fn get_ticks_published(&self) -> u64 {
        self.ticks_published.load(Ordering::Relaxed)
    }

    /// Get dropped count.
    #[must_use]
    pub fn get_ticks_dropped(&self) -> u64 {
        self.ticks_dropped.load(Ordering::Relaxed)
    }
}
