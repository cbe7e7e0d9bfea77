//! Exchange Stream Handler
//!
//! One persistent WebSocket per exchange. The handler owns the connection
//! lifecycle and hands every decoded ticker through the same pipeline:
//!
//! ```text
//! frame ─▶ decode ─▶ [message…] ─▶ cache lookup ─▶ normalize ─▶ sink.save
//!            │                          │              │            │
//!          drop                       drop           drop       log, count
//! ```
//!
//! Frames are processed concurrently up to `max_in_flight`; a slow sink write
//! holds one slot and never blocks the socket beyond that bound. Every drop
//! path is counted and logged at debug level. The stream itself only ends on
//! transport failure, peer close or cancellation; the first two reconnect
//! with backoff.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt, TryStreamExt};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;

use super::codec::{CodecError, FrameKind};
use super::reconnect::{ReconnectConfig, ReconnectPolicy, run_with_backoff};
use super::state::{ConnectionState, FeedState};
use super::venue::VenueProtocol;
use crate::application::ports::{ExchangeTickerStream, TickerSink};
use crate::domain::market::{Exchange, now_millis};
use crate::domain::metadata::SharedMetadataCache;
use crate::infrastructure::metrics::{self, DropReason};

// =============================================================================
// Error Type
// =============================================================================

/// Errors that end one connection attempt.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// Handshake could not be serialized.
    #[error("handshake encoding failed: {0}")]
    Handshake(#[from] CodecError),
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration shared by every stream handler.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Reconnection configuration.
    pub reconnect: ReconnectConfig,
    /// Frames (and per-frame tickers) processed concurrently.
    pub max_in_flight: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            reconnect: ReconnectConfig::default(),
            max_in_flight: 32,
        }
    }
}

impl StreamConfig {
    /// Create configuration from `StreamSettings`.
    #[must_use]
    pub const fn from_stream_settings(settings: &crate::StreamSettings) -> Self {
        Self {
            reconnect: ReconnectConfig::from_stream_settings(settings),
            max_in_flight: settings.max_in_flight,
        }
    }
}

// =============================================================================
// Stream Handler
// =============================================================================

/// Persistent ticker stream for one venue.
pub struct StreamHandler<V: VenueProtocol> {
    venue: V,
    config: StreamConfig,
    cache: SharedMetadataCache,
    sink: Arc<dyn TickerSink>,
    state: Arc<FeedState>,
    cancel: CancellationToken,
}

impl<V: VenueProtocol> StreamHandler<V> {
    /// Create a new stream handler.
    #[must_use]
    pub fn new(
        venue: V,
        config: StreamConfig,
        cache: SharedMetadataCache,
        sink: Arc<dyn TickerSink>,
        cancel: CancellationToken,
    ) -> Self {
        let state = Arc::new(FeedState::new(venue.exchange()));
        Self {
            venue,
            config,
            cache,
            sink,
            state,
            cancel,
        }
    }

    /// Feed state for health reporting.
    #[must_use]
    pub fn state(&self) -> Arc<FeedState> {
        Arc::clone(&self.state)
    }

    /// Run the connection loop until cancelled.
    pub async fn run(&self) {
        let mut policy = ReconnectPolicy::new(self.config.reconnect.clone());
        run_with_backoff(&self.state, &mut policy, &self.cancel, || {
            self.connect_and_stream()
        })
        .await;
        tracing::info!(exchange = %self.venue.exchange(), "Ticker stream stopped");
    }

    /// Connect, subscribe and process frames until the socket ends.
    async fn connect_and_stream(&self) -> Result<(), StreamError> {
        let exchange = self.venue.exchange();
        tracing::info!(%exchange, url = %self.venue.url(), "Connecting to ticker stream");

        let (mut ws_stream, _response) =
            tokio_tungstenite::connect_async(self.venue.url()).await?;

        if let Some(handshake) = self.venue.handshake(&self.cache)? {
            ws_stream.send(Message::Text(handshake.into())).await?;
        }

        self.state.set_state(ConnectionState::Streaming);
        tracing::info!(%exchange, "Ticker stream connected");

        ws_stream
            .try_for_each_concurrent(self.config.max_in_flight, |message| async move {
                self.handle_message(message).await;
                Ok(())
            })
            .await?;

        Ok(())
    }

    async fn handle_message(&self, message: Message) {
        match message {
            Message::Text(text) => {
                self.process_frame(FrameKind::Text, text.as_bytes()).await;
            }
            Message::Binary(data) => {
                self.process_frame(FrameKind::Binary, &data).await;
            }
            Message::Close(frame) => {
                tracing::debug!(
                    exchange = %self.venue.exchange(),
                    ?frame,
                    "Server sent close frame"
                );
            }
            _ => {}
        }
    }

    /// Decode one frame and forward every ticker it carries.
    ///
    /// Never fails: every error is a drop.
    pub async fn process_frame(&self, kind: FrameKind, payload: &[u8]) {
        let exchange = self.venue.exchange();
        let started = Instant::now();
        self.state.record_frame();
        metrics::record_frame_received(exchange);

        let messages = match self.venue.decode(kind, payload) {
            Ok(messages) => messages,
            Err(e) => {
                tracing::debug!(%exchange, error = %e, "Dropping undecodable frame");
                self.drop_tick(DropReason::Decode);
                return;
            }
        };

        futures_util::stream::iter(messages)
            .for_each_concurrent(self.config.max_in_flight, |message| self.forward(message))
            .await;

        metrics::record_processing_duration(exchange, started.elapsed());
    }

    async fn forward(&self, message: V::Message) {
        let exchange = self.venue.exchange();

        let Some(descriptor) = self.cache.find(exchange, V::native_code(&message)) else {
            tracing::trace!(
                %exchange,
                code = V::native_code(&message),
                "No metadata for market"
            );
            self.drop_tick(DropReason::UnknownMarket);
            return;
        };

        let tick = match self
            .venue
            .normalize(message, &descriptor.display_name, now_millis())
        {
            Ok(tick) => tick,
            Err(e) => {
                tracing::debug!(%exchange, error = %e, "Dropping unnormalizable ticker");
                self.drop_tick(DropReason::Normalize);
                return;
            }
        };

        match self.sink.save(&tick).await {
            Ok(()) => {
                self.state.record_published();
                metrics::record_tick_published(exchange);
            }
            Err(e) => {
                tracing::debug!(
                    %exchange,
                    base = %tick.base_asset,
                    error = %e,
                    "Sink write failed"
                );
                metrics::record_sink_error(exchange);
                self.drop_tick(DropReason::Sink);
            }
        }
    }

    fn drop_tick(&self, reason: DropReason) {
        self.state.record_dropped();
        metrics::record_tick_dropped(self.venue.exchange(), reason);
    }
}

#[async_trait]
impl<V: VenueProtocol> ExchangeTickerStream for StreamHandler<V> {
    fn exchange(&self) -> Exchange {
        self.venue.exchange()
    }

    async fn connect(self: Arc<Self>) {
        self.run().await;
    }
}

// =============================================================================
// Tests
// =============================================================================
