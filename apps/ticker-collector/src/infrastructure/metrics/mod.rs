//! Prometheus Metrics Module
//!
//! Exposes application metrics via Prometheus format for monitoring.
//!
//! # Metrics Categories
//!
//! - **Frames**: Frames received per exchange
//! - **Ticks**: Ticks published and dropped (by reason)
//! - **Connections**: Stream state and reconnection attempts
//! - **Sink**: Failed sink writes
//! - **Latency**: Per-frame processing time
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the health server port. Recording
//! before [`init_metrics`] is a no-op.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::domain::market::Exchange;
use crate::infrastructure::exchange::state::ConnectionState;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Idempotent: later calls return the handle installed by the first.
///
/// # Errors
///
/// Returns an error if the global recorder cannot be installed.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let handle = PrometheusBuilder::new().install_recorder()?;
    register_metrics();
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "ticker_collector_frames_received_total",
        "Total WebSocket frames received from exchanges"
    );
    describe_counter!(
        "ticker_collector_ticks_published_total",
        "Total canonical ticks accepted by the sink"
    );
    describe_counter!(
        "ticker_collector_ticks_dropped_total",
        "Total frames or ticks dropped, by reason"
    );
    describe_counter!(
        "ticker_collector_sink_errors_total",
        "Total failed sink writes"
    );
    describe_counter!(
        "ticker_collector_reconnects_total",
        "Total WebSocket reconnection attempts"
    );
    describe_gauge!(
        "ticker_collector_connection_state",
        "Stream state per exchange (0 disconnected, 1 connecting, 2 streaming)"
    );
    describe_histogram!(
        "ticker_collector_frame_processing_seconds",
        "Time from frame receipt to the last sink write it triggered"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Why a frame or tick never reached the sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Frame could not be decompressed or parsed.
    Decode,
    /// Market code absent from the metadata cache.
    UnknownMarket,
    /// Wire message violated the venue's conventions.
    Normalize,
    /// Sink rejected the write.
    Sink,
}

impl DropReason {
    /// Label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Decode => "decode",
            Self::UnknownMarket => "metadata_miss",
            Self::Normalize => "normalize",
            Self::Sink => "sink",
        }
    }
}

const fn exchange_label(exchange: Exchange) -> &'static str {
    match exchange {
        Exchange::Upbit => "upbit",
        Exchange::Bithumb => "bithumb",
        Exchange::Binance => "binance",
    }
}

/// Record a frame received from an exchange.
pub fn record_frame_received(exchange: Exchange) {
    counter!(
        "ticker_collector_frames_received_total",
        "exchange" => exchange_label(exchange)
    )
    .increment(1);
}

/// Record a tick accepted by the sink.
pub fn record_tick_published(exchange: Exchange) {
    counter!(
        "ticker_collector_ticks_published_total",
        "exchange" => exchange_label(exchange)
    )
    .increment(1);
}

/// Record a dropped frame or tick.
pub fn record_tick_dropped(exchange: Exchange, reason: DropReason) {
    counter!(
        "ticker_collector_ticks_dropped_total",
        "exchange" => exchange_label(exchange),
        "reason" => reason.as_str()
    )
    .increment(1);
}

/// Record a failed sink write.
pub fn record_sink_error(exchange: Exchange) {
    counter!(
        "ticker_collector_sink_errors_total",
        "exchange" => exchange_label(exchange)
    )
    .increment(1);
}

/// Record a WebSocket reconnection attempt.
pub fn record_reconnect(exchange: Exchange) {
    counter!(
        "ticker_collector_reconnects_total",
        "exchange" => exchange_label(exchange)
    )
    .increment(1);
}

/// Update the connection state gauge of an exchange.
pub fn set_connection_state(exchange: Exchange, state: ConnectionState) {
    let value = match state {
        ConnectionState::Disconnected => 0.0,
        ConnectionState::Connecting => 1.0,
        ConnectionState::Streaming => 2.0,
    };
    gauge!(
        "ticker_collector_connection_state",
        "exchange" => exchange_label(exchange)
    )
    .set(value);
}

/// Record frame processing duration.
pub fn record_processing_duration(exchange: Exchange, duration: Duration) {
    histogram!(
        "ticker_collector_frame_processing_seconds",
        "exchange" => exchange_label(exchange)
    )
    .record(duration.as_secs_f64());
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drop_reason_as_str() {
        assert_eq!(DropReason::Decode.as_str(), "decode");
        assert_eq!(DropReason::UnknownMarket.as_str(), "metadata_miss");
        assert_eq!(DropReason::Normalize.as_str(), "normalize");
        assert_eq!(DropReason::Sink.as_str(), "sink");
    }

    #[test]
    fn exchange_labels_are_lower_case() {
        for exchange in Exchange::all() {
            assert_eq!(
                exchange_label(*exchange),
                exchange.as_str().to_ascii_lowercase()
            );
        }
    }

    #[test]
    fn recording_without_recorder_is_noop() {
        record_frame_received(Exchange::Upbit);
        record_tick_dropped(Exchange::Binance, DropReason::Sink);
        set_connection_state(Exchange::Bithumb, ConnectionState::Streaming);
        record_processing_duration(Exchange::Upbit, Duration::from_millis(3));
    }
}
