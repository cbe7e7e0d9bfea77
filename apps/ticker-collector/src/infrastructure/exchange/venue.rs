//! Venue Protocol
//!
//! What differs between exchanges: where to connect, what to send after
//! connecting, how to decode a frame, and how to map one wire message onto a
//! [`CanonicalTick`]. The connection lifecycle, fan-out and sink hand-off live
//! in [`super::stream::StreamHandler`] and are shared by every venue.

use crate::domain::market::{CanonicalTick, Exchange};
use crate::domain::metadata::MarketMetadataCache;
use crate::domain::normalize::NormalizeError;

use super::codec::{CodecError, FrameKind};

/// Per-exchange wire protocol.
pub trait VenueProtocol: Send + Sync + 'static {
    /// One decoded ticker as the venue sends it.
    type Message: Send + 'static;

    /// Venue identity.
    fn exchange(&self) -> Exchange;

    /// WebSocket endpoint.
    fn url(&self) -> &str;

    /// Text payload to send right after the socket opens, if the venue needs one.
    ///
    /// # Errors
    ///
    /// Returns an error if the handshake cannot be serialized.
    fn handshake(&self, cache: &MarketMetadataCache) -> Result<Option<String>, CodecError>;

    /// Decode one frame into zero or more wire messages.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not a valid ticker payload.
    fn decode(&self, kind: FrameKind, payload: &[u8]) -> Result<Vec<Self::Message>, CodecError>;

    /// Venue code used as the metadata cache key.
    fn native_code(message: &Self::Message) -> &str;

    /// Map a wire message onto the canonical tick.
    ///
    /// # Errors
    ///
    /// Returns an error if a field violates the venue's conventions.
    fn normalize(
        &self,
        message: Self::Message,
        display_name: &str,
        captured_at_ms: i64,
    ) -> Result<CanonicalTick, NormalizeError>;
}
