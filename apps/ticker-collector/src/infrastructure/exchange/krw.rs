//! Upbit and Bithumb ticker streams.
//!
//! Both venues speak the same protocol: after connecting, the client sends a
//! ticket plus the list of `KRW-*` codes to subscribe, then receives one
//! ticker object per frame. Upbit sends binary frames that may be gzipped.
//!
//! The code list is read from the metadata cache at handshake time, so each
//! reconnect picks up whatever the last bootstrap loaded.

use crate::domain::market::{CanonicalTick, Exchange};
use crate::domain::metadata::MarketMetadataCache;
use crate::domain::normalize::{NormalizeError, base_from_prefixed};

use super::codec::{CodecError, FrameKind, JsonCodec};
use super::messages::{KrwTickerMessage, SubscriptionRequest};
use super::venue::VenueProtocol;

/// Ticker protocol shared by the KRW venues.
#[derive(Debug, Clone)]
pub struct KrwProtocol {
    exchange: Exchange,
    url: String,
    ticket: String,
    codec: JsonCodec,
}

impl KrwProtocol {
    /// Upbit protocol (gzip sniffing on binary frames).
    #[must_use]
    pub fn upbit(url: impl Into<String>, ticket: impl Into<String>) -> Self {
        Self {
            exchange: Exchange::Upbit,
            url: url.into(),
            ticket: ticket.into(),
            codec: JsonCodec::with_gzip_sniffing(),
        }
    }

    /// Bithumb protocol.
    #[must_use]
    pub fn bithumb(url: impl Into<String>, ticket: impl Into<String>) -> Self {
        Self {
            exchange: Exchange::Bithumb,
            url: url.into(),
            ticket: ticket.into(),
            codec: JsonCodec::new(),
        }
    }

    /// Build the subscription request for the codes currently cached.
    #[must_use]
    pub fn subscription(&self, cache: &MarketMetadataCache) -> SubscriptionRequest {
        SubscriptionRequest::ticker(
            self.ticket.clone(),
            cache.list_native_codes(self.exchange),
        )
    }
}

impl VenueProtocol for KrwProtocol {
    type Message = KrwTickerMessage;

    fn exchange(&self) -> Exchange {
        self.exchange
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn handshake(&self, cache: &MarketMetadataCache) -> Result<Option<String>, CodecError> {
        let request = self.subscription(cache);
        tracing::debug!(
            exchange = %self.exchange,
            codes = request.codes().len(),
            "Prepared ticker subscription"
        );
        self.codec.encode(&request).map(Some)
    }

    fn decode(&self, kind: FrameKind, payload: &[u8]) -> Result<Vec<Self::Message>, CodecError> {
        let message: KrwTickerMessage = self.codec.decode(kind, payload)?;
        Ok(vec![message])
    }

    fn native_code(message: &Self::Message) -> &str {
        &message.code
    }

    fn normalize(
        &self,
        message: Self::Message,
        display_name: &str,
        captured_at_ms: i64,
    ) -> Result<CanonicalTick, NormalizeError> {
        let quote = self.exchange.quote_currency();
        let base = base_from_prefixed(&message.code, quote)?;

        Ok(CanonicalTick {
            exchange: self.exchange,
            base_asset: base.to_string(),
            quote_asset: quote.to_string(),
            display_name: display_name.to_string(),
            last_price: message.trade_price,
            change_rate: message.signed_change_rate,
            quote_turnover: message.acc_trade_price_24h,
            capture_time_ms: captured_at_ms,
        })
    }
}
