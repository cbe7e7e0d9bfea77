//! Binance all-market ticker stream.
//!
//! The `!ticker@arr` stream pushes every USDT and non-USDT market without a
//! subscription message; markets absent from the metadata cache are dropped
//! downstream. The change rate is derived from the rolling open so it matches
//! the venue's own window.

use crate::domain::market::{CanonicalTick, Exchange};
use crate::domain::metadata::MarketMetadataCache;
use crate::domain::normalize::{
    NormalizeError, base_from_suffixed, change_rate_from_open, parse_decimal,
};

use super::codec::{CodecError, FrameKind, JsonCodec};
use super::messages::BinanceTickerMessage;
use super::venue::VenueProtocol;

/// Binance ticker protocol.
#[derive(Debug, Clone)]
pub struct BinanceProtocol {
    url: String,
    codec: JsonCodec,
}

impl BinanceProtocol {
    /// Create the protocol for a WebSocket endpoint.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            codec: JsonCodec::new(),
        }
    }
}

impl VenueProtocol for BinanceProtocol {
    type Message = BinanceTickerMessage;

    fn exchange(&self) -> Exchange {
        Exchange::Binance
    }

    fn url(&self) -> &str {
        &self.url
    }

    fn handshake(&self, _cache: &MarketMetadataCache) -> Result<Option<String>, CodecError> {
        Ok(None)
    }

    fn decode(&self, kind: FrameKind, payload: &[u8]) -> Result<Vec<Self::Message>, CodecError> {
        let first = payload.iter().find(|b| !b.is_ascii_whitespace());
        if first != Some(&b'[') {
            return Err(CodecError::InvalidFormat(
                "expected JSON array of tickers".to_string(),
            ));
        }
        self.codec.decode(kind, payload)
    }

    fn native_code(message: &Self::Message) -> &str {
        &message.symbol
    }

    fn normalize(
        &self,
        message: Self::Message,
        display_name: &str,
        captured_at_ms: i64,
    ) -> Result<CanonicalTick, NormalizeError> {
        let quote = Exchange::Binance.quote_currency();
        let base = base_from_suffixed(&message.symbol, quote)?;
        let last_price = parse_decimal("c", &message.last_price)?;
        let open_price = parse_decimal("o", &message.open_price)?;
        let quote_turnover = parse_decimal("q", &message.quote_volume)?;

        Ok(CanonicalTick {
            exchange: Exchange::Binance,
            base_asset: base.to_string(),
            quote_asset: quote.to_string(),
            display_name: display_name.to_string(),
            last_price,
            change_rate: change_rate_from_open(open_price, last_price)?,
            quote_turnover,
            capture_time_ms: captured_at_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;

    use super::*;

    fn message(symbol: &str, close: &str, open: &str) -> BinanceTickerMessage {
        BinanceTickerMessage {
            symbol: symbol.to_string(),
            last_price: close.to_string(),
            open_price: open.to_string(),
            quote_volume: "1000000.5".to_string(),
            event_time: None,
        }
    }

    #[test]
    fn normalizes_usdt_ticker() {
        let protocol = BinanceProtocol::new("wss://example.invalid/ws");
        let tick = protocol
            .normalize(message("BTCUSDT", "110", "100"), "BTC", 42)
            .unwrap();

        assert_eq!(tick.exchange, Exchange::Binance);
        assert_eq!(tick.base_asset, "BTC");
        assert_eq!(tick.quote_asset, "USDT");
        assert_eq!(tick.display_name, "BTC");
        assert_eq!(tick.last_price, Decimal::from(110));
        assert_eq!(tick.change_rate.to_string(), "0.10000000");
        assert_eq!(tick.quote_turnover, Decimal::from_str("1000000.5").unwrap());
        assert_eq!(tick.capture_time_ms, 42);
    }

    #[test]
    fn zero_open_gives_zero_rate() {
        let protocol = BinanceProtocol::new("wss://example.invalid/ws");
        let tick = protocol
            .normalize(message("NEWUSDT", "1.5", "0"), "NEW", 0)
            .unwrap();
        assert_eq!(tick.change_rate, Decimal::ZERO);
    }

    #[test]
    fn non_usdt_symbol_is_rejected() {
        let protocol = BinanceProtocol::new("wss://example.invalid/ws");
        let result = protocol.normalize(message("ETHBTC", "1", "1"), "ETH", 0);
        assert!(matches!(
            result,
            Err(NormalizeError::SymbolConvention { .. })
        ));
    }

    #[test]
    fn bad_price_is_rejected() {
        let protocol = BinanceProtocol::new("wss://example.invalid/ws");
        let result = protocol.normalize(message("BTCUSDT", "n/a", "1"), "BTC", 0);
        assert!(matches!(
            result,
            Err(NormalizeError::InvalidDecimal { field: "c", .. })
        ));
    }

    #[test]
    fn decodes_array_frames_only() {
        let protocol = BinanceProtocol::new("wss://example.invalid/ws");
        let frame = br#" [{"s":"BTCUSDT","c":"1","o":"1","q":"1"}]"#;
        assert_eq!(protocol.decode(FrameKind::Text, frame).unwrap().len(), 1);

        let error_frame = br#"{"code":-1121,"msg":"Invalid symbol."}"#;
        assert!(matches!(
            protocol.decode(FrameKind::Text, error_frame),
            Err(CodecError::InvalidFormat(_))
        ));
    }

    #[test]
    fn no_handshake() {
        let protocol = BinanceProtocol::new("wss://example.invalid/ws");
        assert!(
            protocol
                .handshake(&MarketMetadataCache::new())
                .unwrap()
                .is_none()
        );
    }
}
