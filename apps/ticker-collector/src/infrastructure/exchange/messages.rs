//! Exchange WebSocket Message Types
//!
//! Wire format types for the ticker streams. Only the fields the collector
//! normalizes are mapped; everything else in a frame is ignored.
//!
//! # Binance (`!ticker@arr`)
//!
//! One text frame carries a JSON array of 24h rolling tickers. Prices are
//! strings:
//!
//! ```json
//! [{"e":"24hrTicker","E":1718000000000,"s":"BTCUSDT","c":"67000.10","o":"66000.00","q":"123456.7"}]
//! ```
//!
//! # Upbit / Bithumb
//!
//! One frame per ticker (Upbit binary, possibly gzip; Bithumb text). Prices
//! are JSON numbers:
//!
//! ```json
//! {"type":"ticker","code":"KRW-BTC","trade_price":95000000,"signed_change_rate":0.0123,
//!  "acc_trade_price_24h":123456789.5,"timestamp":1718000000000}
//! ```
//!
//! The subscription handshake is a two-element array:
//!
//! ```json
//! [{"ticket":"ticker-collector"},{"type":"ticker","codes":["KRW-BTC","KRW-ETH"]}]
//! ```
//!
//! # References
//!
//! - [Binance Individual Symbol Ticker Streams](https://developers.binance.com/docs/binance-spot-api-docs/web-socket-streams)
//! - [Upbit WebSocket Ticker](https://global-docs.upbit.com/reference/websocket-ticker)

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Binance
// =============================================================================

/// 24h rolling ticker from the Binance all-market stream.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BinanceTickerMessage {
    /// Symbol (`BTCUSDT`).
    #[serde(rename = "s")]
    pub symbol: String,

    /// Last price.
    #[serde(rename = "c")]
    pub last_price: String,

    /// Open price of the rolling window.
    #[serde(rename = "o")]
    pub open_price: String,

    /// Total traded quote asset volume.
    #[serde(rename = "q")]
    pub quote_volume: String,

    /// Event time (Unix ms).
    #[serde(rename = "E", default)]
    pub event_time: Option<i64>,
}

// =============================================================================
// Upbit / Bithumb
// =============================================================================

/// Ticker event shared by the KRW venues.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KrwTickerMessage {
    /// Market code (`KRW-BTC`).
    pub code: String,

    /// Last trade price.
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub trade_price: Decimal,

    /// Signed change rate against the previous close.
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub signed_change_rate: Decimal,

    /// Rolling 24h accumulated turnover in KRW.
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub acc_trade_price_24h: Decimal,

    /// Venue timestamp (Unix ms).
    #[serde(default)]
    pub timestamp: Option<i64>,
}

// =============================================================================
// Subscription Handshake
// =============================================================================

/// Ticket element of the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TicketField {
    /// Opaque client identifier.
    pub ticket: String,
}

/// Stream selection element of the handshake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickerFilter {
    /// Stream type, always `ticker`.
    #[serde(rename = "type")]
    pub stream_type: &'static str,

    /// Market codes to subscribe.
    pub codes: Vec<String>,
}

/// Subscription request for the KRW venues, serialized as a two-element array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionRequest(pub TicketField, pub TickerFilter);

impl SubscriptionRequest {
    /// Create a ticker subscription for the given codes.
    #[must_use]
    pub fn ticker(ticket: impl Into<String>, codes: Vec<String>) -> Self {
        Self(
            TicketField {
                ticket: ticket.into(),
            },
            TickerFilter {
                stream_type: "ticker",
                codes,
            },
        )
    }

    /// Subscribed codes.
    #[must_use]
    pub fn codes(&self) -> &[String] {
        &self.1.codes
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_deserialize_binance_ticker_array() {
        let json = r#"[
            {"e":"24hrTicker","E":1718000000000,"s":"BTCUSDT","p":"1000.00","P":"1.515",
             "c":"67000.10","o":"66000.00","h":"67500","l":"65800","v":"1234.5","q":"82345678.91"},
            {"e":"24hrTicker","E":1718000000001,"s":"ETHUSDT","c":"3500","o":"3400","q":"100"}
        ]"#;
        let msgs: Vec<BinanceTickerMessage> = serde_json::from_str(json).unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].symbol, "BTCUSDT");
        assert_eq!(msgs[0].last_price, "67000.10");
        assert_eq!(msgs[0].quote_volume, "82345678.91");
        assert_eq!(msgs[1].event_time, Some(1_718_000_000_001));
    }

    #[test]
    fn test_deserialize_upbit_ticker() {
        let json = r#"{
            "type":"ticker","code":"KRW-BTC","opening_price":94000000,"trade_price":95000000.0,
            "signed_change_rate":0.0123,"acc_trade_price_24h":123456789012.12345678,
            "timestamp":1718000000000,"stream_type":"REALTIME"
        }"#;
        let msg: KrwTickerMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.code, "KRW-BTC");
        assert_eq!(msg.trade_price, Decimal::from(95_000_000));
        assert_eq!(msg.signed_change_rate, Decimal::from_str("0.0123").unwrap());
        assert_eq!(
            msg.acc_trade_price_24h,
            Decimal::from_str("123456789012.12345678").unwrap()
        );
    }

    #[test]
    fn test_krw_ticker_missing_price_fails() {
        let json = r#"{"code":"KRW-BTC","signed_change_rate":0.01,"acc_trade_price_24h":1}"#;
        assert!(serde_json::from_str::<KrwTickerMessage>(json).is_err());
    }

    #[test]
    fn test_serialize_subscription_request() {
        let req = SubscriptionRequest::ticker(
            "ticker-collector",
            vec!["KRW-BTC".to_string(), "KRW-ETH".to_string()],
        );

        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(
            json,
            r#"[{"ticket":"ticker-collector"},{"type":"ticker","codes":["KRW-BTC","KRW-ETH"]}]"#
        );
        assert_eq!(req.codes().len(), 2);
    }
}
