//! Market Model
//!
//! Exchange identities, immutable market descriptors and the canonical tick
//! that every venue-specific wire message is normalized into.
//!
//! # Serialized Tick
//!
//! ```json
//! {"exchange":"UPBIT","base":"BTC","quote":"KRW","displayName":"비트코인",
//!  "lastPrice":95000000,"changeRate":0.0123,"quoteTurnover":123456789.5,
//!  "tsMs":1718000000000}
//! ```

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Exchange
// =============================================================================

/// A venue the collector streams from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Exchange {
    /// Upbit (KRW market, gzip-capable binary frames).
    Upbit,
    /// Bithumb (KRW market).
    Bithumb,
    /// Binance (USDT market).
    Binance,
}

impl Exchange {
    /// Number of supported exchanges.
    pub const COUNT: usize = 3;

    /// Get all exchanges.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Upbit, Self::Bithumb, Self::Binance]
    }

    /// Upper-case name used in sink keys and serialized ticks.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Upbit => "UPBIT",
            Self::Bithumb => "BITHUMB",
            Self::Binance => "BINANCE",
        }
    }

    /// Quote currency every tracked market on this venue is denominated in.
    #[must_use]
    pub const fn quote_currency(self) -> &'static str {
        match self {
            Self::Upbit | Self::Bithumb => "KRW",
            Self::Binance => "USDT",
        }
    }

    /// Dense index, stable for the lifetime of the process.
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Upbit => 0,
            Self::Bithumb => 1,
            Self::Binance => 2,
        }
    }
}

impl fmt::Display for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Market Descriptor
// =============================================================================

/// Display metadata for one tradable market, loaded at bootstrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketDescriptor {
    /// Asset being priced (e.g. `BTC`).
    pub base_asset: String,
    /// Asset the price is denominated in (e.g. `KRW`).
    pub quote_asset: String,
    /// `BASE/QUOTE`.
    pub trading_pair: String,
    /// Human-readable name shown to end users.
    pub display_name: String,
}

impl MarketDescriptor {
    /// Create a descriptor, deriving the trading pair from base and quote.
    #[must_use]
    pub fn new(
        base_asset: impl Into<String>,
        quote_asset: impl Into<String>,
        display_name: impl Into<String>,
    ) -> Self {
        let base_asset = base_asset.into();
        let quote_asset = quote_asset.into();
        Self {
            trading_pair: format!("{base_asset}/{quote_asset}"),
            base_asset,
            quote_asset,
            display_name: display_name.into(),
        }
    }
}

// =============================================================================
// Canonical Tick
// =============================================================================

/// Exchange-agnostic price update handed to the sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalTick {
    /// Source venue.
    pub exchange: Exchange,
    /// Base asset per the venue's symbol convention.
    #[serde(rename = "base")]
    pub base_asset: String,
    /// Quote asset per the venue's symbol convention.
    #[serde(rename = "quote")]
    pub quote_asset: String,
    /// Display name resolved from the metadata cache.
    pub display_name: String,
    /// Last traded price.
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub last_price: Decimal,
    /// Fractional change versus the reference price (0.0123 = +1.23%).
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub change_rate: Decimal,
    /// Rolling 24h turnover in the quote asset.
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub quote_turnover: Decimal,
    /// Collector clock at normalization time, Unix milliseconds.
    #[serde(rename = "tsMs")]
    pub capture_time_ms: i64,
}

impl CanonicalTick {
    /// Sink key: `<prefix>:<EXCHANGE>:<BASE>/<QUOTE>`.
    #[must_use]
    pub fn sink_key(&self, prefix: &str) -> String {
        format!(
            "{prefix}:{}:{}/{}",
            self.exchange, self.base_asset, self.quote_asset
        )
    }
}

/// Collector wall clock in Unix milliseconds.
#[must_use]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn sample_tick() -> CanonicalTick {
        CanonicalTick {
            exchange: Exchange::Upbit,
            base_asset: "BTC".to_string(),
            quote_asset: "KRW".to_string(),
            display_name: "비트코인".to_string(),
            last_price: Decimal::from_str("95000000").unwrap(),
            change_rate: Decimal::from_str("0.0123").unwrap(),
            quote_turnover: Decimal::from_str("123456789.5").unwrap(),
            capture_time_ms: 1_718_000_000_000,
        }
    }

    #[test]
    fn exchange_names_are_upper_case() {
        assert_eq!(Exchange::Upbit.as_str(), "UPBIT");
        assert_eq!(Exchange::Bithumb.to_string(), "BITHUMB");
        assert_eq!(
            serde_json::to_string(&Exchange::Binance).unwrap(),
            "\"BINANCE\""
        );
    }

    #[test]
    fn exchange_indices_are_dense() {
        let mut seen = [false; Exchange::COUNT];
        for exchange in Exchange::all() {
            seen[exchange.index()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn descriptor_derives_trading_pair() {
        let descriptor = MarketDescriptor::new("ETH", "KRW", "이더리움");
        assert_eq!(descriptor.trading_pair, "ETH/KRW");
    }

    #[test]
    fn sink_key_shape() {
        assert_eq!(sample_tick().sink_key("ticker"), "ticker:UPBIT:BTC/KRW");
    }

    #[test]
    fn tick_serializes_with_wire_field_names() {
        let json = serde_json::to_string(&sample_tick()).unwrap();
        assert!(json.contains("\"exchange\":\"UPBIT\""));
        assert!(json.contains("\"base\":\"BTC\""));
        assert!(json.contains("\"quote\":\"KRW\""));
        assert!(json.contains("\"displayName\":\"비트코인\""));
        assert!(json.contains("\"changeRate\":0.0123"));
        assert!(json.contains("\"quoteTurnover\":123456789.5"));
        assert!(json.contains("\"tsMs\":1718000000000"));
    }

    #[test]
    fn tick_json_preserves_decimal_precision() {
        let tick = sample_tick();
        let json = serde_json::to_string(&tick).unwrap();
        let decoded: CanonicalTick = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, tick);
    }
}
