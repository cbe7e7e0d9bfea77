//! REST Market Catalogs
//!
//! Lists the markets the collector tracks on each exchange.
//!
//! - Upbit and Bithumb: `GET /v1/market/all`, filtered to `KRW-` markets;
//!   the display name is the Korean market name.
//! - Binance: `GET /api/v3/ticker/24hr`, filtered to `USDT` symbols; the
//!   display name is the base asset, and every row also yields an initial
//!   snapshot tick.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::application::ports::{CatalogError, MarketCatalog, MarketListing};
use crate::domain::market::{CanonicalTick, Exchange, MarketDescriptor, now_millis};
use crate::domain::normalize::{
    NormalizeError, base_from_prefixed, base_from_suffixed, parse_decimal, rate_from_percent,
};

/// Timeout of one catalog request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Wire Types
// =============================================================================

/// Row of `/v1/market/all` (Upbit and Bithumb share the shape).
#[derive(Debug, Clone, Deserialize)]
struct KrwMarketRow {
    market: String,
    korean_name: String,
}

/// Row of Binance `/api/v3/ticker/24hr`. Numbers arrive as strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BinanceTickerRow {
    symbol: String,
    last_price: String,
    price_change_percent: String,
    quote_volume: String,
}

// =============================================================================
// Catalog
// =============================================================================

/// HTTP implementation of [`MarketCatalog`].
#[derive(Debug, Clone)]
pub struct HttpMarketCatalog {
    exchange: Exchange,
    url: String,
    client: reqwest::Client,
}

impl HttpMarketCatalog {
    /// Create a catalog for `exchange` fetching `url`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Request`] if the HTTP client cannot be built.
    pub fn new(exchange: Exchange, url: impl Into<String>) -> Result<Self, CatalogError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| CatalogError::Request(e.to_string()))?;

        Ok(Self {
            exchange,
            url: url.into(),
            client,
        })
    }

    /// Upbit market list.
    ///
    /// # Errors
    ///
    /// See [`HttpMarketCatalog::new`].
    pub fn upbit(url: impl Into<String>) -> Result<Self, CatalogError> {
        Self::new(Exchange::Upbit, url)
    }

    /// Bithumb market list.
    ///
    /// # Errors
    ///
    /// See [`HttpMarketCatalog::new`].
    pub fn bithumb(url: impl Into<String>) -> Result<Self, CatalogError> {
        Self::new(Exchange::Bithumb, url)
    }

    /// Binance 24h ticker list.
    ///
    /// # Errors
    ///
    /// See [`HttpMarketCatalog::new`].
    pub fn binance(url: impl Into<String>) -> Result<Self, CatalogError> {
        Self::new(Exchange::Binance, url)
    }

    async fn get_json<T: DeserializeOwned>(&self) -> Result<T, CatalogError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| CatalogError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(CatalogError::Status {
                status: response.status().as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| CatalogError::Decode(e.to_string()))
    }
}

#[async_trait]
impl MarketCatalog for HttpMarketCatalog {
    fn exchange(&self) -> Exchange {
        self.exchange
    }

    async fn fetch_markets(&self) -> Result<Vec<MarketListing>, CatalogError> {
        let listings = match self.exchange {
            Exchange::Upbit | Exchange::Bithumb => {
                let rows: Vec<KrwMarketRow> = self.get_json().await?;
                krw_listings(self.exchange, rows)
            }
            Exchange::Binance => {
                let rows: Vec<BinanceTickerRow> = self.get_json().await?;
                binance_listings(rows, now_millis())
            }
        };

        tracing::debug!(
            exchange = %self.exchange,
            markets = listings.len(),
            "Fetched market catalog"
        );
        Ok(listings)
    }
}

// =============================================================================
// Row Mapping
// =============================================================================

fn krw_listings(exchange: Exchange, rows: Vec<KrwMarketRow>) -> Vec<MarketListing> {
    let quote = exchange.quote_currency();
    rows.into_iter()
        .filter_map(|row| {
            let base = base_from_prefixed(&row.market, quote).ok()?.to_string();
            Some(MarketListing {
                descriptor: MarketDescriptor::new(base, quote, row.korean_name),
                native_code: row.market,
                snapshot: None,
            })
        })
        .collect()
}

fn binance_listings(rows: Vec<BinanceTickerRow>, captured_at_ms: i64) -> Vec<MarketListing> {
    rows.into_iter()
        .filter_map(|row| match binance_listing(row, captured_at_ms) {
            Ok(listing) => listing,
            Err(e) => {
                tracing::debug!(error = %e, "Skipping Binance catalog row");
                None
            }
        })
        .collect()
}

/// `Ok(None)` for symbols outside the USDT convention.
fn binance_listing(
    row: BinanceTickerRow,
    captured_at_ms: i64,
) -> Result<Option<MarketListing>, NormalizeError> {
    let quote = Exchange::Binance.quote_currency();
    let Ok(base) = base_from_suffixed(&row.symbol, quote) else {
        return Ok(None);
    };
    let base = base.to_string();

    let snapshot = CanonicalTick {
        exchange: Exchange::Binance,
        base_asset: base.clone(),
        quote_asset: quote.to_string(),
        display_name: base.clone(),
        last_price: parse_decimal("lastPrice", &row.last_price)?,
        change_rate: rate_from_percent(parse_decimal(
            "priceChangePercent",
            &row.price_change_percent,
        )?),
        quote_turnover: parse_decimal("quoteVolume", &row.quote_volume)?,
        capture_time_ms: captured_at_ms,
    };

    Ok(Some(MarketListing {
        native_code: row.symbol,
        descriptor: MarketDescriptor::new(base.clone(), quote, base),
        snapshot: Some(snapshot),
    }))
}

// =============================================================================
// Tests
// =============================================================================
