//! Normalization Math
//!
//! Pure helpers shared by the venue normalizers: symbol conventions and the
//! change-rate derivations. Rates are fractional (`0.0123` = +1.23%).

use rust_decimal::{Decimal, RoundingStrategy};

/// Fractional digits kept when a change rate is derived rather than reported.
pub const CHANGE_RATE_SCALE: u32 = 8;

/// Errors raised while mapping a wire message onto the canonical tick.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum NormalizeError {
    /// Native code does not follow the venue's symbol convention.
    #[error("symbol {symbol} does not match quote convention {quote}")]
    SymbolConvention {
        /// Offending native code.
        symbol: String,
        /// Quote currency the venue was expected to use.
        quote: &'static str,
    },

    /// A numeric field could not be parsed.
    #[error("invalid decimal in field {field}: {value}")]
    InvalidDecimal {
        /// Wire field name.
        field: &'static str,
        /// Raw value.
        value: String,
    },

    /// Arithmetic overflowed the decimal range.
    #[error("decimal overflow while deriving {0}")]
    Overflow(&'static str),
}

/// Derive the change rate from open and close prices.
///
/// `(close - open) / open`, rounded half-up to [`CHANGE_RATE_SCALE`] digits.
/// A zero open yields zero.
///
/// # Errors
///
/// Returns [`NormalizeError::Overflow`] if the subtraction or division leaves
/// the decimal range.
pub fn change_rate_from_open(open: Decimal, close: Decimal) -> Result<Decimal, NormalizeError> {
    if open.is_zero() {
        return Ok(Decimal::ZERO);
    }

    let rate = close
        .checked_sub(open)
        .and_then(|delta| delta.checked_div(open))
        .ok_or(NormalizeError::Overflow("changeRate"))?;

    Ok(scale_rate(rate))
}

/// Convert a percentage (`1.23`) into a fractional rate (`0.01230000`).
#[must_use]
pub fn rate_from_percent(percent: Decimal) -> Decimal {
    scale_rate(percent / Decimal::ONE_HUNDRED)
}

fn scale_rate(rate: Decimal) -> Decimal {
    let mut rounded =
        rate.round_dp_with_strategy(CHANGE_RATE_SCALE, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(CHANGE_RATE_SCALE);
    rounded
}

/// Base asset of a quote-suffixed symbol (`BTCUSDT` → `BTC`).
///
/// # Errors
///
/// Returns [`NormalizeError::SymbolConvention`] if the symbol does not end
/// with the quote or has nothing before it.
pub fn base_from_suffixed<'a>(
    symbol: &'a str,
    quote: &'static str,
) -> Result<&'a str, NormalizeError> {
    symbol
        .strip_suffix(quote)
        .filter(|base| !base.is_empty())
        .ok_or_else(|| NormalizeError::SymbolConvention {
            symbol: symbol.to_string(),
            quote,
        })
}

/// Base asset of a `QUOTE-BASE` code (`KRW-BTC` → `BTC`).
///
/// # Errors
///
/// Returns [`NormalizeError::SymbolConvention`] if the code does not start
/// with `QUOTE-` or has nothing after it.
pub fn base_from_prefixed<'a>(
    code: &'a str,
    quote: &'static str,
) -> Result<&'a str, NormalizeError> {
    code.strip_prefix(quote)
        .and_then(|rest| rest.strip_prefix('-'))
        .filter(|base| !base.is_empty())
        .ok_or_else(|| NormalizeError::SymbolConvention {
            symbol: code.to_string(),
            quote,
        })
}

/// Parse a decimal carried as a string on the wire.
///
/// # Errors
///
/// Returns [`NormalizeError::InvalidDecimal`] naming the field on failure.
pub fn parse_decimal(field: &'static str, value: &str) -> Result<Decimal, NormalizeError> {
    value
        .trim()
        .parse::<Decimal>()
        .map_err(|_| NormalizeError::InvalidDecimal {
            field,
            value: value.to_string(),
        })
}

// =============================================================================
// Tests
// =============================================================================
