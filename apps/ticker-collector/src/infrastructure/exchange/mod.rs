//! Exchange WebSocket Adapters
//!
//! Implements the persistent ticker streams:
//!
//! - **Upbit**: `KRW-*` tickers, binary frames, optionally gzip-compressed
//! - **Bithumb**: `KRW-*` tickers, same protocol as Upbit
//! - **Binance**: `*USDT` tickers from the all-market array stream
//!
//! Venue differences live behind [`venue::VenueProtocol`]; the shared
//! [`stream::StreamHandler`] drives connection, backoff and fan-out.

pub mod binance;
pub mod codec;
pub mod krw;
pub mod messages;
pub mod reconnect;
pub mod state;
pub mod stream;
pub mod venue;

pub use binance::BinanceProtocol;
pub use codec::{CodecError, FrameKind, JsonCodec};
pub use krw::KrwProtocol;
pub use messages::{BinanceTickerMessage, KrwTickerMessage, SubscriptionRequest};
pub use reconnect::{ReconnectConfig, ReconnectPolicy, run_with_backoff};
pub use state::{ConnectionState, FeedState};
pub use stream::{StreamConfig, StreamError, StreamHandler};
pub use venue::VenueProtocol;
