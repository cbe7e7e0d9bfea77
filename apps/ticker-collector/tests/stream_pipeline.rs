//! Stream Pipeline Integration Tests
//!
//! Runs real stream handlers against a local WebSocket server and checks
//! what reaches the sink.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use flate2::Compression;
use flate2::write::GzEncoder;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use ticker_collector::{
    BinanceProtocol, CanonicalTick, ConnectionState, Exchange, KrwProtocol, MarketDescriptor,
    MarketMetadataCache, ReconnectConfig, SinkError, StreamConfig, StreamHandler, TickerSink,
};

#[derive(Default)]
struct RecordingSink {
    ticks: Mutex<Vec<CanonicalTick>>,
}

impl RecordingSink {
    fn snapshot(&self) -> Vec<CanonicalTick> {
        self.ticks.lock().clone()
    }
}

#[async_trait]
impl TickerSink for RecordingSink {
    async fn save(&self, tick: &CanonicalTick) -> Result<(), SinkError> {
        self.ticks.lock().push(tick.clone());
        Ok(())
    }
}

fn fast_reconnect() -> StreamConfig {
    StreamConfig {
        reconnect: ReconnectConfig::new(
            Duration::from_millis(10),
            Duration::from_millis(50),
            2.0,
            0.0,
        ),
        max_in_flight: 8,
    }
}

fn gzip(payload: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(payload).unwrap();
    encoder.finish().unwrap()
}

/// Poll until the sink holds `count` ticks.
async fn wait_for_ticks(sink: &RecordingSink, count: usize) -> Vec<CanonicalTick> {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let ticks = sink.snapshot();
            if ticks.len() >= count {
                return ticks;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("ticks did not arrive in time")
}

#[tokio::test]
async fn upbit_handshake_and_frames() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (handshake_tx, handshake_rx) = oneshot::channel::<String>();

    let server = tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();

        let first = ws.next().await.unwrap().unwrap();
        handshake_tx.send(first.to_text().unwrap().to_string()).unwrap();

        let btc = br#"{"code":"KRW-BTC","trade_price":95000000,"signed_change_rate":0.0123,"acc_trade_price_24h":1234567.5}"#;
        ws.send(Message::binary(gzip(btc))).await.unwrap();
        ws.send(Message::text("{not json")).await.unwrap();
        ws.send(Message::text(
            r#"{"code":"KRW-XRP","trade_price":800,"signed_change_rate":0,"acc_trade_price_24h":1}"#,
        ))
        .await
        .unwrap();
        ws.send(Message::binary(
            br#"{"code":"KRW-ETH","trade_price":4000000,"signed_change_rate":-0.02,"acc_trade_price_24h":99}"#
                .to_vec(),
        ))
        .await
        .unwrap();

        // Hold the socket open until the client goes away.
        while let Some(Ok(_)) = ws.next().await {}
    });

    let cache = Arc::new(MarketMetadataCache::new());
    cache.put(
        Exchange::Upbit,
        "KRW-ETH",
        MarketDescriptor::new("ETH", "KRW", "이더리움"),
    );
    cache.put(
        Exchange::Upbit,
        "KRW-BTC",
        MarketDescriptor::new("BTC", "KRW", "비트코인"),
    );

    let sink = Arc::new(RecordingSink::default());
    let cancel = CancellationToken::new();
    let handler = Arc::new(StreamHandler::new(
        KrwProtocol::upbit(format!("ws://{addr}"), "test-ticket"),
        fast_reconnect(),
        cache,
        Arc::clone(&sink) as Arc<dyn TickerSink>,
        cancel.clone(),
    ));
    let state = handler.state();
    let running = tokio::spawn({
        let handler = Arc::clone(&handler);
        async move { handler.run().await }
    });

    let handshake = tokio::time::timeout(Duration::from_secs(5), handshake_rx)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        handshake,
        r#"[{"ticket":"test-ticket"},{"type":"ticker","codes":["KRW-BTC","KRW-ETH"]}]"#
    );

    let mut ticks = wait_for_ticks(&sink, 2).await;
    ticks.sort_by(|a, b| a.base_asset.cmp(&b.base_asset));
    assert_eq!(ticks[0].base_asset, "BTC");
    assert_eq!(ticks[0].display_name, "비트코인");
    assert_eq!(ticks[0].quote_asset, "KRW");
    assert_eq!(ticks[1].base_asset, "ETH");
    assert_eq!(ticks[1].display_name, "이더리움");

    tokio::time::timeout(Duration::from_secs(5), async {
        while state.get_frames_received() < 4 || state.get_ticks_dropped() < 2 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();
    assert_eq!(state.get_state(), ConnectionState::Streaming);
    assert_eq!(state.get_ticks_published(), 2);
    assert_eq!(state.get_ticks_dropped(), 2);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(state.get_state(), ConnectionState::Disconnected);
    server.abort();
}

#[tokio::test]
async fn binance_reconnects_after_server_close() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        // First session: one frame, then close.
        let (socket, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
        ws.send(Message::text(
            r#"[{"s":"BTCUSDT","c":"110","o":"100","q":"5000"}]"#,
        ))
        .await
        .unwrap();
        ws.close(None).await.unwrap();
        drop(ws);

        // Second session stays open.
        let (socket, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(socket).await.unwrap();
        ws.send(Message::text(
            r#"[{"s":"ETHUSDT","c":"90","o":"100","q":"700"},{"s":"BTCUSDT","c":"111","o":"100","q":"5001"}]"#,
        ))
        .await
        .unwrap();
        while let Some(Ok(_)) = ws.next().await {}
    });

    let cache = Arc::new(MarketMetadataCache::new());
    cache.put(
        Exchange::Binance,
        "BTCUSDT",
        MarketDescriptor::new("BTC", "USDT", "BTC"),
    );
    cache.put(
        Exchange::Binance,
        "ETHUSDT",
        MarketDescriptor::new("ETH", "USDT", "ETH"),
    );

    let sink = Arc::new(RecordingSink::default());
    let cancel = CancellationToken::new();
    let handler = Arc::new(StreamHandler::new(
        BinanceProtocol::new(format!("ws://{addr}")),
        fast_reconnect(),
        cache,
        Arc::clone(&sink) as Arc<dyn TickerSink>,
        cancel.clone(),
    ));
    let state = handler.state();
    let running = tokio::spawn({
        let handler = Arc::clone(&handler);
        async move { handler.run().await }
    });

    let ticks = wait_for_ticks(&sink, 3).await;
    assert_eq!(ticks.len(), 3);
    assert!(ticks.iter().all(|t| t.exchange == Exchange::Binance));
    assert!(ticks.iter().any(|t| t.base_asset == "ETH"));
    assert!(state.get_reconnect_attempts() >= 1);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), running)
        .await
        .unwrap()
        .unwrap();
    server.abort();
}
