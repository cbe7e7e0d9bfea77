//! Ticker Collector Binary
//!
//! Starts the exchange ticker collector.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin ticker-collector
//! ```
//!
//! # Environment Variables
//!
//! All optional.
//!
//! - `REDIS_URL`: Redis connection URL (default: redis://127.0.0.1:6379)
//! - `TICKER_REDIS_KEY_PREFIX`: Key prefix (default: ticker)
//! - `TICKER_REDIS_TTL_SECONDS`: Key TTL in seconds (default: 30)
//! - `UPBIT_WS_URL` / `UPBIT_REST_URL`: Upbit endpoints
//! - `BITHUMB_WS_URL` / `BITHUMB_REST_URL`: Bithumb endpoints
//! - `BINANCE_WS_URL` / `BINANCE_REST_URL`: Binance endpoints
//! - `COLLECTOR_SUBSCRIPTION_TICKET`: Ticket for the Upbit/Bithumb handshake
//! - `COLLECTOR_MAX_IN_FLIGHT`: Concurrent frames per stream (default: 32)
//! - `COLLECTOR_RECONNECT_DELAY_INITIAL_MS`: First backoff delay (default: 1000)
//! - `COLLECTOR_RECONNECT_DELAY_MAX_SECS`: Backoff cap (default: 60)
//! - `COLLECTOR_RECONNECT_DELAY_MULTIPLIER`: Backoff multiplier (default: 2.0)
//! - `COLLECTOR_RECONNECT_JITTER`: Backoff jitter fraction (default: 0.1)
//! - `COLLECTOR_HEALTH_PORT`: Health check and metrics HTTP port (default: 8083)
//! - `OTEL_ENABLED`: Enable OpenTelemetry (default: false)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: Service name (default: ticker-collector)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use ticker_collector::infrastructure::telemetry;
use ticker_collector::{
    BinanceProtocol, CollectorConfig, Exchange, ExchangeTickerStream, HealthServer,
    HealthServerState, HttpMarketCatalog, KrwProtocol, MarketBootstrapper, MarketCatalog,
    MarketMetadataCache, RedisTickerSink, ReconnectConfig, ReconnectPolicy, StreamConfig,
    StreamHandler, TickerSink, init_metrics,
};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    load_dotenv();

    // Initialize telemetry (OpenTelemetry + tracing)
    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting Ticker Collector");

    // Initialize Prometheus metrics
    let _metrics_handle = init_metrics()?;

    let config = CollectorConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    let cache = Arc::new(MarketMetadataCache::new());
    let sink: Arc<dyn TickerSink> = Arc::new(RedisTickerSink::connect(&config.sink).await?);
    let bootstrapper = Arc::new(MarketBootstrapper::new(Arc::clone(&cache), Arc::clone(&sink)));

    let stream_config = StreamConfig::from_stream_settings(&config.stream);
    let ticket = config.stream.subscription_ticket.clone();

    // Create one stream handler per exchange
    let upbit = Arc::new(StreamHandler::new(
        KrwProtocol::upbit(config.upbit.ws_url.clone(), ticket.clone()),
        stream_config.clone(),
        Arc::clone(&cache),
        Arc::clone(&sink),
        shutdown_token.clone(),
    ));
    let bithumb = Arc::new(StreamHandler::new(
        KrwProtocol::bithumb(config.bithumb.ws_url.clone(), ticket),
        stream_config.clone(),
        Arc::clone(&cache),
        Arc::clone(&sink),
        shutdown_token.clone(),
    ));
    let binance = Arc::new(StreamHandler::new(
        BinanceProtocol::new(config.binance.ws_url.clone()),
        stream_config.clone(),
        Arc::clone(&cache),
        Arc::clone(&sink),
        shutdown_token.clone(),
    ));

    // Initialize health server
    let health_state = Arc::new(HealthServerState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        vec![upbit.state(), bithumb.state(), binance.state()],
        Arc::clone(&cache),
    ));
    let health_server = HealthServer::new(
        config.server.health_port,
        health_state,
        shutdown_token.clone(),
    );

    // Spawn bootstrap + stream per exchange
    spawn_collector(
        upbit,
        HttpMarketCatalog::upbit(config.upbit.rest_url.clone())?,
        Arc::clone(&bootstrapper),
        stream_config.reconnect.clone(),
        shutdown_token.clone(),
    );
    spawn_collector(
        bithumb,
        HttpMarketCatalog::bithumb(config.bithumb.rest_url.clone())?,
        Arc::clone(&bootstrapper),
        stream_config.reconnect.clone(),
        shutdown_token.clone(),
    );
    spawn_collector(
        binance,
        HttpMarketCatalog::binance(config.binance.rest_url.clone())?,
        bootstrapper,
        stream_config.reconnect,
        shutdown_token.clone(),
    );

    // Spawn health server
    tokio::spawn(async move {
        if let Err(e) = health_server.run().await {
            tracing::error!(error = %e, "Health server error");
        }
    });

    tracing::info!("Ticker collector ready");

    await_shutdown(shutdown_token).await;

    tracing::info!("Ticker collector stopped");
    Ok(())
}

/// Load the exchange's markets, retrying with backoff, then stream forever.
fn spawn_collector<S>(
    stream: Arc<S>,
    catalog: HttpMarketCatalog,
    bootstrapper: Arc<MarketBootstrapper>,
    reconnect: ReconnectConfig,
    cancel: CancellationToken,
) where
    S: ExchangeTickerStream + 'static,
{
    tokio::spawn(async move {
        if !bootstrap_with_retry(&catalog, &bootstrapper, reconnect, &cancel).await {
            return;
        }
        stream.connect().await;
    });
}

/// Returns `false` if cancelled before the markets were loaded.
async fn bootstrap_with_retry(
    catalog: &dyn MarketCatalog,
    bootstrapper: &MarketBootstrapper,
    reconnect: ReconnectConfig,
    cancel: &CancellationToken,
) -> bool {
    let exchange = catalog.exchange();
    let mut policy = ReconnectPolicy::new(reconnect);

    loop {
        let result = tokio::select! {
            () = cancel.cancelled() => return false,
            result = bootstrapper.load(catalog) => result,
        };

        match result {
            Ok(report) => {
                tracing::debug!(?report, "Bootstrap finished");
                return true;
            }
            Err(e) => {
                let delay = policy.next_delay();
                tracing::warn!(
                    %exchange,
                    error = %e,
                    delay_ms = delay.as_millis(),
                    "Market bootstrap failed, retrying"
                );
                tokio::select! {
                    () = cancel.cancelled() => return false,
                    () = tokio::time::sleep(delay) => {}
                }
            }
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &CollectorConfig) {
    tracing::info!(
        key_prefix = %config.sink.key_prefix,
        ttl_secs = config.sink.ttl.as_secs(),
        max_in_flight = config.stream.max_in_flight,
        health_port = config.server.health_port,
        "Configuration loaded"
    );
    for exchange in Exchange::all() {
        let endpoints = config.endpoints(*exchange);
        tracing::debug!(
            %exchange,
            ws_url = %endpoints.ws_url,
            rest_url = %endpoints.rest_url,
            "Exchange endpoints"
        );
    }
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
