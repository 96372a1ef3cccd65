//! HTTP facade tests over a real listener.
//!
//! Query endpoints must serve whatever is cached — including nothing — and
//! never surface upstream outages as request failures.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;

use oi_analyzer::domain::metrics::{Exchange, FundingRateRecord, MetricUpdate, OpenInterestRecord};
use oi_analyzer::feeds::{FeedSupervisor, PollRefresher};
use oi_analyzer::server::{self, AppState};
use oi_analyzer::store::MetricStore;

struct Facade {
    base_url: String,
    store: Arc<MetricStore>,
    shutdown_tx: broadcast::Sender<()>,
}

/// Serve the facade on an ephemeral port with no exchange adapters behind it.
async fn spawn_facade() -> Facade {
    let store = Arc::new(MetricStore::new());
    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    let poller = Arc::new(PollRefresher::new(
        Vec::new(),
        Arc::clone(&store),
        Duration::from_secs(60),
    ));
    let supervisor = Arc::new(FeedSupervisor::new(
        &[],
        &store,
        Duration::from_secs(5),
        shutdown_tx.clone(),
    ));

    let state = AppState {
        store: Arc::clone(&store),
        poller,
        supervisor,
        trend_epsilon: 0.0001,
        exchanges: vec!["binance".to_string()],
        service_name: "facade-test".to_string(),
        started_at: Utc::now(),
    };

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = server::router(state);
    let mut shutdown_rx = shutdown_tx.subscribe();
    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
            })
            .await
            .unwrap();
    });

    Facade {
        base_url: format!("http://{addr}"),
        store,
        shutdown_tx,
    }
}

async fn get_json(url: &str) -> serde_json::Value {
    let response = reqwest::get(url).await.unwrap();
    assert!(response.status().is_success(), "GET {url} failed");
    response.json().await.unwrap()
}

#[tokio::test]
async fn test_empty_store_serves_empty_lists_not_errors() {
    let facade = spawn_facade().await;

    let body = get_json(&format!("{}/api/open-interest", facade.base_url)).await;
    assert_eq!(body["total"], 0);
    assert!(body["data"].as_array().unwrap().is_empty());

    let body = get_json(&format!("{}/api/analysis", facade.base_url)).await;
    assert_eq!(body["analysis"]["totalOpenInterest"], 0.0);
    assert_eq!(body["analysis"]["marketTrend"], "neutral");

    let body = get_json(&format!("{}/api/sentiment", facade.base_url)).await;
    assert_eq!(body["sentiment"]["total"], 0);
    assert_eq!(body["sentiment"]["overall"], "neutral");

    let _ = facade.shutdown_tx.send(());
}

#[tokio::test]
async fn test_health_reports_degraded_without_failing() {
    let facade = spawn_facade().await;

    let body = get_json(&format!("{}/health", facade.base_url)).await;
    // No streams registered: degraded, but still a 200 with full detail.
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["service"], "facade-test");
    assert_eq!(body["dataPoints"], 0);

    let _ = facade.shutdown_tx.send(());
}

#[tokio::test]
async fn test_exchange_filter_and_unknown_exchange() {
    let facade = spawn_facade().await;

    facade
        .store
        .upsert(MetricUpdate::OpenInterest(OpenInterestRecord::new(
            Exchange::Binance,
            "BTCUSDT",
            100.0,
            5_000_000.0,
            Utc::now(),
        )));
    facade
        .store
        .upsert(MetricUpdate::OpenInterest(OpenInterestRecord::new(
            Exchange::Okx,
            "BTC-USDT-SWAP",
            200.0,
            10_000_000.0,
            Utc::now(),
        )));

    let body = get_json(&format!("{}/api/open-interest/binance", facade.base_url)).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["symbol"], "BTCUSDT");
    assert_eq!(body["data"][0]["derivedPrice"], 50_000.0);

    // Unknown exchange: empty list, not an error.
    let body = get_json(&format!("{}/api/open-interest/deribit", facade.base_url)).await;
    assert_eq!(body["total"], 0);

    let _ = facade.shutdown_tx.send(());
}

#[tokio::test]
async fn test_analysis_reflects_store_contents() {
    let facade = spawn_facade().await;

    facade
        .store
        .upsert(MetricUpdate::FundingRate(FundingRateRecord::new(
            Exchange::Binance,
            "BTCUSDT",
            0.0004,
            0,
            Utc::now(),
        )));
    facade
        .store
        .upsert(MetricUpdate::FundingRate(FundingRateRecord::new(
            Exchange::Bybit,
            "BTCUSDT",
            0.0002,
            0,
            Utc::now(),
        )));

    let body = get_json(&format!("{}/api/analysis", facade.base_url)).await;
    let mean = body["analysis"]["totalFundingRate"].as_f64().unwrap();
    assert!((mean - 0.0003).abs() < 1e-12);
    assert_eq!(body["analysis"]["marketTrend"], "bullish");

    let body = get_json(&format!("{}/api/sentiment", facade.base_url)).await;
    assert_eq!(body["sentiment"]["bullish"], 2);
    assert_eq!(body["sentiment"]["overall"], "bullish");

    let _ = facade.shutdown_tx.send(());
}

#[tokio::test]
async fn test_force_update_returns_success() {
    let facade = spawn_facade().await;

    let client = reqwest::Client::new();
    let response = client
        .post(format!("{}/api/force-update", facade.base_url))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);

    let _ = facade.shutdown_tx.send(());
}
