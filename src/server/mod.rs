//! HTTP query facade — thin read-only layer over the metric store.
//!
//! Listing endpoints return `{ data, total, timestamp }`; they never fail on
//! upstream exchange outages, serving whatever is currently cached (possibly
//! stale or empty). The only mutating route is the force-update trigger,
//! which maps to the poll refresher's on-demand path.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tracing::info;

use crate::domain::analysis::{self, MarketAnalysis, SentimentTally};
use crate::domain::metrics::{Exchange, MetricKind};
use crate::feeds::{FeedSupervisor, PollRefresher};
use crate::store::MetricStore;

/// Shared read handles for the request handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MetricStore>,
    pub poller: Arc<PollRefresher>,
    pub supervisor: Arc<FeedSupervisor>,
    pub trend_epsilon: f64,
    pub exchanges: Vec<String>,
    pub service_name: String,
    pub started_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct ListResponse<T> {
    data: Vec<T>,
    total: usize,
    timestamp: DateTime<Utc>,
}

fn list_response<T: Serialize>(data: Vec<T>) -> Json<ListResponse<T>> {
    let total = data.len();
    Json(ListResponse {
        data,
        total,
        timestamp: Utc::now(),
    })
}

#[derive(Serialize)]
struct AnalysisResponse {
    analysis: MarketAnalysis,
    timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
struct SentimentResponse {
    sentiment: SentimentTally,
    timestamp: DateTime<Utc>,
}

/// Build the facade router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/open-interest", get(open_interest))
        .route("/api/open-interest/:exchange", get(open_interest_by_exchange))
        .route("/api/funding-rates", get(funding_rates))
        .route("/api/long-short-ratio", get(long_short_ratio))
        .route("/api/analysis", get(market_analysis))
        .route("/api/sentiment", get(market_sentiment))
        .route("/api/stats", get(stats))
        .route("/api/force-update", post(force_update))
        .with_state(state)
}

/// Serve the facade until the shutdown signal fires.
pub async fn serve(
    state: AppState,
    bind_address: &str,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;

    info!(address = %bind_address, "Query facade listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        })
        .await?;

    Ok(())
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let streams: serde_json::Map<String, Value> = state
        .supervisor
        .states()
        .into_iter()
        .map(|(exchange, conn)| (exchange.id().to_string(), json!(conn.to_string())))
        .collect();

    // Degraded (all streams down) still reports 200: the REST backstop keeps
    // the cache serving.
    Json(json!({
        "status": if state.supervisor.is_healthy() { "OK" } else { "degraded" },
        "timestamp": Utc::now(),
        "service": state.service_name,
        "exchanges": state.exchanges,
        "streams": streams,
        "dataPoints": state.store.total_size(),
        "uptimeMs": (Utc::now() - state.started_at).num_milliseconds(),
        "lastRestUpdate": state.poller.last_refresh().await,
    }))
}

async fn open_interest(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    list_response(state.store.open_interest_snapshot())
}

async fn open_interest_by_exchange(
    State(state): State<AppState>,
    Path(exchange): Path<String>,
) -> Json<Value> {
    // Unknown exchanges yield an empty list, never an error.
    let data = match Exchange::from_id(&exchange) {
        Some(wanted) => state
            .store
            .open_interest_snapshot()
            .into_iter()
            .filter(|r| r.exchange == wanted)
            .collect(),
        None => Vec::new(),
    };

    let total = data.len();
    Json(json!({
        "exchange": exchange,
        "data": data,
        "total": total,
        "timestamp": Utc::now(),
    }))
}

async fn funding_rates(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    list_response(state.store.funding_rate_snapshot())
}

async fn long_short_ratio(State(state): State<AppState>) -> impl axum::response::IntoResponse {
    list_response(state.store.long_short_snapshot())
}

async fn market_analysis(State(state): State<AppState>) -> Json<AnalysisResponse> {
    let analysis = analysis::analyze(
        &state.store.open_interest_snapshot(),
        &state.store.funding_rate_snapshot(),
        &state.store.long_short_snapshot(),
        state.trend_epsilon,
    );

    Json(AnalysisResponse {
        analysis,
        timestamp: Utc::now(),
    })
}

async fn market_sentiment(State(state): State<AppState>) -> Json<SentimentResponse> {
    let sentiment =
        analysis::sentiment(&state.store.funding_rate_snapshot(), state.trend_epsilon);

    Json(SentimentResponse {
        sentiment,
        timestamp: Utc::now(),
    })
}

async fn stats(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "openInterest": {
            "total": state.store.size(MetricKind::OpenInterest),
            "exchanges": state.exchanges,
        },
        "fundingRates": {
            "total": state.store.size(MetricKind::FundingRate),
            "exchanges": state.exchanges,
        },
        "longShortRatio": {
            "total": state.store.size(MetricKind::LongShortRatio),
            "exchanges": state.exchanges,
        },
        "exchanges": state.exchanges,
        "uptimeMs": (Utc::now() - state.started_at).num_milliseconds(),
        "lastRestUpdate": state.poller.last_refresh().await,
        "timestamp": Utc::now(),
    }))
}

async fn force_update(State(state): State<AppState>) -> Json<Value> {
    state.poller.refresh_once().await;

    Json(json!({
        "success": true,
        "message": "Data updated from REST APIs",
        "timestamp": Utc::now(),
    }))
}
