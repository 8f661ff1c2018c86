use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::service::PollSummary;

/// Outcome of the polls so far, shared with the `/health` handler
#[derive(Clone, Default)]
pub struct HealthState {
    pub last_poll_time: Arc<RwLock<Option<DateTime<Utc>>>>,
    pub last_poll: Arc<RwLock<Option<PollSummary>>>,
    pub error_count: Arc<RwLock<usize>>,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_success(&self, summary: PollSummary) {
        *self.last_poll_time.write().await = Some(Utc::now());
        *self.last_poll.write().await = Some(summary);
        *self.error_count.write().await = 0;
    }

    pub async fn record_error(&self) {
        *self.error_count.write().await += 1;
    }
}

/// Health check handler
pub async fn health_handler(State(health): State<HealthState>) -> (StatusCode, Json<serde_json::Value>) {
    let last_poll = health.last_poll_time.read().await;
    let summary = *health.last_poll.read().await;
    let errors = health.error_count.read().await;

    let status = if *errors > 5 { "degraded" } else { "ok" };

    let http_status = if *errors > 10 {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };

    (
        http_status,
        Json(json!({
            "service": "sportmonks-ingestion",
            "version": env!("CARGO_PKG_VERSION"),
            "status": status,
            "last_poll": last_poll.map(|t| t.to_rfc3339()),
            "last_poll_fixtures": summary.map(|s| s.fixtures),
            "last_poll_rows": summary.map(|s| s.rows),
            "consecutive_errors": *errors
        })),
    )
}

pub fn router(health: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(health)
}
