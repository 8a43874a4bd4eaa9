//! HTTP handlers

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use bytes::Bytes;
use mailrelay_core::utils::generate_request_id;
use serde_json::json;
use tracing::{info_span, Instrument};

use crate::server::AppState;

/// POST {webhook_path} - Mailgun webhook
///
/// Responds 406 with an empty body on any rejection; the caller gets no
/// hint about what failed.
pub async fn webhook(State(state): State<AppState>, body: Bytes) -> StatusCode {
    let request_id = generate_request_id();
    let span = info_span!("webhook", request_id = %request_id);

    state
        .pipeline
        .process(&body)
        .instrument(span)
        .await
        .status_code()
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": mailrelay_core::VERSION,
        "uptime_secs": state.metrics.uptime_secs(),
    }))
}
