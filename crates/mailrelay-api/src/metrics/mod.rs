//! Prometheus metrics for Mailrelay
//!
//! Exposes metrics at `/metrics` endpoint in Prometheus format.

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Metric names
pub mod names {
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "mailrelay_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "mailrelay_http_request_duration_seconds";

    // Pipeline metrics
    pub const WEBHOOKS_TOTAL: &str = "mailrelay_webhooks_total";
    pub const REJECTIONS_TOTAL: &str = "mailrelay_rejections_total";
    pub const EVENTS_TOTAL: &str = "mailrelay_events_total";

    // Delivery metrics
    pub const DELIVERIES_TOTAL: &str = "mailrelay_deliveries_total";
    pub const DELIVERY_DURATION_SECONDS: &str = "mailrelay_delivery_duration_seconds";

    // System metrics
    pub const UPTIME_SECONDS: &str = "mailrelay_uptime_seconds";
    pub const INFO: &str = "mailrelay_info";
}

/// Metrics recorder
#[derive(Clone)]
pub struct MetricsRecorder {
    handle: PrometheusHandle,
    start_time: Instant,
}

impl MetricsRecorder {
    /// Install the global Prometheus recorder.
    ///
    /// Fails if a global recorder is already installed.
    pub fn install() -> mailrelay_core::Result<Self> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            mailrelay_core::Error::InternalError(format!(
                "Failed to install Prometheus recorder: {}",
                e
            ))
        })?;

        gauge!(names::INFO, "version" => mailrelay_core::VERSION).set(1.0);

        Ok(Self {
            handle,
            start_time: Instant::now(),
        })
    }

    /// Recorder that is not installed globally; renders an empty exposition.
    pub fn detached() -> Self {
        Self {
            handle: PrometheusBuilder::new().build_recorder().handle(),
            start_time: Instant::now(),
        }
    }

    /// Get metrics output in Prometheus format
    pub fn render(&self) -> String {
        gauge!(names::UPTIME_SECONDS).set(self.start_time.elapsed().as_secs_f64());

        self.handle.render()
    }

    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Record an HTTP request
    pub fn record_http_request(&self, method: &str, status: u16, duration_secs: f64) {
        let status_class = format!("{}xx", status / 100);

        counter!(
            names::HTTP_REQUESTS_TOTAL,
            "method" => method.to_string(),
            "status" => status.to_string(),
            "status_class" => status_class
        )
        .increment(1);

        histogram!(
            names::HTTP_REQUEST_DURATION_SECONDS,
            "method" => method.to_string()
        )
        .record(duration_secs);
    }
}

/// Record the final outcome of one webhook (`accepted` or `rejected`)
pub fn record_webhook(outcome: &'static str) {
    counter!(names::WEBHOOKS_TOTAL, "outcome" => outcome).increment(1);
}

/// Record a rejection at the given pipeline stage
pub fn record_rejection(stage: &'static str) {
    counter!(names::REJECTIONS_TOTAL, "stage" => stage).increment(1);
}

/// Record a successfully decoded event
pub fn record_event(event_type: &str) {
    counter!(names::EVENTS_TOTAL, "event_type" => event_type.to_string()).increment(1);
}

/// Record one outbound delivery attempt
pub fn record_delivery(success: bool, duration_secs: f64) {
    counter!(
        names::DELIVERIES_TOTAL,
        "result" => if success { "success" } else { "error" }
    )
    .increment(1);

    histogram!(names::DELIVERY_DURATION_SECONDS).record(duration_secs);
}

/// Record notifications that never reached an outbound attempt
/// (`queue_full`, `queue_closed`, `abandoned`)
pub fn record_undelivered(result: &'static str, count: u64) {
    counter!(names::DELIVERIES_TOTAL, "result" => result).increment(count);
}

/// Axum middleware for recording HTTP metrics
pub async fn metrics_middleware(
    State(metrics): State<Arc<MetricsRecorder>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16();

    metrics.record_http_request(&method, status, duration);

    debug!(
        method = %method,
        path = %path,
        status = %status,
        duration_ms = %(duration * 1000.0),
        "Request completed"
    );

    response
}

/// Handler for /metrics endpoint
pub async fn metrics_handler(State(metrics): State<Arc<MetricsRecorder>>) -> impl IntoResponse {
    let output = metrics.render();
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        output,
    )
}
