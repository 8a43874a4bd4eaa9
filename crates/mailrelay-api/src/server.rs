//! Relay Server implementation

use axum::{
    extract::{DefaultBodyLimit, FromRef},
    middleware,
    routing::{get, post},
    Router,
};
use mailrelay_core::{config::RelayConfig, utils::redact_url, Error, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{
    timeout::TimeoutLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing::info;

use crate::events::{DispatcherConfig, Notifier, SlackDispatcher};
use crate::metrics::{metrics_handler, metrics_middleware, MetricsRecorder};
use crate::pipeline::Pipeline;
use crate::routes;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<RelayConfig>,
    pub pipeline: Arc<Pipeline>,
    pub metrics: Arc<MetricsRecorder>,
}

impl AppState {
    pub fn new(config: RelayConfig, notifier: Arc<dyn Notifier>, metrics: Arc<MetricsRecorder>) -> Self {
        let pipeline = Pipeline::new(
            config.mailgun.signing_key.as_bytes(),
            config.slack.title.as_str(),
            notifier,
        );

        Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            metrics,
        }
    }
}

impl FromRef<AppState> for Arc<MetricsRecorder> {
    fn from_ref(state: &AppState) -> Self {
        state.metrics.clone()
    }
}

/// Build the router for the given state
pub fn router(state: AppState) -> Router {
    let server = &state.config.server;

    Router::new()
        .route("/health", get(routes::health))
        .route("/metrics", get(metrics_handler))
        .route(&server.webhook_path, post(routes::webhook))
        .layer(DefaultBodyLimit::max(server.max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            server.request_timeout_secs,
        )))
        .layer(middleware::from_fn_with_state(
            state.metrics.clone(),
            metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
        .with_state(state)
}

/// Relay Server
pub struct RelayServer {
    config: RelayConfig,
}

impl RelayServer {
    pub fn new(config: RelayConfig) -> Self {
        Self { config }
    }

    pub async fn run(self) -> Result<()> {
        self.config.validate()?;

        let metrics = Arc::new(MetricsRecorder::install()?);
        info!("Prometheus metrics initialized");

        let dispatcher = SlackDispatcher::new(DispatcherConfig::from(&self.config.slack))
            .map_err(|e| Error::InternalError(e.to_string()))?;
        let dispatcher = Arc::new(dispatcher);
        let drain_timeout = Duration::from_secs(self.config.slack.drain_timeout_secs);

        let addr = self.config.server.addr();
        let webhook_path = self.config.server.webhook_path.clone();
        let slack_url = redact_url(&self.config.slack.webhook_url);

        let state = AppState::new(self.config, dispatcher.clone(), metrics);
        let app = router(state);

        let listener = TcpListener::bind(&addr).await?;

        info!("Mailrelay listening on http://{}", addr);
        info!("Mailgun webhook at http://{}{}", addr, webhook_path);
        info!("Relaying to Slack at {}", slack_url);
        info!("Prometheus metrics at http://{}/metrics", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        // Callers were already answered for anything still queued
        dispatcher.shutdown(drain_timeout).await;

        info!("Mailrelay stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
