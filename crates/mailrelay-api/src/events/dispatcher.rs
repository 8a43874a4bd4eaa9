//! Slack Dispatcher
//!
//! Hands notification messages from the request path to a background worker
//! that posts them to a Slack incoming webhook. Each message gets a single
//! delivery attempt; failures are logged and counted.
//!
//! The queue is bounded and at most `max_in_flight` requests to Slack run at
//! once, so a slow endpoint fills the queue and new messages are refused.

use async_trait::async_trait;
use mailrelay_core::{config::SlackConfig, utils::redact_url, NotificationMessage};
use reqwest::Client;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{mpsc, Notify};
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info};

use super::slack::SlackPayload;
use crate::metrics;

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("failed to serialize Slack payload: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Slack returned error status: {0}")]
    Status(u16),

    #[error("delivery queue is full")]
    QueueFull,

    #[error("delivery queue is closed")]
    QueueClosed,
}

impl DeliveryError {
    /// Label used for `mailrelay_deliveries_total{result}`
    pub fn result_label(&self) -> &'static str {
        match self {
            DeliveryError::QueueFull => "queue_full",
            DeliveryError::QueueClosed => "queue_closed",
            _ => "error",
        }
    }
}

/// Destination for built notification messages.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Take ownership of `message` for delivery.
    ///
    /// Must not wait on the outbound network call.
    async fn notify(&self, message: NotificationMessage) -> Result<(), DeliveryError>;
}

/// Slack dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub webhook_url: String,
    /// HTTP client timeout
    pub timeout: Duration,
    /// Queue capacity
    pub queue_capacity: usize,
    /// Concurrent deliveries
    pub max_in_flight: usize,
}

impl From<&SlackConfig> for DispatcherConfig {
    fn from(config: &SlackConfig) -> Self {
        Self {
            webhook_url: config.webhook_url.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            queue_capacity: config.queue_capacity,
            max_in_flight: config.max_in_flight,
        }
    }
}

/// Slack dispatcher handle
#[derive(Clone)]
pub struct SlackDispatcher {
    sender: mpsc::Sender<NotificationMessage>,
    http_client: Client,
    webhook_url: String,
    /// Accepted messages not yet finished (queued or in flight)
    pending: Arc<AtomicUsize>,
    closing: Arc<Notify>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl SlackDispatcher {
    /// Create a new dispatcher and start its worker.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: DispatcherConfig) -> Result<Self, DeliveryError> {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let http_client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(DeliveryError::Client)?;

        let pending = Arc::new(AtomicUsize::new(0));
        let closing = Arc::new(Notify::new());

        let worker = tokio::spawn(Self::dispatch_worker(
            receiver,
            closing.clone(),
            pending.clone(),
            http_client.clone(),
            config.webhook_url.clone(),
            config.max_in_flight.max(1),
        ));

        Ok(Self {
            sender,
            http_client,
            webhook_url: config.webhook_url,
            pending,
            closing,
            worker: Arc::new(Mutex::new(Some(worker))),
        })
    }

    /// Deliver a message immediately, bypassing the queue
    pub async fn deliver(&self, message: &NotificationMessage) -> Result<(), DeliveryError> {
        Self::deliver_static(&self.http_client, &self.webhook_url, message).await
    }

    /// Number of accepted messages that have not finished delivery
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Stop accepting messages and wait up to `grace` for the queue to drain.
    ///
    /// Messages still pending when `grace` runs out are dropped, logged and
    /// counted as `abandoned`.
    pub async fn shutdown(&self, grace: Duration) {
        let worker = self
            .worker
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        let Some(mut worker) = worker else {
            return;
        };

        info!("Draining {} pending Slack notification(s)", self.pending());
        self.closing.notify_one();

        match tokio::time::timeout(grace, &mut worker).await {
            Ok(_) => info!("Slack dispatcher drained"),
            Err(_) => {
                worker.abort();
                let abandoned = self.pending.swap(0, Ordering::SeqCst);
                error!(
                    "Abandoned {} undelivered Slack notification(s) after {:?}",
                    abandoned, grace
                );
                metrics::record_undelivered("abandoned", abandoned as u64);
            }
        }
    }

    async fn dispatch_worker(
        mut receiver: mpsc::Receiver<NotificationMessage>,
        closing: Arc<Notify>,
        pending: Arc<AtomicUsize>,
        http_client: Client,
        webhook_url: String,
        max_in_flight: usize,
    ) {
        info!("Slack dispatch worker started for {}", redact_url(&webhook_url));

        let mut in_flight = JoinSet::new();
        let mut closed = false;

        loop {
            let message = tokio::select! {
                message = receiver.recv() => message,
                _ = closing.notified(), if !closed => {
                    // Buffered messages are still received after close
                    receiver.close();
                    closed = true;
                    continue;
                }
            };
            let Some(message) = message else {
                break;
            };

            while in_flight.len() >= max_in_flight {
                in_flight.join_next().await;
            }

            in_flight.spawn(Self::deliver_queued(
                http_client.clone(),
                webhook_url.clone(),
                message,
                pending.clone(),
            ));
        }

        while in_flight.join_next().await.is_some() {}

        info!("Slack dispatch worker stopped");
    }

    async fn deliver_queued(
        http_client: Client,
        webhook_url: String,
        message: NotificationMessage,
        pending: Arc<AtomicUsize>,
    ) {
        let start = Instant::now();
        let result = Self::deliver_static(&http_client, &webhook_url, &message).await;
        metrics::record_delivery(result.is_ok(), start.elapsed().as_secs_f64());
        pending.fetch_sub(1, Ordering::SeqCst);

        match result {
            Ok(()) => debug!(
                "Delivered {:?} notification to Slack",
                message.error_field.value
            ),
            Err(e) => error!(
                "Could not send {:?} notification to Slack: {}",
                message.error_field.value, e
            ),
        }
    }

    async fn deliver_static(
        http_client: &Client,
        webhook_url: &str,
        message: &NotificationMessage,
    ) -> Result<(), DeliveryError> {
        let json = serde_json::to_string(&SlackPayload::from(message))?;

        let response = http_client
            .post(webhook_url)
            .header("Content-Type", "application/json")
            .body(json)
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(DeliveryError::Status(response.status().as_u16()))
        }
    }
}

#[async_trait]
impl Notifier for SlackDispatcher {
    async fn notify(&self, message: NotificationMessage) -> Result<(), DeliveryError> {
        self.pending.fetch_add(1, Ordering::SeqCst);
        self.sender.try_send(message).map_err(|e| {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            match e {
                mpsc::error::TrySendError::Full(_) => DeliveryError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => DeliveryError::QueueClosed,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use mailrelay_core::NotificationField;
    use serde_json::Value;
    use std::sync::Arc;
    use tokio::net::TcpListener;
    use tokio::sync::Mutex;

    type Received = Arc<Mutex<Vec<Value>>>;

    async fn spawn_slack(status: StatusCode) -> (String, Received) {
        spawn_slow_slack(status, Duration::ZERO).await
    }

    /// Local Slack stand-in that answers each post after `delay`
    async fn spawn_slow_slack(status: StatusCode, delay: Duration) -> (String, Received) {
        let received: Received = Arc::new(Mutex::new(Vec::new()));
        let sink = received.clone();

        let app = Router::new().route(
            "/services/T0/B0/XYZ",
            post(move |Json(payload): Json<Value>| {
                let sink = sink.clone();
                async move {
                    tokio::time::sleep(delay).await;
                    sink.lock().await.push(payload);
                    status
                }
            }),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/services/T0/B0/XYZ", addr), received)
    }

    fn dispatcher(webhook_url: String) -> SlackDispatcher {
        bounded_dispatcher(webhook_url, 8, 4)
    }

    fn bounded_dispatcher(
        webhook_url: String,
        queue_capacity: usize,
        max_in_flight: usize,
    ) -> SlackDispatcher {
        SlackDispatcher::new(DispatcherConfig {
            webhook_url,
            timeout: Duration::from_secs(60),
            queue_capacity,
            max_in_flight,
        })
        .unwrap()
    }

    fn message() -> NotificationMessage {
        let mut msg =
            NotificationMessage::new("MailGun Error", NotificationField::new("Event", "failed", true));
        msg.add_data("Recipient", "alice@example.com", true)
            .add_data("Reason", "", false);
        msg
    }

    #[tokio::test]
    async fn test_deliver_posts_slack_payload() {
        let (url, received) = spawn_slack(StatusCode::OK).await;

        dispatcher(url).deliver(&message()).await.unwrap();

        let received = received.lock().await;
        assert_eq!(received.len(), 1);
        assert_eq!(received[0]["text"], "MailGun Error");
        assert_eq!(received[0]["attachments"][0]["fields"][0]["value"], "failed");
        assert_eq!(
            received[0]["attachments"][1]["fields"]
                .as_array()
                .unwrap()
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_deliver_reports_error_status() {
        let (url, _received) = spawn_slack(StatusCode::INTERNAL_SERVER_ERROR).await;

        let err = dispatcher(url).deliver(&message()).await.unwrap_err();
        assert!(matches!(err, DeliveryError::Status(500)));
    }

    #[tokio::test]
    async fn test_deliver_reports_connection_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = dispatcher(format!("http://{}/hook", addr))
            .deliver(&message())
            .await
            .unwrap_err();
        assert!(matches!(err, DeliveryError::Http(_)));
    }

    #[tokio::test]
    async fn test_notify_delivers_in_background() {
        let (url, received) = spawn_slack(StatusCode::OK).await;
        let dispatcher = dispatcher(url);

        dispatcher.notify(message()).await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                if !received.lock().await.is_empty() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("notification was not delivered");
    }

    #[tokio::test]
    async fn test_slow_slack_fills_queue() {
        let (url, received) = spawn_slow_slack(StatusCode::OK, Duration::from_secs(30)).await;
        let dispatcher = bounded_dispatcher(url, 1, 1);

        let mut accepted = 0;
        let mut refused = 0;
        for _ in 0..10 {
            match dispatcher.notify(message()).await {
                Ok(()) => accepted += 1,
                Err(DeliveryError::QueueFull) => refused += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        // One in flight, one held by the worker, one buffered
        assert!(accepted <= 3, "accepted {} of 10", accepted);
        assert_eq!(accepted + refused, 10);
        assert_eq!(dispatcher.pending(), accepted);
        assert!(received.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_shutdown_drains_queue() {
        let (url, received) = spawn_slow_slack(StatusCode::OK, Duration::from_millis(50)).await;
        let dispatcher = bounded_dispatcher(url, 8, 1);

        for _ in 0..3 {
            dispatcher.notify(message()).await.unwrap();
        }
        assert_eq!(dispatcher.pending(), 3);

        dispatcher.shutdown(Duration::from_secs(5)).await;

        assert_eq!(received.lock().await.len(), 3);
        assert_eq!(dispatcher.pending(), 0);
        assert!(matches!(
            dispatcher.notify(message()).await,
            Err(DeliveryError::QueueClosed)
        ));
    }

    #[tokio::test]
    async fn test_shutdown_abandons_after_grace() {
        let (url, received) = spawn_slow_slack(StatusCode::OK, Duration::from_secs(30)).await;
        let dispatcher = bounded_dispatcher(url, 8, 1);

        dispatcher.notify(message()).await.unwrap();
        dispatcher.notify(message()).await.unwrap();

        let start = Instant::now();
        dispatcher.shutdown(Duration::from_millis(100)).await;

        assert!(start.elapsed() < Duration::from_secs(5));
        assert_eq!(dispatcher.pending(), 0);
        assert!(received.lock().await.is_empty());

        // Second call is a no-op
        dispatcher.shutdown(Duration::from_millis(100)).await;
    }

    #[test]
    fn test_result_labels() {
        assert_eq!(DeliveryError::QueueFull.result_label(), "queue_full");
        assert_eq!(DeliveryError::QueueClosed.result_label(), "queue_closed");
        assert_eq!(DeliveryError::Status(500).result_label(), "error");
    }
}
