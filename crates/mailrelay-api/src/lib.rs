//! HTTP relay server for Mailrelay

pub mod events;
pub mod metrics;
pub mod pipeline;
pub mod routes;
pub mod server;

pub use events::{DeliveryError, DispatcherConfig, Notifier, SlackDispatcher};
pub use metrics::MetricsRecorder;
pub use pipeline::{Pipeline, PipelineOutcome, RejectReason, Stage};
pub use server::{AppState, RelayServer};
