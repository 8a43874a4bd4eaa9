//! Mailrelay Core Library
//!
//! Core types, configuration, event decoding and notification building for
//! the Mailgun to Slack relay.

pub mod config;
pub mod error;
pub mod events;
pub mod types;
pub mod utils;

pub use config::RelayConfig;
pub use error::{Error, Result};
pub use events::{build_notification, DecodeError, EventDecoder};
pub use types::{EventRecord, InboundEnvelope, NotificationField, NotificationMessage, Signature};

/// Mailrelay version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default notification title
pub const DEFAULT_TITLE: &str = "MailGun Error";

/// Default path the provider posts events to
pub const DEFAULT_WEBHOOK_PATH: &str = "/webhook";

/// Default maximum accepted webhook body (1 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
