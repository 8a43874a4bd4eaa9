//! Webhook authentication for Mailrelay

pub mod signature;

pub use signature::{sign_webhook, verify_webhook_signature, SignatureError};
