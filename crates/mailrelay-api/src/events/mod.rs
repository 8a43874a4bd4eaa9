//! Notification delivery module
//!
//! Handles delivery of notification messages to Slack:
//! - Rendering to the incoming-webhook payload format
//! - Queued, non-blocking dispatch from the request path

mod dispatcher;
mod slack;

pub use dispatcher::{DeliveryError, DispatcherConfig, Notifier, SlackDispatcher};
pub use slack::{SlackAttachment, SlackField, SlackPayload, EMPTY_VALUE};
