//! Mailgun event types
//!
//! Only the members the relay reports on are modeled; everything else in
//! `event-data` is ignored. Members without `#[serde(default)]` are required
//! and a payload missing them fails to parse.

use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Event Names
// ============================================================================

pub const EVENT_REJECTED: &str = "rejected";
pub const EVENT_FAILED: &str = "failed";

/// Discriminant of an `event-data` object.
///
/// Mailgun sends `event`; `Name` is accepted when `event` is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EventName {
    #[serde(default)]
    pub event: Option<String>,
    #[serde(default, rename = "Name")]
    pub legacy_name: Option<String>,
}

impl EventName {
    /// The event type, or `None` when neither key carries a string.
    pub fn into_name(self) -> Option<String> {
        self.event.or(self.legacy_name)
    }
}

// ============================================================================
// Event Record
// ============================================================================

/// A decoded `event-data` object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventRecord {
    Rejected(RejectedEvent),
    Failed(FailedEvent),
    /// Any event type the relay does not model
    Unhandled { event_type: String },
}

impl EventRecord {
    pub fn event_type(&self) -> &str {
        match self {
            EventRecord::Rejected(_) => EVENT_REJECTED,
            EventRecord::Failed(_) => EVENT_FAILED,
            EventRecord::Unhandled { event_type } => event_type,
        }
    }

    pub fn is_handled(&self) -> bool {
        !matches!(self, EventRecord::Unhandled { .. })
    }
}

/// Message Mailgun refused to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedEvent {
    pub id: String,
    pub message: Message<RecipientHeaders>,
    #[serde(default)]
    pub reject: RejectDetails,
}

impl RejectedEvent {
    pub fn subject(&self) -> &str {
        &self.message.headers.subject
    }

    pub fn to(&self) -> &str {
        &self.message.headers.to
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectDetails {
    #[serde(default, deserialize_with = "string_or_null")]
    pub reason: String,
    #[serde(default, deserialize_with = "string_or_null")]
    pub description: String,
}

/// Message the receiving server did not accept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedEvent {
    pub id: String,
    pub recipient: String,
    pub message: Message<SubjectHeaders>,
    /// `permanent` or `temporary`
    pub severity: String,
    #[serde(default, rename = "delivery-status")]
    pub delivery_status: DeliveryStatus,
    #[serde(default, deserialize_with = "string_or_null")]
    pub reason: String,
}

impl FailedEvent {
    pub fn subject(&self) -> &str {
        &self.message.headers.subject
    }

    pub fn delivery_status_message(&self) -> &str {
        &self.delivery_status.message
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryStatus {
    #[serde(default, deserialize_with = "string_or_null")]
    pub message: String,
}

// ============================================================================
// Message Headers
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message<H> {
    pub headers: H,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientHeaders {
    pub subject: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectHeaders {
    pub subject: String,
}

fn string_or_null<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
