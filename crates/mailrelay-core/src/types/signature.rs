//! Inbound webhook envelope
//!
//! Mailgun posts a JSON body with two members:
//!
//! ```json
//! {
//!   "signature": { "timestamp": "1529006854", "token": "a8ce0edb...", "signature": "d2271d12..." },
//!   "event-data": { "event": "failed", ... }
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

/// Proof of authenticity for one webhook payload.
///
/// Absent members deserialize as empty strings; the verifier reports them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub token: String,
    #[serde(default, rename = "signature")]
    pub signature_hex: String,
}

impl Signature {
    pub fn new(
        timestamp: impl Into<String>,
        token: impl Into<String>,
        signature_hex: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            token: token.into(),
            signature_hex: signature_hex.into(),
        }
    }
}

/// Body of one webhook POST.
///
/// `event-data` is kept as raw JSON so the decoder can peek the discriminant
/// before choosing a schema.
#[derive(Debug, Deserialize)]
pub struct InboundEnvelope {
    pub signature: Signature,
    #[serde(rename = "event-data")]
    pub event_data: Box<RawValue>,
}

impl InboundEnvelope {
    pub fn from_slice(body: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(body)
    }

    /// Raw bytes of the `event-data` member, exactly as received.
    pub fn event_bytes(&self) -> &[u8] {
        self.event_data.get().as_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_envelope() {
        let body = br#"{
            "signature": {"timestamp": "1529006854", "token": "tok", "signature": "abcd"},
            "event-data": {"event": "failed", "id": "x"}
        }"#;

        let envelope = InboundEnvelope::from_slice(body).unwrap();
        assert_eq!(envelope.signature, Signature::new("1529006854", "tok", "abcd"));
        assert_eq!(envelope.event_bytes(), br#"{"event": "failed", "id": "x"}"#);
    }

    #[test]
    fn test_missing_signature_members_default_to_empty() {
        let body = br#"{"signature": {"token": "tok"}, "event-data": {}}"#;

        let envelope = InboundEnvelope::from_slice(body).unwrap();
        assert_eq!(envelope.signature.timestamp, "");
        assert_eq!(envelope.signature.signature_hex, "");
    }

    #[test]
    fn test_missing_event_data_is_an_error() {
        let body = br#"{"signature": {"timestamp": "1", "token": "t", "signature": "s"}}"#;
        assert!(InboundEnvelope::from_slice(body).is_err());
    }
}
