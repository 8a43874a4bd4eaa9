//! Event Decoder
//!
//! Decoding is two-phase: the discriminant is peeked first, then the payload
//! is parsed strictly against the schema registered for that discriminant.
//! Modeled events have disjoint required members, so parsing one schema
//! against another's payload would always fail and hide the real cause.

use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use crate::types::{EventName, EventRecord, FailedEvent, RejectedEvent, EVENT_FAILED, EVENT_REJECTED};

/// Strict parser for one event type.
pub type ParseFn = fn(&[u8]) -> serde_json::Result<EventRecord>;

#[derive(Error, Debug)]
pub enum DecodeError {
    /// The discriminant could not be read at all
    #[error("unrecognized Mailgun event")]
    UnrecognizedEvent,

    /// The discriminant is known but the payload does not match its schema
    #[error("failed to parse Mailgun event {name:?}: {source}")]
    Parse {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

impl DecodeError {
    pub fn event_name(&self) -> Option<&str> {
        match self {
            DecodeError::UnrecognizedEvent => None,
            DecodeError::Parse { name, .. } => Some(name),
        }
    }
}

/// Dispatch table from event name to strict parser.
#[derive(Debug, Clone)]
pub struct EventDecoder {
    parsers: HashMap<&'static str, ParseFn>,
}

impl Default for EventDecoder {
    fn default() -> Self {
        let mut decoder = Self::empty();
        decoder.register(EVENT_REJECTED, parse_rejected);
        decoder.register(EVENT_FAILED, parse_failed);
        decoder
    }
}

impl EventDecoder {
    /// Decoder with the modeled Mailgun events registered
    pub fn new() -> Self {
        Self::default()
    }

    /// Decoder that treats every event as unhandled
    pub fn empty() -> Self {
        Self {
            parsers: HashMap::new(),
        }
    }

    pub fn register(&mut self, name: &'static str, parse: ParseFn) -> &mut Self {
        self.parsers.insert(name, parse);
        self
    }

    pub fn handles(&self, name: &str) -> bool {
        self.parsers.contains_key(name)
    }

    pub fn decode(&self, raw: &[u8]) -> Result<EventRecord, DecodeError> {
        let name = serde_json::from_slice::<EventName>(raw)
            .ok()
            .and_then(EventName::into_name)
            .ok_or(DecodeError::UnrecognizedEvent)?;

        match self.parsers.get(name.as_str()) {
            Some(parse) => parse(raw).map_err(|source| DecodeError::Parse { name, source }),
            None => {
                debug!("Unhandled Mailgun event type {:?}", name);
                Ok(EventRecord::Unhandled { event_type: name })
            }
        }
    }
}

fn parse_rejected(raw: &[u8]) -> serde_json::Result<EventRecord> {
    serde_json::from_slice::<RejectedEvent>(raw).map(EventRecord::Rejected)
}

fn parse_failed(raw: &[u8]) -> serde_json::Result<EventRecord> {
    serde_json::from_slice::<FailedEvent>(raw).map(EventRecord::Failed)
}
