//! Webhook pipeline
//!
//! One inbound request moves through
//! `Received → Verifying → Decoding → Building → Delivering → Done`, or stops
//! in `Rejected` when the envelope, signature or event cannot be trusted.
//! Delivery failures never turn an accepted request into a rejected one.

use std::sync::Arc;

use http::StatusCode;
use mailrelay_auth::{verify_webhook_signature, SignatureError};
use mailrelay_core::{build_notification, DecodeError, EventDecoder, InboundEnvelope};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::events::Notifier;
use crate::metrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Verifying,
    Decoding,
    Building,
    Delivering,
    Done,
    Rejected,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Received => "received",
            Stage::Verifying => "verifying",
            Stage::Decoding => "decoding",
            Stage::Building => "building",
            Stage::Delivering => "delivering",
            Stage::Done => "done",
            Stage::Rejected => "rejected",
        }
    }
}

/// Why a request was rejected. Never sent to the caller.
#[derive(Error, Debug)]
pub enum RejectReason {
    #[error("could not decode webhook body: {0}")]
    MalformedEnvelope(#[source] serde_json::Error),

    #[error("could not verify signature: {0}")]
    Signature(#[from] SignatureError),

    #[error("signature does not match")]
    SignatureMismatch,

    #[error(transparent)]
    Decode(#[from] DecodeError),
}

#[derive(Debug)]
pub enum PipelineOutcome {
    /// The message was built and handed to the notifier
    Accepted {
        event_type: String,
        /// Whether the notifier took the message
        queued: bool,
    },
    Rejected {
        /// Stage the request was rejected from
        stage: Stage,
        reason: RejectReason,
    },
}

impl PipelineOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, PipelineOutcome::Accepted { .. })
    }

    /// Response status for the inbound caller
    pub fn status_code(&self) -> StatusCode {
        match self {
            PipelineOutcome::Accepted { .. } => StatusCode::OK,
            PipelineOutcome::Rejected { .. } => StatusCode::NOT_ACCEPTABLE,
        }
    }
}

/// Verification-and-translation pipeline. Shared read-only across requests.
pub struct Pipeline {
    signing_key: Vec<u8>,
    decoder: EventDecoder,
    title: String,
    notifier: Arc<dyn Notifier>,
}

impl Pipeline {
    pub fn new(
        signing_key: impl Into<Vec<u8>>,
        title: impl Into<String>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            signing_key: signing_key.into(),
            decoder: EventDecoder::new(),
            title: title.into(),
            notifier,
        }
    }

    pub fn with_decoder(mut self, decoder: EventDecoder) -> Self {
        self.decoder = decoder;
        self
    }

    /// Run one webhook body through the pipeline.
    pub async fn process(&self, body: &[u8]) -> PipelineOutcome {
        let mut stage = Stage::Received;

        let envelope = match InboundEnvelope::from_slice(body) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Could not decode message from Mailgun: {}", e);
                return reject(stage, RejectReason::MalformedEnvelope(e));
            }
        };

        stage = advance(stage, Stage::Verifying);
        match verify_webhook_signature(&self.signing_key, &envelope.signature) {
            Ok(true) => {}
            Ok(false) => {
                // Scanners hit this constantly; keep it out of the default log level
                debug!("Mailgun message failed verification");
                return reject(stage, RejectReason::SignatureMismatch);
            }
            Err(e) => {
                warn!("Could not verify message from Mailgun: {}", e);
                return reject(stage, e.into());
            }
        }

        stage = advance(stage, Stage::Decoding);
        let record = match self.decoder.decode(envelope.event_bytes()) {
            Ok(record) => record,
            Err(e) => {
                warn!("Could not decode event from Mailgun: {}", e);
                return reject(stage, e.into());
            }
        };
        let event_type = record.event_type().to_string();
        metrics::record_event(&event_type);

        stage = advance(stage, Stage::Building);
        let message = build_notification(&record, &self.title);

        stage = advance(stage, Stage::Delivering);
        info!(
            event_type = %event_type,
            fields = message.field_count(),
            "Relaying Mailgun event"
        );
        let queued = match self.notifier.notify(message).await {
            Ok(()) => true,
            Err(e) => {
                error!("Could not send message to Slack: {}", e);
                metrics::record_undelivered(e.result_label(), 1);
                false
            }
        };

        advance(stage, Stage::Done);
        metrics::record_webhook("accepted");

        PipelineOutcome::Accepted { event_type, queued }
    }
}

fn advance(from: Stage, to: Stage) -> Stage {
    debug!("Pipeline {} -> {}", from.as_str(), to.as_str());
    to
}

fn reject(stage: Stage, reason: RejectReason) -> PipelineOutcome {
    advance(stage, Stage::Rejected);
    metrics::record_rejection(stage.as_str());
    metrics::record_webhook("rejected");
    PipelineOutcome::Rejected { stage, reason }
}
