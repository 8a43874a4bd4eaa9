//! Mailgun webhook signature verification
//!
//! Mailgun signs every webhook with
//! `hex(HMAC-SHA256(signing_key, timestamp || token))`.

use mailrelay_core::Signature;
use mailrelay_crypto::{constant_time_eq, hmac_sha256_parts, HMAC_SHA256_LEN};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum SignatureError {
    #[error("signature is missing {0}")]
    MissingField(&'static str),

    #[error("malformed signature: {0}")]
    Decode(#[from] hex::FromHexError),
}

/// Verify the signature of one webhook payload.
///
/// Returns `Ok(false)` when the signature is well formed but does not match.
/// An `Err` must be treated as unverified by the caller.
pub fn verify_webhook_signature(
    signing_key: &[u8],
    sig: &Signature,
) -> Result<bool, SignatureError> {
    if sig.timestamp.is_empty() {
        return Err(SignatureError::MissingField("timestamp"));
    }
    if sig.token.is_empty() {
        return Err(SignatureError::MissingField("token"));
    }
    if sig.signature_hex.is_empty() {
        return Err(SignatureError::MissingField("signature"));
    }

    let calculated = hmac_sha256_parts(
        signing_key,
        &[sig.timestamp.as_bytes(), sig.token.as_bytes()],
    );
    let provided = hex::decode(&sig.signature_hex)?;

    if provided.len() != HMAC_SHA256_LEN {
        debug!(
            "Signature has {} bytes, expected {}",
            provided.len(),
            HMAC_SHA256_LEN
        );
        return Ok(false);
    }

    Ok(constant_time_eq(&provided, &calculated))
}

/// Produce the signature Mailgun would send for `timestamp` and `token`.
pub fn sign_webhook(signing_key: &[u8], timestamp: &str, token: &str) -> String {
    hex::encode(hmac_sha256_parts(
        signing_key,
        &[timestamp.as_bytes(), token.as_bytes()],
    ))
}
