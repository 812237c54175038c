//! Stripe webhook signature verification and event decoding.
//!
//! Verification follows Stripe's v1 scheme: the `stripe-signature` header
//! carries a unix timestamp and one or more HMAC-SHA256 signatures computed
//! over `"{timestamp}.{raw_body}"`. Verification must run against the raw
//! request bytes, before any JSON parsing.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Maximum accepted distance between the signed timestamp and the server
/// clock, in seconds.
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// The only event kind that carries a credit grant.
pub const EVENT_CHECKOUT_COMPLETED: &str = "checkout.session.completed";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Signature rejection reasons. Rendered to the processor as
/// `Webhook Error: {reason}` with status 400.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum WebhookError {
    #[error("Unable to extract timestamp and signatures from header")]
    MalformedHeader,

    #[error("No signatures found matching the expected signature for payload")]
    SignatureMismatch,

    #[error("Timestamp outside the signature tolerance zone")]
    TimestampOutOfTolerance,
}

// ---------------------------------------------------------------------------
// Verification
// ---------------------------------------------------------------------------

/// Verify a `stripe-signature` header against the raw request body.
///
/// Returns the signed timestamp on success. Signature candidates are checked
/// before the timestamp so a forged header can never learn the clock window.
pub fn verify_signature(
    secret: &str,
    header: &str,
    payload: &[u8],
    now_unix: i64,
    tolerance_secs: i64,
) -> Result<i64, WebhookError> {
    let (timestamp, candidates) = parse_signature_header(header)?;

    let message = signed_payload(timestamp, payload);
    let matched = candidates
        .iter()
        .any(|candidate| candidate_matches(secret, &message, candidate));
    if !matched {
        return Err(WebhookError::SignatureMismatch);
    }

    if (now_unix - timestamp).abs() > tolerance_secs {
        return Err(WebhookError::TimestampOutOfTolerance);
    }

    Ok(timestamp)
}

/// The byte sequence a webhook signature covers: `"{timestamp}.{payload}"`.
pub fn signed_payload(timestamp: i64, payload: &[u8]) -> Vec<u8> {
    let rendered = timestamp.to_string();
    let mut message = Vec::with_capacity(rendered.len() + 1 + payload.len());
    message.extend_from_slice(rendered.as_bytes());
    message.push(b'.');
    message.extend_from_slice(payload);
    message
}

/// Produce a header value that [`verify_signature`] accepts for `payload`
/// at `timestamp`. Exposed for use by tests of webhook consumers.
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(&signed_payload(timestamp, payload));
    format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    )
}

// ---------------------------------------------------------------------------
// Event decoding
// ---------------------------------------------------------------------------

/// A decoded webhook event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

/// The slice of a completed Checkout session relevant to crediting.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletedCheckout {
    #[serde(default)]
    pub metadata: CheckoutMetadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CheckoutMetadata {
    #[serde(rename = "firebaseUid")]
    pub firebase_uid: Option<String>,
    #[serde(rename = "priceId")]
    pub price_id: Option<String>,
}

impl StripeEvent {
    /// Decode the event object as a completed Checkout session.
    ///
    /// Returns `None` when the event is a different kind or the object does
    /// not have the expected shape.
    pub fn completed_checkout(&self) -> Option<CompletedCheckout> {
        if self.event_type != EVENT_CHECKOUT_COMPLETED {
            return None;
        }
        serde_json::from_value(self.data.object.clone()).ok()
    }
}

// ---- private helpers ----

/// Split `t=...,v1=...,v1=...` into the timestamp and signature candidates.
/// Unknown schemes (`v0`) are ignored.
fn parse_signature_header(header: &str) -> Result<(i64, Vec<&str>), WebhookError> {
    let mut timestamp: Option<i64> = None;
    let mut candidates = Vec::new();
    for item in header.split(',') {
        let Some((key, value)) = item.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => {
                timestamp = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_| WebhookError::MalformedHeader)?,
                );
            }
            "v1" => candidates.push(value),
            _ => {}
        }
    }
    match (timestamp, candidates.is_empty()) {
        (Some(t), false) => Ok((t, candidates)),
        _ => Err(WebhookError::MalformedHeader),
    }
}

/// Constant-time comparison of one hex signature candidate.
fn candidate_matches(secret: &str, message: &[u8], candidate: &str) -> bool {
    let Some(bytes) = hex::decode(candidate) else {
        return false;
    };
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(message);
    mac.verify_slice(&bytes).is_ok()
}

// ---------------------------------------------------------------------------
// hex helpers (no extra dep)
// ---------------------------------------------------------------------------

mod hex {
    /// Encode bytes as a lowercase hex string.
    pub fn encode(bytes: impl AsRef<[u8]>) -> String {
        bytes.as_ref().iter().map(|b| format!("{b:02x}")).collect()
    }

    /// Decode a hex string; `None` if it is not well-formed hex.
    pub fn decode(s: &str) -> Option<Vec<u8>> {
        if !s.is_ascii() || s.len() % 2 != 0 {
            return None;
        }
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
