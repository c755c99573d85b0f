//! HTTP header encoding and decoding for payment messages.
//!
//! Handles the base64-encoded JSON payloads carried in the `X-PAYMENT`
//! request header and the `X-PAYMENT-RESPONSE` response header.

use http::HeaderValue;
use signpay::proto::v1::PaymentPayload;
use signpay::proto::{Base64Bytes, SettleResponse};

/// Errors that can occur during header encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum HeaderError {
    /// Base64 decoding failed.
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    /// JSON serialization/deserialization failed.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// The encoded bytes are not a valid HTTP header value.
    #[error("invalid header value: {0}")]
    Value(#[from] http::header::InvalidHeaderValue),
}

/// Decodes an `X-PAYMENT` header value into a [`PaymentPayload`].
///
/// # Errors
///
/// Returns [`HeaderError`] on base64 or JSON decode failure.
pub fn decode_payment_payload(header_value: &[u8]) -> Result<PaymentPayload, HeaderError> {
    let bytes = Base64Bytes::from(header_value).decode()?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Encodes a [`SettleResponse`] as a base64 `X-PAYMENT-RESPONSE` header
/// value.
///
/// # Errors
///
/// Returns [`HeaderError`] if JSON serialization or header-value
/// construction fails.
pub fn encode_settle_response(response: &SettleResponse) -> Result<HeaderValue, HeaderError> {
    let json = serde_json::to_vec(response)?;
    let encoded = Base64Bytes::encode(json);
    Ok(HeaderValue::from_bytes(encoded.as_ref())?)
}
