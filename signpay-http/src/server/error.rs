//! Error types for the payment-gate middleware.
//!
//! This module centralizes construction-time and per-request errors used
//! across the server-side payment gate components.

use crate::facilitator_client::FacilitatorClientError;

/// Gate construction errors.
///
/// These are fatal configuration errors: they surface once, at startup,
/// never per request.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configured chain ID is not present in the network table.
    #[error("unsupported chain ID: {0}")]
    UnsupportedChainId(u64),
    /// The facilitator client could not be constructed.
    #[error(transparent)]
    Facilitator(#[from] FacilitatorClientError),
}

/// Per-request payment validation errors.
#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    /// Required payment header is missing or empty.
    #[error("{0} header is required")]
    PaymentHeaderRequired(&'static str),
    /// Payment header is present but undecodable.
    #[error("Invalid payment payload: {0}")]
    InvalidPaymentHeader(String),
    /// The facilitator rejected the payment.
    #[error("Payment verification failed: {0}")]
    Rejected(String),
}

/// Paygate error type covering every per-request failure mode.
///
/// Each variant maps to exactly one HTTP status in the gate's failure
/// responses: 400 for malformed client input, 402 for missing or rejected
/// payment, 500 for operator misconfiguration and transport failures.
#[derive(Debug, thiserror::Error)]
pub enum PaygateError {
    /// The request body stream could not be read.
    #[error("Failed to read request body: {0}")]
    BodyRead(String),
    /// No amount is configured and no override was provided.
    #[error(
        "Payment amount not configured. Set the amount on the middleware or insert an AmountOverride in preceding middleware."
    )]
    AmountNotConfigured,
    /// Payment validation failed.
    #[error(transparent)]
    Verification(#[from] VerificationError),
    /// The verify call to the facilitator failed in transport.
    #[error("Payment verification failed: {0}")]
    VerifyTransport(String),
    /// The settle call to the facilitator failed in transport.
    #[error("Payment settlement failed: {0}")]
    SettleTransport(String),
    /// The facilitator reported the settlement unsuccessful.
    #[error("Payment settlement failed: {0}")]
    SettleRejected(String),
}
