//! HTTP-specific constants for the sign-pay payment gate.

/// Header carrying the buyer's base64-encoded payment payload
/// (client → server).
///
/// This is the canonical casing; lookups go through [`http::HeaderMap`],
/// which matches case-insensitively on the wire.
pub const X_PAYMENT_HEADER: &str = "X-PAYMENT";

/// Header carrying the base64-encoded settlement result (server → client).
pub const X_PAYMENT_RESPONSE_HEADER: &str = "X-PAYMENT-RESPONSE";

/// The single payment scheme the gate speaks.
pub const EXACT_SCHEME: &str = "exact";

/// Default facilitator service URL.
pub const DEFAULT_FACILITATOR_URL: &str = "https://x402.org/facilitator";

/// Default payment validity bound communicated to the facilitator, in
/// seconds.
pub const DEFAULT_MAX_TIMEOUT_SECONDS: u64 = 300;

/// Default human-readable description attached to payment requirements.
pub const DEFAULT_DESCRIPTION: &str = "Payment for purchase";
