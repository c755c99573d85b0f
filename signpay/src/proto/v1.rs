//! Protocol version 1 (V1) wire types.
//!
//! V1 identifies chains by network name (e.g., "base-sepolia") and carries
//! the signed authorization in the `X-PAYMENT` request header as
//! base64-encoded JSON.
//!
//! # Key Types
//!
//! - [`X402Version1`] - Version marker that serializes as `1`
//! - [`PaymentPayload`] - Signed payment authorization from the buyer
//! - [`PaymentRequirements`] - Payment terms set by the seller
//! - [`PaymentRequired`] - HTTP 402 response body

use serde::{Deserialize, Serialize};

use super::UnixTimestamp;

/// Version marker for x402 protocol version 1.
///
/// This is a type alias for [`super::Version<1>`] that serializes as the
/// integer `1` and rejects other values on deserialization.
///
/// Use the [`V1`] constant when constructing V1 protocol messages.
pub type X402Version1 = super::Version<1>;

/// Convenience constant for constructing V1 protocol messages.
pub const V1: X402Version1 = super::Version;

/// A signed payment authorization from the buyer.
///
/// This contains the cryptographic proof that the buyer has authorized a
/// payment, along with metadata about the payment scheme and network. It is
/// untrusted input until a facilitator confirms it.
///
/// A missing `x402Version` field deserializes to version 1 and is always
/// written back out, so a decoded payload is stamped with the protocol
/// version the gate speaks. Any other explicit version is a parse error.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentPayload {
    /// Protocol version (always 1).
    #[serde(default)]
    pub x402_version: X402Version1,
    /// The payment scheme (e.g., "exact").
    pub scheme: String,
    /// The network name (e.g., "base-sepolia").
    pub network: String,
    /// The signed transfer authorization.
    pub payload: ExactPayload,
}

/// ERC-3009 `transferWithAuthorization` payment payload.
///
/// Contains both the EIP-712 signature and the structured authorization
/// data. Together, they provide everything a facilitator needs to execute a
/// `transferWithAuthorization` call on an ERC-3009 compliant token contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactPayload {
    /// The cryptographic signature authorizing the transfer (hex string).
    pub signature: String,
    /// The structured authorization data that was signed.
    pub authorization: ExactAuthorization,
}

/// EIP-712 structured data for an ERC-3009 transfer authorization.
///
/// Defines the parameters of a `transferWithAuthorization` call: who can
/// transfer tokens, to whom, how much, and during what time window.
/// Addresses and amounts are carried as the opaque strings the wire format
/// uses; the gate never interprets them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactAuthorization {
    /// The address authorizing the transfer (token owner).
    pub from: String,
    /// The recipient address for the transfer.
    pub to: String,
    /// The amount of tokens to transfer, in the token's smallest unit.
    pub value: String,
    /// The authorization is not valid before this timestamp (inclusive).
    pub valid_after: UnixTimestamp,
    /// The authorization expires at this timestamp (exclusive).
    pub valid_before: UnixTimestamp,
    /// A unique 32-byte nonce to prevent replay attacks (hex string).
    pub nonce: String,
}

/// Payment requirements set by the seller.
///
/// Defines the terms under which a payment will be accepted, including the
/// amount, recipient, asset, and timing constraints. Constructed fresh per
/// request, since the resource URL may vary by request.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequirements {
    /// The payment scheme (e.g., "exact").
    pub scheme: String,
    /// The network name (e.g., "base-sepolia").
    pub network: String,
    /// The maximum amount required for payment, in the token's smallest unit.
    pub max_amount_required: String,
    /// The resource URL being paid for.
    pub resource: String,
    /// Human-readable description of the resource.
    pub description: String,
    /// MIME type of the resource.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub mime_type: String,
    /// Optional JSON schema for the resource output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<serde_json::Value>,
    /// The recipient address for payment.
    pub pay_to: String,
    /// Maximum time in seconds for payment validity.
    pub max_timeout_seconds: u64,
    /// The token asset address.
    pub asset: String,
    /// Scheme-specific extra data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

/// HTTP 402 Payment Required response body.
///
/// Returned when a resource requires payment, listing the acceptable
/// payment methods. A client that deliberately omits payment receives this
/// as a quote (price discovery).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequired {
    /// Protocol version (always 1).
    #[serde(default)]
    pub x402_version: X402Version1,
    /// List of acceptable payment methods.
    #[serde(default)]
    pub accepts: Vec<PaymentRequirements>,
    /// Optional error message describing why payment was not accepted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
