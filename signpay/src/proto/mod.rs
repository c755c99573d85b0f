//! Protocol types for sign-pay payment messages.
//!
//! This module defines the wire format used between the payment gate and a
//! facilitator. All types serialize to JSON with camelCase field names; the
//! protocol version is carried in the `x402Version` field.
//!
//! # Key Types
//!
//! - [`VerifyRequest`] / [`VerifyResponse`] - Payment verification messages
//! - [`SettleRequest`] / [`SettleResponse`] - Payment settlement messages
//! - [`v1::PaymentPayload`] / [`v1::PaymentRequirements`] - V1 wire types
//! - [`Base64Bytes`] - Header encoding helper
//! - [`UnixTimestamp`] - Authorization window bounds

use serde::{Deserialize, Deserializer, Serialize, Serializer};

mod encoding;
mod timestamp;
mod version;

pub mod v1;

pub use encoding::Base64Bytes;
pub use timestamp::UnixTimestamp;
pub use version::Version;

use v1::{PaymentPayload, PaymentRequirements, X402Version1};

/// Request to verify a payment before settlement.
///
/// Sent to a facilitator's `POST /verify` endpoint. The facilitator checks
/// that the payment authorization is valid, properly signed, and matches
/// the requirements.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    /// Protocol version (always 1).
    #[serde(default)]
    pub x402_version: X402Version1,
    /// The buyer's signed payment authorization.
    pub payment_payload: PaymentPayload,
    /// The payment terms the authorization is checked against.
    pub payment_requirements: PaymentRequirements,
}

/// Request to settle a verified payment on-chain.
///
/// Structurally identical to [`VerifyRequest`] on the wire, but represented
/// as a distinct type so the compiler can prevent accidental misuse:
/// settlement must reuse the exact request that passed verification, via
/// `From<VerifyRequest>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettleRequest {
    /// Protocol version (always 1).
    #[serde(default)]
    pub x402_version: X402Version1,
    /// The buyer's signed payment authorization.
    pub payment_payload: PaymentPayload,
    /// The payment terms the authorization was verified against.
    pub payment_requirements: PaymentRequirements,
}

impl From<VerifyRequest> for SettleRequest {
    fn from(request: VerifyRequest) -> Self {
        Self {
            x402_version: request.x402_version,
            payment_payload: request.payment_payload,
            payment_requirements: request.payment_requirements,
        }
    }
}

/// Result returned by a facilitator after verifying a payment payload
/// against the provided payment requirements.
///
/// If invalid, the facilitator usually states a reason (e.g., wrong
/// network, expired authorization, insufficient funds) — but V1
/// facilitators may omit it, along with the payer address.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum VerifyResponse {
    /// The payload matches the requirements and passes all checks.
    Valid {
        /// The address of the payer, if reported.
        payer: Option<String>,
    },
    /// The payload was well-formed but failed verification.
    Invalid {
        /// Reason verification failed, if reported.
        reason: Option<String>,
        /// The payer address, if identifiable.
        payer: Option<String>,
    },
}

impl VerifyResponse {
    /// Constructs a successful verification response.
    #[must_use]
    pub const fn valid(payer: Option<String>) -> Self {
        Self::Valid { payer }
    }

    /// Constructs a failed verification response.
    #[must_use]
    pub const fn invalid(reason: Option<String>) -> Self {
        Self::Invalid {
            reason,
            payer: None,
        }
    }

    /// Returns `true` if the verification succeeded.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid { .. })
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerifyResponseWire {
    is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    invalid_reason: Option<String>,
}

impl Serialize for VerifyResponse {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let wire = match self {
            Self::Valid { payer } => VerifyResponseWire {
                is_valid: true,
                payer: payer.clone(),
                invalid_reason: None,
            },
            Self::Invalid { reason, payer } => VerifyResponseWire {
                is_valid: false,
                payer: payer.clone(),
                invalid_reason: reason.clone(),
            },
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for VerifyResponse {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = VerifyResponseWire::deserialize(deserializer)?;
        if wire.is_valid {
            Ok(Self::Valid { payer: wire.payer })
        } else {
            Ok(Self::Invalid {
                reason: wire.invalid_reason,
                payer: wire.payer,
            })
        }
    }
}

/// Response from a payment settlement request.
///
/// Indicates whether the payment was successfully settled on-chain,
/// including the transaction hash on success.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum SettleResponse {
    /// Settlement succeeded.
    Success {
        /// The on-chain transaction hash.
        transaction: String,
        /// The network where settlement occurred, if reported.
        network: Option<String>,
        /// The address that paid, if reported.
        payer: Option<String>,
    },
    /// Settlement failed.
    Error {
        /// Reason for failure, if reported.
        reason: Option<String>,
        /// The network where settlement was attempted, if reported.
        network: Option<String>,
    },
}

impl SettleResponse {
    /// Returns `true` if the settlement succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the on-chain transaction hash, if settlement succeeded.
    #[must_use]
    pub fn transaction(&self) -> Option<&str> {
        match self {
            Self::Success { transaction, .. } => Some(transaction),
            Self::Error { .. } => None,
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettleResponseWire {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transaction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payer: Option<String>,
}

impl Serialize for SettleResponse {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let wire = match self {
            Self::Success {
                transaction,
                network,
                payer,
            } => SettleResponseWire {
                success: true,
                error_reason: None,
                transaction: Some(transaction.clone()),
                network: network.clone(),
                payer: payer.clone(),
            },
            Self::Error { reason, network } => SettleResponseWire {
                success: false,
                error_reason: reason.clone(),
                transaction: None,
                network: network.clone(),
                payer: None,
            },
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SettleResponse {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let wire = SettleResponseWire::deserialize(deserializer)?;
        if wire.success {
            Ok(Self::Success {
                transaction: wire.transaction.unwrap_or_default(),
                network: wire.network,
                payer: wire.payer,
            })
        } else {
            Ok(Self::Error {
                reason: wire.error_reason,
                network: wire.network,
            })
        }
    }
}
