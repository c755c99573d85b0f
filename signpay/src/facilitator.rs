//! Core trait for payment verification and settlement.
//!
//! A facilitator is the external service that cryptographically verifies a
//! signed payment authorization and submits the corresponding blockchain
//! transaction on the payer's behalf. This crate only defines the trait;
//! the HTTP client implementation lives in `signpay-http`, and tests use
//! in-process mocks.

use std::future::Future;
use std::sync::Arc;

use crate::proto::{SettleRequest, SettleResponse, VerifyRequest, VerifyResponse};

/// Verifies and settles payments.
///
/// Both operations take the full request (payload + requirements) so the
/// facilitator can check the authorization against the seller's terms.
/// Settlement must only be attempted with a request that already passed
/// verification — [`SettleRequest`]'s `From<VerifyRequest>` conversion
/// encodes that ordering.
///
/// Implementations do not retry: a failed call is surfaced to the caller
/// as-is. Replay protection is the facilitator's concern, via the payload's
/// nonce and validity window.
pub trait Facilitator {
    /// Error type for transport or protocol failures.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Verifies a payment payload against the payment requirements.
    fn verify(
        &self,
        request: VerifyRequest,
    ) -> impl Future<Output = Result<VerifyResponse, Self::Error>> + Send;

    /// Settles a verified payment on-chain.
    fn settle(
        &self,
        request: SettleRequest,
    ) -> impl Future<Output = Result<SettleResponse, Self::Error>> + Send;
}

impl<F> Facilitator for &F
where
    F: Facilitator + Sync,
{
    type Error = F::Error;

    async fn verify(&self, request: VerifyRequest) -> Result<VerifyResponse, Self::Error> {
        (**self).verify(request).await
    }

    async fn settle(&self, request: SettleRequest) -> Result<SettleResponse, Self::Error> {
        (**self).settle(request).await
    }
}

impl<F> Facilitator for Arc<F>
where
    F: Facilitator + Sync + Send,
{
    type Error = F::Error;

    async fn verify(&self, request: VerifyRequest) -> Result<VerifyResponse, Self::Error> {
        (**self).verify(request).await
    }

    async fn settle(&self, request: SettleRequest) -> Result<SettleResponse, Self::Error> {
        (**self).settle(request).await
    }
}
