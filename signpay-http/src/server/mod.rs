//! Tower/axum middleware for gating protected routes behind a signed
//! payment authorization.
//!
//! The middleware validates the incoming `X-PAYMENT` header with a
//! configured facilitator, settles the payment, and only then forwards the
//! request to the inner service. Requests without a valid payment receive a
//! `402 Payment Required` response carrying the payment requirements, which
//! doubles as a price quote for clients that deliberately omit payment.
//!
//! See [`SignPayMiddleware`] for configuration options.
//!
//! ## Dynamic pricing
//!
//! Middleware mounted *ahead* of the gate can insert an [`AmountOverride`]
//! into the request extensions to replace the statically configured amount
//! for that request.
//!
//! ## Downstream access
//!
//! After a successful verify + settle, the gate stores a [`PaymentData`] in
//! the request extensions. Handlers read it with
//! [`PaymentData::from_request`] or axum's `Extension` extractor; its
//! presence is the payment-confirmed signal.

pub mod context;
pub mod error;
pub mod layer;
pub mod paygate;

pub use context::{AmountOverride, PaymentData};
pub use error::{ConfigError, PaygateError, VerificationError};
pub use layer::{SignPayMiddleware, SignPayService};
pub use paygate::Paygate;
