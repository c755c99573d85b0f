#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! HTTP transport for the sign-pay payment gate.
//!
//! Provides the remote facilitator client, header encoding helpers, and the
//! tower/axum middleware that gates a protected route behind a signed
//! payment authorization.
//!
//! # Modules
//!
//! - [`constants`] — HTTP header names and protocol defaults
//! - [`headers`] — Base64 encoding/decoding for payment headers
//! - [`facilitator_client`] — HTTP client for a remote facilitator
//! - [`server`] — The payment-gate middleware
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation for debugging and monitoring

pub mod constants;
pub mod facilitator_client;
pub mod headers;
pub mod server;

pub use facilitator_client::{FacilitatorClient, FacilitatorClientError};
pub use server::{AmountOverride, PaymentData, SignPayMiddleware, SignPayService};
