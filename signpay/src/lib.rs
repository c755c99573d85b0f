#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for the sign-pay payment gate.
//!
//! This crate provides the foundational types for gating HTTP resources
//! behind a signed payment authorization (x402 protocol version 1). It is
//! transport-agnostic: the HTTP middleware and the remote facilitator client
//! live in the `signpay-http` crate.
//!
//! # Overview
//!
//! A protected endpoint demands payment by responding with HTTP 402 and a
//! set of [`proto::v1::PaymentRequirements`]. The buyer signs a transfer
//! authorization and retries with the signed payload in a request header.
//! A [`facilitator::Facilitator`] verifies the authorization and settles it
//! on-chain; this crate only models the messages exchanged along the way.
//!
//! # Modules
//!
//! - [`facilitator`] - Core trait for payment verification and settlement
//! - [`networks`] - Chain-ID to network-name resolution
//! - [`proto`] - Wire format types, encoding utilities, and timestamps

pub mod facilitator;
pub mod networks;
pub mod proto;
