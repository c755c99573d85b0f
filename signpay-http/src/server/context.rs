//! Request-scoped context types exchanged with neighboring pipeline stages.
//!
//! Both types live in the request extensions and never cross request
//! boundaries: [`AmountOverride`] is written by an upstream pricing stage
//! and read by the gate; [`PaymentData`] is written by the gate and read by
//! everything mounted after it.

use bytes::Bytes;
use serde::de::DeserializeOwned;
use signpay::proto::v1::{PaymentPayload, PaymentRequirements};
use signpay::proto::{SettleResponse, VerifyResponse};

/// Verified payment information made available to downstream handlers.
///
/// Present in the request extensions if and only if both the verify and the
/// settle call succeeded — a handler that finds it can rely on the payment
/// being confirmed. Owned by the request; never persisted or shared across
/// requests.
#[derive(Debug, Clone)]
pub struct PaymentData {
    /// The buyer's decoded payment payload.
    pub payload: PaymentPayload,
    /// The facilitator's verification result.
    pub verify_response: VerifyResponse,
    /// The facilitator's settlement result.
    pub settle_response: SettleResponse,
    /// The payment requirements the payload was checked against.
    pub requirements: PaymentRequirements,
    /// The raw request body, captured before downstream consumption.
    pub body: Bytes,
}

impl PaymentData {
    /// Returns the payment data attached to a request, if the gate ran and
    /// the payment was confirmed.
    ///
    /// A handler mounted without the gate ahead of it gets `None` rather
    /// than a panic.
    #[must_use]
    pub fn from_request<B>(req: &http::Request<B>) -> Option<&Self> {
        req.extensions().get::<Self>()
    }

    /// Deserializes the captured request body.
    ///
    /// An empty body yields `Ok(None)` rather than an error.
    ///
    /// # Errors
    ///
    /// Returns the JSON error if the body is non-empty but does not parse
    /// as `T`.
    pub fn parse_body<T: DeserializeOwned>(&self) -> Result<Option<T>, serde_json::Error> {
        if self.body.is_empty() {
            return Ok(None);
        }
        serde_json::from_slice(&self.body).map(Some)
    }
}

/// Per-request override for the configured payment amount.
///
/// A pricing stage mounted *ahead* of the gate inserts this into the
/// request extensions; the gate reads it before constructing the payment
/// requirements, and it takes precedence over the statically configured
/// amount. The value is a decimal string in the token's smallest unit.
#[derive(Debug, Clone)]
pub struct AmountOverride(pub String);

impl AmountOverride {
    /// Attaches an amount override to the request.
    pub fn insert<B>(req: &mut http::Request<B>, amount: impl Into<String>) {
        req.extensions_mut().insert(Self(amount.into()));
    }

    /// Returns the override attached to the request, if any.
    #[must_use]
    pub fn get<B>(req: &http::Request<B>) -> Option<&str> {
        req.extensions().get::<Self>().map(|a| a.0.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn payment_data(body: &'static [u8]) -> PaymentData {
        PaymentData {
            payload: serde_json::from_value(serde_json::json!({
                "x402Version": 1,
                "scheme": "exact",
                "network": "base-sepolia",
                "payload": {
                    "signature": "0xdeadbeef",
                    "authorization": {
                        "from": "0x1111111111111111111111111111111111111111",
                        "to": "0x2222222222222222222222222222222222222222",
                        "value": "1000000",
                        "validAfter": "0",
                        "validBefore": "1999999999",
                        "nonce": "0xabc123"
                    }
                }
            }))
            .unwrap(),
            verify_response: VerifyResponse::valid(None),
            settle_response: SettleResponse::Success {
                transaction: "0xabc".into(),
                network: None,
                payer: None,
            },
            requirements: serde_json::from_value(serde_json::json!({
                "scheme": "exact",
                "network": "base-sepolia",
                "maxAmountRequired": "1000000",
                "resource": "https://api.example.com/paid",
                "description": "Payment for purchase",
                "payTo": "0x2222222222222222222222222222222222222222",
                "maxTimeoutSeconds": 300,
                "asset": "0x3333333333333333333333333333333333333333"
            }))
            .unwrap(),
            body: Bytes::from_static(body),
        }
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Order {
        item: String,
    }

    #[test]
    fn parse_body_of_empty_body_is_none() {
        let data = payment_data(b"");
        assert_eq!(data.parse_body::<Order>().unwrap(), None);
    }

    #[test]
    fn parse_body_deserializes_captured_json() {
        let data = payment_data(br#"{"item":"widget"}"#);
        assert_eq!(
            data.parse_body::<Order>().unwrap(),
            Some(Order {
                item: "widget".into()
            })
        );
    }

    #[test]
    fn parse_body_surfaces_json_errors() {
        let data = payment_data(b"not json");
        assert!(data.parse_body::<Order>().is_err());
    }

    #[test]
    fn from_request_is_none_without_the_gate() {
        let req = http::Request::builder().body(()).unwrap();
        assert!(PaymentData::from_request(&req).is_none());
    }

    #[test]
    fn amount_override_round_trips_through_extensions() {
        let mut req = http::Request::builder().body(()).unwrap();
        assert_eq!(AmountOverride::get(&req), None);
        AmountOverride::insert(&mut req, "555");
        assert_eq!(AmountOverride::get(&req), Some("555"));
    }
}
