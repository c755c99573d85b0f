//! Core payment gate logic.
//!
//! The [`Paygate`] struct handles the full payment lifecycle for one
//! request: capturing the body, constructing payment requirements,
//! extracting and decoding the `X-PAYMENT` header, verifying with the
//! facilitator, settling on-chain, and exposing the confirmed payment to
//! the inner service.
//!
//! Each step runs in strict order; the first failure short-circuits with
//! the mapped HTTP response and performs no further steps. Facilitator
//! failures are never retried here.

use axum_core::body::Body;
use axum_core::extract::Request;
use axum_core::response::Response;
use http::{HeaderMap, HeaderValue, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::json;
use signpay::facilitator::Facilitator;
use signpay::proto::v1::{PaymentPayload, PaymentRequired, PaymentRequirements, V1, X402Version1};
use signpay::proto::{SettleResponse, VerifyRequest, VerifyResponse};
use std::convert::Infallible;
use std::sync::Arc;
use tower::Service;
use url::Url;

#[cfg(feature = "telemetry")]
use tracing::Instrument;
#[cfg(feature = "telemetry")]
use tracing::instrument;

use crate::constants::{
    DEFAULT_MAX_TIMEOUT_SECONDS, EXACT_SCHEME, X_PAYMENT_HEADER, X_PAYMENT_RESPONSE_HEADER,
};
use crate::headers::encode_settle_response;

use super::context::{AmountOverride, PaymentData};
use super::error::{PaygateError, VerificationError};

/// Static gate configuration, fixed at construction time.
///
/// Everything per-request (the resolved amount, the derived resource URL)
/// is computed in [`Paygate::handle_request`] from this plus the request.
#[derive(Debug, Clone)]
pub struct PaygateConfig {
    /// Resolved wire-format network name (e.g., "base-sepolia")
    pub network: &'static str,
    /// Token contract address
    pub asset: String,
    /// Recipient address for payments
    pub pay_to: String,
    /// Configured amount in smallest token units; `None` forces a
    /// per-request [`AmountOverride`]
    pub amount: Option<String>,
    /// Explicit resource URL; derived from the request when `None`
    pub resource: Option<Url>,
    /// Human-readable description included in payment requirements
    pub description: String,
}

impl PaygateConfig {
    /// Assembles the payment requirements for one request.
    fn requirements<B>(&self, req: &http::Request<B>, amount: String) -> PaymentRequirements {
        let resource = self
            .resource
            .as_ref()
            .map_or_else(|| derive_resource_url(req), Url::to_string);
        PaymentRequirements {
            scheme: EXACT_SCHEME.to_owned(),
            network: self.network.to_owned(),
            max_amount_required: amount,
            resource,
            description: self.description.clone(),
            mime_type: String::new(),
            output_schema: None,
            pay_to: self.pay_to.clone(),
            max_timeout_seconds: DEFAULT_MAX_TIMEOUT_SECONDS,
            asset: self.asset.clone(),
            extra: None,
        }
    }
}

/// Derives `scheme://host/path` from the inbound request.
///
/// Server-side request URIs are usually in origin form, so the authority
/// comes from the `Host` header.
fn derive_resource_url<B>(req: &http::Request<B>) -> String {
    let scheme = req.uri().scheme_str().unwrap_or("http");
    let host = req
        .headers()
        .get(header::HOST)
        .and_then(|h| h.to_str().ok())
        .or_else(|| req.uri().host())
        .unwrap_or("localhost");
    format!("{scheme}://{host}{}", req.uri().path())
}

/// Per-request payment gate.
///
/// Built fresh for each request by
/// [`SignPayService`](super::layer::SignPayService); holds no cross-request
/// mutable state and needs no locking.
#[allow(missing_debug_implementations)]
pub struct Paygate<TFacilitator> {
    /// The facilitator for verifying and settling payments
    pub facilitator: TFacilitator,
    /// Static gate configuration
    pub config: Arc<PaygateConfig>,
}

impl<TFacilitator> Paygate<TFacilitator> {
    /// Calls the inner service with proper telemetry instrumentation.
    async fn call_inner<S: Service<Request, Response = Response>>(
        mut inner: S,
        req: Request,
    ) -> Result<Response, S::Error> {
        #[cfg(feature = "telemetry")]
        {
            inner
                .call(req)
                .instrument(tracing::info_span!("inner"))
                .await
        }
        #[cfg(not(feature = "telemetry"))]
        {
            inner.call(req).await
        }
    }
}

impl<TFacilitator> Paygate<TFacilitator>
where
    TFacilitator: Facilitator + Sync,
{
    /// Handles an incoming request, enforcing payment before the inner
    /// service runs.
    ///
    /// On any failure the chain is aborted with the mapped error response;
    /// the inner service executes exactly once, and only after both verify
    /// and settle succeed.
    ///
    /// # Errors
    ///
    /// This method is infallible (`Infallible` error type).
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "signpay.handle_request", skip_all)
    )]
    pub async fn handle_request<S>(&self, inner: S, req: Request) -> Result<Response, Infallible>
    where
        S: Service<Request, Response = Response, Error = Infallible>,
        S::Future: Send,
    {
        // The body stream is single-read: buffer it up front and hand an
        // identical copy to the inner service, since order-validation
        // middleware or the handler itself may read it again.
        let (parts, body) = req.into_parts();
        let body_bytes = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) => {
                return Ok(failure_response(
                    &PaygateError::BodyRead(err.to_string()),
                    None,
                ));
            }
        };
        let mut req = Request::from_parts(parts, Body::from(body_bytes.clone()));

        // A per-request override from a preceding pricing stage takes
        // precedence over the configured amount.
        let amount = AmountOverride::get(&req)
            .filter(|value| !value.is_empty())
            .map(str::to_owned)
            .or_else(|| self.config.amount.clone());
        let Some(amount) = amount else {
            return Ok(failure_response(&PaygateError::AmountNotConfigured, None));
        };
        let requirements = self.config.requirements(&req, amount);

        let payment_payload = match extract_payment_payload(req.headers()) {
            Ok(payload) => payload,
            Err(err) => {
                return Ok(failure_response(
                    &PaygateError::Verification(err),
                    Some(&requirements),
                ));
            }
        };

        let verify_request = VerifyRequest {
            x402_version: V1,
            payment_payload: payment_payload.clone(),
            payment_requirements: requirements.clone(),
        };

        #[cfg(feature = "telemetry")]
        tracing::debug!(network = self.config.network, "Verifying payment");

        let verify_response = match self.facilitator.verify(verify_request.clone()).await {
            Ok(response) => response,
            Err(err) => {
                return Ok(failure_response(
                    &PaygateError::VerifyTransport(err.to_string()),
                    Some(&requirements),
                ));
            }
        };
        if let VerifyResponse::Invalid { reason, .. } = &verify_response {
            let reason = reason
                .clone()
                .unwrap_or_else(|| "unknown reason".to_owned());
            return Ok(failure_response(
                &PaygateError::Verification(VerificationError::Rejected(reason)),
                Some(&requirements),
            ));
        }

        // Settlement is only attempted after verification passes, never
        // speculatively, and at most once per request.
        #[cfg(feature = "telemetry")]
        tracing::debug!(network = self.config.network, "Settling payment");

        let settle_response = match self.facilitator.settle(verify_request.into()).await {
            Ok(response) => response,
            Err(err) => {
                return Ok(failure_response(
                    &PaygateError::SettleTransport(err.to_string()),
                    Some(&requirements),
                ));
            }
        };
        if let SettleResponse::Error { reason, .. } = &settle_response {
            let reason = reason
                .clone()
                .unwrap_or_else(|| "Settlement was not successful".to_owned());
            return Ok(failure_response(
                &PaygateError::SettleRejected(reason),
                Some(&requirements),
            ));
        }

        // Settlement already succeeded: an encoding glitch here must not
        // undo it, so the response header is best-effort.
        let settle_header = encode_settle_response(&settle_response).ok();

        req.extensions_mut().insert(PaymentData {
            payload: payment_payload,
            verify_response,
            settle_response,
            requirements,
            body: body_bytes,
        });

        let mut response = match Self::call_inner(inner, req).await {
            Ok(response) => response,
            Err(never) => match never {},
        };
        if let Some(value) = settle_header {
            response
                .headers_mut()
                .insert(X_PAYMENT_RESPONSE_HEADER, value);
        }
        Ok(response)
    }
}

/// Extracts and decodes the payment payload from the request headers.
///
/// An absent or empty header is the price-discovery case; a present but
/// undecodable header is malformed input, reported distinctly.
fn extract_payment_payload(headers: &HeaderMap) -> Result<PaymentPayload, VerificationError> {
    let header_value = headers
        .get(X_PAYMENT_HEADER)
        .map(HeaderValue::as_bytes)
        .filter(|value| !value.is_empty())
        .ok_or(VerificationError::PaymentHeaderRequired(X_PAYMENT_HEADER))?;
    crate::headers::decode_payment_payload(header_value)
        .map_err(|err| VerificationError::InvalidPaymentHeader(err.to_string()))
}

/// Converts a [`PaygateError`] into its HTTP error response.
///
/// 402 responses echo the constructed requirements under `accepts` so the
/// client can pay and retry; 400/500 responses carry only the error and the
/// protocol version.
fn failure_response(err: &PaygateError, requirements: Option<&PaymentRequirements>) -> Response {
    let status = match err {
        PaygateError::BodyRead(_)
        | PaygateError::Verification(VerificationError::InvalidPaymentHeader(_)) => {
            StatusCode::BAD_REQUEST
        }
        PaygateError::AmountNotConfigured
        | PaygateError::VerifyTransport(_)
        | PaygateError::SettleTransport(_) => StatusCode::INTERNAL_SERVER_ERROR,
        PaygateError::Verification(_) | PaygateError::SettleRejected(_) => {
            StatusCode::PAYMENT_REQUIRED
        }
    };

    let body = if status == StatusCode::PAYMENT_REQUIRED {
        let payment_required = PaymentRequired {
            x402_version: V1,
            accepts: requirements.cloned().into_iter().collect(),
            error: Some(err.to_string()),
        };
        serde_json::to_value(&payment_required).expect("serialization failed")
    } else {
        json!({
            "error": err.to_string(),
            "x402Version": X402Version1::VALUE,
        })
    };

    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("Fail to construct response")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::layer::SignPayMiddleware;
    use axum::Extension;
    use axum::Router;
    use axum::body::Bytes;
    use axum::routing::post;
    use signpay::networks::NetworkTable;
    use signpay::proto::{Base64Bytes, SettleRequest};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ASSET: &str = "0x3333333333333333333333333333333333333333";
    const PAY_TO: &str = "0x2222222222222222222222222222222222222222";

    fn payload_json() -> serde_json::Value {
        serde_json::json!({
            "x402Version": 1,
            "scheme": "exact",
            "network": "base-sepolia",
            "payload": {
                "signature": "0xdeadbeef",
                "authorization": {
                    "from": "0x1111111111111111111111111111111111111111",
                    "to": PAY_TO,
                    "value": "1000000",
                    "validAfter": "0",
                    "validBefore": "1999999999",
                    "nonce": "0xabc123"
                }
            }
        })
    }

    fn encoded_payload() -> String {
        Base64Bytes::encode(payload_json().to_string()).to_string()
    }

    #[derive(Debug, thiserror::Error)]
    #[error("{0}")]
    struct MockError(String);

    /// In-process facilitator double with call counters.
    #[derive(Clone, Debug)]
    struct MockFacilitator {
        verify_response: Result<VerifyResponse, String>,
        settle_response: Result<SettleResponse, String>,
        verify_calls: Arc<AtomicUsize>,
        settle_calls: Arc<AtomicUsize>,
        seen_amounts: Arc<Mutex<Vec<String>>>,
    }

    impl MockFacilitator {
        fn with(
            verify_response: Result<VerifyResponse, String>,
            settle_response: Result<SettleResponse, String>,
        ) -> Self {
            Self {
                verify_response,
                settle_response,
                verify_calls: Arc::new(AtomicUsize::new(0)),
                settle_calls: Arc::new(AtomicUsize::new(0)),
                seen_amounts: Arc::new(Mutex::new(Vec::new())),
            }
        }

        fn ok() -> Self {
            Self::with(
                Ok(VerifyResponse::valid(Some(
                    "0x1111111111111111111111111111111111111111".into(),
                ))),
                Ok(SettleResponse::Success {
                    transaction: "0xabc".into(),
                    network: Some("base-sepolia".into()),
                    payer: None,
                }),
            )
        }

        fn rejecting(reason: Option<&str>) -> Self {
            Self::with(
                Ok(VerifyResponse::invalid(reason.map(str::to_owned))),
                Ok(SettleResponse::Success {
                    transaction: "0xabc".into(),
                    network: None,
                    payer: None,
                }),
            )
        }

        fn verify_transport_error() -> Self {
            Self::with(
                Err("connection refused".into()),
                Ok(SettleResponse::Success {
                    transaction: "0xabc".into(),
                    network: None,
                    payer: None,
                }),
            )
        }

        fn settle_transport_error() -> Self {
            Self::with(
                Ok(VerifyResponse::valid(None)),
                Err("connection reset".into()),
            )
        }

        fn settle_rejecting(reason: Option<&str>) -> Self {
            Self::with(
                Ok(VerifyResponse::valid(None)),
                Ok(SettleResponse::Error {
                    reason: reason.map(str::to_owned),
                    network: None,
                }),
            )
        }
    }

    impl Facilitator for MockFacilitator {
        type Error = MockError;

        async fn verify(&self, request: VerifyRequest) -> Result<VerifyResponse, MockError> {
            self.verify_calls.fetch_add(1, Ordering::SeqCst);
            self.seen_amounts
                .lock()
                .unwrap()
                .push(request.payment_requirements.max_amount_required.clone());
            self.verify_response.clone().map_err(MockError)
        }

        async fn settle(&self, _request: SettleRequest) -> Result<SettleResponse, MockError> {
            self.settle_calls.fetch_add(1, Ordering::SeqCst);
            self.settle_response.clone().map_err(MockError)
        }
    }

    fn gate(amount: &str, facilitator: MockFacilitator) -> SignPayMiddleware<MockFacilitator> {
        SignPayMiddleware::with_facilitator(
            &NetworkTable::known(),
            84_532,
            ASSET,
            amount,
            PAY_TO,
            facilitator,
        )
        .unwrap()
    }

    fn app(middleware: SignPayMiddleware<MockFacilitator>) -> Router {
        Router::new()
            .route("/paid", post(|| async { "ok" }))
            .layer(middleware)
    }

    fn request(payment_header: Option<&str>, body: &'static str) -> http::Request<Body> {
        let mut builder = http::Request::builder()
            .method("POST")
            .uri("/paid")
            .header("host", "api.example.com");
        if let Some(value) = payment_header {
            builder = builder.header("X-PAYMENT", value);
        }
        builder.body(Body::from(body)).unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn missing_header_is_402_with_price_quote() {
        let facilitator = MockFacilitator::ok();
        let app = app(gate("1000000", facilitator.clone()));

        let response = app.oneshot(request(None, "")).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

        let body = json_body(response).await;
        assert_eq!(body["error"], "X-PAYMENT header is required");
        assert_eq!(body["x402Version"], 1);
        let accepts = body["accepts"].as_array().unwrap();
        assert_eq!(accepts.len(), 1);
        assert_eq!(accepts[0]["scheme"], "exact");
        assert_eq!(accepts[0]["network"], "base-sepolia");
        assert_eq!(accepts[0]["maxAmountRequired"], "1000000");
        assert_eq!(accepts[0]["resource"], "http://api.example.com/paid");
        assert_eq!(accepts[0]["payTo"], PAY_TO);
        assert_eq!(accepts[0]["asset"], ASSET);
        assert_eq!(accepts[0]["maxTimeoutSeconds"], 300);

        assert_eq!(facilitator.verify_calls.load(Ordering::SeqCst), 0);
        assert_eq!(facilitator.settle_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_header_is_treated_as_missing() {
        let app = app(gate("1000000", MockFacilitator::ok()));
        let response = app.oneshot(request(Some(""), "")).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);
    }

    #[tokio::test]
    async fn undecodable_header_is_400() {
        let facilitator = MockFacilitator::ok();
        let app = app(gate("1000000", facilitator.clone()));

        let response = app
            .oneshot(request(Some("!!not-base64!!"), ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = json_body(response).await;
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .starts_with("Invalid payment payload")
        );
        assert!(body.get("accepts").is_none());
        assert_eq!(facilitator.verify_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn structurally_invalid_payload_is_400() {
        let app = app(gate("1000000", MockFacilitator::ok()));
        let bogus = Base64Bytes::encode(r#"{"foo": 1}"#).to_string();
        let response = app.oneshot(request(Some(&bogus), "")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn wrong_protocol_version_is_400() {
        let app = app(gate("1000000", MockFacilitator::ok()));
        let mut json = payload_json();
        json["x402Version"] = serde_json::json!(2);
        let encoded = Base64Bytes::encode(json.to_string()).to_string();
        let response = app.oneshot(request(Some(&encoded), "")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn amount_override_takes_precedence_over_configured_amount() {
        let facilitator = MockFacilitator::ok();
        let app = app(gate("1000000", facilitator.clone()));

        let mut req = request(Some(&encoded_payload()), "");
        AmountOverride::insert(&mut req, "555");
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        assert_eq!(*facilitator.seen_amounts.lock().unwrap(), vec!["555"]);
    }

    #[tokio::test]
    async fn override_is_quoted_in_price_discovery() {
        let app = app(gate("1000000", MockFacilitator::ok()));
        let mut req = request(None, "");
        AmountOverride::insert(&mut req, "555");
        let response = app.oneshot(req).await.unwrap();

        let body = json_body(response).await;
        assert_eq!(body["accepts"][0]["maxAmountRequired"], "555");
    }

    #[tokio::test]
    async fn configured_amount_is_used_without_override() {
        let facilitator = MockFacilitator::ok();
        let app = app(gate("1000000", facilitator.clone()));

        let response = app
            .oneshot(request(Some(&encoded_payload()), ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*facilitator.seen_amounts.lock().unwrap(), vec!["1000000"]);
    }

    #[tokio::test]
    async fn no_amount_anywhere_is_500() {
        let facilitator = MockFacilitator::ok();
        let app = app(gate("", facilitator.clone()));

        let response = app
            .oneshot(request(Some(&encoded_payload()), ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = json_body(response).await;
        assert!(body["error"].as_str().unwrap().contains("not configured"));
        assert_eq!(body["x402Version"], 1);
        assert!(body.get("accepts").is_none());
        assert_eq!(facilitator.verify_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn empty_static_amount_with_override_succeeds() {
        let facilitator = MockFacilitator::ok();
        let app = app(gate("", facilitator.clone()));

        let mut req = request(Some(&encoded_payload()), "");
        AmountOverride::insert(&mut req, "19990000");
        let response = app.oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(*facilitator.seen_amounts.lock().unwrap(), vec!["19990000"]);
    }

    #[tokio::test]
    async fn rejected_verification_is_402_and_skips_settlement() {
        let facilitator = MockFacilitator::rejecting(Some("insufficient_funds"));
        let app = app(gate("1000000", facilitator.clone()));

        let response = app
            .oneshot(request(Some(&encoded_payload()), ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

        let body = json_body(response).await;
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .contains("insufficient_funds")
        );
        assert_eq!(body["accepts"][0]["maxAmountRequired"], "1000000");
        assert_eq!(facilitator.settle_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rejected_verification_without_reason_reports_unknown() {
        let app = app(gate("1000000", MockFacilitator::rejecting(None)));
        let response = app
            .oneshot(request(Some(&encoded_payload()), ""))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(
            body["error"],
            "Payment verification failed: unknown reason"
        );
    }

    #[tokio::test]
    async fn verify_transport_error_is_500_and_skips_settlement() {
        let facilitator = MockFacilitator::verify_transport_error();
        let app = app(gate("1000000", facilitator.clone()));

        let response = app
            .oneshot(request(Some(&encoded_payload()), ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = json_body(response).await;
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .starts_with("Payment verification failed")
        );
        assert_eq!(facilitator.settle_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn settle_transport_error_is_500() {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_in = Arc::clone(&hits);
        let app = Router::new()
            .route(
                "/paid",
                post(move || {
                    let hits = Arc::clone(&hits_in);
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        "ok"
                    }
                }),
            )
            .layer(gate("1000000", MockFacilitator::settle_transport_error()));

        let response = app
            .oneshot(request(Some(&encoded_payload()), ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unsuccessful_settlement_is_402_with_reason() {
        let app = app(gate(
            "1000000",
            MockFacilitator::settle_rejecting(Some("nonce already used")),
        ));
        let response = app
            .oneshot(request(Some(&encoded_payload()), ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

        let body = json_body(response).await;
        assert_eq!(
            body["error"],
            "Payment settlement failed: nonce already used"
        );
        assert!(body["accepts"].as_array().is_some());
    }

    #[tokio::test]
    async fn unsuccessful_settlement_without_reason_uses_generic_message() {
        let app = app(gate("1000000", MockFacilitator::settle_rejecting(None)));
        let response = app
            .oneshot(request(Some(&encoded_payload()), ""))
            .await
            .unwrap();
        let body = json_body(response).await;
        assert_eq!(
            body["error"],
            "Payment settlement failed: Settlement was not successful"
        );
    }

    #[tokio::test]
    async fn success_runs_handler_once_with_payment_data() {
        let facilitator = MockFacilitator::ok();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_in = Arc::clone(&hits);
        let app = Router::new()
            .route(
                "/paid",
                post(move |Extension(data): Extension<PaymentData>| {
                    let hits = Arc::clone(&hits_in);
                    async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        assert!(data.verify_response.is_valid());
                        assert_eq!(data.requirements.max_amount_required, "1000000");
                        assert_eq!(data.payload.network, "base-sepolia");
                        data.settle_response.transaction().unwrap().to_owned()
                    }
                }),
            )
            .layer(gate("1000000", facilitator.clone()));

        let response = app
            .oneshot(request(Some(&encoded_payload()), ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let settle_header = response
            .headers()
            .get(X_PAYMENT_RESPONSE_HEADER)
            .expect("settle response header");
        let decoded = Base64Bytes::from(settle_header.as_bytes()).decode().unwrap();
        let settle: SettleResponse = serde_json::from_slice(&decoded).unwrap();
        assert_eq!(settle.transaction(), Some("0xabc"));

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"0xabc");

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(facilitator.verify_calls.load(Ordering::SeqCst), 1);
        assert_eq!(facilitator.settle_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn body_is_byte_identical_downstream() {
        let app = Router::new()
            .route(
                "/paid",
                post(|Extension(data): Extension<PaymentData>, body: Bytes| async move {
                    assert_eq!(data.body, body);
                    body
                }),
            )
            .layer(gate("1000000", MockFacilitator::ok()));

        let payload = r#"{"item":"widget","qty":3}"#;
        let response = app
            .oneshot(request(Some(&encoded_payload()), payload))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], payload.as_bytes());
    }

    #[tokio::test]
    async fn empty_body_is_valid() {
        let app = Router::new()
            .route(
                "/paid",
                post(|Extension(data): Extension<PaymentData>| async move {
                    assert!(data.body.is_empty());
                    assert_eq!(data.parse_body::<serde_json::Value>().unwrap(), None);
                    "ok"
                }),
            )
            .layer(gate("1000000", MockFacilitator::ok()));

        let response = app
            .oneshot(request(Some(&encoded_payload()), ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn explicit_resource_overrides_derivation() {
        let middleware = gate("1000000", MockFacilitator::ok())
            .with_resource(Url::parse("https://shop.example/checkout").unwrap());
        let app = app(middleware);

        let response = app.oneshot(request(None, "")).await.unwrap();
        let body = json_body(response).await;
        assert_eq!(body["accepts"][0]["resource"], "https://shop.example/checkout");
    }

    // End-to-end scenarios against a wiremock facilitator, through the real
    // HTTP client.

    #[tokio::test]
    async fn e2e_price_discovery_against_remote_facilitator() {
        let mock_server = MockServer::start().await;
        let middleware =
            SignPayMiddleware::try_new(84_532, ASSET, "1000000", PAY_TO, &mock_server.uri())
                .unwrap();
        let app = Router::new()
            .route("/paid", post(|| async { "ok" }))
            .layer(middleware);

        let response = app.oneshot(request(None, "")).await.unwrap();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

        let body = json_body(response).await;
        assert_eq!(body["error"], "X-PAYMENT header is required");
        assert_eq!(body["accepts"][0]["network"], "base-sepolia");
        assert_eq!(body["accepts"][0]["maxAmountRequired"], "1000000");
        assert_eq!(body["x402Version"], 1);
    }

    #[tokio::test]
    async fn e2e_remote_rejection_surfaces_reason() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/verify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "isValid": false,
                "invalidReason": "insufficient_funds"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/settle"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&mock_server)
            .await;

        let middleware =
            SignPayMiddleware::try_new(84_532, ASSET, "1000000", PAY_TO, &mock_server.uri())
                .unwrap();
        let app = Router::new()
            .route("/paid", post(|| async { "ok" }))
            .layer(middleware);

        let response = app
            .oneshot(request(Some(&encoded_payload()), ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYMENT_REQUIRED);

        let body = json_body(response).await;
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .contains("insufficient_funds")
        );
    }

    #[tokio::test]
    async fn e2e_settled_payment_reaches_handler() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/verify"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "isValid": true,
                "payer": "0x1111111111111111111111111111111111111111"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/settle"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "success": true,
                "transaction": "0xabc",
                "network": "base-sepolia",
                "payer": "0x1111111111111111111111111111111111111111"
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let middleware =
            SignPayMiddleware::try_new(84_532, ASSET, "1000000", PAY_TO, &mock_server.uri())
                .unwrap();
        let app = Router::new()
            .route(
                "/paid",
                post(|Extension(data): Extension<PaymentData>| async move {
                    data.settle_response.transaction().unwrap().to_owned()
                }),
            )
            .layer(middleware);

        let response = app
            .oneshot(request(Some(&encoded_payload()), ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(X_PAYMENT_RESPONSE_HEADER));

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"0xabc");
    }
}
