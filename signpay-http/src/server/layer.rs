//! Tower layer wiring for the payment gate.
//!
//! [`SignPayMiddleware`] holds the construction-time configuration: the
//! resolved network name, token asset, recipient, default amount, and the
//! facilitator client. It implements [`tower::Layer`], so it can be applied
//! to an axum router or any tower service; the produced [`SignPayService`]
//! runs the per-request [`Paygate`] logic.
//!
//! ## Configuration Notes
//!
//! - The chain ID is resolved against a [`NetworkTable`] at construction.
//!   An unknown chain ID is a fatal configuration error: [`SignPayMiddleware::try_new`]
//!   returns it, [`SignPayMiddleware::new`] panics, aborting startup.
//! - An empty amount string configures no static amount; every request then
//!   requires an [`AmountOverride`](super::AmountOverride) from a preceding
//!   pricing stage.
//! - **[`SignPayMiddleware::with_resource`]** pins the resource URL reported in payment
//!   requirements; without it the URL is derived per request.
//! - **[`SignPayMiddleware::with_api_key`]** authenticates against hosted facilitators.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum_core::extract::Request;
use axum_core::response::Response;
use signpay::facilitator::Facilitator;
use signpay::networks::NetworkTable;
use tower::util::BoxCloneSyncService;
use tower::{Layer, Service};
use url::Url;

use crate::constants::DEFAULT_DESCRIPTION;
use crate::facilitator_client::FacilitatorClient;

use super::error::ConfigError;
use super::paygate::{Paygate, PaygateConfig};

/// The payment-gate middleware for protected routes.
///
/// Create one instance per protected route (or share one across routes with
/// identical payment terms) and apply it as a layer.
pub struct SignPayMiddleware<F = Arc<FacilitatorClient>> {
    facilitator: F,
    config: Arc<PaygateConfig>,
}

impl<F: Clone> Clone for SignPayMiddleware<F> {
    fn clone(&self) -> Self {
        Self {
            facilitator: self.facilitator.clone(),
            config: Arc::clone(&self.config),
        }
    }
}

impl<F: std::fmt::Debug> std::fmt::Debug for SignPayMiddleware<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignPayMiddleware")
            .field("facilitator", &self.facilitator)
            .field("config", &self.config)
            .finish()
    }
}

impl SignPayMiddleware<Arc<FacilitatorClient>> {
    /// Creates a middleware instance backed by a remote facilitator.
    ///
    /// `amount` is a decimal string in the token's smallest unit; pass `""`
    /// to force per-request pricing via
    /// [`AmountOverride`](super::AmountOverride).
    ///
    /// # Panics
    ///
    /// Panics if the chain ID is unknown or the facilitator URL is invalid.
    /// Misconfiguration must abort startup, not degrade at request time.
    #[must_use]
    pub fn new(
        chain_id: u64,
        asset: &str,
        amount: &str,
        pay_to: &str,
        facilitator_url: &str,
    ) -> Self {
        Self::try_new(chain_id, asset, amount, pay_to, facilitator_url)
            .expect("sign-pay middleware configuration")
    }

    /// Creates a middleware instance backed by a remote facilitator,
    /// resolving the chain ID against the built-in network table.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the chain ID is unknown or the
    /// facilitator URL is invalid.
    pub fn try_new(
        chain_id: u64,
        asset: &str,
        amount: &str,
        pay_to: &str,
        facilitator_url: &str,
    ) -> Result<Self, ConfigError> {
        Self::try_with_networks(
            &NetworkTable::known(),
            chain_id,
            asset,
            amount,
            pay_to,
            facilitator_url,
        )
    }

    /// Creates a middleware instance, resolving the chain ID against a
    /// caller-provided [`NetworkTable`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the chain ID is unknown or the
    /// facilitator URL is invalid.
    pub fn try_with_networks(
        table: &NetworkTable,
        chain_id: u64,
        asset: &str,
        amount: &str,
        pay_to: &str,
        facilitator_url: &str,
    ) -> Result<Self, ConfigError> {
        let facilitator = Arc::new(FacilitatorClient::try_from(facilitator_url)?);
        Self::with_facilitator(table, chain_id, asset, amount, pay_to, facilitator)
    }

    /// Authenticates verify/settle calls with a bearer credential.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the key is not a valid header value.
    pub fn with_api_key(self, api_key: &str) -> Result<Self, ConfigError> {
        let inner = Arc::unwrap_or_clone(self.facilitator);
        Ok(Self {
            facilitator: Arc::new(inner.with_api_key(api_key)?),
            config: self.config,
        })
    }

    /// Sets the outbound facilitator-call timeout.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let inner = Arc::unwrap_or_clone(self.facilitator);
        Self {
            facilitator: Arc::new(inner.with_timeout(timeout)),
            config: self.config,
        }
    }

    /// Returns the configured facilitator URL.
    #[must_use]
    pub fn facilitator_url(&self) -> &Url {
        self.facilitator.base_url()
    }
}

impl<F> SignPayMiddleware<F>
where
    F: Facilitator,
{
    /// Creates a middleware instance with a custom [`Facilitator`]
    /// implementation (an in-process facilitator, a test double, …).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnsupportedChainId`] if the chain ID is not
    /// in the table.
    pub fn with_facilitator(
        table: &NetworkTable,
        chain_id: u64,
        asset: &str,
        amount: &str,
        pay_to: &str,
        facilitator: F,
    ) -> Result<Self, ConfigError> {
        let network = table
            .name_by_chain_id(chain_id)
            .ok_or(ConfigError::UnsupportedChainId(chain_id))?;
        Ok(Self {
            facilitator,
            config: Arc::new(PaygateConfig {
                network,
                asset: asset.to_owned(),
                pay_to: pay_to.to_owned(),
                amount: (!amount.is_empty()).then(|| amount.to_owned()),
                resource: None,
                description: DEFAULT_DESCRIPTION.to_owned(),
            }),
        })
    }
}

impl<F> SignPayMiddleware<F> {
    /// Pins the resource URL reported in payment requirements.
    ///
    /// When set, this URL is used directly instead of deriving it from each
    /// request. This is the preferred approach in production.
    #[must_use]
    pub fn with_resource(mut self, resource: Url) -> Self {
        let mut config = (*self.config).clone();
        config.resource = Some(resource);
        self.config = Arc::new(config);
        self
    }

    /// Sets a description of what the payment grants access to.
    ///
    /// Included in 402 responses to inform clients what they're paying for.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let mut config = (*self.config).clone();
        config.description = description.into();
        self.config = Arc::new(config);
        self
    }

    /// Returns a reference to the underlying facilitator.
    pub const fn facilitator(&self) -> &F {
        &self.facilitator
    }

    /// Returns the resolved wire-format network name.
    #[must_use]
    pub fn network(&self) -> &'static str {
        self.config.network
    }
}

impl<S, F> Layer<S> for SignPayMiddleware<F>
where
    S: Service<Request, Response = Response, Error = Infallible> + Clone + Send + Sync + 'static,
    S::Future: Send + 'static,
    F: Facilitator + Clone,
{
    type Service = SignPayService<F>;

    fn layer(&self, inner: S) -> Self::Service {
        SignPayService {
            facilitator: self.facilitator.clone(),
            config: Arc::clone(&self.config),
            inner: BoxCloneSyncService::new(inner),
        }
    }
}

/// Tower service that enforces payment on incoming requests.
#[derive(Clone)]
#[allow(missing_debug_implementations)] // BoxCloneSyncService does not implement Debug
pub struct SignPayService<F> {
    /// Payment facilitator (remote or in-process)
    facilitator: F,
    /// Static gate configuration shared across requests
    config: Arc<PaygateConfig>,
    /// The inner service being wrapped
    inner: BoxCloneSyncService<Request, Response, Infallible>,
}

impl<F> Service<Request> for SignPayService<F>
where
    F: Facilitator + Clone + Send + Sync + 'static,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    /// Delegates readiness polling to the wrapped inner service.
    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    /// Intercepts the request, enforces payment, and forwards to the
    /// wrapped service.
    fn call(&mut self, req: Request) -> Self::Future {
        let gate = Paygate {
            facilitator: self.facilitator.clone(),
            config: Arc::clone(&self.config),
        };
        let inner = self.inner.clone();

        Box::pin(async move { gate.handle_request(inner, req).await })
    }
}
