use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;

use crate::error::BoxError;

/// The contract this crate requires from the underlying single-socket HTTP
/// engine: a request/response round trip, nothing more.
///
/// Connection pooling, TLS, and HTTP/1.1 vs HTTP/2 negotiation are the
/// engine's concern, not this crate's; callers who need those knobs
/// configure them on the engine they hand to [`crate::config::Config`].
/// Bodies are always fully-buffered `Bytes` so that a request can be
/// replayed verbatim across retry attempts.
#[async_trait]
pub trait BaseTransport: Send + Sync {
    async fn round_trip(
        &self,
        req: http::Request<Bytes>,
    ) -> Result<http::Response<Bytes>, BoxError>;
}

/// The default [`BaseTransport`], backed by `hyper-util`'s legacy client.
pub struct HyperBaseTransport {
    client: Client<HttpConnector, Full<Bytes>>,
}

impl HyperBaseTransport {
    pub fn new() -> Self {
        let connector = HttpConnector::new();
        let client = Client::builder(TokioExecutor::new()).build(connector);
        HyperBaseTransport { client }
    }

    pub fn with_max_idle_per_endpoint(max_idle: usize) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_reuse_address(true);
        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(max_idle)
            .build(connector);
        HyperBaseTransport { client }
    }
}

impl Default for HyperBaseTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseTransport for HyperBaseTransport {
    async fn round_trip(
        &self,
        req: http::Request<Bytes>,
    ) -> Result<http::Response<Bytes>, BoxError> {
        let (parts, body) = req.into_parts();
        let req = http::Request::from_parts(parts, Full::new(body));

        let resp = self.client.request(req).await?;
        let (parts, body) = resp.into_parts();
        let collected = body.collect().await?;
        Ok(http::Response::from_parts(parts, collected.to_bytes()))
    }
}

/// Wraps another [`BaseTransport`] with a per-attempt response-header
/// timeout, matching the `ReadTimeout` knob in [`crate::config::Config`].
///
/// This is the backstop the retry transport's own `deadline` relies on
/// (§5): a slow or degrading endpoint is cut off here rather than being
/// waited out one attempt at a time.
pub struct TimeoutTransport {
    inner: Arc<dyn BaseTransport>,
    duration: Duration,
}

impl TimeoutTransport {
    pub fn new(inner: Arc<dyn BaseTransport>, duration: Duration) -> Self {
        TimeoutTransport { inner, duration }
    }
}

#[async_trait]
impl BaseTransport for TimeoutTransport {
    async fn round_trip(
        &self,
        req: http::Request<Bytes>,
    ) -> Result<http::Response<Bytes>, BoxError> {
        match tokio::time::timeout(self.duration, self.inner.round_trip(req)).await {
            Ok(result) => result,
            Err(_) => Err("read timeout".into()),
        }
    }
}
