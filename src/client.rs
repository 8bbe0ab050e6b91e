use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;

use crate::config::Config;
use crate::error::Error;
use crate::metrics::Metrics;
use crate::registry::Registry;
use crate::report::ReportEvent;
use crate::transport::{BundleFactory, RetryConfig};

pub use crate::config::ClientBuilder;

/// Issues HTTP requests against symbolic service names, each continuously
/// resolved to a changing set of backend endpoints.
///
/// A single `Client` owns a [`Registry`] of per-name transports; cloning
/// it (it's cheap — everything inside is `Arc`'d) shares that registry,
/// which is the intended way to reuse one client across a process.
pub struct Client {
    registry: Arc<Registry>,
    metrics: Arc<Metrics>,
    report_writer: Option<Arc<dyn crate::report::ReportWriter>>,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn from_config(config: Config) -> Self {
        let metrics = Arc::new(Metrics::new());
        let report_writer = config.report_writer.clone();
        let factory = BundleFactory {
            scheme: Arc::from(config.scheme.as_str()),
            base: config.base.clone(),
            breaker_config: config.breaker,
            retry_config: RetryConfig {
                max_attempts: config.max_attempts,
                cutoff: config.cutoff,
                validator: config.response_validator.clone(),
            },
            pool_factory: config.pool_factory.clone(),
            pool_success: config.pool_success.clone(),
            metrics: metrics.clone(),
        };
        let registry = Arc::new(Registry::new(config.resolver.clone(), factory));
        Client {
            registry,
            metrics,
            report_writer,
        }
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Sends `req` against `name`'s resolved endpoints, retrying across
    /// endpoints per the client's configuration.
    pub async fn request(
        &self,
        name: &str,
        req: http::Request<Bytes>,
    ) -> Result<http::Response<Bytes>, Error> {
        self.metrics.record_request();
        let started = Instant::now();
        let transport = self.registry.get(name).await;
        let result = transport.round_trip(&req).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &result {
            Ok(resp) => {
                self.metrics.record_success();
                self.metrics.record_latency(resp.status().as_u16(), elapsed_ms);
                if let Some(writer) = &self.report_writer {
                    writer.write(&build_report_event(name, &req, resp, elapsed_ms));
                }
            }
            Err(_) => self.metrics.record_failure(),
        }

        result
    }
}

fn build_report_event(
    name: &str,
    req: &http::Request<Bytes>,
    resp: &http::Response<Bytes>,
    elapsed_ms: u64,
) -> ReportEvent {
    ReportEvent {
        time: ReportEvent::now_rfc3339(),
        method: req.method().to_string(),
        url: req.uri().to_string(),
        path: req.uri().path().to_owned(),
        proto: format!("{:?}", req.version()),
        status: resp.status().as_u16(),
        content_length: resp.body().len() as u64,
        ms: elapsed_ms,
        host: name.to_owned(),
        remote_addr: None,
        forwarded_for: req
            .headers()
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
        forwarded_proto: req
            .headers()
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
        authorization: None,
        referrer: req
            .headers()
            .get("referer")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
        user_agent: req
            .headers()
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
        range: req
            .headers()
            .get("range")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
        request_id: req
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned),
        region: None,
        country: None,
        city: None,
    }
}

impl ClientBuilder {
    pub fn build_client(self) -> Result<Client, crate::error::BoxError> {
        Ok(Client::from_config(self.build()?))
    }
}
