use std::sync::Arc;
use std::time::Duration;

use crate::breaker::BreakerConfig;
#[cfg(feature = "hickory-dns")]
use crate::dns::DnsSrvResolver;
use crate::dns::Resolve;
use crate::error::BoxError;
use crate::pool::PoolFactory;
use crate::report::ReportWriter;
use crate::transport::{
    BaseTransport, HyperBaseTransport, PoolSuccess, ResponseValidator, TimeoutTransport,
    simple_pool_success, simple_response_validator,
};

/// The fully-resolved configuration backing a [`crate::client::Client`].
/// Built exclusively through [`ClientBuilder`]; every field here has a
/// documented default so a caller only configures what they need to
/// change.
pub struct Config {
    pub(crate) resolver: Arc<dyn Resolve>,
    pub(crate) pool_factory: Option<Arc<dyn PoolFactory>>,
    pub(crate) pool_success: PoolSuccess,
    pub(crate) response_validator: ResponseValidator,
    pub(crate) max_attempts: usize,
    pub(crate) cutoff: Option<Duration>,
    pub(crate) read_timeout: Option<Duration>,
    pub(crate) breaker: BreakerConfig,
    pub(crate) max_idle_conns_per_endpoint: usize,
    pub(crate) report_writer: Option<Arc<dyn ReportWriter>>,
    pub(crate) scheme: String,
    pub(crate) base: Arc<dyn BaseTransport>,
}

/// Builds a [`Config`] / [`crate::client::Client`] with per-field
/// defaults, in the style of a `ClientBuilder`: every setter consumes and
/// returns `Self` so calls chain, and `build()` is the only fallible step.
pub struct ClientBuilder {
    resolver: Option<Arc<dyn Resolve>>,
    pool_factory: Option<Arc<dyn PoolFactory>>,
    pool_success: Option<PoolSuccess>,
    response_validator: Option<ResponseValidator>,
    max_attempts: usize,
    cutoff: Option<Duration>,
    read_timeout: Option<Duration>,
    breaker: BreakerConfig,
    max_idle_conns_per_endpoint: usize,
    report_writer: Option<Arc<dyn ReportWriter>>,
    scheme: String,
    base: Option<Arc<dyn BaseTransport>>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        ClientBuilder {
            resolver: None,
            pool_factory: None,
            pool_success: None,
            response_validator: None,
            max_attempts: 3,
            cutoff: None,
            read_timeout: None,
            breaker: BreakerConfig::default(),
            max_idle_conns_per_endpoint: 2,
            report_writer: None,
            scheme: "http".to_owned(),
            base: None,
        }
    }

    pub fn resolver(mut self, resolver: Arc<dyn Resolve>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn pool_factory(mut self, factory: Arc<dyn PoolFactory>) -> Self {
        self.pool_factory = Some(factory);
        self
    }

    pub fn pool_success(mut self, f: PoolSuccess) -> Self {
        self.pool_success = Some(f);
        self
    }

    pub fn response_validator(mut self, f: ResponseValidator) -> Self {
        self.response_validator = Some(f);
        self
    }

    /// Default 3. A value of 0 means no attempt is ever made.
    pub fn max_attempts(mut self, n: usize) -> Self {
        self.max_attempts = n;
        self
    }

    /// Default: no deadline.
    pub fn cutoff(mut self, d: Duration) -> Self {
        self.cutoff = Some(d);
        self
    }

    pub fn read_timeout(mut self, d: Duration) -> Self {
        self.read_timeout = Some(d);
        self
    }

    /// Default 0.05 (5%).
    pub fn breaker_failure_ratio(mut self, ratio: f64) -> Self {
        self.breaker.failure_ratio = ratio;
        self
    }

    pub fn breaker_min_samples(mut self, n: usize) -> Self {
        self.breaker.min_samples = n;
        self
    }

    pub fn breaker_window_size(mut self, n: usize) -> Self {
        self.breaker.window_size = n;
        self
    }

    /// Clamped to the crate's supported 1-10 second range.
    pub fn breaker_cooldown(mut self, d: Duration) -> Self {
        self.breaker.cooldown = d.clamp(Duration::from_secs(1), Duration::from_secs(10));
        self
    }

    pub fn max_idle_conns_per_endpoint(mut self, n: usize) -> Self {
        self.max_idle_conns_per_endpoint = n;
        self
    }

    pub fn report_writer(mut self, writer: Arc<dyn ReportWriter>) -> Self {
        self.report_writer = Some(writer);
        self
    }

    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.scheme = scheme.into();
        self
    }

    pub fn base_transport(mut self, base: Arc<dyn BaseTransport>) -> Self {
        self.base = Some(base);
        self
    }

    pub fn build(self) -> Result<Config, BoxError> {
        let resolver = match self.resolver {
            Some(r) => r,
            #[cfg(feature = "hickory-dns")]
            None => Arc::new(DnsSrvResolver::from_system_conf()?),
            #[cfg(not(feature = "hickory-dns"))]
            None => {
                return Err(
                    "no resolver configured: enable the `hickory-dns` feature for a default \
                     DNS SRV resolver, or call `.resolver(...)` explicitly"
                        .into(),
                );
            }
        };
        let base: Arc<dyn BaseTransport> = self
            .base
            .unwrap_or_else(|| Arc::new(HyperBaseTransport::with_max_idle_per_endpoint(self.max_idle_conns_per_endpoint)));
        let base: Arc<dyn BaseTransport> = match self.read_timeout {
            Some(d) => Arc::new(TimeoutTransport::new(base, d)),
            None => base,
        };

        Ok(Config {
            resolver,
            // No pool by default: the retry transport walks a fresh random
            // permutation of breaker-gated endpoints per request. Configuring
            // a pool_factory opts into pool-driven attempt ordering instead.
            pool_factory: self.pool_factory,
            pool_success: self.pool_success.unwrap_or_else(simple_pool_success),
            response_validator: self.response_validator.unwrap_or_else(simple_response_validator),
            max_attempts: self.max_attempts,
            cutoff: self.cutoff,
            read_timeout: self.read_timeout,
            breaker: self.breaker,
            max_idle_conns_per_endpoint: self.max_idle_conns_per_endpoint,
            report_writer: self.report_writer,
            scheme: self.scheme,
            base,
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
