use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::transport::{BundleFactory, UpdatingTransport};

/// Caches one [`UpdatingTransport`] per symbolic name, allocating lazily
/// on first use and never evicting.
///
/// A registry is meant to be shared across a process for a bounded set of
/// service names; callers whose name space is effectively unbounded (for
/// example, names derived from untrusted input) should not share one
/// registry, since nothing here frees an entry.
pub struct Registry {
    resolver: Arc<dyn crate::dns::Resolve>,
    factory: BundleFactory,
    transports: Mutex<HashMap<String, Arc<UpdatingTransport>>>,
}

impl Registry {
    pub fn new(resolver: Arc<dyn crate::dns::Resolve>, factory: BundleFactory) -> Self {
        Registry {
            resolver,
            factory,
            transports: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the transport for `name`, allocating and priming it on
    /// first use.
    pub async fn get(&self, name: &str) -> Arc<UpdatingTransport> {
        if let Some(existing) = self.transports.lock().expect("registry poisoned").get(name) {
            return existing.clone();
        }

        // Resolution happens outside the lock: priming can take a DNS
        // round trip, and we don't want concurrent lookups of other names
        // blocked on it. A race where two callers both prime the same new
        // name is resolved by keeping whichever one wins the insert.
        let transport = Arc::new(
            UpdatingTransport::start(name.to_owned(), self.resolver.clone(), self.factory.clone()).await,
        );

        let mut transports = self.transports.lock().expect("registry poisoned");
        transports.entry(name.to_owned()).or_insert(transport).clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breaker::BreakerConfig;
    use crate::dns::test_support::ScriptedResolver;
    use crate::endpoint::Endpoint;
    use crate::transport::{RetryConfig, simple_pool_success, simple_response_validator};
    use async_trait::async_trait;
    use bytes::Bytes;

    struct EchoTransport;

    #[async_trait]
    impl crate::transport::BaseTransport for EchoTransport {
        async fn round_trip(
            &self,
            _req: http::Request<Bytes>,
        ) -> Result<http::Response<Bytes>, crate::error::BoxError> {
            Ok(http::Response::builder().status(200).body(Bytes::new()).unwrap())
        }
    }

    #[tokio::test]
    async fn same_name_returns_same_transport_instance() {
        let resolver: Arc<dyn crate::dns::Resolve> =
            Arc::new(ScriptedResolver::new(vec![Ok((vec![Endpoint::new("a", 1)], None))]));
        let factory = BundleFactory {
            scheme: Arc::from("http"),
            base: Arc::new(EchoTransport),
            breaker_config: BreakerConfig::default(),
            retry_config: RetryConfig {
                max_attempts: 3,
                cutoff: None,
                validator: simple_response_validator(),
            },
            pool_factory: None,
            pool_success: simple_pool_success(),
            metrics: Arc::new(crate::metrics::Metrics::new()),
        };
        let registry = Registry::new(resolver, factory);

        let a = registry.get("svc").await;
        let b = registry.get("svc").await;
        assert!(Arc::ptr_eq(&a, &b));
    }
}
