use std::sync::Arc;

use bytes::Bytes;

use super::allowing::AllowingTransport;
use super::base::BaseTransport;
use super::retry::{PoolSuccess, RetryConfig, RetryTransport};
use crate::breaker::{Breaker, BreakerConfig};
use crate::endpoint::Endpoint;
use crate::error::Error;
use crate::metrics::Metrics;
use crate::pool::{Pool, PoolFactory};

/// Everything needed to build a [`Bundle`] for one resolved endpoint set.
/// Cloned cheaply (all fields are `Arc` or `Copy`) so the updating
/// transport's driver task can build a new bundle without borrowing from
/// the client.
#[derive(Clone)]
pub struct BundleFactory {
    pub scheme: Arc<str>,
    pub base: Arc<dyn BaseTransport>,
    pub breaker_config: BreakerConfig,
    pub retry_config: RetryConfig,
    pub pool_factory: Option<Arc<dyn PoolFactory>>,
    pub pool_success: PoolSuccess,
    pub metrics: Arc<Metrics>,
}

impl BundleFactory {
    pub fn build(&self, endpoints: Vec<Endpoint>) -> Bundle {
        let transports: Vec<Arc<AllowingTransport>> = endpoints
            .iter()
            .cloned()
            .map(|endpoint| {
                Arc::new(AllowingTransport::new(
                    endpoint,
                    self.scheme.to_string(),
                    Breaker::new(self.breaker_config),
                    self.base.clone(),
                    self.retry_config.validator.clone(),
                ))
            })
            .collect();

        let pool: Option<Arc<dyn Pool>> = self
            .pool_factory
            .as_ref()
            .map(|factory| Arc::from(factory.build(endpoints)));

        let retry = RetryTransport::new(
            transports,
            pool.clone(),
            self.pool_success.clone(),
            self.retry_config.clone(),
            self.metrics.clone(),
        );

        Bundle { retry, pool }
    }
}

/// An immutable snapshot of the per-endpoint transports (and optional
/// pool) bound to one resolved endpoint set. Bundles never mutate after
/// construction; the updating transport swaps the whole `Arc<Bundle>`
/// when the endpoint set changes.
pub struct Bundle {
    retry: RetryTransport,
    pool: Option<Arc<dyn Pool>>,
}

impl Bundle {
    pub fn empty(metrics: Arc<Metrics>) -> Self {
        Bundle {
            retry: RetryTransport::new(
                Vec::new(),
                None,
                super::retry::simple_pool_success(),
                RetryConfig::default(),
                metrics,
            ),
            pool: None,
        }
    }

    pub async fn round_trip(&self, req: &http::Request<Bytes>) -> Result<http::Response<Bytes>, Error> {
        self.retry.round_trip(req).await
    }

    pub async fn close(&self) {
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
