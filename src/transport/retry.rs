use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use rand::seq::SliceRandom;
use tracing::trace;

use super::allowing::AllowingTransport;
use crate::error::{BoxError, Error};
use crate::pool::Pool;

/// Decides whether a response, once received, should be returned to the
/// caller or retried against a different endpoint.
pub type ResponseValidator = Arc<dyn Fn(&http::Response<Bytes>) -> bool + Send + Sync>;

/// Classifies the outcome of one attempt for the purposes of pool
/// feedback. Distinct from [`ResponseValidator`] because a pool may want
/// to treat, say, a 4xx response as a pool-success (the endpoint is
/// healthy, the request itself was bad) while the retry transport still
/// wouldn't retry it either way.
pub type PoolSuccess = Arc<dyn Fn(Option<&http::Response<Bytes>>, Option<&BoxError>) -> bool + Send + Sync>;

/// Accepts any response without a transport error; the default `PoolSuccess`.
pub fn simple_pool_success() -> PoolSuccess {
    Arc::new(|_resp, err| err.is_none())
}

/// Accepts 1xx/2xx/3xx/4xx; only 5xx and transport errors are retried.
/// The default `ResponseValidator`.
pub fn simple_response_validator() -> ResponseValidator {
    Arc::new(|resp| resp.status().as_u16() < 500)
}

#[derive(Clone)]
pub struct RetryConfig {
    pub max_attempts: usize,
    pub cutoff: Option<Duration>,
    pub validator: ResponseValidator,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_attempts: 3,
            cutoff: None,
            validator: simple_response_validator(),
        }
    }
}

/// Retries a request across endpoints: a fresh random permutation per
/// request (or, with a [`Pool`] configured, pool-driven ordering), with
/// breaker-gated skipping, a deadline, and a max-attempts budget. Failed
/// attempts accumulate into a single composite error rather than
/// propagating individually.
pub struct RetryTransport {
    transports: Vec<Arc<AllowingTransport>>,
    pool: Option<Arc<dyn Pool>>,
    pool_success: PoolSuccess,
    config: RetryConfig,
    metrics: Arc<crate::metrics::Metrics>,
}

impl RetryTransport {
    pub fn new(
        transports: Vec<Arc<AllowingTransport>>,
        pool: Option<Arc<dyn Pool>>,
        pool_success: PoolSuccess,
        config: RetryConfig,
        metrics: Arc<crate::metrics::Metrics>,
    ) -> Self {
        RetryTransport {
            transports,
            pool,
            pool_success,
            config,
            metrics,
        }
    }

    pub async fn round_trip(
        &self,
        req: &http::Request<Bytes>,
    ) -> Result<http::Response<Bytes>, Error> {
        if self.transports.is_empty() {
            return Err(Error::NoTransportAvailable);
        }

        let deadline = self.config.cutoff.map(|d| Instant::now() + d);
        let mut attempts = 0usize;
        let mut causes: Vec<BoxError> = Vec::new();

        match &self.pool {
            Some(pool) => self.round_trip_pooled(req, pool, deadline, &mut attempts, &mut causes).await,
            None => self.round_trip_permuted(req, deadline, &mut attempts, &mut causes).await,
        }
    }

    async fn round_trip_permuted(
        &self,
        req: &http::Request<Bytes>,
        deadline: Option<Instant>,
        attempts: &mut usize,
        causes: &mut Vec<BoxError>,
    ) -> Result<http::Response<Bytes>, Error> {
        let mut order: Vec<usize> = (0..self.transports.len()).collect();
        order.shuffle(&mut rand::rng());

        for idx in order {
            if *attempts >= self.config.max_attempts {
                return Err(Error::AttemptsExhausted {
                    attempts: *attempts,
                    causes: std::mem::take(causes),
                });
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(Error::DeadlineExceeded {
                        causes: std::mem::take(causes),
                    });
                }
            }

            let transport = &self.transports[idx];
            if !transport.allow() {
                trace!(endpoint = %transport.endpoint(), "breaker denies, skipping without counting attempt");
                continue;
            }
            *attempts += 1;

            match transport.round_trip(req).await {
                Ok(resp) if (self.config.validator)(&resp) => return Ok(resp),
                Ok(resp) => causes.push(format!("validator rejected status {}", resp.status()).into()),
                Err(err) => causes.push(err),
            }
        }

        Err(Error::AttemptsExhausted {
            attempts: *attempts,
            causes: std::mem::take(causes),
        })
    }

    async fn round_trip_pooled(
        &self,
        req: &http::Request<Bytes>,
        pool: &Arc<dyn Pool>,
        deadline: Option<Instant>,
        attempts: &mut usize,
        causes: &mut Vec<BoxError>,
    ) -> Result<http::Response<Bytes>, Error> {
        let mut consecutive_skips = 0usize;
        let skip_budget = self.transports.len().max(1) * 2;

        loop {
            if *attempts >= self.config.max_attempts {
                return Err(Error::AttemptsExhausted {
                    attempts: *attempts,
                    causes: std::mem::take(causes),
                });
            }
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return Err(Error::DeadlineExceeded {
                        causes: std::mem::take(causes),
                    });
                }
            }

            self.metrics.record_pool_get();
            let host = match pool.get().await {
                Ok(host) => host,
                Err(Error::NoHosts) => return Err(Error::NoHosts),
                Err(err) => return Err(err),
            };

            let transport = self
                .transports
                .iter()
                .find(|t| t.endpoint().authority() == host.authority());
            let Some(transport) = transport else {
                // pool returned a host outside the current bundle snapshot;
                // treat like a denied endpoint rather than retrying forever.
                consecutive_skips += 1;
                if consecutive_skips > skip_budget {
                    return Err(Error::NoTransportAvailable);
                }
                continue;
            };

            if !transport.allow() {
                consecutive_skips += 1;
                if consecutive_skips > skip_budget {
                    return Err(Error::NoTransportAvailable);
                }
                continue;
            }
            consecutive_skips = 0;
            *attempts += 1;

            match transport.round_trip(req).await {
                Ok(resp) => {
                    let valid = (self.config.validator)(&resp);
                    let ok = (self.pool_success)(Some(&resp), None);
                    let _ = pool.put(&host, ok).await;
                    self.metrics.record_pool_put(ok);
                    if valid {
                        return Ok(resp);
                    }
                    causes.push(format!("validator rejected status {}", resp.status()).into());
                }
                Err(err) => {
                    let ok = (self.pool_success)(None, Some(&err));
                    let _ = pool.put(&host, ok).await;
                    self.metrics.record_pool_put(ok);
                    causes.push(err);
                }
            }
        }
    }
}
