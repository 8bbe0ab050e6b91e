use std::sync::Arc;

use bytes::Bytes;

use super::base::BaseTransport;
use super::retry::ResponseValidator;
use crate::breaker::Breaker;
use crate::director;
use crate::endpoint::Endpoint;
use crate::error::BoxError;

/// Combines a circuit breaker with a host-rewriting [`BaseTransport`] for
/// one endpoint. Lets callers check whether a request would be allowed to
/// proceed before committing to it, which is what gives the retry
/// transport immediate cross-endpoint failover instead of paying a
/// connection timeout on a known-bad endpoint.
pub struct AllowingTransport {
    endpoint: Endpoint,
    scheme: String,
    breaker: Breaker,
    base: Arc<dyn BaseTransport>,
    validator: ResponseValidator,
}

impl AllowingTransport {
    pub fn new(
        endpoint: Endpoint,
        scheme: String,
        breaker: Breaker,
        base: Arc<dyn BaseTransport>,
        validator: ResponseValidator,
    ) -> Self {
        AllowingTransport {
            endpoint,
            scheme,
            breaker,
            base,
            validator,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn allow(&self) -> bool {
        self.breaker.allow()
    }

    pub fn record_outcome(&self, valid: bool) {
        if valid {
            self.breaker.success();
        } else {
            self.breaker.failure();
        }
    }

    pub async fn round_trip(
        &self,
        req: &http::Request<Bytes>,
    ) -> Result<http::Response<Bytes>, BoxError> {
        let rewritten = director::direct(req, &self.endpoint, &self.scheme);
        match self.base.round_trip(rewritten).await {
            Ok(resp) => {
                let valid = (self.validator)(&resp);
                self.record_outcome(valid);
                Ok(resp)
            }
            Err(err) => {
                self.breaker.failure();
                Err(err)
            }
        }
    }
}
