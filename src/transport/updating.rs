use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::{mpsc, watch};
use tracing::debug;

use super::bundle::{Bundle, BundleFactory};
use crate::dns::Resolve;
use crate::error::Error;
use crate::resolver::StreamingResolver;

/// Keeps a single, always-valid transport [`Bundle`] hot-swapped in
/// response to the streaming resolver's endpoint-set changes.
///
/// Construction synchronously primes the first bundle before returning,
/// so `round_trip` never observes an uninitialized state. After that, a
/// background task rebuilds the bundle whenever the resolver reports a
/// distinct host set; in-flight requests keep running against the
/// `Arc<Bundle>` they started with, since bundles are immutable and the
/// swap only replaces which one new requests see.
pub struct UpdatingTransport {
    bundle_rx: watch::Receiver<Arc<Bundle>>,
    // Kept alive so the resolver's background task and channel live as
    // long as this transport does.
    _resolver: StreamingResolver,
    _quit: mpsc::Sender<()>,
}

impl UpdatingTransport {
    pub async fn start(name: impl Into<String>, resolver: Arc<dyn Resolve>, factory: BundleFactory) -> Self {
        let name = name.into();
        let streaming = StreamingResolver::start(name.clone(), resolver).await;
        let first_bundle = Arc::new(factory.build(streaming.current().into_vec()));
        let (bundle_tx, bundle_rx) = watch::channel(first_bundle);

        let mut host_rx = streaming.watch();
        let (quit_tx, mut quit_rx) = mpsc::channel::<()>(1);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = host_rx.changed() => {
                        if changed.is_err() {
                            let stale = bundle_tx.borrow().clone();
                            stale.close().await;
                            return;
                        }
                        let hosts = host_rx.borrow_and_update().clone().into_vec();
                        debug!(name = %name, count = hosts.len(), "endpoint set changed, rebuilding bundle");
                        let new_bundle = Arc::new(factory.build(hosts));
                        let old_bundle = bundle_tx.send_replace(new_bundle);
                        old_bundle.close().await;
                    }
                    _ = quit_rx.recv() => {
                        let stale = bundle_tx.borrow().clone();
                        stale.close().await;
                        return;
                    }
                    _ = bundle_tx.closed() => {
                        let stale = bundle_tx.borrow().clone();
                        stale.close().await;
                        return;
                    }
                }
            }
        });

        UpdatingTransport {
            bundle_rx,
            _resolver: streaming,
            _quit: quit_tx,
        }
    }

    pub async fn round_trip(&self, req: &http::Request<Bytes>) -> Result<http::Response<Bytes>, Error> {
        let bundle = self.bundle_rx.borrow().clone();
        bundle.round_trip(req).await
    }

    /// The bundle currently in effect, for tests and introspection.
    pub fn current_bundle(&self) -> Arc<Bundle> {
        self.bundle_rx.borrow().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::breaker::BreakerConfig;
    use crate::dns::test_support::ScriptedResolver;
    use crate::endpoint::Endpoint;
    use crate::transport::{BaseTransport, RetryConfig, simple_pool_success, simple_response_validator};
    use async_trait::async_trait;
    use std::time::Duration;

    struct EchoTransport;

    #[async_trait]
    impl BaseTransport for EchoTransport {
        async fn round_trip(
            &self,
            _req: http::Request<Bytes>,
        ) -> Result<http::Response<Bytes>, crate::error::BoxError> {
            Ok(http::Response::builder().status(200).body(Bytes::new()).unwrap())
        }
    }

    fn factory() -> BundleFactory {
        BundleFactory {
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
        }
    }

    #[tokio::test(start_paused = true)]
    async fn swaps_bundle_when_endpoint_set_changes() {
        let resolver: Arc<dyn Resolve> = Arc::new(ScriptedResolver::new(vec![
            Ok((vec![Endpoint::new("a", 1)], Some(Duration::from_millis(10)))),
            Ok((vec![Endpoint::new("b", 2)], Some(Duration::from_millis(10)))),
        ]));

        let transport = UpdatingTransport::start("svc", resolver, factory()).await;
        let req = http::Request::builder()
            .uri("http://svc/")
            .body(Bytes::new())
            .unwrap();
        let resp = transport.round_trip(&req).await.unwrap();
        assert_eq!(resp.status(), 200);

        tokio::time::advance(Duration::from_millis(20)).await;
        tokio::task::yield_now().await;

        let resp = transport.round_trip(&req).await.unwrap();
        assert_eq!(resp.status(), 200);
    }
}
