//! The streaming resolver: a background task that turns one-shot [`Resolve`]
//! calls into a continually refreshed stream of host sets.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, trace, warn};

use crate::dns::Resolve;
use crate::endpoint::HostSet;

/// Delay before retrying resolution after an error, matching the
/// conservative fixed backoff used by comparable streaming proxies.
const FALLBACK_REFRESH_DELAY: Duration = Duration::from_secs(1);

/// Refresh interval used when a resolver declines to offer a TTL.
const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// A live subscription to a name's resolved host set.
///
/// Construction blocks until the first resolution completes (successfully
/// or not) so that callers never observe an empty set purely due to
/// start-up ordering; after that, [`StreamingResolver::watch`] clones of
/// the receiver observe every subsequent distinct host set.
pub struct StreamingResolver {
    rx: watch::Receiver<HostSet>,
    _quit: tokio::sync::mpsc::Sender<()>,
}

impl StreamingResolver {
    /// Starts resolving `name` via `resolver`, priming the first host set
    /// before returning.
    pub async fn start(name: impl Into<String>, resolver: Arc<dyn Resolve>) -> Self {
        let name = name.into();
        let (first_hosts, first_ttl) = match resolve_once(&resolver, &name).await {
            Some((hosts, ttl)) => (hosts, ttl),
            None => (HostSet::default(), Some(FALLBACK_REFRESH_DELAY)),
        };
        let (tx, rx) = watch::channel(first_hosts);
        let (quit_tx, mut quit_rx) = tokio::sync::mpsc::channel::<()>(1);

        tokio::spawn(async move {
            let mut next_delay = first_ttl.unwrap_or(DEFAULT_REFRESH_INTERVAL);
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(next_delay) => {
                        match resolve_once(&resolver, &name).await {
                            Some((hosts, ttl)) => {
                                next_delay = ttl.unwrap_or(DEFAULT_REFRESH_INTERVAL);
                                tx.send_if_modified(|current| {
                                    if *current == hosts {
                                        false
                                    } else {
                                        *current = hosts;
                                        true
                                    }
                                });
                            }
                            None => {
                                // resolve failed: retain the last known good
                                // host set and re-arm at the fallback delay.
                                next_delay = FALLBACK_REFRESH_DELAY;
                            }
                        }
                    }
                    _ = quit_rx.recv() => {
                        debug!(name = %name, "streaming resolver stopped");
                        return;
                    }
                    _ = tx.closed() => {
                        debug!(name = %name, "streaming resolver stopped, no subscribers left");
                        return;
                    }
                }
            }
        });

        StreamingResolver { rx, _quit: quit_tx }
    }

    /// Returns a receiver that observes every future distinct host set.
    pub fn watch(&self) -> watch::Receiver<HostSet> {
        self.rx.clone()
    }

    /// The current host set, without waiting for a change.
    pub fn current(&self) -> HostSet {
        self.rx.borrow().clone()
    }
}

/// Returns `None` on resolution failure so the caller can retain whatever
/// host set it already has rather than overwriting it with an empty one.
async fn resolve_once(resolver: &Arc<dyn Resolve>, name: &str) -> Option<(HostSet, Option<Duration>)> {
    match resolver.resolve(name).await {
        Ok((endpoints, ttl)) => {
            trace!(name, count = endpoints.len(), "resolved host set");
            Some((HostSet::new(endpoints), ttl))
        }
        Err(err) => {
            warn!(name, error = %err, "resolution failed, retaining previous host set");
            None
        }
    }
}
