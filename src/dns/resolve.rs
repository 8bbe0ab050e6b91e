use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::endpoint::Endpoint;
use crate::error::BoxError;

/// The future type returned by [`Resolve::resolve`].
pub type Resolving =
    Pin<Box<dyn Future<Output = Result<(Vec<Endpoint>, Option<Duration>), BoxError>> + Send>>;

/// Converts a symbolic, opaque service name to a set of [`Endpoint`]s plus
/// the duration for which that set should be considered fresh.
///
/// A `None` duration means the resolver has no TTL opinion and the caller's
/// default refresh interval applies. Resolution errors are the caller's
/// responsibility to interpret; the streaming resolver built on top of this
/// trait treats every error as transient and keeps serving the last known
/// good set.
pub trait Resolve: Send + Sync {
    fn resolve(&self, name: &str) -> Resolving;
}
