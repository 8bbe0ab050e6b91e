//! Host pools: the `get`/`put`/`close` contract and its two policies.

mod priority_queue;
mod round_robin;

pub use priority_queue::PriorityQueuePool;
pub use round_robin::RoundRobinPool;

use async_trait::async_trait;

use crate::endpoint::Endpoint;
use crate::error::Error;

/// Yields endpoints for outgoing requests and accepts feedback about
/// whether a previously yielded endpoint's request succeeded.
///
/// `put` only influences future scheduling; it never affects a request
/// already in flight. After [`Pool::close`], every method returns
/// [`Error::PoolClosed`].
#[async_trait]
pub trait Pool: Send + Sync {
    async fn get(&self) -> Result<Endpoint, Error>;
    async fn put(&self, endpoint: &Endpoint, success: bool) -> Result<(), Error>;
    async fn close(&self);
}

/// Builds a [`Pool`] from a resolved host set. Stored in [`crate::config::Config`]
/// as `pool_factory`.
pub trait PoolFactory: Send + Sync {
    fn build(&self, endpoints: Vec<Endpoint>) -> Box<dyn Pool>;
}

impl<F> PoolFactory for F
where
    F: Fn(Vec<Endpoint>) -> Box<dyn Pool> + Send + Sync,
{
    fn build(&self, endpoints: Vec<Endpoint>) -> Box<dyn Pool> {
        (self)(endpoints)
    }
}

/// A [`PoolFactory`] that builds a [`RoundRobinPool`]. Not configured by
/// default: [`crate::config::Config`]'s `pool_factory` is `None` unless a
/// caller opts into pool-driven attempt ordering via
/// [`crate::config::ClientBuilder::pool_factory`].
pub struct RoundRobinFactory;

impl PoolFactory for RoundRobinFactory {
    fn build(&self, endpoints: Vec<Endpoint>) -> Box<dyn Pool> {
        Box::new(RoundRobinPool::new(endpoints))
    }
}

/// A [`PoolFactory`] that builds [`PriorityQueuePool`]s with a fixed
/// recycle duration.
pub struct PriorityQueueFactory {
    pub recycle: std::time::Duration,
}

impl PoolFactory for PriorityQueueFactory {
    fn build(&self, endpoints: Vec<Endpoint>) -> Box<dyn Pool> {
        Box::new(PriorityQueuePool::new(endpoints, self.recycle))
    }
}
