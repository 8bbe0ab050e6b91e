use std::sync::Mutex;

use async_trait::async_trait;

use super::Pool;
use crate::endpoint::Endpoint;
use crate::error::Error;

/// The default pool: cycles through hosts in a fixed order. `put` is a
/// no-op, since round-robin has no notion of feedback.
pub struct RoundRobinPool {
    inner: Mutex<Inner>,
}

struct Inner {
    hosts: Vec<Endpoint>,
    cursor: usize,
    closed: bool,
}

impl RoundRobinPool {
    pub fn new(hosts: Vec<Endpoint>) -> Self {
        RoundRobinPool {
            inner: Mutex::new(Inner {
                hosts,
                cursor: 0,
                closed: false,
            }),
        }
    }
}

#[async_trait]
impl Pool for RoundRobinPool {
    async fn get(&self) -> Result<Endpoint, Error> {
        let mut inner = self.inner.lock().expect("round robin pool poisoned");
        if inner.closed {
            return Err(Error::PoolClosed);
        }
        if inner.hosts.is_empty() {
            return Err(Error::NoHosts);
        }
        let host = inner.hosts[inner.cursor].clone();
        inner.cursor = (inner.cursor + 1) % inner.hosts.len();
        Ok(host)
    }

    async fn put(&self, _endpoint: &Endpoint, _success: bool) -> Result<(), Error> {
        let inner = self.inner.lock().expect("round robin pool poisoned");
        if inner.closed {
            return Err(Error::PoolClosed);
        }
        Ok(())
    }

    async fn close(&self) {
        self.inner.lock().expect("round robin pool poisoned").closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cycles_through_hosts_evenly() {
        let hosts = vec![Endpoint::new("a", 1), Endpoint::new("b", 2), Endpoint::new("c", 3)];
        let pool = RoundRobinPool::new(hosts.clone());

        let mut counts = std::collections::HashMap::new();
        for _ in 0..hosts.len() * 4 {
            let host = pool.get().await.unwrap();
            *counts.entry(host.host).or_insert(0) += 1;
        }
        for host in &hosts {
            assert_eq!(counts[&host.host], 4);
        }
    }

    #[tokio::test]
    async fn empty_pool_yields_no_hosts_error() {
        let pool = RoundRobinPool::new(Vec::new());
        assert!(matches!(pool.get().await, Err(Error::NoHosts)));
    }

    #[tokio::test]
    async fn closed_pool_rejects_further_calls() {
        let pool = RoundRobinPool::new(vec![Endpoint::new("a", 1)]);
        pool.close().await;
        assert!(matches!(pool.get().await, Err(Error::PoolClosed)));
        assert!(matches!(
            pool.put(&Endpoint::new("a", 1), true).await,
            Err(Error::PoolClosed)
        ));
    }
}
