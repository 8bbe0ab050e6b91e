use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, trace};

use super::Pool;
use crate::endpoint::Endpoint;
use crate::error::Error;

/// A two-tier pool with time-based recycling: hosts that report a failure
/// drop into a "bad" tier and are served only when the "good" tier is
/// exhausted; after a configurable delay they're promoted back to "good"
/// unless they've failed again in the meantime.
///
/// Implemented as a single actor task that owns all mutable state and
/// communicates only over channels, so per-host recycle timers never race
/// each other or a concurrent `get`/`put`.
pub struct PriorityQueuePool {
    commands: mpsc::UnboundedSender<Command>,
}

enum Command {
    Get(oneshot::Sender<Result<Endpoint, Error>>),
    Put(Endpoint, bool),
    Recycle { key: String, generation: u64 },
    Close(oneshot::Sender<()>),
}

struct BadEntry {
    endpoint: Endpoint,
    generation: u64,
}

struct Actor {
    good: VecDeque<Endpoint>,
    bad: HashMap<String, BadEntry>,
    // Round-robin order over `bad`'s current keys; kept separate from the
    // map so a migration (good<->bad) never reshuffles unrelated hosts.
    bad_order: VecDeque<String>,
    recycle: Duration,
    closed: bool,
    commands: mpsc::UnboundedSender<Command>,
}

impl PriorityQueuePool {
    pub fn new(hosts: Vec<Endpoint>, recycle: Duration) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = Actor {
            good: hosts.into_iter().collect(),
            bad: HashMap::new(),
            bad_order: VecDeque::new(),
            recycle,
            closed: false,
            commands: tx.clone(),
        };
        tokio::spawn(actor.run(rx));
        PriorityQueuePool { commands: tx }
    }
}

impl Actor {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        while let Some(cmd) = rx.recv().await {
            match cmd {
                Command::Get(reply) => {
                    let _ = reply.send(self.get());
                }
                Command::Put(endpoint, success) => self.put(endpoint, success),
                Command::Recycle { key, generation } => self.recycle(&key, generation),
                Command::Close(reply) => {
                    self.closed = true;
                    self.good.clear();
                    self.bad.clear();
                    let _ = reply.send(());
                    return;
                }
            }
        }
    }

    fn get(&mut self) -> Result<Endpoint, Error> {
        if self.closed {
            return Err(Error::PoolClosed);
        }
        if let Some(endpoint) = self.good.pop_front() {
            self.good.push_back(endpoint.clone());
            return Ok(endpoint);
        }
        // Round-robin over the bad tier too, skipping keys that migrated
        // out of `bad` (back to good, or recycled) since they were queued.
        while let Some(key) = self.bad_order.pop_front() {
            let Some(entry) = self.bad.get(&key) else {
                continue;
            };
            let endpoint = entry.endpoint.clone();
            self.bad_order.push_back(key);
            return Ok(endpoint);
        }
        Err(Error::NoHosts)
    }

    fn put(&mut self, endpoint: Endpoint, success: bool) {
        if self.closed {
            return;
        }
        let key = endpoint.authority();
        if success {
            if self.bad.remove(&key).is_some() {
                debug!(host = %key, "host recovered, returning to good rotation");
            }
            if !self.good.iter().any(|e| e.authority() == key) {
                self.good.push_back(endpoint);
            }
            return;
        }

        self.good.retain(|e| e.authority() != key);
        let already_bad = self.bad.contains_key(&key);
        let generation = self
            .bad
            .get(&key)
            .map(|entry| entry.generation + 1)
            .unwrap_or(1);
        debug!(host = %key, generation, "host failed, moving to bad tier");
        self.bad.insert(
            key.clone(),
            BadEntry {
                endpoint,
                generation,
            },
        );
        if !already_bad {
            self.bad_order.push_back(key.clone());
        }

        let commands = self.commands.clone();
        let recycle = self.recycle;
        tokio::spawn(async move {
            tokio::time::sleep(recycle).await;
            let _ = commands.send(Command::Recycle { key, generation });
        });
    }

    fn recycle(&mut self, key: &str, generation: u64) {
        let Some(entry) = self.bad.get(key) else {
            return;
        };
        if entry.generation != generation {
            trace!(host = key, generation, "stale recycle tick, ignoring");
            return;
        }
        let entry = self.bad.remove(key).expect("checked above");
        trace!(host = key, "recycle elapsed, returning to good rotation");
        self.good.push_back(entry.endpoint);
    }
}

#[async_trait]
impl Pool for PriorityQueuePool {
    async fn get(&self) -> Result<Endpoint, Error> {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Get(tx)).is_err() {
            return Err(Error::PoolClosed);
        }
        rx.await.unwrap_or(Err(Error::PoolClosed))
    }

    async fn put(&self, endpoint: &Endpoint, success: bool) -> Result<(), Error> {
        if self
            .commands
            .send(Command::Put(endpoint.clone(), success))
            .is_err()
        {
            return Err(Error::PoolClosed);
        }
        Ok(())
    }

    async fn close(&self) {
        let (tx, rx) = oneshot::channel();
        if self.commands.send(Command::Close(tx)).is_ok() {
            let _ = rx.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoints(n: usize) -> Vec<Endpoint> {
        (0..n).map(|i| Endpoint::new(format!("h{i}"), 80)).collect()
    }

    #[tokio::test]
    async fn all_hosts_start_good_and_rotate_evenly() {
        let hosts = endpoints(4);
        let pool = PriorityQueuePool::new(hosts.clone(), Duration::from_secs(1));
        let mut counts = HashMap::new();
        for _ in 0..hosts.len() * 10 {
            let h = pool.get().await.unwrap();
            *counts.entry(h.host).or_insert(0) += 1;
        }
        for h in &hosts {
            assert_eq!(counts[&h.host], 10);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_host_is_excluded_until_recycled() {
        let hosts = endpoints(3);
        let pool = PriorityQueuePool::new(hosts.clone(), Duration::from_millis(50));

        pool.put(&hosts[0], false).await.unwrap();

        for _ in 0..20 {
            let h = pool.get().await.unwrap();
            assert_ne!(h.host, hosts[0].host);
        }

        tokio::time::advance(Duration::from_millis(60)).await;
        tokio::task::yield_now().await;

        let mut seen_recovered = false;
        for _ in 0..20 {
            let h = pool.get().await.unwrap();
            if h.host == hosts[0].host {
                seen_recovered = true;
            }
        }
        assert!(seen_recovered, "host should return to rotation after recycle delay");
    }

    #[tokio::test]
    async fn success_report_clears_bad_status_immediately() {
        let hosts = endpoints(2);
        let pool = PriorityQueuePool::new(hosts.clone(), Duration::from_secs(30));
        pool.put(&hosts[0], false).await.unwrap();
        pool.put(&hosts[0], true).await.unwrap();

        let mut seen = false;
        for _ in 0..10 {
            if pool.get().await.unwrap().host == hosts[0].host {
                seen = true;
            }
        }
        assert!(seen);
    }

    #[tokio::test]
    async fn closed_pool_rejects_get() {
        let pool = PriorityQueuePool::new(endpoints(2), Duration::from_secs(1));
        pool.close().await;
        assert!(matches!(pool.get().await, Err(Error::PoolClosed)));
    }
}
