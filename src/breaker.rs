use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

/// Tuning knobs for a single [`Breaker`].
#[derive(Debug, Clone, Copy)]
pub struct BreakerConfig {
    /// Fraction of recent outcomes that must be failures to trip the
    /// breaker, once `min_samples` have been recorded.
    pub failure_ratio: f64,
    /// Outcomes tracked in the rolling window.
    pub window_size: usize,
    /// Minimum recorded outcomes before the failure ratio is evaluated.
    pub min_samples: usize,
    /// How long the breaker stays `Open` before allowing a single probe.
    pub cooldown: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        BreakerConfig {
            failure_ratio: 0.05,
            window_size: 20,
            min_samples: 10,
            cooldown: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: State,
    outcomes: VecDeque<bool>,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

/// A per-endpoint circuit breaker over a sliding failure-ratio window.
///
/// `allow` is cheap and non-blocking (a single mutex, never held across an
/// await) so it can be called on every dispatch attempt without I/O.
pub struct Breaker {
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

impl Breaker {
    pub fn new(config: BreakerConfig) -> Self {
        Breaker {
            config,
            inner: Mutex::new(Inner {
                state: State::Closed,
                outcomes: VecDeque::with_capacity(config.window_size),
                opened_at: None,
                probe_in_flight: false,
            }),
        }
    }

    /// Whether a request should be dispatched to this endpoint right now.
    pub fn allow(&self) -> bool {
        let mut inner = self.inner.lock().expect("breaker poisoned");
        match inner.state {
            State::Closed => true,
            State::Open => {
                let elapsed = inner.opened_at.map(|at| at.elapsed()).unwrap_or_default();
                if elapsed >= self.config.cooldown && !inner.probe_in_flight {
                    inner.state = State::HalfOpen;
                    inner.probe_in_flight = true;
                    trace!("breaker half-open, admitting a single probe");
                    true
                } else {
                    false
                }
            }
            State::HalfOpen => false,
        }
    }

    pub fn success(&self) {
        let mut inner = self.inner.lock().expect("breaker poisoned");
        match inner.state {
            State::HalfOpen => {
                debug!("probe succeeded, breaker closing");
                inner.state = State::Closed;
                inner.probe_in_flight = false;
                inner.outcomes.clear();
                inner.opened_at = None;
            }
            State::Closed => record(&mut inner, self.config, true),
            State::Open => {}
        }
    }

    pub fn failure(&self) {
        let mut inner = self.inner.lock().expect("breaker poisoned");
        match inner.state {
            State::HalfOpen => {
                debug!("probe failed, breaker reopening");
                inner.state = State::Open;
                inner.probe_in_flight = false;
                inner.opened_at = Some(Instant::now());
            }
            State::Closed => record(&mut inner, self.config, false),
            State::Open => {}
        }
    }

    #[cfg(test)]
    fn is_open(&self) -> bool {
        matches!(self.inner.lock().unwrap().state, State::Open)
    }
}

fn record(inner: &mut Inner, config: BreakerConfig, success: bool) {
    if inner.outcomes.len() == config.window_size {
        inner.outcomes.pop_front();
    }
    inner.outcomes.push_back(success);

    if inner.outcomes.len() < config.min_samples {
        return;
    }
    let failures = inner.outcomes.iter().filter(|ok| !**ok).count();
    let ratio = failures as f64 / inner.outcomes.len() as f64;
    if ratio > config.failure_ratio {
        debug!(ratio, threshold = config.failure_ratio, "breaker tripping open");
        inner.state = State::Open;
        inner.opened_at = Some(Instant::now());
        inner.outcomes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BreakerConfig {
        BreakerConfig {
            failure_ratio: 0.5,
            window_size: 10,
            min_samples: 4,
            cooldown: Duration::from_millis(50),
        }
    }

    #[test]
    fn closed_allows_until_min_samples_reached() {
        let breaker = Breaker::new(config());
        assert!(breaker.allow());
        breaker.failure();
        breaker.failure();
        breaker.failure();
        assert!(breaker.allow(), "below min_samples, still closed");
        assert!(!breaker.is_open());
    }

    #[test]
    fn trips_open_when_failure_ratio_exceeds_threshold() {
        let breaker = Breaker::new(config());
        for _ in 0..6 {
            breaker.failure();
        }
        assert!(breaker.is_open());
        assert!(!breaker.allow());
    }

    #[tokio::test(start_paused = true)]
    async fn half_open_admits_single_probe_after_cooldown() {
        let breaker = Breaker::new(config());
        for _ in 0..6 {
            breaker.failure();
        }
        assert!(breaker.is_open());

        tokio::time::advance(Duration::from_millis(60)).await;

        assert!(breaker.allow(), "first call after cooldown gets the probe");
        assert!(!breaker.allow(), "second concurrent call is denied");

        breaker.success();
        assert!(breaker.allow(), "breaker closed after successful probe");
    }

    #[tokio::test(start_paused = true)]
    async fn failed_probe_reopens_breaker() {
        let breaker = Breaker::new(config());
        for _ in 0..6 {
            breaker.failure();
        }
        tokio::time::advance(Duration::from_millis(60)).await;
        assert!(breaker.allow());
        breaker.failure();
        assert!(breaker.is_open());
    }
}
