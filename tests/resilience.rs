use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use meshttp::breaker::BreakerConfig;
use meshttp::endpoint::Endpoint;
use meshttp::error::{BoxError, Error};
use meshttp::transport::{
    AllowingTransport, BaseTransport, RetryConfig, RetryTransport, simple_pool_success,
    simple_response_validator,
};

struct FailingHost {
    failures_before_success: usize,
    calls: AtomicUsize,
}

#[async_trait]
impl BaseTransport for FailingHost {
    async fn round_trip(
        &self,
        _req: http::Request<Bytes>,
    ) -> Result<http::Response<Bytes>, BoxError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures_before_success {
            return Err("connection refused".into());
        }
        Ok(http::Response::builder().status(200).body(Bytes::new()).unwrap())
    }
}

struct AlwaysFails;

#[async_trait]
impl BaseTransport for AlwaysFails {
    async fn round_trip(
        &self,
        _req: http::Request<Bytes>,
    ) -> Result<http::Response<Bytes>, BoxError> {
        Err("connection refused".into())
    }
}

fn request() -> http::Request<Bytes> {
    http::Request::builder()
        .uri("http://svc/")
        .body(Bytes::new())
        .unwrap()
}

fn retry_config(max_attempts: usize) -> RetryConfig {
    RetryConfig {
        max_attempts,
        cutoff: None,
        validator: simple_response_validator(),
    }
}

#[tokio::test]
async fn succeeds_after_failing_over_to_a_healthy_endpoint() {
    let bad = Arc::new(AllowingTransport::new(
        Endpoint::new("bad", 1),
        "http".into(),
        meshttp::breaker::Breaker::new(BreakerConfig::default()),
        Arc::new(AlwaysFails),
        simple_response_validator(),
    ));
    let good = Arc::new(AllowingTransport::new(
        Endpoint::new("good", 2),
        "http".into(),
        meshttp::breaker::Breaker::new(BreakerConfig::default()),
        Arc::new(FailingHost {
            failures_before_success: 0,
            calls: AtomicUsize::new(0),
        }),
        simple_response_validator(),
    ));

    let retry = RetryTransport::new(
        vec![bad, good],
        None,
        simple_pool_success(),
        retry_config(3),
        Arc::new(meshttp::metrics::Metrics::new()),
    );

    let resp = retry.round_trip(&request()).await.unwrap();
    assert_eq!(resp.status(), 200);
}

#[tokio::test]
async fn exhausts_attempts_and_reports_composite_error() {
    let endpoints: Vec<_> = (0..3)
        .map(|i| {
            Arc::new(AllowingTransport::new(
                Endpoint::new(format!("h{i}"), 1),
                "http".into(),
                meshttp::breaker::Breaker::new(BreakerConfig::default()),
                Arc::new(AlwaysFails),
                simple_response_validator(),
            ))
        })
        .collect();

    let retry = RetryTransport::new(
        endpoints,
        None,
        simple_pool_success(),
        retry_config(3),
        Arc::new(meshttp::metrics::Metrics::new()),
    );

    let err = retry.round_trip(&request()).await.unwrap_err();
    match err {
        Error::AttemptsExhausted { attempts, causes } => {
            assert_eq!(attempts, 3);
            assert_eq!(causes.len(), 3);
        }
        other => panic!("expected AttemptsExhausted, got {other:?}"),
    }
}

#[tokio::test]
async fn respects_a_deadline_shorter_than_max_attempts() {
    struct SlowHost;

    #[async_trait]
    impl BaseTransport for SlowHost {
        async fn round_trip(
            &self,
            _req: http::Request<Bytes>,
        ) -> Result<http::Response<Bytes>, BoxError> {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Err("timed out".into())
        }
    }

    let endpoints: Vec<_> = (0..5)
        .map(|i| {
            Arc::new(AllowingTransport::new(
                Endpoint::new(format!("h{i}"), 1),
                "http".into(),
                meshttp::breaker::Breaker::new(BreakerConfig::default()),
                Arc::new(SlowHost),
                simple_response_validator(),
            ))
        })
        .collect();

    let mut config = retry_config(5);
    config.cutoff = Some(Duration::from_millis(60));
    let retry = RetryTransport::new(
        endpoints,
        None,
        simple_pool_success(),
        config,
        Arc::new(meshttp::metrics::Metrics::new()),
    );

    let err = retry.round_trip(&request()).await.unwrap_err();
    assert!(matches!(err, Error::DeadlineExceeded { .. }));
}

#[tokio::test]
async fn breaker_removes_a_consistently_failing_endpoint_from_rotation() {
    let breaker_config = BreakerConfig {
        failure_ratio: 0.5,
        window_size: 10,
        min_samples: 2,
        cooldown: Duration::from_secs(30),
    };

    let bad = Arc::new(AllowingTransport::new(
        Endpoint::new("bad", 1),
        "http".into(),
        meshttp::breaker::Breaker::new(breaker_config),
        Arc::new(AlwaysFails),
        simple_response_validator(),
    ));
    let good = Arc::new(AllowingTransport::new(
        Endpoint::new("good", 2),
        "http".into(),
        meshttp::breaker::Breaker::new(breaker_config),
        Arc::new(FailingHost {
            failures_before_success: 0,
            calls: AtomicUsize::new(0),
        }),
        simple_response_validator(),
    ));

    // Drive enough direct failures to trip `bad`'s breaker deterministically,
    // independent of which endpoint the retry transport's random
    // permutation happens to try first.
    for _ in 0..2 {
        let _ = bad.round_trip(&request()).await;
    }
    assert!(!bad.allow(), "breaker should have tripped open for the failing endpoint");

    let retry = RetryTransport::new(
        vec![bad, good],
        None,
        simple_pool_success(),
        retry_config(2),
        Arc::new(meshttp::metrics::Metrics::new()),
    );

    // With `bad` denied by its breaker, every request should succeed
    // against `good` without the skip counting as an attempt.
    for _ in 0..5 {
        let resp = retry.round_trip(&request()).await.unwrap();
        assert_eq!(resp.status(), 200);
    }
}
