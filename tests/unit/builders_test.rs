//! Tests for builder modules

use campus_scheduler::builders::{build_http_scheduler, build_scheduler};
use campus_scheduler::config::{CredentialPair, SchedulerConfig};
use campus_scheduler::core::SchedulerError;
use campus_scheduler::infra::HttpUpstream;
use campus_scheduler::runtime::TokioSpawner;

fn config() -> SchedulerConfig {
    SchedulerConfig {
        credentials: vec![CredentialPair::new(1, "u1", "s1")],
        ..SchedulerConfig::default()
    }
}

#[tokio::test]
async fn test_build_http_scheduler_is_lazy() {
    let scheduler = build_http_scheduler(&config(), TokioSpawner::current()).unwrap();
    assert_eq!(scheduler.pool_size(), None, "no token exchange before first use");
    assert_eq!(scheduler.queue_len(), 0);
}

#[tokio::test]
async fn test_build_scheduler_rejects_invalid_config() {
    let mut cfg = config();
    cfg.requests_per_token_per_second = 0;
    let upstream = HttpUpstream::new(&config()).unwrap();

    let err = build_scheduler(&cfg, upstream, TokioSpawner::current()).err();
    assert!(matches!(err, Some(SchedulerError::Config(_))));
}
