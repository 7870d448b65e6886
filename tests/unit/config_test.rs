//! Tests for configuration loading and validation

use campus_scheduler::config::{CredentialPair, SchedulerConfig};

fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_from_vars_collects_numbered_pairs() {
    let cfg = SchedulerConfig::from_vars(vars(&[
        ("CLIENT_SECRET2", "s2"),
        ("CLIENT_ID1", "u1"),
        ("CLIENT_ID2", "u2"),
        ("CLIENT_SECRET1", "s1"),
        ("CLIENT_ID3", "u3"),
        ("PATH", "/usr/bin"),
    ]))
    .unwrap();

    let indices: Vec<_> = cfg.credentials.iter().map(|p| p.index).collect();
    assert_eq!(indices, vec![1, 2, 3]);
    assert!(cfg.credentials[0].is_complete());
    assert!(cfg.credentials[1].is_complete());
    assert!(!cfg.credentials[2].is_complete(), "pair 3 has no secret");
}

#[test]
fn test_from_vars_accepts_sparse_indices() {
    let cfg = SchedulerConfig::from_vars(vars(&[
        ("CLIENT_ID7", "u7"),
        ("CLIENT_SECRET7", "s7"),
        ("CLIENT_ID12", "u12"),
        ("CLIENT_SECRET12", "s12"),
    ]))
    .unwrap();

    let indices: Vec<_> = cfg.credentials.iter().map(|p| p.index).collect();
    assert_eq!(indices, vec![7, 12]);
}

#[test]
fn test_from_vars_ignores_malformed_slot_names() {
    let cfg = SchedulerConfig::from_vars(vars(&[
        ("CLIENT_ID", "bare"),
        ("CLIENT_ID0", "zero"),
        ("CLIENT_IDX", "letters"),
    ]))
    .unwrap();
    assert!(cfg.credentials.is_empty());
}

#[test]
fn test_from_vars_overrides() {
    let cfg = SchedulerConfig::from_vars(vars(&[
        ("CAMPUS_API_BASE_URL", "http://localhost:8080"),
        ("CAMPUS_REQUESTS_PER_TOKEN", "4"),
        ("CAMPUS_MAX_RETRIES", "5"),
        ("CAMPUS_RETRY_BASE_MS", "250"),
        ("CAMPUS_REQUEST_TIMEOUT_SECS", "30"),
        ("CAMPUS_REFRESH_EXPIRED_TOKENS", "true"),
    ]))
    .unwrap();

    assert_eq!(cfg.api_root(), "http://localhost:8080/v2");
    assert_eq!(cfg.requests_per_token_per_second, 4);
    assert_eq!(cfg.retry_policy().max_retries, 5);
    assert_eq!(cfg.base_retry_delay_ms, 250);
    assert_eq!(cfg.request_timeout_secs, Some(30));
    assert!(cfg.refresh_expired_tokens);
}

#[test]
fn test_from_vars_rejects_bad_numbers() {
    let err = SchedulerConfig::from_vars(vars(&[("CAMPUS_MAX_RETRIES", "many")])).unwrap_err();
    assert!(err.contains("CAMPUS_MAX_RETRIES"), "{err}");

    let err =
        SchedulerConfig::from_vars(vars(&[("CAMPUS_REQUESTS_PER_TOKEN", "0")])).unwrap_err();
    assert!(err.contains("requests_per_token_per_second"), "{err}");
}

#[test]
fn test_from_json_str_applies_defaults() {
    let cfg = SchedulerConfig::from_json_str(
        r#"{
            "credentials": [
                {"index": 1, "client_id": "u1", "client_secret": "s1"},
                {"index": 2, "client_id": "u2"}
            ]
        }"#,
    )
    .unwrap();

    assert_eq!(cfg.requests_per_token_per_second, 2);
    assert_eq!(cfg.max_retries, 3);
    assert_eq!(cfg.credentials.len(), 2);
    assert!(!cfg.credentials[1].is_complete());
}

#[test]
fn test_from_json_str_rejects_duplicate_indices() {
    let err = SchedulerConfig::from_json_str(
        r#"{"credentials": [
            {"index": 1, "client_id": "a", "client_secret": "b"},
            {"index": 1, "client_id": "c", "client_secret": "d"}
        ]}"#,
    )
    .unwrap_err();
    assert!(err.contains("defined twice"), "{err}");
}

#[test]
fn test_validation_failures() {
    let bad_url = SchedulerConfig {
        api_base_url: "ftp://example.org".into(),
        ..SchedulerConfig::default()
    };
    assert!(bad_url.validate().is_err());

    let zero_delay = SchedulerConfig {
        base_retry_delay_ms: 0,
        ..SchedulerConfig::default()
    };
    assert!(zero_delay.validate().is_err());

    let zero_timeout = SchedulerConfig {
        request_timeout_secs: Some(0),
        ..SchedulerConfig::default()
    };
    assert!(zero_timeout.validate().is_err());
}

#[test]
fn test_blank_halves_count_as_missing() {
    let pair = CredentialPair::new(1, "  ", "secret");
    assert!(!pair.is_complete());
    assert!(pair.to_credential().is_none());
}

#[test]
fn test_credential_debug_redacts_secret() {
    let pair = CredentialPair::new(1, "u1", "hunter2");
    let rendered = format!("{pair:?}");
    assert!(!rendered.contains("hunter2"));
    assert!(rendered.contains("u1"));
}
