//! Tests for error types

use campus_scheduler::core::SchedulerError;

#[test]
fn test_no_credentials_error() {
    let err = SchedulerError::NoCredentials;
    assert_eq!(format!("{}", err), "no usable client credentials configured");
    assert!(err.is_fatal());
}

#[test]
fn test_initialization_failed_error() {
    let err = SchedulerError::InitializationFailed("all 2 token exchanges failed".to_string());
    assert_eq!(
        format!("{}", err),
        "token pool initialization failed: all 2 token exchanges failed"
    );
    assert!(err.is_fatal());
}

#[test]
fn test_token_exchange_error() {
    let err = SchedulerError::TokenExchange {
        index: 2,
        reason: "invalid_client".to_string(),
    };
    assert_eq!(
        format!("{}", err),
        "token exchange failed for credential #2: invalid_client"
    );
    assert!(!err.is_fatal());
}

#[test]
fn test_transport_error() {
    let err = SchedulerError::Transport("connection reset".to_string());
    assert_eq!(format!("{}", err), "transport error: connection reset");
    assert!(!err.is_fatal());
}

#[test]
fn test_upstream_status_error() {
    let err = SchedulerError::UpstreamStatus {
        status: 429,
        path: "/users/me".to_string(),
    };
    assert_eq!(format!("{}", err), "upstream returned status 429 for /users/me");
}

#[test]
fn test_errors_convert_into_anyhow() {
    let err: anyhow::Error = SchedulerError::Abandoned.into();
    assert_eq!(err.to_string(), "request abandoned before completion");
    assert_eq!(
        err.downcast_ref::<SchedulerError>(),
        Some(&SchedulerError::Abandoned)
    );
}
