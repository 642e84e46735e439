//! Failure injection tests for base-URL failover.

use std::sync::Arc;

use airwatch_provisioning::client::{
    ClientError, ErrorCategory, RequestExecutor, RequestSpec, ServiceClientRegistry,
};

mod common;

fn executor(config: airwatch_provisioning::AdapterConfig) -> RequestExecutor {
    RequestExecutor::new(Arc::new(ServiceClientRegistry::new(config)))
}

#[tokio::test]
async fn test_failover_to_secondary_persists() {
    let refused = common::refused_addr().await;
    let backend = common::start_fixed_backend(200, r#"{"ok": true}"#).await;

    let exec = executor(common::tenant_config(
        "main",
        vec![format!("http://{}", refused), backend.url()],
    ));

    let first = exec.execute("main", RequestSpec::get("/system/info")).await.unwrap();
    assert_eq!(first.status, 200);
    assert_eq!(backend.hits(), 1);
    assert_eq!(exec.registry().failover_index("main"), Some(1));

    // The next call starts at the secondary, no further failover.
    let second = exec.execute("main", RequestSpec::get("/system/info")).await.unwrap();
    assert_eq!(second.status, 200);
    assert_eq!(backend.hits(), 2);
    assert_eq!(exec.registry().failover_index("main"), Some(1));
}

#[tokio::test]
async fn test_exhaustion_reports_unable_to_connect_service() {
    let a = common::refused_addr().await;
    let b = common::refused_addr().await;

    let exec = executor(common::tenant_config(
        "main",
        vec![format!("http://{}", a), format!("http://{}", b)],
    ));

    let err = exec.execute("main", RequestSpec::get("/system/info")).await.unwrap_err();
    assert!(
        matches!(err, ClientError::UnableToConnectService { attempts: 2, .. }),
        "unexpected error: {err:?}"
    );
    assert_eq!(err.category(), ErrorCategory::Transport);
    let message = err.to_string();
    assert!(message.starts_with("UnableToConnectService"));
    assert!(message.contains("[tenant=main]"));
    assert!(!message.contains("ECONNREFUSED"));

    // Exhaustion drops the cached descriptor; the next call starts at the primary.
    assert!(!exec.registry().is_cached("main"));
}

#[tokio::test]
async fn test_three_base_urls_exhaust_after_three_attempts() {
    let a = common::refused_addr().await;
    let b = common::refused_addr().await;
    let c = common::refused_addr().await;

    let exec = executor(common::tenant_config(
        "main",
        vec![format!("http://{}", a), format!("http://{}", b), format!("http://{}", c)],
    ));

    let err = exec.execute("main", RequestSpec::get("/x")).await.unwrap_err();
    assert!(
        matches!(err, ClientError::UnableToConnectService { attempts: 3, .. }),
        "unexpected error: {err:?}"
    );
    assert!(!exec.registry().is_cached("main"));

    // A fresh call gets a fresh budget starting at the primary.
    let err = exec.execute("main", RequestSpec::get("/x")).await.unwrap_err();
    assert!(matches!(err, ClientError::UnableToConnectService { attempts: 3, .. }));
    assert!(!exec.registry().is_cached("main"));
}

#[tokio::test]
async fn test_single_base_url_gets_one_attempt() {
    let refused = common::refused_addr().await;
    let exec = executor(common::tenant_config("main", vec![format!("http://{}", refused)]));

    let err = exec.execute("main", RequestSpec::get("/x")).await.unwrap_err();
    assert!(matches!(err, ClientError::UnableToConnectService { attempts: 1, .. }));
}

#[tokio::test]
async fn test_host_not_found_fails_over() {
    let backend = common::start_fixed_backend(200, "{}").await;
    let exec = executor(common::tenant_config(
        "main",
        vec!["http://airwatch-primary.invalid".to_string(), backend.url()],
    ));

    let response = exec.execute("main", RequestSpec::get("/x")).await.unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(exec.registry().failover_index("main"), Some(1));
}

#[tokio::test]
async fn test_unresolvable_hosts_report_unable_to_connect_host() {
    let exec = executor(common::tenant_config(
        "main",
        vec!["http://airwatch-only.invalid".to_string()],
    ));

    let err = exec.execute("main", RequestSpec::get("/x")).await.unwrap_err();
    assert!(matches!(err, ClientError::UnableToConnectHost { attempts: 1, .. }), "unexpected error: {err:?}");
    assert!(!err.to_string().contains("ENOTFOUND"));
}

#[tokio::test]
async fn test_absolute_path_never_fails_over() {
    let refused = common::refused_addr().await;
    let backend = common::start_fixed_backend(200, "{}").await;
    let exec = executor(common::tenant_config(
        "main",
        vec![format!("http://{}", refused), backend.url()],
    ));

    let absolute = format!("http://{}/system/info", refused);
    let err = exec.execute("main", RequestSpec::get(absolute)).await.unwrap_err();
    assert!(matches!(err, ClientError::UnableToConnectService { attempts: 1, .. }));
    assert_eq!(backend.hits(), 0);
    assert!(!exec.registry().is_cached("main"));
}

#[tokio::test]
async fn test_non_2xx_is_not_retried() {
    let failing = common::start_fixed_backend(500, r#"{"message": "boom"}"#).await;
    let healthy = common::start_fixed_backend(200, "{}").await;
    let exec = executor(common::tenant_config("main", vec![failing.url(), healthy.url()]));

    let err = exec.execute("main", RequestSpec::get("/x")).await.unwrap_err();
    match &err {
        ClientError::Application { status, message, body, .. } => {
            assert_eq!(*status, 500);
            assert_eq!(message, "Internal Server Error");
            assert_eq!(body.json(), Some(&serde_json::json!({"message": "boom"})));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.category(), ErrorCategory::Application);
    assert_eq!(healthy.hits(), 0);
    assert_eq!(exec.registry().failover_index("main"), Some(0));
}

#[tokio::test]
async fn test_timeout_is_not_retried() {
    let stalled = common::start_stalled_backend().await;
    let healthy = common::start_fixed_backend(200, "{}").await;

    let mut config = common::tenant_config("main", vec![format!("http://{}", stalled), healthy.url()]);
    config.http.idle_timeout_secs = 1;
    let exec = executor(config);

    let err = exec.execute("main", RequestSpec::get("/x")).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::Timeout, "unexpected error: {err:?}");
    assert_eq!(healthy.hits(), 0);
}

#[tokio::test]
async fn test_unknown_tenant_is_configuration_error() {
    let exec = executor(common::tenant_config("main", vec!["http://127.0.0.1:1".into()]));

    let err = exec.execute("other", RequestSpec::get("/x")).await.unwrap_err();
    assert!(matches!(err, ClientError::UnknownTenant { .. }));
    assert_eq!(err.category(), ErrorCategory::Configuration);
}
