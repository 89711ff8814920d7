mod common;

use common::*;
use resilience_tester::probe::RecordingPause;
use resilience_tester::runner::Scenario;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_health_check_with_all_fields_passes() {
    let server = MockServer::start().await;
    mount_get(
        &server,
        "/api/health",
        200,
        json!({"status": "ok", "timestamp": "t", "services": {}, "features": {}, "performance": {}}),
    )
    .await;

    let mut harness = harness_for(&server);
    assert!(Scenario::HealthCheck.run(&mut harness).await.unwrap());

    let outcome = harness.log().last().unwrap();
    assert_eq!(outcome.name, "Health Check Endpoint");
    assert!(outcome.success);
    assert_eq!(outcome.status_code, Some(200));
}

#[tokio::test]
async fn test_health_check_missing_field_fails() {
    for missing in ["status", "timestamp", "services", "features", "performance"] {
        let server = MockServer::start().await;
        let mut body = json!({"status": "ok", "timestamp": "t", "services": {}, "features": {}, "performance": {}});
        body.as_object_mut().unwrap().remove(missing);
        mount_get(&server, "/api/health", 200, body).await;

        let mut harness = harness_for(&server);
        assert!(!Scenario::HealthCheck.run(&mut harness).await.unwrap());

        let outcome = harness.log().last().unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.status_code, Some(200));
        assert!(outcome.error.as_deref().unwrap().contains(missing));
        assert_eq!(harness.log().passed(), 0);
    }
}

#[tokio::test]
async fn test_health_check_raw_text_fails_field_check() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("status timestamp services features performance"),
        )
        .mount(&server)
        .await;

    let mut harness = harness_for(&server);
    assert!(!Scenario::HealthCheck.run(&mut harness).await.unwrap());
    assert_eq!(harness.log().attempted(), 1);
}

#[tokio::test]
async fn test_agent_health_missing_field_fails() {
    let full = json!({
        "status": "ready",
        "message": "Agent online",
        "services": {},
        "features": {},
        "timestamp": "2024-01-01T00:00:00Z"
    });
    for missing in ["status", "message", "services", "features", "timestamp"] {
        let server = MockServer::start().await;
        let mut body = full.clone();
        body.as_object_mut().unwrap().remove(missing);
        mount_get(&server, "/api/agent", 200, body).await;

        let mut harness = harness_for(&server);
        assert!(!Scenario::AgentHealth.run(&mut harness).await.unwrap());

        let outcome = harness.log().last().unwrap();
        assert!(!outcome.success);
        assert_eq!(outcome.status_code, Some(200));
        assert!(outcome.error.as_deref().unwrap().contains(missing));
    }
}

#[tokio::test]
async fn test_metrics_requires_cache_section() {
    let server = MockServer::start().await;
    let mut body = metrics_body();
    body.as_object_mut().unwrap().remove("cache");
    mount_get(&server, "/api/metrics", 200, body).await;

    let mut harness = harness_for(&server);
    assert!(!Scenario::Metrics.run(&mut harness).await.unwrap());
}

#[tokio::test]
async fn test_get_balance_success_false_fails_despite_200() {
    let server = MockServer::start().await;
    mount_post(
        &server,
        "/api/agent",
        "getBalance",
        200,
        json!({"success": false, "error": "wallet not configured"}),
    )
    .await;

    let mut harness = harness_for(&server);
    assert!(!Scenario::AgentGetBalance.run(&mut harness).await.unwrap());

    let outcome = harness.log().last().unwrap();
    assert_eq!(outcome.name, "Agent getBalance Action");
    assert!(!outcome.success);
    assert_eq!(outcome.status_code, Some(200));
    assert!(outcome
        .error
        .as_deref()
        .unwrap()
        .contains("wallet not configured"));
}

#[tokio::test]
async fn test_get_balance_503_is_recorded_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/agent"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let mut harness = harness_for(&server);
    assert!(!Scenario::AgentGetBalance.run(&mut harness).await.unwrap());

    let outcome = harness.log().last().unwrap();
    assert_eq!(outcome.name, "Agent getBalance Action");
    assert!(!outcome.success);
    assert_eq!(outcome.status_code, Some(503));
}

#[tokio::test]
async fn test_analyze_performance_sends_timeframe() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/agent"))
        .and(body_partial_json(
            json!({"action": "analyzePerformance", "params": {"timeframe": "7d"}}),
        ))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": "a\nb"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut harness = harness_for(&server);
    assert!(Scenario::AgentAnalyzePerformance.run(&mut harness).await.unwrap());
}

#[tokio::test]
async fn test_analyze_performance_success_false_fails_despite_200() {
    let server = MockServer::start().await;
    mount_post(
        &server,
        "/api/agent",
        "analyzePerformance",
        200,
        json!({"success": false}),
    )
    .await;

    let mut harness = harness_for(&server);
    assert!(!Scenario::AgentAnalyzePerformance.run(&mut harness).await.unwrap());

    let outcome = harness.log().last().unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.status_code, Some(200));
    assert!(outcome.error.is_some());
}

#[tokio::test]
async fn test_user_groups_accepts_lists_and_rejects_error_objects() {
    let server = MockServer::start().await;
    mount_get(&server, "/api/user-groups", 200, json!([])).await;
    let mut harness = harness_for(&server);
    assert!(Scenario::UserGroups.run(&mut harness).await.unwrap());

    let server = MockServer::start().await;
    mount_get(&server, "/api/user-groups", 200, json!({"error": "unknown address"})).await;
    let mut harness = harness_for(&server);
    assert!(!Scenario::UserGroups.run(&mut harness).await.unwrap());
    assert!(harness
        .log()
        .last()
        .unwrap()
        .error
        .as_deref()
        .unwrap()
        .contains("unknown address"));
}

#[tokio::test]
async fn test_circuit_breaker_is_observational() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/non-existent-endpoint"))
        .respond_with(ResponseTemplate::new(404))
        .expect(6)
        .mount(&server)
        .await;
    mount_get(&server, "/api/health", 200, health_body(&[])).await;
    mount_post(&server, "/api/health", "reset_circuit_breaker", 200, json!({})).await;

    let mut harness = harness_for(&server);
    assert!(Scenario::CircuitBreaker.run(&mut harness).await.unwrap());

    let names: Vec<&str> = harness
        .log()
        .outcomes()
        .iter()
        .map(|o| o.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "Health Check After Circuit Breaker Test",
            "Reset Circuit Breaker",
            "Circuit Breaker Test"
        ]
    );

    let summary = harness.log().last().unwrap();
    assert!(summary.success);
    let notes = summary.notes.as_deref().unwrap();
    assert!(notes.contains("could not be definitively verified"));
    assert!(notes.contains("blockchain"));
}

#[tokio::test]
async fn test_circuit_breaker_spaces_requests_one_second_apart() {
    let server = MockServer::start().await;
    mount_get(&server, "/api/non-existent-endpoint", 404, json!({})).await;
    mount_get(&server, "/api/health", 200, health_body(&[])).await;
    mount_post(&server, "/api/health", "reset_circuit_breaker", 200, json!({})).await;

    let pause = Arc::new(RecordingPause::new());
    let mut harness = harness_with_pause(&server, pause.clone());
    assert!(Scenario::CircuitBreaker.run(&mut harness).await.unwrap());

    assert_eq!(pause.requested(), vec![Duration::from_secs(1); 6]);
}

#[tokio::test]
async fn test_circuit_breaker_fails_when_health_down() {
    let server = MockServer::start().await;
    mount_get(&server, "/api/health", 503, json!({})).await;

    let mut harness = harness_for(&server);
    assert!(!Scenario::CircuitBreaker.run(&mut harness).await.unwrap());

    let summary = harness.log().last().unwrap();
    assert_eq!(summary.name, "Circuit Breaker Test");
    assert!(!summary.success);
    assert!(summary.notes.is_some());
}

#[tokio::test]
async fn test_degraded_mode_verified_and_disabled() {
    let server = healthy_server().await;

    let mut harness = harness_for(&server);
    assert!(Scenario::GracefulDegradation.run(&mut harness).await.unwrap());

    let names: Vec<&str> = harness
        .log()
        .outcomes()
        .iter()
        .map(|o| o.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "Enable Degraded Mode",
            "Get Balance in Degraded Mode",
            "Health Check in Degraded Mode",
            "Disable Degraded Mode",
            "Graceful Degradation Test"
        ]
    );
    assert_eq!(harness.log().passed(), harness.log().attempted());
}

#[tokio::test]
async fn test_degraded_mode_disabled_even_when_not_listed() {
    let server = MockServer::start().await;
    mount_post(&server, "/api/health", "enable_degraded_mode", 200, json!({})).await;
    mount_post(&server, "/api/agent", "getBalance", 200, json!({"success": true})).await;
    mount_get(&server, "/api/health", 200, health_body(&[])).await;
    Mock::given(method("POST"))
        .and(path("/api/health"))
        .and(body_partial_json(
            json!({"action": "disable_degraded_mode", "service": "blockchain"}),
        ))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let mut harness = harness_for(&server);
    assert!(!Scenario::GracefulDegradation.run(&mut harness).await.unwrap());

    let summary = harness.log().last().unwrap();
    assert_eq!(summary.name, "Graceful Degradation Test");
    assert!(!summary.success);
    let notes = summary.notes.as_deref().unwrap();
    assert!(notes.contains("not listed"));
    assert!(notes.contains("could not be disabled"));
}

#[tokio::test]
async fn test_degraded_mode_disabled_when_enable_fails() {
    let server = MockServer::start().await;
    mount_post(&server, "/api/health", "enable_degraded_mode", 500, json!({})).await;
    Mock::given(method("POST"))
        .and(path("/api/health"))
        .and(body_partial_json(
            json!({"action": "disable_degraded_mode", "service": "blockchain"}),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let mut harness = harness_for(&server);
    assert!(!Scenario::GracefulDegradation.run(&mut harness).await.unwrap());

    let names: Vec<&str> = harness
        .log()
        .outcomes()
        .iter()
        .map(|o| o.name.as_str())
        .collect();
    assert_eq!(
        names,
        vec![
            "Enable Degraded Mode",
            "Disable Degraded Mode",
            "Graceful Degradation Test"
        ]
    );
    let summary = harness.log().last().unwrap();
    assert!(!summary.success);
    assert!(summary
        .notes
        .as_deref()
        .unwrap()
        .contains("could not be enabled"));
}

#[tokio::test]
async fn test_degraded_mode_cleanup_failure_keeps_verdict() {
    let server = MockServer::start().await;
    mount_post(&server, "/api/health", "enable_degraded_mode", 200, json!({})).await;
    mount_post(&server, "/api/agent", "getBalance", 200, json!({"success": true})).await;
    mount_get(&server, "/api/health", 200, health_body(&["blockchain"])).await;
    mount_post(&server, "/api/health", "disable_degraded_mode", 500, json!({})).await;

    let mut harness = harness_for(&server);
    assert!(Scenario::GracefulDegradation.run(&mut harness).await.unwrap());

    let summary = harness.log().last().unwrap();
    assert!(summary.success);
    assert!(summary.notes.as_deref().unwrap().contains("could not be disabled"));
}

#[tokio::test]
async fn test_caching_reads_cache_statistics() {
    let server = MockServer::start().await;
    mount_get(&server, "/api/health", 200, health_body(&[])).await;
    mount_get(&server, "/api/metrics", 200, metrics_body()).await;

    let mut harness = harness_for(&server);
    assert!(Scenario::Caching.run(&mut harness).await.unwrap());

    assert_eq!(harness.log().attempted(), 4);
    let summary = harness.log().last().unwrap();
    assert_eq!(summary.name, "Caching Test");
    assert_eq!(
        summary.notes.as_deref(),
        Some("Cache hit rate: 75.5%, Entries: 12")
    );
}

#[tokio::test]
async fn test_caching_pauses_once_between_requests() {
    let server = MockServer::start().await;
    mount_get(&server, "/api/health", 200, health_body(&[])).await;
    mount_get(&server, "/api/metrics", 200, metrics_body()).await;

    let pause = Arc::new(RecordingPause::new());
    let mut harness = harness_with_pause(&server, pause.clone());
    assert!(Scenario::Caching.run(&mut harness).await.unwrap());

    assert_eq!(pause.requested(), vec![Duration::from_secs(1)]);
}

#[tokio::test]
async fn test_caching_without_cache_object_fails() {
    let server = MockServer::start().await;
    mount_get(&server, "/api/health", 200, health_body(&[])).await;
    mount_get(&server, "/api/metrics", 200, json!({"summary": {}})).await;

    let mut harness = harness_for(&server);
    assert!(!Scenario::Caching.run(&mut harness).await.unwrap());
    assert!(!harness.log().last().unwrap().success);
}
