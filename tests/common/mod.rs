//! Mock target server for harness tests

#![allow(dead_code)]

use resilience_tester::probe::{NoPause, Pause};
use resilience_tester::runner::{EventEmitter, Harness};
use resilience_tester::HarnessConfig;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const TEST_ADDRESS: &str = "0x25A40049c13Edf6DcBbcd51Ca0De2C055D3885B5";

pub fn health_body(degraded: &[&str]) -> Value {
    json!({
        "status": "ok",
        "timestamp": "2024-01-01T00:00:00Z",
        "services": {"healthy": ["xmtp", "openai"], "degraded": degraded},
        "features": {},
        "performance": {},
        "network": {"blockchain": {"circuitBreakerOpen": true}}
    })
}

pub fn metrics_body() -> Value {
    json!({
        "timestamp": "2024-01-01T00:00:00Z",
        "system": {},
        "services": {},
        "cache": {"hitRate": 75.5, "totalEntries": 12},
        "network": {},
        "summary": {"requests": 42, "errors": 0}
    })
}

pub fn harness_for(server: &MockServer) -> Harness {
    harness_with_pause(server, Arc::new(NoPause))
}

pub fn harness_with_pause(server: &MockServer, pause: Arc<dyn Pause>) -> Harness {
    Harness::new(
        HarnessConfig::with_base_url(&server.uri()),
        pause,
        EventEmitter::default(),
    )
    .expect("harness")
}

pub async fn mount_get(server: &MockServer, route: &str, status: u16, body: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

pub async fn mount_post(server: &MockServer, route: &str, action: &str, status: u16, body: Value) {
    Mock::given(method("POST"))
        .and(path(route))
        .and(body_partial_json(json!({ "action": action })))
        .respond_with(ResponseTemplate::new(status).set_body_json(body))
        .mount(server)
        .await;
}

/// A server on which every scenario passes
pub async fn healthy_server() -> MockServer {
    let server = MockServer::start().await;

    mount_get(&server, "/api/health", 200, health_body(&["blockchain"])).await;
    mount_get(&server, "/api/metrics", 200, metrics_body()).await;
    mount_get(
        &server,
        "/api/agent",
        200,
        json!({
            "status": "ready",
            "message": "Agent online",
            "services": {},
            "features": {},
            "timestamp": "2024-01-01T00:00:00Z"
        }),
    )
    .await;
    mount_post(
        &server,
        "/api/agent",
        "getBalance",
        200,
        json!({
            "success": true,
            "data": {"address": TEST_ADDRESS, "balance": "1.5", "currency": "ETH"}
        }),
    )
    .await;
    mount_post(
        &server,
        "/api/agent",
        "analyzePerformance",
        200,
        json!({"success": true, "data": "Portfolio up 3%\nGas spend stable"}),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/api/user-groups"))
        .and(query_param("address", TEST_ADDRESS))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .mount(&server)
        .await;

    mount_get(&server, "/api/non-existent-endpoint", 404, json!({"error": "not found"})).await;

    for action in [
        "reset_circuit_breaker",
        "enable_degraded_mode",
        "disable_degraded_mode",
    ] {
        mount_post(&server, "/api/health", action, 200, json!({"success": true})).await;
    }

    server
}

/// Address of a local port nothing listens on
pub fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    drop(listener);
    format!("http://127.0.0.1:{}", port)
}
