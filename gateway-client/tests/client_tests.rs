//! Gateway client tests against a wiremock gateway.

use mcp_gateway_client::{
    CircuitState, ErrorKind, GatewayClient, GatewayConfig, InvocationRequest, InvocationStatus,
};
use serde_json::json;
use std::time::{Duration, Instant};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn fast_config(uri: &str) -> GatewayConfig {
    GatewayConfig::new(uri)
        .with_retry_base_delay(Duration::from_millis(5))
        .with_retry_jitter(0.0)
        .with_timeout(Duration::from_secs(2))
        .with_health_timeout(Duration::from_millis(500))
}

fn client_for(server: &MockServer) -> GatewayClient {
    GatewayClient::new(fast_config(&server.uri())).unwrap()
}

#[tokio::test]
async fn test_health_check_healthy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let health = client.check_health().await;

    assert!(health.healthy);
    assert_eq!(health.gateway_url, server.uri());
    assert!(health.latency_ms.is_some());
    assert_eq!(health.status_code, Some(200));
    assert_eq!(health.circuit_breaker_state, CircuitState::Closed);
    assert!(health.error.is_none());

    let metrics = client.get_metrics();
    assert_eq!(metrics.health_checks_total, 1);
    assert_eq!(metrics.health_checks_success, 1);
}

#[tokio::test]
async fn test_health_check_is_single_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let health = client.check_health().await;

    assert!(!health.healthy);
    assert_eq!(health.status_code, Some(503));
    assert!(health.error.unwrap().contains("503"));
    assert_eq!(client.get_metrics().health_checks_success, 0);
    assert_eq!(client.circuit_state().await, CircuitState::Closed);
}

#[tokio::test]
async fn test_health_check_uses_health_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let started = Instant::now();
    let health = client.check_health().await;

    assert!(!health.healthy);
    assert!(health.error.unwrap().contains("timed out"));
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_list_capabilities_parses_tools() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tools"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tools": [
                {"name": "echo", "description": "Echo input", "parameters": [
                    {"name": "message", "type": "string", "required": true}
                ]},
                {"name": "weather", "category": "data", "version": "2.0.0", "enabled": false}
            ]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let tools = client.list_capabilities(None).await.unwrap();

    assert_eq!(tools.len(), 2);
    assert_eq!(tools[0].name, "echo");
    assert_eq!(tools[0].parameters[0].name, "message");
    assert_eq!(tools[1].category.as_deref(), Some("data"));
    assert!(!tools[1].enabled);

    let found = client.find_capability("weather", None).await.unwrap();
    assert_eq!(found.map(|c| c.version), Some("2.0.0".to_string()));
    assert!(client.find_capability("missing", None).await.unwrap().is_none());

    let metrics = client.get_metrics();
    assert_eq!(metrics.requests_total, 3);
    assert_eq!(metrics.requests_success, 3);
}

#[tokio::test]
async fn test_list_capabilities_propagates_identity() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tools"))
        .and(header("X-Authenticated-User", "alice@example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tools": []})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let tools = client.list_capabilities(Some("alice@example.com")).await.unwrap();
    assert!(tools.is_empty());
}

#[tokio::test]
async fn test_list_capabilities_omits_identity_when_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tools"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tools": []})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.list_capabilities(None).await.unwrap();

    let requests: Vec<Request> = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(!requests[0].headers.contains_key("x-authenticated-user"));
    assert_eq!(requests[0].headers["accept"], "application/json");
}

#[tokio::test]
async fn test_list_capabilities_malformed_body_is_protocol_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tools"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.list_capabilities(None).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert_eq!(client.get_metrics().requests_failed, 1);
    assert_eq!(client.get_metrics().circuit_breaker_failure_count, 0);
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tools"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.list_capabilities(None).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Http);
    // Three attempts count as one breaker failure
    assert_eq!(client.get_metrics().circuit_breaker_failure_count, 1);
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(422).set_body_string("bad arguments"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client.invoke_capability(InvocationRequest::new("echo")).await;

    assert_eq!(result.status, InvocationStatus::Failure);
    assert_eq!(result.error_kind, Some(ErrorKind::Http));
    assert!(result.error.unwrap().contains("bad arguments"));
    assert_eq!(client.get_metrics().circuit_breaker_failure_count, 0);
}

#[tokio::test]
async fn test_invoke_sends_json_rpc_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .and(header("content-type", "application/json"))
        .and(header("X-Authenticated-User", "bob"))
        .and(body_partial_json(json!({
            "jsonrpc": "2.0",
            "method": "tools/call",
            "params": {"name": "search", "arguments": {"query": "rust"}}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "result": {"hits": 3}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client
        .invoke_capability(
            InvocationRequest::new("search")
                .with_argument("query", "rust")
                .with_identity("bob"),
        )
        .await;

    assert_eq!(result.status, InvocationStatus::Success);
    assert_eq!(result.result, Some(json!({"hits": 3})));
    assert!(result.error.is_none());
}

#[tokio::test]
async fn test_invoke_json_rpc_error_is_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "error": {"code": -32602, "message": "Unknown tool: nope"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client.invoke_capability(InvocationRequest::new("nope")).await;

    assert_eq!(result.status, InvocationStatus::Failure);
    assert_eq!(result.error_kind, Some(ErrorKind::Rpc));
    assert!(result.result.is_none());
    assert!(result.error.unwrap().contains("Unknown tool: nope"));

    let metrics = client.get_metrics();
    assert_eq!(metrics.requests_failed, 1);
    assert_eq!(metrics.circuit_breaker_failure_count, 0);
}

#[tokio::test]
async fn test_invoke_timeout_is_distinct_from_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"result": {}}))
                .set_delay(Duration::from_secs(3)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = client
        .invoke_capability(InvocationRequest::new("slow").with_timeout(Duration::from_millis(100)))
        .await;

    assert_eq!(result.status, InvocationStatus::Timeout);
    assert_eq!(result.error_kind, Some(ErrorKind::Timeout));
    assert!(result.execution_time_ms < 2000);

    let metrics = client.get_metrics();
    assert_eq!(metrics.requests_failed, 1);
    assert_eq!(metrics.circuit_breaker_failure_count, 1);
}

#[tokio::test]
async fn test_invoke_honors_caller_deadline() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mcp"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let started = Instant::now();
    let result = client
        .invoke_capability(
            InvocationRequest::new("slow").with_deadline(Instant::now() + Duration::from_millis(150)),
        )
        .await;

    assert_eq!(result.status, InvocationStatus::Timeout);
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_list_with_expired_deadline_makes_no_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/tools"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"tools": []})))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let deadline = Instant::now();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let err = client
        .list_capabilities_with_deadline(None, Some(deadline))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_eq!(client.get_metrics().requests_failed, 1);
}

#[tokio::test]
async fn test_invalid_identity_rejected_before_network() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let err = client.list_capabilities(Some("eve\nX-Admin: 1")).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    assert_eq!(client.get_metrics().circuit_breaker_failure_count, 0);
}

#[tokio::test]
async fn test_reset_circuit() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = GatewayClient::new(
        fast_config(&server.uri())
            .with_max_retries(1)
            .with_circuit_failure_threshold(1),
    )
    .unwrap();

    client.list_capabilities(None).await.unwrap_err();
    assert_eq!(client.circuit_state().await, CircuitState::Open);
    assert_eq!(client.get_metrics().circuit_breaker_state, CircuitState::Open);

    client.reset_circuit().await;
    assert_eq!(client.circuit_state().await, CircuitState::Closed);
    assert_eq!(client.get_metrics().circuit_breaker_state, CircuitState::Closed);
    assert_eq!(client.get_metrics().circuit_breaker_failure_count, 0);
}

#[tokio::test]
async fn test_metrics_text_exposition() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.check_health().await;

    let text = client.metrics_text();
    assert!(text.contains("mcp_gateway_health_checks_total 1"));
    assert!(text.contains("mcp_gateway_health_checks_success_total 1"));
}
