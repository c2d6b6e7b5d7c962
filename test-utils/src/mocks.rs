//! Mock gateway for testing.
//!
//! Wraps a [`wiremock::MockServer`] with mount helpers for the three gateway
//! endpoints the client talks to.

use mcp_gateway_client::GatewayConfig;
use mcp_gateway_client::client::{HEALTH_PATH, INVOKE_PATH, TOOLS_PATH};
use serde_json::{Value, json};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Address nothing listens on. Connections are refused immediately.
pub const UNREACHABLE_GATEWAY: &str = "http://127.0.0.1:1";

/// In-process gateway backed by wiremock.
#[derive(Debug)]
pub struct MockGateway {
    server: MockServer,
}

impl MockGateway {
    /// Start a gateway on a random local port.
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL of the gateway.
    #[must_use]
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Underlying wiremock server, for custom mocks.
    #[must_use]
    pub const fn server(&self) -> &MockServer {
        &self.server
    }

    /// Client configuration pointing at this gateway with fast, deterministic
    /// backoff.
    #[must_use]
    pub fn client_config(&self) -> GatewayConfig {
        GatewayConfig::new(self.uri())
            .with_retry_base_delay(Duration::from_millis(5))
            .with_retry_jitter(0.0)
    }

    /// Answer health checks with `status`.
    pub async fn mount_health(&self, status: u16) {
        Mock::given(method("GET"))
            .and(path(HEALTH_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({"status": "ok"})))
            .mount(&self.server)
            .await;
    }

    /// Answer capability listings with `body`.
    pub async fn mount_tools(&self, body: Value) {
        Mock::given(method("GET"))
            .and(path(TOOLS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    /// Echo every invocation's arguments back as its result.
    pub async fn mount_echo(&self) {
        Mock::given(method("POST"))
            .and(path(INVOKE_PATH))
            .respond_with(EchoResponder)
            .mount(&self.server)
            .await;
    }

    /// Answer every invocation with a bare `status`.
    pub async fn mount_invoke_status(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path(INVOKE_PATH))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Echo invocations after `delay`.
    pub async fn mount_slow_echo(&self, delay: Duration) {
        Mock::given(method("POST"))
            .and(path(INVOKE_PATH))
            .respond_with(SlowEcho(delay))
            .mount(&self.server)
            .await;
    }

    /// Drop all mounts and the request journal.
    pub async fn reset(&self) {
        self.server.reset().await;
    }

    /// All requests received so far.
    pub async fn requests(&self) -> Vec<Request> {
        self.server.received_requests().await.unwrap_or_default()
    }

    /// Number of requests received so far.
    pub async fn request_count(&self) -> usize {
        self.requests().await.len()
    }

    /// Requests received on `endpoint`.
    pub async fn requests_to(&self, endpoint: &str) -> Vec<Request> {
        self.requests()
            .await
            .into_iter()
            .filter(|r| r.url.path() == endpoint)
            .collect()
    }
}

/// JSON-RPC responder that returns `params.arguments` as the result.
///
/// The result carries the arguments under `echo` and their JSON text as a
/// single MCP text content item. The request id is mirrored back.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoResponder;

impl EchoResponder {
    fn reply(request: &Request) -> ResponseTemplate {
        let Ok(body) = serde_json::from_slice::<Value>(&request.body) else {
            return ResponseTemplate::new(400).set_body_string("request body is not JSON");
        };

        let id = body.get("id").cloned().unwrap_or(Value::Null);
        let arguments = body
            .pointer("/params/arguments")
            .cloned()
            .unwrap_or_else(|| json!({}));

        ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {
                "content": [{"type": "text", "text": arguments.to_string()}],
                "echo": arguments,
            },
        }))
    }
}

impl Respond for EchoResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        Self::reply(request)
    }
}

struct SlowEcho(Duration);

impl Respond for SlowEcho {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        EchoResponder::reply(request).set_delay(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcp_gateway_client::{GatewayClient, InvocationRequest, InvocationStatus};

    #[tokio::test]
    async fn test_echo_returns_arguments() {
        let gateway = MockGateway::start().await;
        gateway.mount_echo().await;

        let client = GatewayClient::new(gateway.client_config()).unwrap();
        let result = client
            .invoke_capability(InvocationRequest::new("echo").with_argument("message", "Hello"))
            .await;

        assert_eq!(result.status, InvocationStatus::Success);
        assert_eq!(result.result.unwrap()["echo"]["message"], "Hello");
        assert_eq!(gateway.requests_to(INVOKE_PATH).await.len(), 1);
    }

    #[tokio::test]
    async fn test_reset_clears_mounts_and_journal() {
        let gateway = MockGateway::start().await;
        gateway.mount_health(200).await;

        let client = GatewayClient::new(gateway.client_config()).unwrap();
        assert!(client.check_health().await.healthy);
        assert_eq!(gateway.request_count().await, 1);

        gateway.reset().await;
        assert_eq!(gateway.request_count().await, 0);
        assert!(!client.check_health().await.healthy);
    }
}
