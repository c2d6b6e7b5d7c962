//! Data model exchanged with callers.
//!
//! Capabilities are a read-only projection of what the gateway reports.
//! Health and invocation results are produced fresh for each call.

use crate::circuit_breaker::CircuitState;
use crate::error::{ErrorKind, GatewayError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::{Duration, Instant};

fn default_version() -> String {
    "1.0.0".to_string()
}

const fn default_enabled() -> bool {
    true
}

fn default_param_type() -> String {
    "any".to_string()
}

/// Typed description of one capability parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    /// Parameter name
    pub name: String,
    /// JSON type name (`string`, `number`, `object`, ...)
    #[serde(rename = "type", default = "default_param_type")]
    pub param_type: String,
    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the parameter must be supplied
    #[serde(default)]
    pub required: bool,
}

/// A named operation the gateway can execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireCapability")]
pub struct Capability {
    /// Unique name used for invocation
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Parameters in declaration order
    pub parameters: Vec<ParameterDescriptor>,
    /// Grouping hint
    pub category: Option<String>,
    /// Capability version
    pub version: String,
    /// Whether the gateway currently accepts invocations
    pub enabled: bool,
}

/// Capability as listed on the wire, before normalization.
#[derive(Deserialize)]
struct WireCapability {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<Vec<ParameterDescriptor>>,
    #[serde(default, rename = "inputSchema")]
    input_schema: Option<Value>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default = "default_version")]
    version: String,
    #[serde(default = "default_enabled")]
    enabled: bool,
}

impl From<WireCapability> for Capability {
    fn from(wire: WireCapability) -> Self {
        let parameters = match (wire.parameters, wire.input_schema) {
            (Some(parameters), _) => parameters,
            (None, Some(schema)) => parameters_from_schema(&schema),
            (None, None) => Vec::new(),
        };
        Self {
            name: wire.name,
            description: wire.description.unwrap_or_default(),
            parameters,
            category: wire.category,
            version: wire.version,
            enabled: wire.enabled,
        }
    }
}

fn parameters_from_schema(schema: &Value) -> Vec<ParameterDescriptor> {
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    schema
        .get("properties")
        .and_then(Value::as_object)
        .map(|properties| {
            properties
                .iter()
                .map(|(name, prop)| ParameterDescriptor {
                    name: name.clone(),
                    param_type: prop
                        .get("type")
                        .and_then(Value::as_str)
                        .map_or_else(default_param_type, str::to_string),
                    description: prop
                        .get("description")
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    required: required.contains(&name.as_str()),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Body of `GET /tools`.
#[derive(Debug, Deserialize)]
pub(crate) struct ToolsListing {
    pub(crate) tools: Vec<Capability>,
}

/// Result of a single health probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    /// Whether the gateway answered with a 2xx in time
    pub healthy: bool,
    /// Gateway base URL
    pub gateway_url: String,
    /// Round-trip latency when a response was received
    pub latency_ms: Option<u64>,
    /// Breaker state at the time of the check
    pub circuit_breaker_state: CircuitState,
    /// HTTP status when a response was received
    pub status_code: Option<u16>,
    /// Failure description when unhealthy
    pub error: Option<String>,
    /// When the check completed
    pub checked_at: DateTime<Utc>,
}

/// Request to invoke one capability.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationRequest {
    /// Capability to invoke
    pub capability_name: String,
    /// Named arguments
    pub arguments: Map<String, Value>,
    /// Per-attempt timeout overriding the client default
    pub timeout: Option<Duration>,
    /// Identity to propagate to the gateway
    pub caller_identity: Option<String>,
    /// Absolute deadline propagated from the caller
    pub deadline: Option<Instant>,
}

impl InvocationRequest {
    /// Create a request with no arguments.
    #[must_use]
    pub fn new(capability_name: impl Into<String>) -> Self {
        Self {
            capability_name: capability_name.into(),
            arguments: Map::new(),
            timeout: None,
            caller_identity: None,
            deadline: None,
        }
    }

    /// Add one argument.
    #[must_use]
    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    /// Replace all arguments.
    #[must_use]
    pub fn with_arguments(mut self, arguments: Map<String, Value>) -> Self {
        self.arguments = arguments;
        self
    }

    /// Override the per-attempt timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Propagate a caller identity.
    #[must_use]
    pub fn with_identity(mut self, identity: impl Into<String>) -> Self {
        self.caller_identity = Some(identity.into());
        self
    }

    /// Bound the whole invocation by an absolute deadline.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Outcome class of an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvocationStatus {
    /// The capability ran and returned a result
    Success,
    /// The call failed for any reason other than a timeout or open circuit
    Failure,
    /// The call exceeded its time bound; the remote outcome is unknown
    Timeout,
    /// The breaker rejected the call without a network attempt
    CircuitOpen,
}

/// Structured result of an invocation. Never an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvocationResult {
    /// Capability that was invoked
    pub capability_name: String,
    /// Outcome class
    pub status: InvocationStatus,
    /// Result payload, present iff `status` is `Success`
    pub result: Option<Value>,
    /// Error description, present iff `status` is not `Success`
    pub error: Option<String>,
    /// Error classification, present iff `status` is not `Success`
    pub error_kind: Option<ErrorKind>,
    /// Wall time spent in the client
    pub execution_time_ms: u64,
}

impl InvocationResult {
    /// Successful result.
    #[must_use]
    pub fn success(capability_name: impl Into<String>, result: Value, execution_time_ms: u64) -> Self {
        Self {
            capability_name: capability_name.into(),
            status: InvocationStatus::Success,
            result: Some(result),
            error: None,
            error_kind: None,
            execution_time_ms,
        }
    }

    /// Failed result classified from `error`.
    #[must_use]
    pub fn from_error(
        capability_name: impl Into<String>,
        error: &GatewayError,
        execution_time_ms: u64,
    ) -> Self {
        let status = match error {
            GatewayError::Timeout(_) => InvocationStatus::Timeout,
            GatewayError::CircuitOpen { .. } => InvocationStatus::CircuitOpen,
            _ => InvocationStatus::Failure,
        };
        Self {
            capability_name: capability_name.into(),
            status,
            result: None,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
            execution_time_ms,
        }
    }

    /// Whether the invocation succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == InvocationStatus::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_capability_defaults() {
        let cap: Capability = serde_json::from_value(json!({"name": "ping"})).unwrap();
        assert_eq!(cap.name, "ping");
        assert_eq!(cap.description, "");
        assert!(cap.parameters.is_empty());
        assert_eq!(cap.category, None);
        assert_eq!(cap.version, "1.0.0");
        assert!(cap.enabled);
    }

    #[test]
    fn test_capability_explicit_parameters() {
        let cap: Capability = serde_json::from_value(json!({
            "name": "search",
            "description": "Full-text search",
            "parameters": [
                {"name": "query", "type": "string", "required": true},
                {"name": "limit", "type": "integer"}
            ],
            "category": "retrieval",
            "version": "2.1.0",
            "enabled": false
        }))
        .unwrap();

        assert_eq!(cap.parameters.len(), 2);
        assert_eq!(cap.parameters[0].name, "query");
        assert!(cap.parameters[0].required);
        assert_eq!(cap.parameters[1].param_type, "integer");
        assert!(!cap.parameters[1].required);
        assert_eq!(cap.category.as_deref(), Some("retrieval"));
        assert!(!cap.enabled);
    }

    #[test]
    fn test_capability_parameters_from_input_schema_keep_order() {
        let cap: Capability = serde_json::from_value(json!({
            "name": "weather",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "city": {"type": "string", "description": "City name"},
                    "units": {"type": "string"},
                    "days": {"type": "integer"}
                },
                "required": ["city"]
            }
        }))
        .unwrap();

        let names: Vec<&str> = cap.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["city", "units", "days"]);
        assert!(cap.parameters[0].required);
        assert_eq!(cap.parameters[0].description.as_deref(), Some("City name"));
        assert!(!cap.parameters[2].required);
    }

    #[test]
    fn test_invocation_request_builder() {
        let request = InvocationRequest::new("echo")
            .with_argument("message", "Hello")
            .with_identity("alice@example.com")
            .with_timeout(Duration::from_secs(2));

        assert_eq!(request.arguments["message"], json!("Hello"));
        assert_eq!(request.caller_identity.as_deref(), Some("alice@example.com"));
        assert_eq!(request.timeout, Some(Duration::from_secs(2)));
        assert_eq!(request.deadline, None);
    }

    #[test]
    fn test_result_status_from_error() {
        let timeout = InvocationResult::from_error("x", &GatewayError::Timeout(Duration::from_secs(1)), 1000);
        assert_eq!(timeout.status, InvocationStatus::Timeout);
        assert_eq!(timeout.error_kind, Some(ErrorKind::Timeout));

        let open = InvocationResult::from_error("x", &GatewayError::circuit_open("gw"), 0);
        assert_eq!(open.status, InvocationStatus::CircuitOpen);

        let failed = InvocationResult::from_error("x", &GatewayError::http(500, "boom"), 3);
        assert_eq!(failed.status, InvocationStatus::Failure);
        assert!(failed.result.is_none());
        assert!(failed.error.is_some());
    }

    #[test]
    fn test_status_serialization() {
        let result = InvocationResult::from_error("x", &GatewayError::circuit_open("gw"), 0);
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "CIRCUIT_OPEN");
        assert_eq!(value["error_kind"], "circuit_open");
    }
}
