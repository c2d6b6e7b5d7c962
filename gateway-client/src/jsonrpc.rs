//! JSON-RPC 2.0 envelope for the gateway invocation endpoint.

use crate::error::{GatewayError, GatewayResult};
use serde::Serialize;
use serde_json::{Map, Value};

/// JSON-RPC protocol version.
pub const JSONRPC_VERSION: &str = "2.0";

/// Method name for tool invocation.
pub const TOOLS_CALL_METHOD: &str = "tools/call";

/// Outbound JSON-RPC request.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcRequest<P> {
    /// Always `"2.0"`
    pub jsonrpc: &'static str,
    /// Request id echoed back by the gateway
    pub id: u64,
    /// Method name
    pub method: &'static str,
    /// Method parameters
    pub params: P,
}

/// Parameters of a `tools/call` request.
#[derive(Debug, Clone, Serialize)]
pub struct ToolCallParams<'a> {
    /// Capability name
    pub name: &'a str,
    /// Capability arguments
    pub arguments: &'a Map<String, Value>,
}

impl<'a> JsonRpcRequest<ToolCallParams<'a>> {
    /// Build a `tools/call` request.
    #[must_use]
    pub const fn tool_call(id: u64, name: &'a str, arguments: &'a Map<String, Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method: TOOLS_CALL_METHOD,
            params: ToolCallParams { name, arguments },
        }
    }
}

/// Decode a response body for the request with `expected_id`.
///
/// A non-null `id` that differs from the request's is rejected so that a
/// confused proxy can never hand us another caller's result.
///
/// # Errors
///
/// Returns [`GatewayError::Rpc`] when the envelope carries an `error`, or its
/// `result` is flagged `isError`. Returns [`GatewayError::Protocol`] if the
/// body is not a JSON object carrying `result` or `error`, or if the ids do
/// not match.
pub fn decode_response(body: &str, expected_id: u64) -> GatewayResult<Value> {
    let value: Value = serde_json::from_str(body)?;
    let Value::Object(envelope) = value else {
        return Err(GatewayError::protocol("JSON-RPC response is not an object"));
    };

    match envelope.get("id") {
        None | Some(Value::Null) => {}
        Some(id) if id.as_u64() == Some(expected_id) => {}
        Some(id) => {
            return Err(GatewayError::protocol(format!(
                "JSON-RPC id mismatch: sent {expected_id}, received {id}"
            )));
        }
    }

    if let Some(error) = envelope.get("error").filter(|e| !e.is_null()) {
        return Err(GatewayError::rpc(describe_error(error)));
    }

    match envelope.get("result") {
        Some(result) if tool_reported_error(result) => {
            Err(GatewayError::rpc(tool_error_text(result)))
        }
        Some(result) => Ok(result.clone()),
        None => Err(GatewayError::protocol(
            "JSON-RPC response has neither result nor error",
        )),
    }
}

fn describe_error(error: &Value) -> String {
    match error {
        Value::String(s) => s.clone(),
        Value::Object(obj) => {
            let message = obj
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("Unknown JSON-RPC error");
            match obj.get("code").and_then(Value::as_i64) {
                Some(code) => format!("{message} (code {code})"),
                None => message.to_string(),
            }
        }
        other => other.to_string(),
    }
}

fn tool_reported_error(result: &Value) -> bool {
    result.get("isError").and_then(Value::as_bool).unwrap_or(false)
}

fn tool_error_text(result: &Value) -> String {
    let text: Vec<&str> = result
        .get("content")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter(|item| item.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|item| item.get("text").and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        "Tool reported an error".to_string()
    } else {
        text.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    #[test]
    fn test_tool_call_serialization() {
        let mut arguments = Map::new();
        arguments.insert("message".to_string(), json!("Hello"));
        let request = JsonRpcRequest::tool_call(7, "echo", &arguments);

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "jsonrpc": "2.0",
                "id": 7,
                "method": "tools/call",
                "params": {"name": "echo", "arguments": {"message": "Hello"}}
            })
        );
    }

    #[test]
    fn test_decode_result() {
        let result = decode_response(r#"{"jsonrpc":"2.0","id":1,"result":{"ok":true}}"#, 1).unwrap();
        assert_eq!(result, json!({"ok": true}));
    }

    #[test]
    fn test_decode_null_result_is_success() {
        let result = decode_response(r#"{"result":null}"#, 1).unwrap();
        assert_eq!(result, Value::Null);
    }

    #[test]
    fn test_decode_error_object() {
        let err = decode_response(
            r#"{"jsonrpc":"2.0","id":3,"error":{"code":-32601,"message":"Tool not found"}}"#,
            3,
        )
        .unwrap_err();
        assert_eq!(err, GatewayError::rpc("Tool not found (code -32601)"));
    }

    #[test]
    fn test_decode_tool_is_error() {
        let body = json!({
            "result": {
                "isError": true,
                "content": [{"type": "text", "text": "city not found"}]
            }
        })
        .to_string();
        let err = decode_response(&body, 1).unwrap_err();
        assert_eq!(err, GatewayError::rpc("city not found"));
    }

    #[test]
    fn test_decode_rejects_id_mismatch() {
        let err = decode_response(r#"{"id":2,"result":{}}"#, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }

    #[test]
    fn test_decode_rejects_missing_payload() {
        let err = decode_response(r#"{"jsonrpc":"2.0","id":1}"#, 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);

        let err = decode_response("[1,2,3]", 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);

        let err = decode_response("not json", 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Protocol);
    }
}
