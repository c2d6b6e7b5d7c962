//! Test fixtures with sample data.
//!
//! This module provides pre-built gateway payloads for use in tests.

use mcp_gateway_client::{Capability, ParameterDescriptor};
use serde_json::{Value, json};

/// Identity used by identity propagation scenarios.
pub const SAMPLE_IDENTITY: &str = "alice@example.com";

/// A `/tools` body with one tool in each wire shape the gateway may use.
///
/// `echo` lists explicit parameters, `weather` only carries an MCP
/// `inputSchema`, and `legacy_report` is disabled.
#[must_use]
pub fn sample_tools_body() -> Value {
    json!({
        "tools": [
            {
                "name": "echo",
                "description": "Echo the message back",
                "parameters": [
                    {"name": "message", "type": "string", "description": "Text to echo", "required": true}
                ],
                "category": "utility"
            },
            {
                "name": "weather",
                "description": "Current weather for a city",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "city": {"type": "string", "description": "City name"},
                        "units": {"type": "string"}
                    },
                    "required": ["city"]
                },
                "category": "data",
                "version": "2.1.0"
            },
            {
                "name": "legacy_report",
                "description": "Retired report generator",
                "enabled": false
            }
        ]
    })
}

/// The `weather` entry of [`sample_tools_body`] as the client parses it.
#[must_use]
pub fn weather_capability() -> Capability {
    Capability {
        name: "weather".to_string(),
        description: "Current weather for a city".to_string(),
        parameters: vec![
            ParameterDescriptor {
                name: "city".to_string(),
                param_type: "string".to_string(),
                description: Some("City name".to_string()),
                required: true,
            },
            ParameterDescriptor {
                name: "units".to_string(),
                param_type: "string".to_string(),
                description: None,
                required: false,
            },
        ],
        category: Some("data".to_string()),
        version: "2.1.0".to_string(),
        enabled: true,
    }
}

/// A JSON-RPC error body as the gateway returns for an unknown tool.
#[must_use]
pub fn unknown_tool_error(id: u64, name: &str) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": {"code": -32602, "message": format!("Unknown tool: {name}")}
    })
}
