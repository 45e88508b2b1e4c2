//! WebSocket envelope models
//!
//! Requests arrive as
//! `{"ws_action": {"type": "request", "response_expected": true, "request": {...}, "request_id": "..."}}`
//! and replies go back as `{"ws_action": {"type": "response", "request_id": "...", "response": ...}}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Any text frame a client may send
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ClientFrame {
    Setup { setup: String },
    Action { ws_action: WsRequest },
}

#[derive(Debug, Deserialize)]
pub struct WsRequest {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default = "default_response_expected")]
    pub response_expected: bool,
    pub request: RpcCall,
    #[serde(default)]
    pub request_id: Option<String>,
}

fn default_response_expected() -> bool {
    true
}

/// A named operation with positional and named arguments
#[derive(Debug, Clone, Deserialize)]
pub struct RpcCall {
    pub action: String,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
}

impl RpcCall {
    /// Look up a parameter by position first, then by name
    pub fn param(&self, position: usize, name: &str) -> Option<&Value> {
        self.args.get(position).or_else(|| self.kwargs.get(name))
    }
}

#[derive(Debug, Serialize)]
pub struct WsResponse {
    pub ws_action: WsResponseBody,
}

#[derive(Debug, Serialize)]
pub struct WsResponseBody {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub request_id: Option<String>,
    pub response: Value,
}

impl WsResponse {
    pub fn new(request_id: Option<String>, response: Value) -> Self {
        Self {
            ws_action: WsResponseBody {
                kind: "response",
                request_id,
                response,
            },
        }
    }
}
