pub mod create_chart;
pub mod update_chart;

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::models::{ClientFrame, RpcCall, WsResponse};
use crate::services::DatasetStore;
use crate::utils::ChartError;

/// Stateless request/response mediator for chart subscriptions
///
/// Holds no per-client state: every delta request carries its own cursor.
#[derive(Clone)]
pub struct SyncEngine {
    store: DatasetStore,
    secret: Arc<str>,
}

/// What the connection loop should do with a text frame
#[derive(Debug, PartialEq)]
pub enum FrameOutcome {
    Reply(String),
    Silent,
}

impl SyncEngine {
    pub fn new(store: DatasetStore, secret: impl Into<Arc<str>>) -> Self {
        Self {
            store,
            secret: secret.into(),
        }
    }

    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    /// Token clients present in their setup frame
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Check a connection's opening `{"setup": ...}` frame
    pub fn authorize(&self, text: &str) -> bool {
        match serde_json::from_str::<ClientFrame>(text) {
            Ok(ClientFrame::Setup { setup }) => setup == *self.secret,
            _ => false,
        }
    }

    /// Run one named operation
    pub async fn dispatch(&self, call: &RpcCall) -> Result<Value, ChartError> {
        match call.action.as_str() {
            "create_chart" => create_chart::execute(&self.store, call).await,
            "update_chart" => update_chart::execute(&self.store, call).await,
            other => Err(ChartError::InvalidRequest(format!(
                "Unknown action '{}'",
                other
            ))),
        }
    }

    /// Decode a request frame, run it and encode the reply envelope
    pub async fn handle_frame(&self, text: &str) -> FrameOutcome {
        let request = match serde_json::from_str::<ClientFrame>(text) {
            Ok(ClientFrame::Action { ws_action }) => ws_action,
            Ok(ClientFrame::Setup { .. }) => {
                debug!("Ignoring repeated setup frame");
                return FrameOutcome::Silent;
            }
            Err(e) => {
                warn!("Malformed frame: {}", e);
                let request_id = recover_request_id(text);
                if request_id.is_none() {
                    return FrameOutcome::Silent;
                }
                let error = ChartError::InvalidRequest(format!("Malformed request: {}", e));
                return encode(WsResponse::new(request_id, error_payload(&error)));
            }
        };

        debug!(
            "Request {:?}: {} (args: {}, kwargs: {})",
            request.request_id,
            request.request.action,
            request.request.args.len(),
            request.request.kwargs.len()
        );

        let result = match request.kind.as_deref() {
            None | Some("request") => self.dispatch(&request.request).await,
            Some(other) => Err(ChartError::InvalidRequest(format!(
                "Unsupported frame type '{}'",
                other
            ))),
        };

        let response = match result {
            Ok(payload) => payload,
            Err(e) => {
                if e.status().is_server_error() {
                    warn!("{} failed: {}", request.request.action, e);
                } else {
                    debug!("{} rejected: {}", request.request.action, e);
                }
                error_payload(&e)
            }
        };

        if !request.response_expected {
            return FrameOutcome::Silent;
        }

        encode(WsResponse::new(request.request_id, response))
    }
}

fn error_payload(error: &ChartError) -> Value {
    json!({
        "error": error.client_message(),
        "status": error.status().as_u16(),
    })
}

fn encode(response: WsResponse) -> FrameOutcome {
    match serde_json::to_string(&response) {
        Ok(text) => FrameOutcome::Reply(text),
        Err(e) => {
            warn!("Failed to encode response: {}", e);
            FrameOutcome::Silent
        }
    }
}

/// Best effort lookup of `ws_action.request_id` in a frame that failed to decode
fn recover_request_id(text: &str) -> Option<String> {
    let value: Value = serde_json::from_str(text).ok()?;
    value
        .get("ws_action")?
        .get("request_id")?
        .as_str()
        .map(str::to_string)
}
