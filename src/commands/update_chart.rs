use serde_json::{json, Value};

use crate::models::{Cursor, DeltaOutcome, RpcCall};
use crate::services::chart_service;
use crate::services::DatasetStore;
use crate::utils::ChartError;

/// `update_chart(name, latest_timestamp)`
pub async fn execute(store: &DatasetStore, call: &RpcCall) -> Result<Value, ChartError> {
    let name = call
        .param(0, "name")
        .and_then(Value::as_str)
        .ok_or_else(|| ChartError::InvalidRequest("'name' must be a dataset name".to_string()))?;
    let cursor = parse_cursor(call.param(1, "latest_timestamp"))?;

    match chart_service::build_chart_delta(store, name, cursor).await? {
        DeltaOutcome::Changes(delta) => Ok(serde_json::to_value(delta)?),
        DeltaOutcome::NoChange { name } => Ok(json!({
            "info": format!("{} does not have any changes to update", name)
        })),
    }
}

/// Cursors are client input: a number, or null for "nothing seen yet"
fn parse_cursor(value: Option<&Value>) -> Result<Cursor, ChartError> {
    let raw = match value {
        None => {
            return Err(ChartError::InvalidRequest(
                "'latest_timestamp' is required".to_string(),
            ))
        }
        Some(Value::Null) => None,
        Some(Value::Number(n)) => n.as_f64(),
        Some(other) => {
            return Err(ChartError::InvalidRequest(format!(
                "'latest_timestamp' must be a number, got {}",
                other
            )))
        }
    };

    Cursor::from_wire(raw)
        .ok_or_else(|| ChartError::InvalidRequest("'latest_timestamp' is not a number".to_string()))
}
