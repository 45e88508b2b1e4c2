use serde_json::Value;

use crate::models::{ChartType, RpcCall};
use crate::services::chart_service;
use crate::services::DatasetStore;
use crate::utils::ChartError;

/// `create_chart(names, chart_type="line")`
pub async fn execute(store: &DatasetStore, call: &RpcCall) -> Result<Value, ChartError> {
    let names = parse_names(call.param(0, "names"))?;
    let chart_type = parse_chart_type(call.param(1, "chart_type"))?;

    let snapshot = chart_service::build_chart_snapshot(store, &names, chart_type).await?;
    Ok(serde_json::to_value(snapshot)?)
}

fn parse_names(value: Option<&Value>) -> Result<Vec<String>, ChartError> {
    let items = value
        .and_then(Value::as_array)
        .ok_or_else(|| ChartError::InvalidRequest("'names' must be a list of dataset names".to_string()))?;

    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                ChartError::InvalidRequest(format!("Dataset name must be a string, got {}", item))
            })
        })
        .collect()
}

fn parse_chart_type(value: Option<&Value>) -> Result<ChartType, ChartError> {
    match value {
        None | Some(Value::Null) => Ok(ChartType::default()),
        Some(Value::String(s)) => s.parse().map_err(ChartError::InvalidRequest),
        Some(other) => Err(ChartError::InvalidRequest(format!(
            "'chart_type' must be a string, got {}",
            other
        ))),
    }
}
