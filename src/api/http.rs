use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use super::page::ChartPage;
use super::AppState;
use crate::models::ChartType;
use crate::utils::{value_to_text, ChartError};

#[derive(Debug, Deserialize)]
pub struct ViewQuery {
    /// Second dataset drawn on the same chart
    pub extra: Option<String>,
    pub chart_type: Option<String>,
    #[serde(default)]
    pub body_only: bool,
}

#[derive(Debug, Deserialize)]
pub struct AppendQuery {
    pub label: String,
    pub data: String,
}

#[derive(Debug, Deserialize)]
pub struct NewDataset {
    pub name: String,
    #[serde(default)]
    pub labels: Vec<Value>,
    #[serde(default)]
    pub dataset: Vec<Value>,
}

pub async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// `GET {prefix}/{chart}`
pub async fn view_chart(
    State(state): State<AppState>,
    Path(chart): Path<String>,
    Query(query): Query<ViewQuery>,
) -> Result<Html<String>, ChartError> {
    let mut names = vec![chart];
    if let Some(extra) = query.extra.filter(|e| !e.is_empty()) {
        names.push(extra);
    }

    let chart_type = match query.chart_type.as_deref() {
        None | Some("") => ChartType::default(),
        Some(raw) => raw.parse().map_err(ChartError::InvalidRequest)?,
    };

    // 404 before serving a page that could never load
    state.engine.store().registry().handles(&names).await?;

    let page = ChartPage {
        names: &names,
        chart_type,
        ws_path: super::WS_PATH,
        secret: state.engine.secret(),
    };

    Ok(Html(if query.body_only {
        page.body()
    } else {
        page.document()
    }))
}

/// `POST {prefix}/{chart}?label=&data=`
pub async fn append_point(
    State(state): State<AppState>,
    Path(chart): Path<String>,
    Query(query): Query<AppendQuery>,
) -> Result<Json<Value>, ChartError> {
    state
        .engine
        .store()
        .append_point(&chart, &query.label, &query.data)
        .await?;
    Ok(Json(json!("datapoint created")))
}

/// `PUT {prefix}` with `{name, labels, dataset}`
pub async fn create_dataset(
    State(state): State<AppState>,
    Json(body): Json<NewDataset>,
) -> Result<Json<Value>, ChartError> {
    let labels: Vec<String> = body.labels.iter().map(value_to_text).collect();
    let values: Vec<String> = body.dataset.iter().map(value_to_text).collect();

    let points = state
        .engine
        .store()
        .registry()
        .create_dataset(&body.name, &labels, &values)
        .await?;

    info!("HTTP created dataset {} ({} point(s))", body.name, points.len());
    Ok(Json(json!({ "message": format!("dataset {} created", body.name) })))
}

/// `DELETE {prefix}/{chart}`
pub async fn remove_dataset(
    State(state): State<AppState>,
    Path(chart): Path<String>,
) -> Result<Json<Value>, ChartError> {
    state.engine.store().registry().remove_dataset(&chart).await?;
    Ok(Json(json!(format!("dataset {} removed", chart))))
}
