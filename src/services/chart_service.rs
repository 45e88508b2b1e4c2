use futures_util::future::try_join_all;

use crate::models::{
    ChartDelta, ChartSnapshot, ChartType, Cursor, DataPoint, DatasetSeries, DeltaOutcome,
};
use crate::services::store_service::DatasetStore;
use crate::utils::names::chart_id;
use crate::utils::ChartError;

/// Split points into parallel label and value columns
fn columns(points: Vec<DataPoint>) -> (Vec<String>, Vec<String>) {
    points.into_iter().map(|p| (p.label, p.value)).unzip()
}

/// Build the full chart view for the given datasets, in the given order
///
/// Every name is resolved before anything is read, so one missing dataset
/// fails the whole request. The per-dataset reads run concurrently.
pub async fn build_chart_snapshot(
    store: &DatasetStore,
    names: &[String],
    chart_type: ChartType,
) -> Result<ChartSnapshot, ChartError> {
    if names.is_empty() {
        return Err(ChartError::InvalidRequest(
            "A chart needs at least one dataset".to_string(),
        ));
    }

    let handles = store.registry().handles(names).await?;

    let contents = try_join_all(
        handles
            .iter()
            .map(|handle| store.read_handle(handle, Cursor::START)),
    )
    .await?;

    let datasets = names
        .iter()
        .zip(contents)
        .map(|(name, points)| {
            let latest_timestamp = points
                .last()
                .map(|p| p.timestamp)
                .unwrap_or(f64::NEG_INFINITY);
            let (labels, values) = columns(points);
            DatasetSeries {
                name: name.clone(),
                labels,
                values,
                latest_timestamp,
            }
        })
        .collect();

    let id = chart_id(names);
    Ok(ChartSnapshot {
        chart_id: id.clone(),
        name: id,
        names: names.to_vec(),
        action: "create_chart",
        chart_type,
        datasets,
    })
}

/// Points of one dataset newer than the client's cursor
pub async fn build_chart_delta(
    store: &DatasetStore,
    name: &str,
    cursor: Cursor,
) -> Result<DeltaOutcome, ChartError> {
    let changes = store.read_since(name, cursor).await?;

    let Some(latest_timestamp) = changes.last().map(|p| p.timestamp) else {
        return Ok(DeltaOutcome::NoChange {
            name: name.to_string(),
        });
    };

    let (labels, values) = columns(changes);
    Ok(DeltaOutcome::Changes(ChartDelta {
        name: name.to_string(),
        action: "update_chart",
        latest_timestamp,
        labels,
        values,
    }))
}
