//! Chart models

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::dataset::serialize_cursor;

/// Presentation hint forwarded to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    Bar,
    #[default]
    Line,
}

impl ChartType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChartType::Bar => "bar",
            ChartType::Line => "line",
        }
    }
}

impl fmt::Display for ChartType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChartType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "bar" => Ok(ChartType::Bar),
            "line" => Ok(ChartType::Line),
            _ => Err(format!("Unknown chart type: '{}'. Supported: bar, line", s)),
        }
    }
}

/// One dataset's full contents inside a chart snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetSeries {
    pub name: String,
    pub labels: Vec<String>,
    #[serde(rename = "data")]
    pub values: Vec<String>,
    /// Timestamp of the last point, negative infinity for an empty dataset
    #[serde(serialize_with = "serialize_cursor")]
    pub latest_timestamp: f64,
}

/// Full chart view returned by `create_chart`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSnapshot {
    pub chart_id: String,
    pub name: String,
    pub names: Vec<String>,
    pub action: &'static str,
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub datasets: Vec<DatasetSeries>,
}

/// Points newer than a client's cursor, returned by `update_chart`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartDelta {
    pub name: String,
    pub action: &'static str,
    pub latest_timestamp: f64,
    pub labels: Vec<String>,
    #[serde(rename = "data")]
    pub values: Vec<String>,
}

/// Result of a delta query; `NoChange` is the steady state, not a failure
#[derive(Debug, Clone, PartialEq)]
pub enum DeltaOutcome {
    Changes(ChartDelta),
    NoChange { name: String },
}
