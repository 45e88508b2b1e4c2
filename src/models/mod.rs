//! Data models for chartsync
//!
//! Datasets and their points, the chart views built out of them, and the
//! envelope used to carry chart operations over a WebSocket.

pub mod chart;
pub mod dataset;
pub mod rpc;

// Re-export commonly used types for convenience
pub use chart::{ChartDelta, ChartSnapshot, ChartType, DatasetSeries, DeltaOutcome};
pub use dataset::{Cursor, DataPoint};
pub use rpc::{ClientFrame, RpcCall, WsResponse};
