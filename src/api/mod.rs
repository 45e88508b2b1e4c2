pub mod http;
pub mod page;
pub mod ws;

use axum::routing::{get, put};
use axum::Router;

use crate::commands::SyncEngine;

/// Path of the chart WebSocket endpoint
pub const WS_PATH: &str = "/ws/charts";

#[derive(Clone)]
pub struct AppState {
    pub engine: SyncEngine,
}

impl AppState {
    pub fn new(engine: SyncEngine) -> Self {
        Self { engine }
    }
}

/// Build the full HTTP surface; `chart_prefix` is already normalized
pub fn router(state: AppState, chart_prefix: &str) -> Router {
    Router::new()
        .route(WS_PATH, get(ws::ws_handler))
        .route("/health", get(http::health_handler))
        .route(
            &format!("{}/{{chart}}", chart_prefix),
            get(http::view_chart)
                .post(http::append_point)
                .delete(http::remove_dataset),
        )
        .route(chart_prefix, put(http::create_dataset))
        .with_state(state)
}
