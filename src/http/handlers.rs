//! Operational endpoints.

use axum::extract::State;
use axum::http::Uri;
use axum::Json;
use serde::Serialize;

use crate::monitor::DashboardData;

use super::GatewayState;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

pub async fn health() -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
    })
}

pub async fn dashboard(State(state): State<GatewayState>) -> Json<DashboardData> {
    Json(state.monitor.dashboard())
}

/// Demo content handler standing in for the protected application.
pub async fn content(uri: Uri) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "message": "ok",
        "path": uri.path(),
    }))
}
