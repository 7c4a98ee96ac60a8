//! Health and status handlers

use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use crate::storage::OrderStorage;
use axum::{extract::State, Json};
use serde::Serialize;
use std::collections::BTreeMap;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthCheckResponse {
    pub status: String,
    pub version: String,
    pub uptime: String,
}

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    Json(HealthCheckResponse {
        status: "healthy".to_string(),
        version: state.version.clone(),
        uptime: state.uptime(),
    })
}

/// Operator status response
#[derive(Debug, Serialize)]
pub struct OperatorStatusResponse {
    pub version: String,
    pub uptime: String,
    pub started_at: chrono::DateTime<chrono::Utc>,
    pub total_orders: usize,

    /// Order count per phase; unset phases are reported as `Pending`
    pub phases: BTreeMap<String, usize>,
}

/// Operator status endpoint
pub async fn operator_status(
    State(state): State<AppState>,
) -> ApiResult<Json<OperatorStatusResponse>> {
    let orders = state.storage.list_orders().await?;

    let mut phases = BTreeMap::new();
    for order in &orders {
        let phase = match order.phase().as_str() {
            "" => "Pending",
            other => other,
        };
        *phases.entry(phase.to_string()).or_insert(0) += 1;
    }

    Ok(Json(OperatorStatusResponse {
        version: state.version.clone(),
        uptime: state.uptime(),
        started_at: state.started_at,
        total_orders: orders.len(),
        phases,
    }))
}
