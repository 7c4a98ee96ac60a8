//! Taco order handlers

use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::storage::OrderStorage;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use taco_types::{ObjectKey, ObjectMeta, TacoOrder, TacoOrderSpec};

/// Create order request
///
/// Same shape as a `TacoOrder` manifest; any `status` in the body is ignored.
#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub metadata: ObjectMeta,
    pub spec: TacoOrderSpec,
}

/// Delete order response
#[derive(Debug, Serialize)]
pub struct DeleteOrderResponse {
    pub namespace: String,
    pub name: String,
    pub deleted: bool,
}

/// List all orders
pub async fn list_orders(State(state): State<AppState>) -> ApiResult<Json<Vec<TacoOrder>>> {
    let orders = state.storage.list_orders().await?;
    Ok(Json(orders))
}

/// Get a specific order
pub async fn get_order(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
) -> ApiResult<Json<TacoOrder>> {
    let key = ObjectKey::new(namespace, name);
    let order = state
        .storage
        .get_order(&key)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("TacoOrder {} not found", key)))?;
    Ok(Json(order))
}

/// Create a new order
pub async fn create_order(
    State(state): State<AppState>,
    Json(request): Json<CreateOrderRequest>,
) -> ApiResult<(StatusCode, Json<TacoOrder>)> {
    if request.metadata.name.trim().is_empty() {
        return Err(ApiError::BadRequest("metadata.name must not be empty".to_string()));
    }

    let order = state
        .storage
        .create_order(TacoOrder::new(request.metadata, request.spec))
        .await?;

    tracing::info!(
        order = %order.key(),
        quantity = order.spec.quantity,
        variety = %order.spec.variety,
        "Created order"
    );

    Ok((StatusCode::CREATED, Json(order)))
}

/// Delete an order
///
/// Only the stored object is removed; a provider order that was already
/// placed is left as is.
pub async fn delete_order(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
) -> ApiResult<Json<DeleteOrderResponse>> {
    let key = ObjectKey::new(namespace, name);
    if !state.storage.delete_order(&key).await? {
        return Err(ApiError::NotFound(format!("TacoOrder {} not found", key)));
    }

    tracing::info!(order = %key, "Deleted order");

    Ok(Json(DeleteOrderResponse {
        namespace: key.namespace,
        name: key.name,
        deleted: true,
    }))
}
