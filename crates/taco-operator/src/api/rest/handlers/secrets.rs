//! Secret handlers

use crate::api::rest::state::AppState;
use crate::error::{ApiError, ApiResult};
use crate::storage::SecretStorage;
use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use taco_types::{ObjectMeta, Secret};

/// Put secret request
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutSecretRequest {
    pub string_data: BTreeMap<String, String>,
}

/// Put secret response; values are never echoed back
#[derive(Debug, Serialize)]
pub struct SecretSummary {
    pub namespace: String,
    pub name: String,
    pub keys: Vec<String>,
}

/// Create or replace a secret
pub async fn put_secret(
    State(state): State<AppState>,
    Path((namespace, name)): Path<(String, String)>,
    Json(request): Json<PutSecretRequest>,
) -> ApiResult<Json<SecretSummary>> {
    if request.string_data.is_empty() {
        return Err(ApiError::BadRequest("stringData must not be empty".to_string()));
    }

    let secret = Secret::from_string_data(ObjectMeta::new(&namespace, &name), request.string_data);
    let keys: Vec<String> = secret.data.keys().cloned().collect();
    state.storage.upsert_secret(secret).await?;

    tracing::info!(namespace = %namespace, name = %name, keys = keys.len(), "Stored secret");

    Ok(Json(SecretSummary {
        namespace,
        name,
        keys,
    }))
}
