//! Model metadata handler.

use std::sync::Arc;

use axum::{extract::Extension, Json};

use storage::ModelMetadata;

use crate::error::ApiResult;
use crate::state::AppState;

/// GET /models - Distinct models, systems, domains, backgrounds, frequencies,
/// variables and initialization times
pub async fn models_handler(Extension(state): Extension<Arc<AppState>>) -> ApiResult<Json<ModelMetadata>> {
    Ok(Json(state.service.model_metadata().await?))
}
