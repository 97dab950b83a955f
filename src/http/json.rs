use crate::errors::AppError;
use crate::http::{log_failure, status_for, AppState};
use crate::models::{CatalogJson, CategoryItemsJson, ItemId, SingleItemJson};
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub async fn catalog_json(State(state): State<AppState>) -> Result<Json<CatalogJson>, Response> {
    state.catalog.catalog_json().map(Json).map_err(json_error)
}

pub async fn category_json(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<CategoryItemsJson>, Response> {
    state.catalog.category_json(&category).map(Json).map_err(json_error)
}

pub async fn item_json(
    State(state): State<AppState>,
    Path((category, item, id)): Path<(String, String, ItemId)>,
) -> Result<Json<SingleItemJson>, Response> {
    state
        .catalog
        .item_json(&category, &item, id)
        .map(Json)
        .map_err(json_error)
}

fn json_error(error: AppError) -> Response {
    log_failure(&error);
    (status_for(&error), Json(json!({ "error": error.user_message() }))).into_response()
}
