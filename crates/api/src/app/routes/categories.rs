use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use stockroom_core::CategoryId;
use stockroom_inventory::{CategoryPatch, NewCategory};

use crate::app::errors;
use crate::app::extract::ApiJson;
use crate::app::services::AppServices;

pub async fn list_categories(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.ledger.list_categories().await {
        Ok(categories) => (StatusCode::OK, Json(categories)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    ApiJson(body): ApiJson<NewCategory>,
) -> axum::response::Response {
    match services.ledger.create_category(body).await {
        Ok(category) => (StatusCode::CREATED, Json(category)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn update_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<CategoryPatch>,
) -> axum::response::Response {
    let id: CategoryId = match errors::parse_id(&id, "category") {
        Ok(v) => v,
        Err(response) => return response,
    };

    match services.ledger.update_category(id, &patch).await {
        Ok(category) => (StatusCode::OK, Json(category)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn delete_category(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: CategoryId = match errors::parse_id(&id, "category") {
        Ok(v) => v,
        Err(response) => return response,
    };

    match services.ledger.delete_category(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
