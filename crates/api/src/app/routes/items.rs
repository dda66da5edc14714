use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use stockroom_core::ItemId;
use stockroom_inventory::{ItemPatch, NewItem};

use crate::app::extract::ApiJson;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub async fn list_items(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.ledger.list_items().await {
        Ok(items) => (StatusCode::OK, Json(dto::item_views(items))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn low_stock(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.ledger.low_stock().await {
        Ok(items) => (StatusCode::OK, Json(dto::item_views(items))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    ApiJson(body): ApiJson<NewItem>,
) -> axum::response::Response {
    match services.ledger.create_item(actor.user_id(), body).await {
        Ok(item) => (StatusCode::CREATED, Json(dto::ItemView::from(item))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn get_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ItemId = match errors::parse_id(&id, "item") {
        Ok(v) => v,
        Err(response) => return response,
    };

    match services.ledger.get_item(id).await {
        Ok(item) => (StatusCode::OK, Json(dto::ItemView::from(item))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<ItemPatch>,
) -> axum::response::Response {
    let id: ItemId = match errors::parse_id(&id, "item") {
        Ok(v) => v,
        Err(response) => return response,
    };

    match services.ledger.update_item(id, &patch).await {
        Ok(item) => (StatusCode::OK, Json(dto::ItemView::from(item))).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn delete_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ItemId = match errors::parse_id(&id, "item") {
        Ok(v) => v,
        Err(response) => return response,
    };

    match services.ledger.delete_item(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

/// Re-derive the item's stock from its movement history.
pub async fn audit_item(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: ItemId = match errors::parse_id(&id, "item") {
        Ok(v) => v,
        Err(response) => return response,
    };

    match services.ledger.audit_item(id).await {
        Ok(audit) => (StatusCode::OK, Json(audit)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
