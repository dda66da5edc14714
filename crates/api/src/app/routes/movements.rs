use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use stockroom_core::ItemId;

use crate::app::extract::{ApiJson, ApiQuery};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub async fn record_movement(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    ApiJson(body): ApiJson<dto::RecordMovementRequest>,
) -> axum::response::Response {
    let request = body.into_request(actor.user_id());

    match services.ledger.record_movement(&request).await {
        Ok(movement) => (StatusCode::CREATED, Json(movement)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

/// Newest first; optionally one item's history and/or capped at `limit`.
pub async fn list_movements(
    Extension(services): Extension<Arc<AppServices>>,
    ApiQuery(query): ApiQuery<dto::MovementsQuery>,
) -> axum::response::Response {
    let item_id: Option<ItemId> = match query.item_id.as_deref() {
        Some(raw) => match errors::parse_id(raw, "item") {
            Ok(v) => Some(v),
            Err(response) => return response,
        },
        None => None,
    };

    match services.ledger.list_movements(item_id, query.limit).await {
        Ok(movements) => (StatusCode::OK, Json(movements)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}
