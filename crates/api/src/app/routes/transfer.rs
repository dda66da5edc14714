//! CSV import/export endpoints.

use std::sync::Arc;

use axum::{
    extract::Extension,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use stockroom_core::CategoryId;
use stockroom_inventory::csv::write_template;

use crate::app::extract::{ApiQuery, TextBody};
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// Import a CSV body into `?category_id=`; answers with the per-row tally.
pub async fn import(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    ApiQuery(query): ApiQuery<dto::ImportQuery>,
    TextBody(body): TextBody,
) -> axum::response::Response {
    let Some(raw_category) = query.category_id.as_deref() else {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "category_id query parameter is required",
        );
    };
    let category_id: CategoryId = match errors::parse_id(raw_category, "category") {
        Ok(v) => v,
        Err(response) => return response,
    };

    match services.ledger.import_batch(actor.user_id(), &body, category_id).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

pub async fn export(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.ledger.export_catalog().await {
        Ok(csv) => csv_response("stockroom-export.csv", csv),
        Err(e) => errors::ledger_error_to_response(e),
    }
}

/// Blank import template with a sample row.
pub async fn template() -> axum::response::Response {
    csv_response("stockroom-template.csv", write_template())
}

fn csv_response(filename: &str, body: String) -> axum::response::Response {
    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, CSV_CONTENT_TYPE.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
        .into_response()
}
