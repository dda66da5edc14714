use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

pub mod categories;
pub mod items;
pub mod movements;
pub mod system;
pub mod transfer;

/// Router for all authenticated endpoints.
pub fn router(import_max_bytes: usize) -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route(
            "/categories",
            get(categories::list_categories).post(categories::create_category),
        )
        .route(
            "/categories/:id",
            put(categories::update_category).delete(categories::delete_category),
        )
        .route("/items", get(items::list_items).post(items::create_item))
        .route("/items/low-stock", get(items::low_stock))
        .route(
            "/items/:id",
            get(items::get_item)
                .patch(items::update_item)
                .delete(items::delete_item),
        )
        .route("/items/:id/audit", get(items::audit_item))
        .route(
            "/movements",
            get(movements::list_movements).post(movements::record_movement),
        )
        .route(
            "/import",
            post(transfer::import).layer(DefaultBodyLimit::max(import_max_bytes)),
        )
        .route("/import/template", get(transfer::template))
        .route("/export", get(transfer::export))
}
