use super::common::{map_service_error, success_response};
use crate::{errors::ApiError, handlers::AppState};
use axum::{extract::State, routing::get, Router};

/// List every recorded inventory lot with its item and order context
#[utoipa::path(
    get,
    path = "/api/v1/inventory-lots",
    responses(
        (status = 200, description = "Inventory lots fetched", body = crate::ApiResponse<serde_json::Value>)
    ),
    tag = "inventory-lots"
)]
pub async fn list_inventory_lots(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let listing = state
        .services
        .inventory_lots
        .list_inventory_lots()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(listing))
}

/// Creates the router for inventory lot endpoints
pub fn inventory_lot_routes() -> Router<AppState> {
    Router::new().route("/", get(list_inventory_lots))
}
