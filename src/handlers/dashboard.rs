use super::common::{map_service_error, success_response};
use crate::{errors::ApiError, handlers::AppState};
use axum::{extract::State, routing::get, Router};

/// Dashboard summary: order counts per status plus the newest orders
#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    responses(
        (status = 200, description = "Dashboard summary fetched", body = crate::ApiResponse<serde_json::Value>)
    ),
    tag = "dashboard"
)]
pub async fn get_dashboard(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let status_counts = state
        .services
        .purchase_orders
        .count_purchase_orders_by_status()
        .await
        .map_err(map_service_error)?;

    let recent_orders = state
        .services
        .purchase_orders
        .recent_purchase_orders(state.config.dashboard_recent_orders)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(serde_json::json!({
        "status_counts": status_counts,
        "recent_orders": recent_orders
    })))
}

/// Creates the router for the dashboard endpoint
pub fn dashboard_routes() -> Router<AppState> {
    Router::new().route("/", get(get_dashboard))
}
