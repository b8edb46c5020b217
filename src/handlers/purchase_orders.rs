use super::common::{created_response, map_service_error, success_response, validate_input};
use crate::{
    commands::purchaseorders::{
        approve_purchase_order_command::ApprovePurchaseOrderCommand,
        create_purchase_order_command::{
            CreatePurchaseOrderCommand,
            PurchaseOrderItemRequest as CommandPurchaseOrderItemRequest,
        },
        receive_purchase_order_command::ReceivePurchaseOrderCommand,
        reject_purchase_order_command::RejectPurchaseOrderCommand,
        replace_lots_command::{ItemLotsRequest as CommandItemLotsRequest, ReplaceLotsCommand},
    },
    errors::ApiError,
    handlers::AppState,
    services::reconciliation::LotCandidate,
};
use axum::{
    extract::{Json, Path, State},
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use validator::Validate;

// Request DTOs

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreatePurchaseOrderRequest {
    #[validate(length(min = 1, message = "Purchase order number is required"))]
    pub unique_id: String,
    #[validate(length(min = 1, message = "At least one item is required"))]
    pub items: Vec<PurchaseOrderItemRequest>,
}

#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct PurchaseOrderItemRequest {
    #[validate(length(min = 1, message = "Item code is required"))]
    pub item_code: String,
    #[validate(length(min = 1, message = "Item name is required"))]
    pub item_name: String,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
}

/// Replacement lot set grouped by item. Each item id may appear at most
/// once; items of the order left out of the list end up with no lots.
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct ReplaceLotsRequest {
    pub items: Vec<ItemLotsRequest>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ItemLotsRequest {
    pub item_id: i32,
    #[serde(default)]
    pub lots: Vec<LotCandidate>,
}

// Handler functions

/// Create a new purchase order
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders",
    request_body = CreatePurchaseOrderRequest,
    responses(
        (status = 201, description = "Purchase order created", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order number already exists", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn create_purchase_order(
    State(state): State<AppState>,
    Json(payload): Json<CreatePurchaseOrderRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let items = payload
        .items
        .into_iter()
        .map(|item| CommandPurchaseOrderItemRequest {
            item_code: item.item_code,
            item_name: item.item_name,
            quantity: item.quantity,
        })
        .collect();

    let command = CreatePurchaseOrderCommand {
        unique_id: payload.unique_id,
        items,
    };

    let result = state
        .services
        .purchase_orders
        .create_purchase_order(command)
        .await
        .map_err(map_service_error)?;

    info!(
        "Purchase order created: {} ({})",
        result.id, result.unique_id
    );

    Ok(created_response(serde_json::json!({
        "id": result.id,
        "unique_id": result.unique_id,
        "status": result.status,
        "create_date": result.create_date,
        "item_count": result.item_count,
        "message": "Purchase order created successfully"
    })))
}

/// List all purchase orders, newest first
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders",
    responses(
        (status = 200, description = "Purchase orders fetched", body = crate::ApiResponse<serde_json::Value>)
    ),
    tag = "purchase-orders"
)]
pub async fn list_purchase_orders(
    State(state): State<AppState>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let orders = state
        .services
        .purchase_orders
        .list_purchase_orders()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(orders))
}

/// Get a purchase order with its items, lots, and reconciliation state
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{id}",
    params(
        ("id" = i32, Path, description = "Purchase order ID")
    ),
    responses(
        (status = 200, description = "Purchase order fetched", body = crate::ApiResponse<serde_json::Value>),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn get_purchase_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let detail = state
        .services
        .purchase_orders
        .get_purchase_order_detail(id)
        .await
        .map_err(map_service_error)?
        .ok_or_else(|| ApiError::NotFound(format!("Purchase order with ID {} not found", id)))?;

    Ok(success_response(detail))
}

/// Approve a purchase order awaiting approval
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/approve",
    params(
        ("id" = i32, Path, description = "Purchase order ID")
    ),
    responses(
        (status = 200, description = "Purchase order approved", body = crate::ApiResponse<serde_json::Value>),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order is not awaiting approval", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn approve_purchase_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let command = ApprovePurchaseOrderCommand { id };

    let result = state
        .services
        .purchase_orders
        .approve_purchase_order(command)
        .await
        .map_err(map_service_error)?;

    info!(
        "Purchase order approved: {} (status: {})",
        result.id, result.status
    );

    Ok(success_response(serde_json::json!({
        "id": result.id,
        "unique_id": result.unique_id,
        "status": result.status,
        "message": "Purchase order approved"
    })))
}

/// Reject a purchase order awaiting approval
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/reject",
    params(
        ("id" = i32, Path, description = "Purchase order ID")
    ),
    responses(
        (status = 200, description = "Purchase order rejected", body = crate::ApiResponse<serde_json::Value>),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order is not awaiting approval", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn reject_purchase_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let command = RejectPurchaseOrderCommand { id };

    let result = state
        .services
        .purchase_orders
        .reject_purchase_order(command)
        .await
        .map_err(map_service_error)?;

    info!(
        "Purchase order rejected: {} (status: {})",
        result.id, result.status
    );

    Ok(success_response(serde_json::json!({
        "id": result.id,
        "unique_id": result.unique_id,
        "status": result.status,
        "message": "Purchase order rejected"
    })))
}

/// Mark a purchase order as received once its lots reconcile
#[utoipa::path(
    post,
    path = "/api/v1/purchase-orders/{id}/receive",
    params(
        ("id" = i32, Path, description = "Purchase order ID")
    ),
    responses(
        (status = 200, description = "Purchase order received", body = crate::ApiResponse<serde_json::Value>),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order is not awaiting receipt", body = crate::errors::ErrorResponse),
        (status = 422, description = "Recorded lots do not reconcile", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn receive_purchase_order(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let command = ReceivePurchaseOrderCommand { id };

    let result = state
        .services
        .purchase_orders
        .receive_purchase_order(command)
        .await
        .map_err(map_service_error)?;

    info!(
        "Purchase order received: {} (status: {})",
        result.id, result.status
    );

    Ok(success_response(serde_json::json!({
        "id": result.id,
        "unique_id": result.unique_id,
        "status": result.status,
        "message": "Purchase order received"
    })))
}

/// Get the items of a purchase order with their recorded lots
#[utoipa::path(
    get,
    path = "/api/v1/purchase-orders/{id}/lots",
    params(
        ("id" = i32, Path, description = "Purchase order ID")
    ),
    responses(
        (status = 200, description = "Purchase order lots fetched", body = crate::ApiResponse<serde_json::Value>),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn get_purchase_order_lots(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    let lots = state
        .services
        .purchase_orders
        .get_purchase_order_lots(id)
        .await
        .map_err(map_service_error)?
        .ok_or_else(|| ApiError::NotFound(format!("Purchase order with ID {} not found", id)))?;

    Ok(success_response(lots))
}

/// Replace the recorded lots of a purchase order
#[utoipa::path(
    put,
    path = "/api/v1/purchase-orders/{id}/lots",
    request_body = ReplaceLotsRequest,
    params(
        ("id" = i32, Path, description = "Purchase order ID")
    ),
    responses(
        (status = 200, description = "Lots replaced", body = crate::ApiResponse<serde_json::Value>),
        (status = 400, description = "Invalid request", body = crate::errors::ErrorResponse),
        (status = 404, description = "Purchase order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order is not awaiting receipt", body = crate::errors::ErrorResponse)
    ),
    tag = "purchase-orders"
)]
pub async fn replace_purchase_order_lots(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<ReplaceLotsRequest>,
) -> Result<impl axum::response::IntoResponse, ApiError> {
    validate_input(&payload)?;

    let lots_by_item = payload
        .items
        .into_iter()
        .map(|entry| CommandItemLotsRequest {
            item_id: entry.item_id,
            lots: entry.lots,
        })
        .collect();

    let command = ReplaceLotsCommand {
        purchase_order_id: id,
        lots_by_item,
    };

    let result = state
        .services
        .purchase_orders
        .replace_lots(command)
        .await
        .map_err(map_service_error)?;

    info!(
        "Recorded {} lots for purchase order {} ({} discarded)",
        result.lots_recorded, result.purchase_order_id, result.lots_discarded
    );

    Ok(success_response(serde_json::json!({
        "purchase_order_id": result.purchase_order_id,
        "unique_id": result.unique_id,
        "lots_recorded": result.lots_recorded,
        "lots_discarded": result.lots_discarded,
        "reconciliation": result.reconciliation,
        "message": "Inventory lots replaced"
    })))
}

/// Creates the router for purchase order endpoints
pub fn purchase_order_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(create_purchase_order))
        .route("/", get(list_purchase_orders))
        .route("/:id", get(get_purchase_order))
        .route("/:id/approve", post(approve_purchase_order))
        .route("/:id/reject", post(reject_purchase_order))
        .route("/:id/receive", post(receive_purchase_order))
        .route("/:id/lots", get(get_purchase_order_lots))
        .route("/:id/lots", put(replace_purchase_order_lots))
}
