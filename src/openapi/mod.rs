use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Stockroom API",
        version = "1.0.0",
        description = r#"
# Stockroom Purchase Order API

An API for tracking purchase orders from creation through approval to
receipt, with per-item inventory lot recording and reconciliation.

## Lifecycle

Orders are created in `pending_approval`. Approval moves them to
`pending_receive`, rejection to `rejected`. While an order is in
`pending_receive`, inventory lots can be recorded against its items;
the order can be marked `received` only once the recorded lot
quantities reconcile exactly with the ordered quantities.

## Error Handling

Errors use a consistent JSON shape with appropriate HTTP status codes:

```json
{
  "error": "Conflict",
  "message": "Cannot approve purchase order in received status. Must be in pending_approval status.",
  "request_id": "req-abc123xyz",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "purchase-orders", description = "Purchase order lifecycle and lot recording"),
        (name = "inventory-lots", description = "Recorded inventory lot listing"),
        (name = "dashboard", description = "Status counts and recent orders")
    ),
    paths(
        // Purchase orders
        crate::handlers::purchase_orders::create_purchase_order,
        crate::handlers::purchase_orders::list_purchase_orders,
        crate::handlers::purchase_orders::get_purchase_order,
        crate::handlers::purchase_orders::approve_purchase_order,
        crate::handlers::purchase_orders::reject_purchase_order,
        crate::handlers::purchase_orders::receive_purchase_order,
        crate::handlers::purchase_orders::get_purchase_order_lots,
        crate::handlers::purchase_orders::replace_purchase_order_lots,

        // Inventory lots
        crate::handlers::inventory_lots::list_inventory_lots,

        // Dashboard
        crate::handlers::dashboard::get_dashboard,
    ),
    components(
        schemas(
            // Common types
            crate::ApiResponse<serde_json::Value>,

            // Purchase order types
            crate::handlers::purchase_orders::CreatePurchaseOrderRequest,
            crate::handlers::purchase_orders::PurchaseOrderItemRequest,
            crate::handlers::purchase_orders::ReplaceLotsRequest,
            crate::handlers::purchase_orders::ItemLotsRequest,
            crate::entities::purchase_order::PurchaseOrderStatus,
            crate::services::purchase_orders::PurchaseOrderDetail,
            crate::services::purchase_orders::PurchaseOrderLots,
            crate::services::purchase_orders::StatusCounts,

            // Reconciliation types
            crate::services::reconciliation::LotCandidate,
            crate::services::reconciliation::LotSummary,
            crate::services::reconciliation::ItemReconciliation,
            crate::services::reconciliation::OrderReconciliation,

            // Inventory lot types
            crate::services::inventory_lots::InventoryLotRow,
            crate::services::inventory_lots::InventoryLotSummary,
            crate::services::inventory_lots::InventoryLotListing,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
