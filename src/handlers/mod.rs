pub mod common;
pub mod dashboard;
pub mod inventory_lots;
pub mod purchase_orders;

use crate::db::DbPool;
use crate::events::EventSender;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub purchase_orders: Arc<crate::services::purchase_orders::PurchaseOrderService>,
    pub inventory_lots: Arc<crate::services::inventory_lots::InventoryLotService>,
}

impl AppServices {
    /// Build the AppServices container shared by every handler
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let purchase_orders = Arc::new(
            crate::services::purchase_orders::PurchaseOrderService::new(
                db_pool.clone(),
                event_sender,
            ),
        );
        let inventory_lots = Arc::new(crate::services::inventory_lots::InventoryLotService::new(
            db_pool,
        ));

        Self {
            purchase_orders,
            inventory_lots,
        }
    }
}

// Note: AppState is defined in lib.rs alongside the router
