use crate::commands::purchaseorders::{
    approve_purchase_order_command::{ApprovePurchaseOrderCommand, ApprovePurchaseOrderResult},
    create_purchase_order_command::{CreatePurchaseOrderCommand, CreatePurchaseOrderResult},
    receive_purchase_order_command::{ReceivePurchaseOrderCommand, ReceivePurchaseOrderResult},
    reject_purchase_order_command::{RejectPurchaseOrderCommand, RejectPurchaseOrderResult},
    replace_lots_command::{ReplaceLotsCommand, ReplaceLotsResult},
};
use crate::commands::Command;
use crate::db::DbPool;
use crate::entities::{
    inventory_lot,
    purchase_order::{self, PurchaseOrderStatus},
    purchase_order_item,
};
use crate::errors::ServiceError;
use crate::events::EventSender;
use crate::services::reconciliation::{
    compute_reconciliation, ItemReconciliation, OrderReconciliation,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

/// One purchase order with its items, lots, and reconciliation state.
#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseOrderDetail {
    pub id: i32,
    pub unique_id: String,
    pub status: PurchaseOrderStatus,
    pub create_date: DateTime<Utc>,
    pub items: Vec<ItemReconciliation>,
    pub all_match: bool,
    pub has_any_lots: bool,
}

/// Items of one order with their recorded lots, for the lot entry flow.
#[derive(Debug, Serialize, ToSchema)]
pub struct PurchaseOrderLots {
    pub purchase_order_id: i32,
    pub unique_id: String,
    pub status: PurchaseOrderStatus,
    pub items: Vec<ItemReconciliation>,
}

/// Order counts per status. Always carries all four statuses, zero-filled.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct StatusCounts {
    pub pending_approval: u64,
    pub pending_receive: u64,
    pub received: u64,
    pub rejected: u64,
}

/// Service for the purchase order lifecycle
#[derive(Clone)]
pub struct PurchaseOrderService {
    db_pool: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl PurchaseOrderService {
    /// Creates a new purchase order service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Creates a new purchase order with its line items
    #[instrument(skip(self))]
    pub async fn create_purchase_order(
        &self,
        command: CreatePurchaseOrderCommand,
    ) -> Result<CreatePurchaseOrderResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    /// Approves a pending purchase order
    #[instrument(skip(self))]
    pub async fn approve_purchase_order(
        &self,
        command: ApprovePurchaseOrderCommand,
    ) -> Result<ApprovePurchaseOrderResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    /// Rejects a pending purchase order
    #[instrument(skip(self))]
    pub async fn reject_purchase_order(
        &self,
        command: RejectPurchaseOrderCommand,
    ) -> Result<RejectPurchaseOrderResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    /// Marks a purchase order as received once its lots reconcile
    #[instrument(skip(self))]
    pub async fn receive_purchase_order(
        &self,
        command: ReceivePurchaseOrderCommand,
    ) -> Result<ReceivePurchaseOrderResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    /// Replaces the recorded lots of a purchase order wholesale
    #[instrument(skip(self))]
    pub async fn replace_lots(
        &self,
        command: ReplaceLotsCommand,
    ) -> Result<ReplaceLotsResult, ServiceError> {
        command
            .execute(self.db_pool.clone(), self.event_sender.clone())
            .await
    }

    /// Gets a purchase order by ID
    #[instrument(skip(self))]
    pub async fn get_purchase_order(
        &self,
        id: i32,
    ) -> Result<Option<purchase_order::Model>, ServiceError> {
        let db = &*self.db_pool;
        purchase_order::Entity::find_by_id(id)
            .one(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Gets a purchase order together with items, lots, and reconciliation
    #[instrument(skip(self))]
    pub async fn get_purchase_order_detail(
        &self,
        id: i32,
    ) -> Result<Option<PurchaseOrderDetail>, ServiceError> {
        let order = match self.get_purchase_order(id).await? {
            Some(order) => order,
            None => return Ok(None),
        };

        let reconciliation = self.load_reconciliation(&order).await?;

        Ok(Some(PurchaseOrderDetail {
            id: order.id,
            unique_id: order.unique_id,
            status: order.status,
            create_date: order.create_date,
            items: reconciliation.items,
            all_match: reconciliation.all_match,
            has_any_lots: reconciliation.has_any_lots,
        }))
    }

    /// Gets the items of a purchase order with their current lots
    #[instrument(skip(self))]
    pub async fn get_purchase_order_lots(
        &self,
        id: i32,
    ) -> Result<Option<PurchaseOrderLots>, ServiceError> {
        let order = match self.get_purchase_order(id).await? {
            Some(order) => order,
            None => return Ok(None),
        };

        let reconciliation = self.load_reconciliation(&order).await?;

        Ok(Some(PurchaseOrderLots {
            purchase_order_id: order.id,
            unique_id: order.unique_id,
            status: order.status,
            items: reconciliation.items,
        }))
    }

    /// Lists all purchase orders, newest first
    #[instrument(skip(self))]
    pub async fn list_purchase_orders(&self) -> Result<Vec<purchase_order::Model>, ServiceError> {
        let db = &*self.db_pool;
        purchase_order::Entity::find()
            .order_by_desc(purchase_order::Column::CreateDate)
            .order_by_desc(purchase_order::Column::Id)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Lists the newest purchase orders for the dashboard
    #[instrument(skip(self))]
    pub async fn recent_purchase_orders(
        &self,
        limit: u64,
    ) -> Result<Vec<purchase_order::Model>, ServiceError> {
        let db = &*self.db_pool;
        purchase_order::Entity::find()
            .order_by_desc(purchase_order::Column::CreateDate)
            .order_by_desc(purchase_order::Column::Id)
            .limit(limit)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Counts purchase orders per status
    #[instrument(skip(self))]
    pub async fn count_purchase_orders_by_status(&self) -> Result<StatusCounts, ServiceError> {
        let db = &*self.db_pool;
        Ok(StatusCounts {
            pending_approval: count_status(db, PurchaseOrderStatus::PendingApproval).await?,
            pending_receive: count_status(db, PurchaseOrderStatus::PendingReceive).await?,
            received: count_status(db, PurchaseOrderStatus::Received).await?,
            rejected: count_status(db, PurchaseOrderStatus::Rejected).await?,
        })
    }

    async fn load_reconciliation(
        &self,
        order: &purchase_order::Model,
    ) -> Result<OrderReconciliation, ServiceError> {
        let db = &*self.db_pool;

        let items = order
            .find_related(purchase_order_item::Entity)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let item_ids: Vec<i32> = items.iter().map(|item| item.id).collect();
        let lots = inventory_lot::Entity::find()
            .filter(inventory_lot::Column::PurchaseOrderItemId.is_in(item_ids))
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        Ok(compute_reconciliation(&items, &lots))
    }
}

async fn count_status(
    db: &DatabaseConnection,
    status: PurchaseOrderStatus,
) -> Result<u64, ServiceError> {
    purchase_order::Entity::find()
        .filter(purchase_order::Column::Status.eq(status))
        .count(db)
        .await
        .map_err(ServiceError::DatabaseError)
}
