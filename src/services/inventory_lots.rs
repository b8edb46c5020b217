use crate::db::DbPool;
use crate::entities::{
    inventory_lot,
    purchase_order::{self, PurchaseOrderStatus},
    purchase_order_item,
};
use crate::errors::ServiceError;
use chrono::{DateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::instrument;
use utoipa::ToSchema;

/// One recorded lot joined with its item and purchase order.
#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryLotRow {
    pub lot_id: i32,
    pub lot_number: String,
    pub quantity: i32,
    pub item_code: String,
    pub item_name: String,
    pub purchase_order_id: i32,
    pub purchase_order_unique_id: String,
    pub purchase_order_status: PurchaseOrderStatus,
    pub order_create_date: DateTime<Utc>,
}

/// Aggregate figures across every recorded lot.
#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryLotSummary {
    pub total_lots: usize,
    pub total_quantity: i64,
    pub distinct_item_codes: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InventoryLotListing {
    pub lots: Vec<InventoryLotRow>,
    pub summary: InventoryLotSummary,
}

/// Read-side service over recorded inventory lots
#[derive(Clone)]
pub struct InventoryLotService {
    db_pool: Arc<DbPool>,
}

impl InventoryLotService {
    /// Creates a new inventory lot service instance
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Lists every recorded lot with its item and order context, newest orders
    /// first and lot numbers ascending within an order
    #[instrument(skip(self))]
    pub async fn list_inventory_lots(&self) -> Result<InventoryLotListing, ServiceError> {
        let db = &*self.db_pool;

        let items_with_lots = purchase_order_item::Entity::find()
            .find_with_related(inventory_lot::Entity)
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?;

        let order_ids: Vec<i32> = items_with_lots
            .iter()
            .filter(|(_, lots)| !lots.is_empty())
            .map(|(item, _)| item.purchase_order_id)
            .collect();
        let orders_by_id: HashMap<i32, purchase_order::Model> = purchase_order::Entity::find()
            .filter(purchase_order::Column::Id.is_in(order_ids))
            .all(db)
            .await
            .map_err(ServiceError::DatabaseError)?
            .into_iter()
            .map(|order| (order.id, order))
            .collect();

        let mut rows = Vec::new();
        for (item, lots) in items_with_lots {
            let order = match orders_by_id.get(&item.purchase_order_id) {
                Some(order) => order,
                None => continue,
            };
            for lot in lots {
                rows.push(InventoryLotRow {
                    lot_id: lot.id,
                    lot_number: lot.lot_number,
                    quantity: lot.quantity,
                    item_code: item.item_code.clone(),
                    item_name: item.item_name.clone(),
                    purchase_order_id: order.id,
                    purchase_order_unique_id: order.unique_id.clone(),
                    purchase_order_status: order.status,
                    order_create_date: order.create_date,
                });
            }
        }

        rows.sort_by(|a, b| {
            b.order_create_date
                .cmp(&a.order_create_date)
                .then_with(|| b.purchase_order_id.cmp(&a.purchase_order_id))
                .then_with(|| a.lot_number.cmp(&b.lot_number))
        });

        let total_quantity: i64 = rows.iter().map(|row| i64::from(row.quantity)).sum();
        let distinct_item_codes = rows
            .iter()
            .map(|row| row.item_code.as_str())
            .collect::<HashSet<_>>()
            .len();
        let summary = InventoryLotSummary {
            total_lots: rows.len(),
            total_quantity,
            distinct_item_codes,
        };

        Ok(InventoryLotListing {
            lots: rows,
            summary,
        })
    }
}
