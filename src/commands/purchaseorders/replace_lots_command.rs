use crate::{
    commands::Command,
    db::DbPool,
    entities::{
        inventory_lot,
        purchase_order::{self, PurchaseOrderStatus},
        purchase_order_item,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::reconciliation::{
        compute_reconciliation, filter_candidate_lots, LotCandidate, OrderReconciliation,
    },
};
use lazy_static::lazy_static;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};
use sea_orm::{Set, *};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, instrument};
use validator::{Validate, ValidationError};

lazy_static! {
    static ref LOT_REPLACEMENTS: IntCounter = register_int_counter!(
        "inventory_lot_replacements_total",
        "Total number of inventory lot replacements"
    )
    .expect("metric can be created");
    static ref LOT_REPLACEMENT_FAILURES: IntCounterVec = register_int_counter_vec!(
        "inventory_lot_replacement_failures_total",
        "Total number of failed inventory lot replacements",
        &["error_type"]
    )
    .expect("metric can be created");
}

fn no_duplicate_items(entries: &[ItemLotsRequest]) -> Result<(), ValidationError> {
    let mut seen = HashSet::new();
    for entry in entries {
        if !seen.insert(entry.item_id) {
            let mut err = ValidationError::new("duplicate_item");
            err.message = Some(
                format!(
                    "Item {} appears more than once in the lots payload",
                    entry.item_id
                )
                .into(),
            );
            return Err(err);
        }
    }
    Ok(())
}

/// Wholesale replacement of the recorded lots for one purchase order.
///
/// Candidates with a blank lot number or a non-positive quantity are
/// silently dropped, never persisted. Items of the order that are absent
/// from `lots_by_item` end up with no lots. Each item may appear at most
/// once; duplicate item ids are rejected rather than merged.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReplaceLotsCommand {
    pub purchase_order_id: i32,
    #[validate(custom = "no_duplicate_items")]
    pub lots_by_item: Vec<ItemLotsRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemLotsRequest {
    pub item_id: i32,
    pub lots: Vec<LotCandidate>,
}

#[derive(Debug, Serialize)]
pub struct ReplaceLotsResult {
    pub purchase_order_id: i32,
    pub unique_id: String,
    /// Lots persisted after filtering
    pub lots_recorded: usize,
    /// Submitted candidates dropped by filtering
    pub lots_discarded: usize,
    pub reconciliation: OrderReconciliation,
}

#[async_trait::async_trait]
impl Command for ReplaceLotsCommand {
    type Result = ReplaceLotsResult;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate().map_err(|e| {
            LOT_REPLACEMENT_FAILURES
                .with_label_values(&["validation_error"])
                .inc();
            let msg = format!("Invalid input: {}", e);
            error!("{}", msg);
            ServiceError::ValidationError(msg)
        })?;

        let db = db_pool.as_ref();

        let (order, reconciliation, recorded, discarded) = self.replace_lots(db).await?;

        self.log_and_trigger_event(&event_sender, &order, recorded)
            .await?;

        LOT_REPLACEMENTS.inc();

        Ok(ReplaceLotsResult {
            purchase_order_id: order.id,
            unique_id: order.unique_id,
            lots_recorded: recorded,
            lots_discarded: discarded,
            reconciliation,
        })
    }
}

impl ReplaceLotsCommand {
    async fn replace_lots(
        &self,
        db: &DatabaseConnection,
    ) -> Result<(purchase_order::Model, OrderReconciliation, usize, usize), ServiceError> {
        let order_id = self.purchase_order_id;
        let entries = self.lots_by_item.clone();

        db.transaction::<_, (purchase_order::Model, OrderReconciliation, usize, usize), ServiceError>(
            move |txn| {
                Box::pin(async move {
                    let order = purchase_order::Entity::find_by_id(order_id)
                        .one(txn)
                        .await
                        .map_err(|e| {
                            LOT_REPLACEMENT_FAILURES
                                .with_label_values(&["db_error"])
                                .inc();
                            ServiceError::db_error(e)
                        })?
                        .ok_or_else(|| {
                            LOT_REPLACEMENT_FAILURES
                                .with_label_values(&["not_found"])
                                .inc();
                            ServiceError::NotFound(format!(
                                "Purchase order {} not found",
                                order_id
                            ))
                        })?;

                    // Lots are only recorded while the order awaits receiving.
                    if order.status != PurchaseOrderStatus::PendingReceive {
                        LOT_REPLACEMENT_FAILURES
                            .with_label_values(&["invalid_status"])
                            .inc();
                        return Err(ServiceError::InvalidTransition(format!(
                            "Cannot record lots for purchase order in {} status. Must be in pending_receive status.",
                            order.status
                        )));
                    }

                    let items = order
                        .find_related(purchase_order_item::Entity)
                        .all(txn)
                        .await
                        .map_err(|e| {
                            LOT_REPLACEMENT_FAILURES
                                .with_label_values(&["db_error"])
                                .inc();
                            ServiceError::db_error(e)
                        })?;

                    let known_ids: HashSet<i32> = items.iter().map(|item| item.id).collect();
                    for entry in &entries {
                        if !known_ids.contains(&entry.item_id) {
                            LOT_REPLACEMENT_FAILURES
                                .with_label_values(&["unknown_item"])
                                .inc();
                            return Err(ServiceError::ValidationError(format!(
                                "Item {} does not belong to purchase order {}",
                                entry.item_id, order_id
                            )));
                        }
                    }

                    let item_ids: Vec<i32> = items.iter().map(|item| item.id).collect();

                    // Wholesale replace: clear every item's lots, including
                    // items not mentioned in this request.
                    inventory_lot::Entity::delete_many()
                        .filter(inventory_lot::Column::PurchaseOrderItemId.is_in(item_ids.clone()))
                        .exec(txn)
                        .await
                        .map_err(|e| {
                            LOT_REPLACEMENT_FAILURES
                                .with_label_values(&["db_error"])
                                .inc();
                            ServiceError::db_error(e)
                        })?;

                    let mut recorded = 0usize;
                    let mut discarded = 0usize;
                    for entry in entries {
                        let submitted = entry.lots.len();
                        let survivors = filter_candidate_lots(entry.lots);
                        discarded += submitted - survivors.len();

                        for lot in survivors {
                            let new_lot = inventory_lot::ActiveModel {
                                purchase_order_item_id: Set(entry.item_id),
                                lot_number: Set(lot.lot_number),
                                quantity: Set(lot.quantity),
                                ..Default::default()
                            };
                            new_lot.insert(txn).await.map_err(|e| {
                                LOT_REPLACEMENT_FAILURES
                                    .with_label_values(&["db_error"])
                                    .inc();
                                let msg = format!(
                                    "Failed to record lot for item {} of purchase order {}: {}",
                                    entry.item_id, order_id, e
                                );
                                error!("{}", msg);
                                ServiceError::db_error(e)
                            })?;
                            recorded += 1;
                        }
                    }

                    let lots = inventory_lot::Entity::find()
                        .filter(inventory_lot::Column::PurchaseOrderItemId.is_in(item_ids))
                        .all(txn)
                        .await
                        .map_err(|e| {
                            LOT_REPLACEMENT_FAILURES
                                .with_label_values(&["db_error"])
                                .inc();
                            ServiceError::db_error(e)
                        })?;
                    let reconciliation = compute_reconciliation(&items, &lots);

                    Ok((order, reconciliation, recorded, discarded))
                })
            },
        )
        .await
        .map_err(|e| match e {
            TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
            TransactionError::Transaction(service_err) => service_err,
        })
    }

    async fn log_and_trigger_event(
        &self,
        event_sender: &EventSender,
        order: &purchase_order::Model,
        recorded: usize,
    ) -> Result<(), ServiceError> {
        info!(
            purchase_order_id = %order.id,
            unique_id = %order.unique_id,
            lot_count = %recorded,
            "Inventory lots replaced"
        );

        event_sender
            .send(Event::InventoryLotsReplaced {
                purchase_order_id: order.id,
                lot_count: recorded,
            })
            .await
            .map_err(|e| {
                LOT_REPLACEMENT_FAILURES
                    .with_label_values(&["event_error"])
                    .inc();
                let msg = format!("Failed to send event for replaced lots: {}", e);
                error!("{}", msg);
                ServiceError::EventError(msg)
            })
    }
}
