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
    services::reconciliation::compute_reconciliation,
};
use lazy_static::lazy_static;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};
use sea_orm::{Set, *};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use validator::Validate;

lazy_static! {
    static ref PO_RECEIPTS: IntCounter = register_int_counter!(
        "purchase_order_receipts_total",
        "Total number of purchase orders marked received"
    )
    .expect("metric can be created");
    static ref PO_RECEIPT_FAILURES: IntCounterVec = register_int_counter_vec!(
        "purchase_order_receipt_failures_total",
        "Total number of failed purchase order receipts",
        &["error_type"]
    )
    .expect("metric can be created");
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ReceivePurchaseOrderCommand {
    pub id: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReceivePurchaseOrderResult {
    pub id: i32,
    pub unique_id: String,
    pub status: String,
}

#[async_trait::async_trait]
impl Command for ReceivePurchaseOrderCommand {
    type Result = ReceivePurchaseOrderResult;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate().map_err(|e| {
            PO_RECEIPT_FAILURES
                .with_label_values(&["validation_error"])
                .inc();
            let msg = format!("Invalid input: {}", e);
            error!("{}", msg);
            ServiceError::ValidationError(msg)
        })?;

        let db = db_pool.as_ref();

        let updated_order = self.receive_order(db).await?;

        self.log_and_trigger_event(&event_sender, &updated_order)
            .await?;

        PO_RECEIPTS.inc();

        Ok(ReceivePurchaseOrderResult {
            id: updated_order.id,
            unique_id: updated_order.unique_id,
            status: updated_order.status.to_string(),
        })
    }
}

impl ReceivePurchaseOrderCommand {
    /// Checks the status guard and the lot reconciliation, then flips the
    /// order to received, all inside one transaction so the lots cannot
    /// change between the check and the update.
    async fn receive_order(
        &self,
        db: &DatabaseConnection,
    ) -> Result<purchase_order::Model, ServiceError> {
        let order_id = self.id;

        db.transaction::<_, purchase_order::Model, ServiceError>(move |txn| {
            Box::pin(async move {
                let order = purchase_order::Entity::find_by_id(order_id)
                    .one(txn)
                    .await
                    .map_err(|e| {
                        PO_RECEIPT_FAILURES.with_label_values(&["db_error"]).inc();
                        ServiceError::db_error(e)
                    })?
                    .ok_or_else(|| {
                        PO_RECEIPT_FAILURES.with_label_values(&["not_found"]).inc();
                        ServiceError::NotFound(format!("Purchase order {} not found", order_id))
                    })?;

                if order.status != PurchaseOrderStatus::PendingReceive {
                    PO_RECEIPT_FAILURES
                        .with_label_values(&["invalid_status"])
                        .inc();
                    return Err(ServiceError::InvalidTransition(format!(
                        "Cannot receive purchase order in {} status. Must be in pending_receive status.",
                        order.status
                    )));
                }

                let items = order
                    .find_related(purchase_order_item::Entity)
                    .all(txn)
                    .await
                    .map_err(|e| {
                        PO_RECEIPT_FAILURES.with_label_values(&["db_error"]).inc();
                        ServiceError::db_error(e)
                    })?;

                let item_ids: Vec<i32> = items.iter().map(|item| item.id).collect();
                let lots = inventory_lot::Entity::find()
                    .filter(inventory_lot::Column::PurchaseOrderItemId.is_in(item_ids))
                    .all(txn)
                    .await
                    .map_err(|e| {
                        PO_RECEIPT_FAILURES.with_label_values(&["db_error"]).inc();
                        ServiceError::db_error(e)
                    })?;

                let report = compute_reconciliation(&items, &lots);

                if !report.has_any_lots {
                    PO_RECEIPT_FAILURES.with_label_values(&["no_lots"]).inc();
                    return Err(ServiceError::NoLotsRecorded);
                }

                if let Some(mismatch) = report.first_mismatch() {
                    PO_RECEIPT_FAILURES.with_label_values(&["mismatch"]).inc();
                    return Err(ServiceError::ReconciliationMismatch {
                        item_name: mismatch.item_name.clone(),
                        lot_quantity: mismatch.lot_quantity_total,
                        ordered_quantity: i64::from(mismatch.ordered_quantity),
                    });
                }

                let mut order: purchase_order::ActiveModel = order.into();
                order.status = Set(PurchaseOrderStatus::Received);

                order.update(txn).await.map_err(|e| {
                    PO_RECEIPT_FAILURES.with_label_values(&["db_error"]).inc();
                    let msg = format!("Failed to receive purchase order {}: {}", order_id, e);
                    error!("{}", msg);
                    ServiceError::db_error(e)
                })
            })
        })
        .await
        .map_err(|e| match e {
            TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
            TransactionError::Transaction(service_err) => service_err,
        })
    }

    async fn log_and_trigger_event(
        &self,
        event_sender: &EventSender,
        updated_order: &purchase_order::Model,
    ) -> Result<(), ServiceError> {
        info!(
            purchase_order_id = %updated_order.id,
            unique_id = %updated_order.unique_id,
            "Purchase order received"
        );

        event_sender
            .send(Event::PurchaseOrderReceived(updated_order.id))
            .await
            .map_err(|e| {
                PO_RECEIPT_FAILURES
                    .with_label_values(&["event_error"])
                    .inc();
                let msg = format!("Failed to send event for received purchase order: {}", e);
                error!("{}", msg);
                ServiceError::EventError(msg)
            })
    }
}
