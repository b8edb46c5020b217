use crate::{
    commands::Command,
    db::DbPool,
    entities::purchase_order::{self, PurchaseOrderStatus},
    errors::ServiceError,
    events::{Event, EventSender},
};
use lazy_static::lazy_static;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};
use sea_orm::{Set, *};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use validator::Validate;

lazy_static! {
    static ref PO_APPROVALS: IntCounter = register_int_counter!(
        "purchase_order_approvals_total",
        "Total number of purchase orders approved"
    )
    .expect("metric can be created");
    static ref PO_APPROVAL_FAILURES: IntCounterVec = register_int_counter_vec!(
        "purchase_order_approval_failures_total",
        "Total number of failed purchase order approvals",
        &["error_type"]
    )
    .expect("metric can be created");
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ApprovePurchaseOrderCommand {
    pub id: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApprovePurchaseOrderResult {
    pub id: i32,
    pub unique_id: String,
    pub status: String,
}

#[async_trait::async_trait]
impl Command for ApprovePurchaseOrderCommand {
    type Result = ApprovePurchaseOrderResult;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate().map_err(|e| {
            PO_APPROVAL_FAILURES
                .with_label_values(&["validation_error"])
                .inc();
            let msg = format!("Invalid input: {}", e);
            error!("{}", msg);
            ServiceError::ValidationError(msg)
        })?;

        let db = db_pool.as_ref();

        let updated_order = self.approve_order(db).await?;

        self.log_and_trigger_event(&event_sender, &updated_order)
            .await?;

        PO_APPROVALS.inc();

        Ok(ApprovePurchaseOrderResult {
            id: updated_order.id,
            unique_id: updated_order.unique_id,
            status: updated_order.status.to_string(),
        })
    }
}

impl ApprovePurchaseOrderCommand {
    /// Checks the status guard and flips the order to pending_receive
    /// inside one transaction, so two racing approvals cannot both pass
    /// the guard.
    async fn approve_order(
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
                        PO_APPROVAL_FAILURES.with_label_values(&["db_error"]).inc();
                        ServiceError::db_error(e)
                    })?
                    .ok_or_else(|| {
                        PO_APPROVAL_FAILURES.with_label_values(&["not_found"]).inc();
                        ServiceError::NotFound(format!("Purchase order {} not found", order_id))
                    })?;

                if order.status != PurchaseOrderStatus::PendingApproval {
                    PO_APPROVAL_FAILURES
                        .with_label_values(&["invalid_status"])
                        .inc();
                    return Err(ServiceError::InvalidTransition(format!(
                        "Cannot approve purchase order in {} status. Must be in pending_approval status.",
                        order.status
                    )));
                }

                let mut order: purchase_order::ActiveModel = order.into();
                order.status = Set(PurchaseOrderStatus::PendingReceive);

                order.update(txn).await.map_err(|e| {
                    PO_APPROVAL_FAILURES.with_label_values(&["db_error"]).inc();
                    let msg = format!("Failed to approve purchase order {}: {}", order_id, e);
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
            "Purchase order approved"
        );

        event_sender
            .send(Event::PurchaseOrderApproved(updated_order.id))
            .await
            .map_err(|e| {
                PO_APPROVAL_FAILURES
                    .with_label_values(&["event_error"])
                    .inc();
                let msg = format!("Failed to send event for approved purchase order: {}", e);
                error!("{}", msg);
                ServiceError::EventError(msg)
            })
    }
}
