use crate::{
    commands::Command,
    db::DbPool,
    entities::{
        purchase_order::{self, PurchaseOrderStatus},
        purchase_order_item,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};
use sea_orm::{Set, *};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument};
use validator::{Validate, ValidationError};

lazy_static! {
    static ref PO_CREATIONS: IntCounter = register_int_counter!(
        "purchase_order_creations_total",
        "Total number of purchase orders created"
    )
    .expect("metric can be created");
    static ref PO_CREATION_FAILURES: IntCounterVec = register_int_counter_vec!(
        "purchase_order_creation_failures_total",
        "Total number of failed purchase order creations",
        &["error_type"]
    )
    .expect("metric can be created");
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePurchaseOrderCommand {
    #[validate(custom = "validate_required_text")]
    pub unique_id: String,
    #[validate(
        length(min = 1, message = "At least one item is required"),
        custom = "validate_items"
    )]
    pub items: Vec<PurchaseOrderItemRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PurchaseOrderItemRequest {
    #[validate(custom = "validate_required_text")]
    pub item_code: String,
    #[validate(custom = "validate_required_text")]
    pub item_name: String,
    #[validate(range(min = 1, message = "Quantity must be positive"))]
    pub quantity: i32,
}

fn validate_required_text(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

fn validate_items(items: &[PurchaseOrderItemRequest]) -> Result<(), ValidationError> {
    for item in items {
        if item.item_code.trim().is_empty() {
            return Err(ValidationError::new("item_code_required"));
        }
        if item.item_name.trim().is_empty() {
            return Err(ValidationError::new("item_name_required"));
        }
        if item.quantity < 1 {
            return Err(ValidationError::new("item_quantity_must_be_positive"));
        }
    }
    Ok(())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreatePurchaseOrderResult {
    pub id: i32,
    pub unique_id: String,
    pub status: String,
    pub create_date: DateTime<Utc>,
    pub item_count: usize,
}

#[async_trait::async_trait]
impl Command for CreatePurchaseOrderCommand {
    type Result = CreatePurchaseOrderResult;

    #[instrument(skip(self, db_pool, event_sender))]
    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError> {
        self.validate().map_err(|e| {
            PO_CREATION_FAILURES
                .with_label_values(&["validation_error"])
                .inc();
            let msg = format!("Invalid input: {}", e);
            error!("{}", msg);
            ServiceError::ValidationError(msg)
        })?;

        let db = db_pool.as_ref();

        let saved_order = self.insert_order(db).await?;

        self.log_and_trigger_event(&event_sender, &saved_order)
            .await?;

        PO_CREATIONS.inc();

        Ok(CreatePurchaseOrderResult {
            id: saved_order.id,
            unique_id: saved_order.unique_id,
            status: saved_order.status.to_string(),
            create_date: saved_order.create_date,
            item_count: self.items.len(),
        })
    }
}

impl CreatePurchaseOrderCommand {
    async fn insert_order(
        &self,
        db: &DatabaseConnection,
    ) -> Result<purchase_order::Model, ServiceError> {
        let unique_id = self.unique_id.trim().to_string();
        let items = self.items.clone();

        db.transaction::<_, purchase_order::Model, ServiceError>(move |txn| {
            Box::pin(async move {
                let existing = purchase_order::Entity::find()
                    .filter(purchase_order::Column::UniqueId.eq(unique_id.clone()))
                    .one(txn)
                    .await
                    .map_err(|e| {
                        PO_CREATION_FAILURES.with_label_values(&["db_error"]).inc();
                        ServiceError::db_error(e)
                    })?;
                if existing.is_some() {
                    PO_CREATION_FAILURES.with_label_values(&["conflict"]).inc();
                    return Err(ServiceError::Conflict(format!(
                        "Purchase order {} already exists",
                        unique_id
                    )));
                }

                let new_order = purchase_order::ActiveModel {
                    unique_id: Set(unique_id.clone()),
                    create_date: Set(Utc::now()),
                    status: Set(PurchaseOrderStatus::PendingApproval),
                    ..Default::default()
                };

                // The unique index backs up the pre-check for inserts that
                // race between the check and this statement.
                let saved_order = new_order.insert(txn).await.map_err(|e| {
                    if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                        PO_CREATION_FAILURES.with_label_values(&["conflict"]).inc();
                        return ServiceError::Conflict(format!(
                            "Purchase order {} already exists",
                            unique_id
                        ));
                    }
                    PO_CREATION_FAILURES.with_label_values(&["db_error"]).inc();
                    let msg = format!("Failed to create purchase order {}: {}", unique_id, e);
                    error!("{}", msg);
                    ServiceError::db_error(e)
                })?;

                for item in &items {
                    let new_item = purchase_order_item::ActiveModel {
                        purchase_order_id: Set(saved_order.id),
                        item_code: Set(item.item_code.trim().to_string()),
                        item_name: Set(item.item_name.trim().to_string()),
                        quantity: Set(item.quantity),
                        ..Default::default()
                    };
                    new_item.insert(txn).await.map_err(|e| {
                        PO_CREATION_FAILURES.with_label_values(&["db_error"]).inc();
                        let msg = format!(
                            "Failed to create item {} for purchase order {}: {}",
                            item.item_code, saved_order.unique_id, e
                        );
                        error!("{}", msg);
                        ServiceError::db_error(e)
                    })?;
                }

                Ok(saved_order)
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
        saved_order: &purchase_order::Model,
    ) -> Result<(), ServiceError> {
        info!(
            purchase_order_id = %saved_order.id,
            unique_id = %saved_order.unique_id,
            item_count = %self.items.len(),
            "Purchase order created"
        );

        event_sender
            .send(Event::PurchaseOrderCreated(saved_order.id))
            .await
            .map_err(|e| {
                PO_CREATION_FAILURES
                    .with_label_values(&["event_error"])
                    .inc();
                let msg = format!("Failed to send event for created purchase order: {}", e);
                error!("{}", msg);
                ServiceError::EventError(msg)
            })
    }
}
