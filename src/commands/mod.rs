use crate::{db::DbPool, errors::ServiceError, events::EventSender};
use async_trait::async_trait;
use std::sync::Arc;

/// A single write-side business operation.
///
/// Each command validates its input, mutates state inside a transaction
/// where more than one row is touched, publishes a domain event, and
/// records its outcome in the Prometheus counters it owns.
#[async_trait]
pub trait Command: Send + Sync {
    /// Value produced on successful execution
    type Result;

    async fn execute(
        &self,
        db_pool: Arc<DbPool>,
        event_sender: Arc<EventSender>,
    ) -> Result<Self::Result, ServiceError>;
}

pub mod purchaseorders;
