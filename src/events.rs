use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

// Define the various events that can occur in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Purchase order lifecycle events
    PurchaseOrderCreated(i32),
    PurchaseOrderApproved(i32),
    PurchaseOrderRejected(i32),
    PurchaseOrderReceived(i32),

    // Inventory lot events
    InventoryLotsReplaced {
        purchase_order_id: i32,
        lot_count: usize,
    },
}

// Function to process incoming events. The loop runs until every sender
// handle has been dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        info!("Received event: {:?}", event);

        match event {
            Event::PurchaseOrderReceived(purchase_order_id) => {
                if let Err(e) = handle_purchase_order_received(purchase_order_id).await {
                    tracing::error!(
                        "Failed to handle purchase order received event: purchase_order_id={}, error={}",
                        purchase_order_id,
                        e
                    );
                }
            }
            Event::InventoryLotsReplaced {
                purchase_order_id,
                lot_count,
            } => {
                info!(
                    "Inventory lots replaced: purchase_order_id={}, lot_count={}",
                    purchase_order_id, lot_count
                );
            }
            _ => {
                info!("No specific handler for event: {:?}", event);
            }
        }
    }

    warn!("Event processing loop has ended");
}

// Handler functions for specific events
async fn handle_purchase_order_received(purchase_order_id: i32) -> Result<(), String> {
    // Receiving completes the workflow; downstream systems (putaway,
    // accounting) would be notified from here.
    info!(
        "Processing received event for purchase order {}",
        purchase_order_id
    );

    Ok(())
}
