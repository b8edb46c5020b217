pub mod approve_purchase_order_command;
pub mod create_purchase_order_command;
pub mod receive_purchase_order_command;
pub mod reject_purchase_order_command;
pub mod replace_lots_command;

// Re-export commands for easier access
pub use approve_purchase_order_command::ApprovePurchaseOrderCommand;
pub use create_purchase_order_command::CreatePurchaseOrderCommand;
pub use receive_purchase_order_command::ReceivePurchaseOrderCommand;
pub use reject_purchase_order_command::RejectPurchaseOrderCommand;
pub use replace_lots_command::ReplaceLotsCommand;
