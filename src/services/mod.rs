// Core services
pub mod inventory_lots;
pub mod purchase_orders;

// Pure reconciliation engine shared by commands and read paths
pub mod reconciliation;
