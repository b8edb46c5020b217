pub mod inventory_lot;
pub mod purchase_order;
pub mod purchase_order_item;
