use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// The `inventory_lots` table. Lot numbers recorded against a purchase
/// order line item during receiving. Lot numbers are not unique; the same
/// lot can arrive against several items or orders.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "inventory_lots")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub purchase_order_item_id: i32,
    pub lot_number: String,
    /// Quantity received under this lot, always positive.
    pub quantity: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::purchase_order_item::Entity",
        from = "Column::PurchaseOrderItemId",
        to = "super::purchase_order_item::Column::Id",
        on_delete = "Cascade"
    )]
    PurchaseOrderItem,
}

impl Related<super::purchase_order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PurchaseOrderItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
