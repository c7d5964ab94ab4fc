use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub vendor_id: Uuid,
    pub sales_window_id: Uuid,
    pub slot_id: Option<Uuid>,
    pub order_number: String,
    pub status: String,
    pub payment_status: String,
    pub fulfillment_status: String,
    pub subtotal: i64,
    pub tax: i64,
    pub delivery_fee: i64,
    pub total_amount: i64,
    pub commission_amount: i64,
    pub vendor_payout: i64,
    pub payment_reference: Option<String>,
    pub notes: Option<String>,
    pub fulfillment_notes: Option<String>,
    pub paid_at: Option<DateTimeWithTimeZone>,
    pub fulfilled_at: Option<DateTimeWithTimeZone>,
    pub cancelled_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    Users,
    #[sea_orm(
        belongs_to = "super::sales_windows::Entity",
        from = "Column::SalesWindowId",
        to = "super::sales_windows::Column::Id"
    )]
    SalesWindows,
    #[sea_orm(has_many = "super::order_items::Entity")]
    OrderItems,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::sales_windows::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SalesWindows.def()
    }
}

impl Related<super::order_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
