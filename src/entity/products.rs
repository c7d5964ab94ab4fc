use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub unit_cost: Option<i64>,
    pub target_margin: f64,
    pub stock: i32,
    pub is_available: bool,
    pub last_ai_suggestion: Option<i64>,
    pub ai_suggestion_note: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::vendor_profiles::Entity",
        from = "Column::VendorId",
        to = "super::vendor_profiles::Column::Id"
    )]
    VendorProfiles,
    #[sea_orm(has_many = "super::product_price_history::Entity")]
    PriceHistory,
    #[sea_orm(has_many = "super::sales_window_products::Entity")]
    SalesWindowProducts,
    #[sea_orm(has_many = "super::order_items::Entity")]
    OrderItems,
}

impl Related<super::vendor_profiles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VendorProfiles.def()
    }
}

impl Related<super::product_price_history::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PriceHistory.def()
    }
}

impl Related<super::sales_window_products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SalesWindowProducts.def()
    }
}

impl Related<super::order_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
