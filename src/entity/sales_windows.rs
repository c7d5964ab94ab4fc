use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sales_windows")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub vendor_id: Uuid,
    pub window_type: String,
    pub name: String,
    pub description: Option<String>,
    pub status: String,
    pub location_name: Option<String>,
    pub address_text: Option<String>,
    pub epicenter_address: Option<String>,
    pub radius_miles: Option<f64>,
    pub delivery_fee_mode: String,
    pub delivery_fee_cents: Option<i64>,
    pub free_over_cents: Option<i64>,
    pub preorder_open_at: Option<DateTimeWithTimeZone>,
    pub preorder_close_at: Option<DateTimeWithTimeZone>,
    pub fulfill_start_at: Option<DateTimeWithTimeZone>,
    pub fulfill_end_at: Option<DateTimeWithTimeZone>,
    pub is_always_on: bool,
    pub capacity_total: Option<i32>,
    pub max_items_total: Option<i32>,
    pub auto_close_when_full: bool,
    pub pickup_instructions: Option<String>,
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
    #[sea_orm(has_many = "super::sales_window_products::Entity")]
    SalesWindowProducts,
    #[sea_orm(has_many = "super::sales_window_slots::Entity")]
    SalesWindowSlots,
    #[sea_orm(has_one = "super::sales_window_metrics::Entity")]
    SalesWindowMetrics,
}

impl Related<super::vendor_profiles::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::VendorProfiles.def()
    }
}

impl Related<super::sales_window_products::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SalesWindowProducts.def()
    }
}

impl Related<super::sales_window_slots::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SalesWindowSlots.def()
    }
}

impl Related<super::sales_window_metrics::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SalesWindowMetrics.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
