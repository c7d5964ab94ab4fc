use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sales_window_slots")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub sales_window_id: Uuid,
    pub starts_at: DateTimeWithTimeZone,
    pub ends_at: DateTimeWithTimeZone,
    pub capacity: i32,
    pub reserved: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sales_windows::Entity",
        from = "Column::SalesWindowId",
        to = "super::sales_windows::Column::Id"
    )]
    SalesWindows,
}

impl Related<super::sales_windows::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SalesWindows.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
