use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "events")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub coordinator_id: Uuid,
    pub title: String,
    #[sea_orm(unique)]
    pub slug: String,
    pub description: String,
    pub venue: String,
    pub start_at: DateTimeWithTimeZone,
    pub end_at: DateTimeWithTimeZone,
    pub max_vendors: Option<i32>,
    pub categories: Json,
    pub rules: Option<String>,
    pub status: String,
    pub published_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::event_applications::Entity")]
    EventApplications,
}

impl Related<super::event_applications::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EventApplications.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
