use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "challenges")]
pub struct Model {
    /// Opaque challenge key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub src_user_id: String,
    pub dest_user_id: String,
    /// The proposed game options
    pub prefs: Json,
    pub timestamp: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
