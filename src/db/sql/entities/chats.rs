use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "chats")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// "game:<uuid>" or "user:<a>:<b>" with a < b
    pub channel: String,
    pub user_id: String,
    pub recipient_id: Option<String>,
    /// Empty message = read marker
    #[sea_orm(column_type = "Text")]
    pub msg: String,
    pub timestamp: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
