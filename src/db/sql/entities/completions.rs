use sea_orm::entity::prelude::*;

/// Completion log for the scheduled background processes; operators use
/// this to detect skipped days
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "completions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub proctype: String,
    pub ts_from: DateTimeUtc,
    pub ts_to: DateTimeUtc,
    pub success: bool,
    #[sea_orm(column_type = "Text")]
    pub reason: String,
    pub timestamp: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
