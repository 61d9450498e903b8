use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "stats")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Null for robot snapshots
    pub user_id: Option<String>,
    pub robot_level: i32,
    pub timestamp: DateTimeUtc,
    pub games: i32,
    pub human_games: i32,
    pub manual_games: i32,
    pub elo: i32,
    pub human_elo: i32,
    pub manual_elo: i32,
    pub score: i32,
    pub human_score: i32,
    pub manual_score: i32,
    pub score_against: i32,
    pub human_score_against: i32,
    pub manual_score_against: i32,
    pub wins: i32,
    pub losses: i32,
    pub human_wins: i32,
    pub human_losses: i32,
    pub manual_wins: i32,
    pub manual_losses: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
