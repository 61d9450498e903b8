use sea_orm::entity::prelude::*;

/// Precomputed top-100 ranking row. The three historical snapshots are
/// inlined as column triples.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "ratings")]
pub struct Model {
    /// "all", "human" or "manual"
    #[sea_orm(primary_key, auto_increment = false)]
    pub kind: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub rank: i32,
    /// Null for robots and for sentinel rows
    pub user_id: Option<String>,
    /// -1 marks a sentinel row
    pub robot_level: i32,
    pub games: i32,
    pub elo: i32,
    pub score: i32,
    pub score_against: i32,
    pub wins: i32,
    pub losses: i32,
    pub rank_yesterday: i32,
    pub games_yesterday: i32,
    pub elo_yesterday: i32,
    pub score_yesterday: i32,
    pub score_against_yesterday: i32,
    pub wins_yesterday: i32,
    pub losses_yesterday: i32,
    pub rank_week_ago: i32,
    pub games_week_ago: i32,
    pub elo_week_ago: i32,
    pub score_week_ago: i32,
    pub score_against_week_ago: i32,
    pub wins_week_ago: i32,
    pub losses_week_ago: i32,
    pub rank_month_ago: i32,
    pub games_month_ago: i32,
    pub elo_month_ago: i32,
    pub score_month_ago: i32,
    pub score_against_month_ago: i32,
    pub wins_month_ago: i32,
    pub losses_month_ago: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
