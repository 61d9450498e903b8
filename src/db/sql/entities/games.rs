use crate::db::records::MoveRecord;
use sea_orm::{entity::prelude::*, FromJsonQueryResult};
use serde::{Deserialize, Serialize};

/// The embedded move list, stored as a single JSON column. Ordered and
/// append-only; the whole list is always read together.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct MoveList(pub Vec<MoveRecord>);

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "games")]
pub struct Model {
    /// Game UUID
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// Either seat may be null for a robot
    pub player0_id: Option<String>,
    pub player1_id: Option<String>,
    pub locale: String,
    pub rack0: String,
    pub rack1: String,
    pub irack0: String,
    pub irack1: String,
    pub score0: i32,
    pub score1: i32,
    pub to_move: i32,
    pub robot_level: i32,
    pub over: bool,
    pub timestamp: DateTimeUtc,
    pub ts_last_move: DateTimeUtc,
    pub moves: MoveList,
    pub prefs: Json,
    pub tile_count: i32,
    pub elo0: Option<i32>,
    pub elo1: Option<i32>,
    pub elo0_adj: Option<i32>,
    pub elo1_adj: Option<i32>,
    pub human_elo0: Option<i32>,
    pub human_elo1: Option<i32>,
    pub human_elo0_adj: Option<i32>,
    pub human_elo1_adj: Option<i32>,
    pub manual_elo0: Option<i32>,
    pub manual_elo1: Option<i32>,
    pub manual_elo0_adj: Option<i32>,
    pub manual_elo1_adj: Option<i32>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
