use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Opaque, stable user identifier
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    /// External-auth subject; unique when present
    pub account: Option<String>,
    /// Lowercased email address, empty when unknown
    pub email: String,
    pub nickname: String,
    /// Lowercase nickname, for case-insensitive search
    pub nick_lc: String,
    /// Lowercase full name from prefs, for search
    pub name_lc: String,
    pub image: String,
    pub image_blob: Option<Vec<u8>>,
    pub locale: String,
    pub location: String,
    pub prefs: Json,
    pub inactive: bool,
    pub ready: bool,
    pub ready_timed: bool,
    pub chat_disabled: bool,
    pub plan: Option<String>,
    /// Denormalized Elo ratings in the user's current locale
    pub elo: i32,
    pub human_elo: i32,
    pub manual_elo: i32,
    pub highest_score: i32,
    pub highest_score_game: Option<String>,
    pub best_word: Option<String>,
    pub best_word_score: i32,
    pub best_word_game: Option<String>,
    pub games: i32,
    pub timestamp: DateTimeUtc,
    pub last_login: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::elo_ratings::Entity")]
    EloRatings,
}

impl Related<super::elo_ratings::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::EloRatings.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
