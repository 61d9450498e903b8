//! Repository implementations over SeaORM. Every query executes against
//! the innermost open transaction of the request session.

use crate::db::records::PrefsMap;
use serde_json::Value;

mod chat;
mod elo;
mod games;
mod misc;
mod social;
mod stats;
mod users;

pub(crate) use chat::SqlChatRepository;
pub(crate) use elo::{SqlEloRepository, SqlRobotRepository};
pub(crate) use games::SqlGameRepository;
pub(crate) use misc::{
    SqlCompletionRepository, SqlImageRepository, SqlPromoRepository, SqlRatingRepository,
    SqlReportRepository, SqlRiddleRepository, SqlSubmissionRepository, SqlTransactionRepository,
};
pub(crate) use social::{
    SqlBlockRepository, SqlChallengeRepository, SqlFavoriteRepository, SqlZombieRepository,
};
pub(crate) use stats::SqlStatsRepository;
pub(crate) use users::SqlUserRepository;

macro_rules! sql_repository {
    ($name:ident) => {
        pub(crate) struct $name {
            pub(crate) session: std::sync::Arc<crate::db::sql::SqlSession>,
        }

        impl $name {
            pub fn new(session: std::sync::Arc<crate::db::sql::SqlSession>) -> Self {
                Self { session }
            }
        }
    };
}

pub(crate) use sql_repository;

/// Decode a JSON column into a preference map
pub(crate) fn json_to_prefs(json: Value) -> PrefsMap {
    match json {
        Value::Object(map) => map,
        _ => PrefsMap::new(),
    }
}

/// Encode a preference map for a JSON column
pub(crate) fn prefs_to_json(prefs: &PrefsMap) -> Value {
    Value::Object(prefs.clone())
}
