//! Shared fixtures for the integration tests: an in-memory document
//! store session manager, collaborator stubs and entity builders.
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use lexicross::config::{DatabaseBackend, DatabaseConfig};
use lexicross::db::records::{GameRecord, MoveRecord, PrefsMap};
use lexicross::db::{Session, SessionManager};
use lexicross::locales::Locale;
use lexicross::services::game::moves::PlayedMove;
use lexicross::services::game::state::GameState;
use lexicross::services::users::CreateUser;
use lexicross::services::{
    AcceptAllValidator, GameService, MoveGenerator, NullNotifier, UserService,
};
use serde_json::Value;
use std::sync::Arc;

/// A fresh in-memory document store deployment
pub async fn manager() -> SessionManager {
    let config = DatabaseConfig {
        backend: DatabaseBackend::DocStore,
        url: None,
        data_dir: None,
    };
    SessionManager::connect(&config)
        .await
        .expect("document store should open")
}

/// A robot that always passes; deterministic and always legal
pub struct PassingRobot;

impl MoveGenerator for PassingRobot {
    fn generate_move(&self, _state: &GameState, _locale: &Locale, _level: i32) -> PlayedMove {
        PlayedMove::Pass
    }
}

pub fn game_service() -> GameService {
    GameService::new(
        Arc::new(PassingRobot),
        Arc::new(AcceptAllValidator),
        Arc::new(NullNotifier),
    )
}

/// Create a user with sensible defaults and return its id
pub async fn create_user(session: &Session, id: &str, nickname: &str) -> String {
    let users = UserService::new();
    let (user_id, _prefs) = users
        .create(
            session,
            CreateUser {
                user_id: id.to_string(),
                account: format!("acct-{id}"),
                email: format!("{id}@example.com"),
                nickname: nickname.to_string(),
                image: String::new(),
                preferences: None,
                locale: Some("is_IS".to_string()),
            },
        )
        .await
        .expect("user creation should succeed");
    user_id
}

pub fn placement_record(coord: &str, tiles: &str, score: i32, ts: DateTime<Utc>) -> MoveRecord {
    MoveRecord {
        coord: coord.to_string(),
        tiles: tiles.to_string(),
        score,
        rack: "aaaaaaa".to_string(),
        timestamp: ts,
    }
}

/// A finished game record suitable for feeding the Elo and stats
/// pipelines directly
pub fn finished_game(
    id: &str,
    player0: Option<&str>,
    player1: Option<&str>,
    score0: i32,
    score1: i32,
    ts_last_move: DateTime<Utc>,
    manual: bool,
) -> GameRecord {
    let mut prefs = PrefsMap::new();
    if manual {
        prefs.insert("manual".to_string(), Value::Bool(true));
    }
    let start = ts_last_move - chrono::Duration::minutes(30);
    GameRecord {
        id: id.to_string(),
        player0_id: player0.map(str::to_string),
        player1_id: player1.map(str::to_string),
        locale: "is_IS".to_string(),
        rack0: "aaaaaaa".to_string(),
        rack1: "bbbbbbb".to_string(),
        irack0: "aaaaaaa".to_string(),
        irack1: "bbbbbbb".to_string(),
        score0,
        score1,
        to_move: 0,
        robot_level: if player0.is_none() || player1.is_none() {
            8
        } else {
            0
        },
        over: true,
        timestamp: start,
        ts_last_move,
        moves: vec![
            placement_record("H4", "ara", 12, start + chrono::Duration::minutes(1)),
            placement_record("4H", "rak", 10, start + chrono::Duration::minutes(2)),
        ],
        prefs,
        tile_count: 6,
        elo0: None,
        elo1: None,
        elo0_adj: None,
        elo1_adj: None,
        human_elo0: None,
        human_elo1: None,
        human_elo0_adj: None,
        human_elo1_adj: None,
        manual_elo0: None,
        manual_elo1: None,
        manual_elo0_adj: None,
        manual_elo1_adj: None,
    }
}
