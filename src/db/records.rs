//! Entity views and update maps exchanged across the persistence
//! protocol. Records are read-only snapshots; mutation is expressed by
//! passing an id plus an update struct to the repository, which writes
//! atomically. This keeps callers independent of substrate semantics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Semi-structured preference map, as stored on users, games and
/// challenges
pub type PrefsMap = serde_json::Map<String, Value>;

/// Read a boolean preference, treating absence as false
pub fn prefs_bool(prefs: &PrefsMap, key: &str) -> bool {
    prefs.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// Read an integer preference, treating absence as zero
pub fn prefs_int(prefs: &PrefsMap, key: &str) -> i64 {
    prefs.get(key).and_then(Value::as_i64).unwrap_or(0)
}

/// Read a string preference
pub fn prefs_str<'a>(prefs: &'a PrefsMap, key: &str) -> Option<&'a str> {
    prefs.get(key).and_then(Value::as_str)
}

/// An individual user account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: String,
    /// External-auth subject; unique when present
    pub account: Option<String>,
    /// Lowercased email address, or empty
    pub email: String,
    pub nickname: String,
    /// Lowercase nickname, maintained for search
    pub nick_lc: String,
    /// Lowercase full name from prefs, maintained for search
    pub name_lc: String,
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_blob: Option<Vec<u8>>,
    pub locale: String,
    pub location: String,
    pub prefs: PrefsMap,
    pub inactive: bool,
    pub ready: bool,
    pub ready_timed: bool,
    pub chat_disabled: bool,
    pub plan: Option<String>,
    /// Cached view of the Elo rating in the user's current locale
    pub elo: i32,
    pub human_elo: i32,
    pub manual_elo: i32,
    pub highest_score: i32,
    pub highest_score_game: Option<String>,
    pub best_word: Option<String>,
    pub best_word_score: i32,
    pub best_word_game: Option<String>,
    /// Career game count
    pub games: i32,
    pub timestamp: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
}

/// Writable attributes of a user; only set fields are written
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub account: Option<Option<String>>,
    pub email: Option<String>,
    pub nickname: Option<String>,
    pub nick_lc: Option<String>,
    pub name_lc: Option<String>,
    pub image: Option<String>,
    pub image_blob: Option<Option<Vec<u8>>>,
    pub locale: Option<String>,
    pub location: Option<String>,
    pub prefs: Option<PrefsMap>,
    pub inactive: Option<bool>,
    pub ready: Option<bool>,
    pub ready_timed: Option<bool>,
    pub chat_disabled: Option<bool>,
    pub plan: Option<Option<String>>,
    pub elo: Option<i32>,
    pub human_elo: Option<i32>,
    pub manual_elo: Option<i32>,
    pub highest_score: Option<i32>,
    pub highest_score_game: Option<Option<String>>,
    pub best_word: Option<Option<String>>,
    pub best_word_score: Option<i32>,
    pub best_word_game: Option<Option<String>>,
    pub games: Option<i32>,
    pub last_login: Option<DateTime<Utc>>,
}

impl UserUpdate {
    /// Fold the set fields of this update into a user record
    pub fn apply(self, user: &mut UserRecord) {
        if let Some(account) = self.account {
            user.account = account;
        }
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(nickname) = self.nickname {
            user.nickname = nickname;
        }
        if let Some(nick_lc) = self.nick_lc {
            user.nick_lc = nick_lc;
        }
        if let Some(name_lc) = self.name_lc {
            user.name_lc = name_lc;
        }
        if let Some(image) = self.image {
            user.image = image;
        }
        if let Some(image_blob) = self.image_blob {
            user.image_blob = image_blob;
        }
        if let Some(locale) = self.locale {
            user.locale = locale;
        }
        if let Some(location) = self.location {
            user.location = location;
        }
        if let Some(prefs) = self.prefs {
            user.prefs = prefs;
        }
        if let Some(inactive) = self.inactive {
            user.inactive = inactive;
        }
        if let Some(ready) = self.ready {
            user.ready = ready;
        }
        if let Some(ready_timed) = self.ready_timed {
            user.ready_timed = ready_timed;
        }
        if let Some(chat_disabled) = self.chat_disabled {
            user.chat_disabled = chat_disabled;
        }
        if let Some(plan) = self.plan {
            user.plan = plan;
        }
        if let Some(elo) = self.elo {
            user.elo = elo;
        }
        if let Some(human_elo) = self.human_elo {
            user.human_elo = human_elo;
        }
        if let Some(manual_elo) = self.manual_elo {
            user.manual_elo = manual_elo;
        }
        if let Some(highest_score) = self.highest_score {
            user.highest_score = highest_score;
        }
        if let Some(highest_score_game) = self.highest_score_game {
            user.highest_score_game = highest_score_game;
        }
        if let Some(best_word) = self.best_word {
            user.best_word = best_word;
        }
        if let Some(best_word_score) = self.best_word_score {
            user.best_word_score = best_word_score;
        }
        if let Some(best_word_game) = self.best_word_game {
            user.best_word_game = best_word_game;
        }
        if let Some(games) = self.games {
            user.games = games;
        }
        if let Some(last_login) = self.last_login {
            user.last_login = Some(last_login);
        }
    }
}

/// A single move inside a game's embedded move list. The list is ordered
/// and append-only; this is also the persisted JSON shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRecord {
    /// Board coordinate ("A15" horizontal, "15A" vertical) or empty for
    /// non-placement moves
    pub coord: String,
    /// Placement string with '?' prefixing a blank and its chosen
    /// letter, or one of the sentinels "PASS", "EXCH <tiles>", "RSGN"
    pub tiles: String,
    /// Score delta this move contributed
    pub score: i32,
    /// The player's rack after the move
    pub rack: String,
    pub timestamp: DateTime<Utc>,
}

impl MoveRecord {
    pub fn is_resignation(&self) -> bool {
        self.tiles == "RSGN"
    }

    pub fn is_pass(&self) -> bool {
        self.tiles == "PASS"
    }

    pub fn is_exchange(&self) -> bool {
        self.tiles.starts_with("EXCH")
    }

    /// True for moves that lay tiles on the board
    pub fn is_placement(&self) -> bool {
        !self.coord.is_empty()
    }
}

/// A game between two players; either seat may be a robot (id None)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRecord {
    pub id: String,
    pub player0_id: Option<String>,
    pub player1_id: Option<String>,
    pub locale: String,
    /// Current racks
    pub rack0: String,
    pub rack1: String,
    /// Racks at game start
    pub irack0: String,
    pub irack1: String,
    pub score0: i32,
    pub score1: i32,
    /// Whose turn is it next, 0 or 1
    pub to_move: i32,
    /// Robot difficulty (0 = strongest); 0 also for human games
    pub robot_level: i32,
    pub over: bool,
    pub timestamp: DateTime<Utc>,
    pub ts_last_move: DateTime<Utc>,
    pub moves: Vec<MoveRecord>,
    pub prefs: PrefsMap,
    /// Cached count of tiles laid on the board
    pub tile_count: i32,
    /// Elo state at finalization; None while the game is live
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

impl GameRecord {
    /// True if either seat is a robot
    pub fn is_robot_game(&self) -> bool {
        self.player0_id.is_none() || self.player1_id.is_none()
    }

    /// True if the game uses manual word checking ("Pro mode")
    pub fn manual_wordcheck(&self) -> bool {
        prefs_bool(&self.prefs, "manual")
    }

    /// Per-player duration in minutes; 0 for untimed games
    pub fn duration(&self) -> i64 {
        prefs_int(&self.prefs, "duration")
    }
}

/// Writable attributes of a game
#[derive(Debug, Clone, Default)]
pub struct GameUpdate {
    pub player0_id: Option<Option<String>>,
    pub player1_id: Option<Option<String>>,
    pub rack0: Option<String>,
    pub rack1: Option<String>,
    pub score0: Option<i32>,
    pub score1: Option<i32>,
    pub to_move: Option<i32>,
    pub over: Option<bool>,
    pub ts_last_move: Option<DateTime<Utc>>,
    /// Full replacement of the embedded move list; the caller must only
    /// ever append
    pub moves: Option<Vec<MoveRecord>>,
    pub tile_count: Option<i32>,
    pub elo0: Option<Option<i32>>,
    pub elo1: Option<Option<i32>>,
    pub elo0_adj: Option<Option<i32>>,
    pub elo1_adj: Option<Option<i32>>,
    pub human_elo0: Option<Option<i32>>,
    pub human_elo1: Option<Option<i32>>,
    pub human_elo0_adj: Option<Option<i32>>,
    pub human_elo1_adj: Option<Option<i32>>,
    pub manual_elo0: Option<Option<i32>>,
    pub manual_elo1: Option<Option<i32>>,
    pub manual_elo0_adj: Option<Option<i32>>,
    pub manual_elo1_adj: Option<Option<i32>>,
}

impl GameUpdate {
    /// Fold the set fields of this update into a game record
    pub fn apply(self, game: &mut GameRecord) {
        if let Some(player0_id) = self.player0_id {
            game.player0_id = player0_id;
        }
        if let Some(player1_id) = self.player1_id {
            game.player1_id = player1_id;
        }
        if let Some(rack0) = self.rack0 {
            game.rack0 = rack0;
        }
        if let Some(rack1) = self.rack1 {
            game.rack1 = rack1;
        }
        if let Some(score0) = self.score0 {
            game.score0 = score0;
        }
        if let Some(score1) = self.score1 {
            game.score1 = score1;
        }
        if let Some(to_move) = self.to_move {
            game.to_move = to_move;
        }
        if let Some(over) = self.over {
            game.over = over;
        }
        if let Some(ts_last_move) = self.ts_last_move {
            game.ts_last_move = ts_last_move;
        }
        if let Some(moves) = self.moves {
            game.moves = moves;
        }
        if let Some(tile_count) = self.tile_count {
            game.tile_count = tile_count;
        }
        if let Some(elo0) = self.elo0 {
            game.elo0 = elo0;
        }
        if let Some(elo1) = self.elo1 {
            game.elo1 = elo1;
        }
        if let Some(elo0_adj) = self.elo0_adj {
            game.elo0_adj = elo0_adj;
        }
        if let Some(elo1_adj) = self.elo1_adj {
            game.elo1_adj = elo1_adj;
        }
        if let Some(human_elo0) = self.human_elo0 {
            game.human_elo0 = human_elo0;
        }
        if let Some(human_elo1) = self.human_elo1 {
            game.human_elo1 = human_elo1;
        }
        if let Some(human_elo0_adj) = self.human_elo0_adj {
            game.human_elo0_adj = human_elo0_adj;
        }
        if let Some(human_elo1_adj) = self.human_elo1_adj {
            game.human_elo1_adj = human_elo1_adj;
        }
        if let Some(manual_elo0) = self.manual_elo0 {
            game.manual_elo0 = manual_elo0;
        }
        if let Some(manual_elo1) = self.manual_elo1 {
            game.manual_elo1 = manual_elo1;
        }
        if let Some(manual_elo0_adj) = self.manual_elo0_adj {
            game.manual_elo0_adj = manual_elo0_adj;
        }
        if let Some(manual_elo1_adj) = self.manual_elo1_adj {
            game.manual_elo1_adj = manual_elo1_adj;
        }
    }
}

/// Locale-scoped Elo rating of a user; one row per (user, locale)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EloRecord {
    pub user_id: String,
    pub locale: String,
    pub elo: i32,
    pub human_elo: i32,
    pub manual_elo: i32,
    pub timestamp: DateTime<Utc>,
}

/// Global Elo rating of a robot difficulty level in a locale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RobotEloRecord {
    pub locale: String,
    pub level: i32,
    pub elo: i32,
}

/// A directed matchmaking intent from one user to another
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChallengeRecord {
    /// Opaque key disambiguating concurrent challenges between a pair
    pub key: String,
    pub src_user_id: String,
    pub dest_user_id: String,
    pub prefs: PrefsMap,
    pub timestamp: DateTime<Utc>,
}

/// A chat message. By convention an empty message from a user is a read
/// marker: the user has seen all older messages on the channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRecord {
    pub id: String,
    /// "game:<uuid>" or "user:<a>:<b>" with a < b
    pub channel: String,
    pub user_id: String,
    pub recipient_id: Option<String>,
    pub msg: String,
    pub timestamp: DateTime<Utc>,
}

/// Career statistics snapshot of a user (or robot level) at a point in
/// time; the snapshot series is append-only
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsRecord {
    /// None for robot snapshots
    pub user_id: Option<String>,
    pub robot_level: i32,
    /// None until the snapshot has been written at a run boundary
    pub timestamp: Option<DateTime<Utc>>,
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

impl StatsRecord {
    /// A fresh accumulator with default ratings and zeroed counters
    pub fn new(user_id: Option<String>, robot_level: i32) -> Self {
        Self {
            user_id,
            robot_level,
            timestamp: None,
            games: 0,
            human_games: 0,
            manual_games: 0,
            elo: 1200,
            human_elo: 1200,
            manual_elo: 1200,
            score: 0,
            human_score: 0,
            manual_score: 0,
            score_against: 0,
            human_score_against: 0,
            manual_score_against: 0,
            wins: 0,
            losses: 0,
            human_wins: 0,
            human_losses: 0,
            manual_wins: 0,
            manual_losses: 0,
        }
    }

    /// A dictionary key that works for human users and robots alike
    pub fn dict_key(&self) -> String {
        match &self.user_id {
            Some(uid) => uid.clone(),
            None => format!("robot-{}", self.robot_level),
        }
    }
}

/// The Elo column a stats or ratings query is keyed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RatingKind {
    /// All games, including robot games
    All,
    /// Human-vs-human games only
    Human,
    /// Manual word-check games only
    Manual,
}

impl RatingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RatingKind::All => "all",
            RatingKind::Human => "human",
            RatingKind::Manual => "manual",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "all" => Some(Self::All),
            "human" => Some(Self::Human),
            "manual" => Some(Self::Manual),
            _ => None,
        }
    }
}

/// One historical point of a precomputed ranking row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingSnapshot {
    pub rank: i32,
    pub games: i32,
    pub elo: i32,
    pub score: i32,
    pub score_against: i32,
    pub wins: i32,
    pub losses: i32,
}

/// One row of the precomputed top-100 ranking table, keyed (kind, rank)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RatingRecord {
    pub kind: String,
    pub rank: i32,
    /// None for robots and for sentinel rows
    pub user_id: Option<String>,
    /// -1 marks a sentinel row filling an unused rank
    pub robot_level: i32,
    pub games: i32,
    pub elo: i32,
    pub score: i32,
    pub score_against: i32,
    pub wins: i32,
    pub losses: i32,
    pub yesterday: RatingSnapshot,
    pub week_ago: RatingSnapshot,
    pub month_ago: RatingSnapshot,
}

impl RatingRecord {
    /// A sentinel row for an unused rank
    pub fn sentinel(kind: &str, rank: i32) -> Self {
        Self {
            kind: kind.to_string(),
            rank,
            user_id: None,
            robot_level: -1,
            games: -1,
            elo: 1200,
            score: 0,
            score_against: 0,
            wins: 0,
            losses: 0,
            yesterday: RatingSnapshot::default(),
            week_ago: RatingSnapshot::default(),
            month_ago: RatingSnapshot::default(),
        }
    }
}

/// Completion log entry for a background process run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub proctype: String,
    pub ts_from: DateTime<Utc>,
    pub ts_to: DateTime<Utc>,
    pub success: bool,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
}

/// A user reporting another user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRecord {
    pub reporter_id: String,
    pub reported_id: String,
    pub code: i32,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// A word submitted by a user for inclusion in a vocabulary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub user_id: String,
    pub locale: String,
    pub word: String,
    pub comment: String,
    pub timestamp: DateTime<Utc>,
}

/// A record of a promotion having been displayed to a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromoRecord {
    pub user_id: String,
    pub promotion: String,
    pub timestamp: DateTime<Utc>,
}

/// A plan transaction log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub user_id: String,
    pub plan: String,
    pub kind: String,
    pub op: String,
    pub timestamp: DateTime<Utc>,
}

/// A daily riddle for a locale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiddleRecord {
    pub date: String,
    pub locale: String,
    pub riddle_json: String,
    pub created: DateTime<Utc>,
    pub version: i32,
}

// ---------------------------------------------------------------------
// Query result shapes
// ---------------------------------------------------------------------

/// Summary of an ongoing game from one player's perspective
#[derive(Debug, Clone, Serialize)]
pub struct LiveGameInfo {
    pub uuid: String,
    pub ts: DateTime<Utc>,
    pub opp: Option<String>,
    pub robot_level: i32,
    pub my_turn: bool,
    pub sc0: i32,
    pub sc1: i32,
    pub prefs: PrefsMap,
    pub tile_count: i32,
    pub locale: String,
}

/// Summary of a finished game from one player's perspective
#[derive(Debug, Clone, Serialize)]
pub struct FinishedGameInfo {
    pub uuid: String,
    pub ts: DateTime<Utc>,
    pub ts_last_move: DateTime<Utc>,
    pub opp: Option<String>,
    pub robot_level: i32,
    pub sc0: i32,
    pub sc1: i32,
    pub elo_adj: Option<i32>,
    pub human_elo_adj: Option<i32>,
    pub prefs: PrefsMap,
    pub locale: String,
}

/// Summary of a finished-but-unacknowledged game for its player
#[derive(Debug, Clone, Serialize)]
pub struct ZombieGameInfo {
    pub uuid: String,
    pub ts: DateTime<Utc>,
    pub opp: Option<String>,
    pub robot_level: i32,
    pub sc0: i32,
    pub sc1: i32,
}

/// One challenge as seen from either end of the edge
#[derive(Debug, Clone, Serialize)]
pub struct ChallengeInfo {
    /// The other party of the challenge
    pub user_id: String,
    pub prefs: PrefsMap,
    pub timestamp: DateTime<Utc>,
    pub key: String,
}

/// One correspondent line of a user's chat history
#[derive(Debug, Clone, Serialize)]
pub struct ChatHistoryEntry {
    pub user: String,
    pub ts: DateTime<Utc>,
    pub last_msg: String,
    pub unread: bool,
}

/// Subset of user attributes returned by the list queries
#[derive(Debug, Clone, Serialize)]
pub struct UserListEntry {
    pub id: String,
    pub nickname: String,
    pub prefs: PrefsMap,
    pub timestamp: DateTime<Utc>,
    pub ready: bool,
    pub ready_timed: bool,
    pub human_elo: i32,
}
