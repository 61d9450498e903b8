//! Repository traits: one per entity family. These are the only
//! accesses the domain services perform; there is no free-form query
//! surface across this boundary. Both storage backends implement every
//! trait with identical observable semantics.

use crate::db::{records::*, DbResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn get(&self, user_id: &str) -> DbResult<Option<UserRecord>>;

    /// Lookup by external-auth subject (unique when present)
    async fn get_by_account(&self, account: &str) -> DbResult<Option<UserRecord>>;

    /// Lookup by email. Among active users with this address, prefers
    /// those with a positive Elo, newest first (legacy tie-break).
    async fn get_by_email(&self, email: &str) -> DbResult<Option<UserRecord>>;

    /// Case-insensitive nickname lookup
    async fn get_by_nickname(&self, nickname: &str) -> DbResult<Option<UserRecord>>;

    /// Batch lookup; the result preserves the order of `user_ids`
    async fn get_multi(&self, user_ids: &[String]) -> DbResult<Vec<Option<UserRecord>>>;

    async fn create(&self, user: &UserRecord) -> DbResult<()>;

    async fn update(&self, user_id: &str, update: UserUpdate) -> DbResult<()>;

    async fn delete(&self, user_id: &str) -> DbResult<()>;

    async fn count(&self) -> DbResult<u64>;

    /// Users whose lowercase nickname or full name starts with the
    /// prefix, active only, deduplicated, optionally locale-filtered
    async fn list_prefix(
        &self,
        prefix: &str,
        locale: Option<&str>,
        max_len: usize,
    ) -> DbResult<Vec<UserListEntry>>;

    /// Up to `max_len` users with human Elo strictly below `elo`, in
    /// descending Elo order, active players only
    async fn list_elo_below(
        &self,
        elo: i32,
        locale: Option<&str>,
        max_len: usize,
    ) -> DbResult<Vec<String>>;

    /// Up to `max_len` users with human Elo at or above `elo`, in
    /// ascending Elo order, active players only
    async fn list_elo_at_or_above(
        &self,
        elo: i32,
        locale: Option<&str>,
        max_len: usize,
    ) -> DbResult<Vec<String>>;
}

#[async_trait]
pub trait GameRepository: Send + Sync {
    async fn get(&self, game_id: &str) -> DbResult<Option<GameRecord>>;

    async fn create(&self, game: &GameRecord) -> DbResult<()>;

    async fn update(&self, game_id: &str, update: GameUpdate) -> DbResult<()>;

    async fn delete(&self, game_id: &str) -> DbResult<()>;

    /// Recently finished games of a user, newest last-move first,
    /// optionally restricted to one opponent
    async fn list_finished_games(
        &self,
        user_id: &str,
        versus: Option<&str>,
        max_len: usize,
    ) -> DbResult<Vec<FinishedGameInfo>>;

    /// Ongoing games of a user, newest last-move first
    async fn list_live_games(
        &self,
        user_id: &str,
        max_len: usize,
    ) -> DbResult<Vec<LiveGameInfo>>;

    /// Finished games with `from < ts_last_move <= to`, ordered by
    /// (ts_last_move, id) ascending. `cursor` is the exclusive position
    /// of the last game already processed; at most `limit` are returned.
    async fn list_finished_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        cursor: Option<(DateTime<Utc>, String)>,
        limit: usize,
    ) -> DbResult<Vec<GameRecord>>;

    /// Null out every seat the user occupies; the games themselves are
    /// retained so scoreboards stay coherent
    async fn detach_user(&self, user_id: &str) -> DbResult<()>;
}

#[async_trait]
pub trait EloRepository: Send + Sync {
    async fn get(&self, locale: &str, user_id: &str) -> DbResult<Option<EloRecord>>;

    async fn upsert(&self, rating: &EloRecord) -> DbResult<()>;

    /// Batch load ratings for a locale, keyed by user id
    async fn load_multi(
        &self,
        locale: &str,
        user_ids: &[String],
    ) -> DbResult<HashMap<String, EloRecord>>;

    /// Ratings of a locale in descending order of the given kind
    async fn list_rating(
        &self,
        kind: RatingKind,
        locale: &str,
        max_len: usize,
    ) -> DbResult<Vec<EloRecord>>;

    async fn delete_for_user(&self, user_id: &str) -> DbResult<()>;
}

#[async_trait]
pub trait StatsRepository: Send + Sync {
    /// Insert snapshots; the caller has set the shared timestamp
    async fn put_multi(&self, records: &[StatsRecord]) -> DbResult<()>;

    /// The newest snapshot for a human user, if any
    async fn newest_for_user(&self, user_id: &str) -> DbResult<Option<StatsRecord>>;

    /// The newest snapshot at or before `ts` for the given user or
    /// robot level
    async fn newest_before(
        &self,
        ts: DateTime<Utc>,
        user_id: Option<&str>,
        robot_level: i32,
    ) -> DbResult<Option<StatsRecord>>;

    /// For each user (or robot level), the newest snapshot at or before
    /// `ts`, ordered descending by the Elo column selected by `kind`
    async fn list_elo(
        &self,
        kind: RatingKind,
        ts: DateTime<Utc>,
        max_len: usize,
    ) -> DbResult<Vec<StatsRecord>>;

    /// All snapshots at exactly this timestamp; used to reload partial
    /// results when a nightly run resumes
    async fn list_at(&self, ts: DateTime<Utc>) -> DbResult<Vec<StatsRecord>>;

    /// Delete all snapshots at exactly this timestamp (idempotent
    /// rewrites under retry)
    async fn delete_at(&self, ts: DateTime<Utc>) -> DbResult<()>;

    async fn delete_for_user(&self, user_id: &str) -> DbResult<()>;
}

#[async_trait]
pub trait FavoriteRepository: Send + Sync {
    async fn list_favorites(&self, user_id: &str, max_len: usize) -> DbResult<Vec<String>>;

    async fn has_relation(&self, src_user_id: &str, dest_user_id: &str) -> DbResult<bool>;

    /// Idempotent
    async fn add_relation(&self, src_user_id: &str, dest_user_id: &str) -> DbResult<()>;

    /// Idempotent
    async fn delete_relation(&self, src_user_id: &str, dest_user_id: &str) -> DbResult<()>;

    /// Remove relations in both directions
    async fn delete_for_user(&self, user_id: &str) -> DbResult<()>;
}

#[async_trait]
pub trait ChallengeRepository: Send + Sync {
    async fn has_relation(&self, src_user_id: &str, dest_user_id: &str) -> DbResult<bool>;

    /// Find a challenge between the pair; `key` disambiguates when
    /// several exist
    async fn find_relation(
        &self,
        src_user_id: &str,
        dest_user_id: &str,
        key: Option<&str>,
    ) -> DbResult<Option<ChallengeRecord>>;

    /// Returns the key of the new challenge
    async fn add_relation(
        &self,
        src_user_id: &str,
        dest_user_id: &str,
        prefs: &PrefsMap,
    ) -> DbResult<String>;

    /// Delete the edge(s) and return the prefs of the first one found
    async fn delete_relation(
        &self,
        src_user_id: &str,
        dest_user_id: &str,
        key: Option<&str>,
    ) -> DbResult<Option<PrefsMap>>;

    /// Challenges issued by the user, oldest first
    async fn list_issued(&self, user_id: &str, max_len: usize) -> DbResult<Vec<ChallengeInfo>>;

    /// Challenges received by the user, oldest first
    async fn list_received(&self, user_id: &str, max_len: usize)
        -> DbResult<Vec<ChallengeInfo>>;

    /// Remove challenges in both directions
    async fn delete_for_user(&self, user_id: &str) -> DbResult<()>;
}

#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Add a message to the channel; an empty `msg` is a read marker.
    /// Returns the message timestamp.
    async fn add_msg(
        &self,
        channel: &str,
        user_id: &str,
        recipient_id: Option<&str>,
        msg: &str,
        timestamp: Option<DateTime<Utc>>,
    ) -> DbResult<DateTime<Utc>>;

    /// The newest items of a conversation, newest first. `max_len`
    /// counts only non-empty messages; read markers in between are
    /// still included.
    async fn list_conversation(&self, channel: &str, max_len: usize)
        -> DbResult<Vec<ChatRecord>>;

    /// Scan the channel newest to oldest: true at the first non-empty
    /// message from another user, false at the first empty message from
    /// the querying user, false when neither is found.
    async fn check_conversation(&self, channel: &str, user_id: &str) -> DbResult<bool>;

    /// Per distinct correspondent, the most recent message and an unread
    /// flag, filtering correspondents in `blocked`
    async fn chat_history(
        &self,
        for_user: &str,
        max_len: usize,
        blocked: &HashSet<String>,
    ) -> DbResult<Vec<ChatHistoryEntry>>;

    /// Remove messages originated by the user
    async fn delete_for_user(&self, user_id: &str) -> DbResult<()>;
}

#[async_trait]
pub trait BlockRepository: Send + Sync {
    async fn list_blocked_users(&self, user_id: &str, max_len: usize) -> DbResult<Vec<String>>;

    async fn list_blocked_by(&self, user_id: &str, max_len: usize) -> DbResult<Vec<String>>;

    /// Returns false if the relation already existed
    async fn block_user(&self, blocker_id: &str, blocked_id: &str) -> DbResult<bool>;

    /// Returns false if there was nothing to remove
    async fn unblock_user(&self, blocker_id: &str, blocked_id: &str) -> DbResult<bool>;

    async fn is_blocking(&self, blocker_id: &str, blocked_id: &str) -> DbResult<bool>;

    async fn delete_for_user(&self, user_id: &str) -> DbResult<()>;
}

#[async_trait]
pub trait ZombieRepository: Send + Sync {
    /// Record a finished game the user has not yet acknowledged
    async fn add_game(&self, game_id: &str, user_id: &str) -> DbResult<()>;

    /// Acknowledge: remove the entry if present
    async fn delete_game(&self, game_id: &str, user_id: &str) -> DbResult<()>;

    async fn list_games(&self, user_id: &str) -> DbResult<Vec<ZombieGameInfo>>;

    async fn delete_for_user(&self, user_id: &str) -> DbResult<()>;
}

#[async_trait]
pub trait RatingRepository: Send + Sync {
    /// Delete and recreate the whole table in one sweep, avoiding
    /// staleness between nightly runs
    async fn replace_all(&self, rows: &[RatingRecord]) -> DbResult<()>;

    /// The rating table of a kind, ascending by rank
    async fn list_rating(&self, kind: RatingKind) -> DbResult<Vec<RatingRecord>>;
}

#[async_trait]
pub trait ReportRepository: Send + Sync {
    async fn report_user(
        &self,
        reporter_id: &str,
        reported_id: &str,
        code: i32,
        text: &str,
    ) -> DbResult<()>;

    async fn list_reported_by(&self, user_id: &str, max_len: usize) -> DbResult<Vec<String>>;

    async fn delete_for_user(&self, user_id: &str) -> DbResult<()>;
}

#[async_trait]
pub trait PromoRepository: Send + Sync {
    async fn add_promotion(&self, user_id: &str, promotion: &str) -> DbResult<()>;

    /// Timestamps at which the promotion has been shown to the user
    async fn list_promotions(
        &self,
        user_id: &str,
        promotion: &str,
    ) -> DbResult<Vec<DateTime<Utc>>>;

    async fn delete_for_user(&self, user_id: &str) -> DbResult<()>;
}

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn add_transaction(
        &self,
        user_id: &str,
        plan: &str,
        kind: &str,
        op: &str,
    ) -> DbResult<()>;

    async fn count_for_user(&self, user_id: &str) -> DbResult<u64>;

    async fn delete_for_user(&self, user_id: &str) -> DbResult<()>;
}

#[async_trait]
pub trait SubmissionRepository: Send + Sync {
    async fn submit_word(
        &self,
        user_id: &str,
        locale: &str,
        word: &str,
        comment: &str,
    ) -> DbResult<()>;

    async fn count_for_user(&self, user_id: &str) -> DbResult<u64>;

    async fn delete_for_user(&self, user_id: &str) -> DbResult<()>;
}

#[async_trait]
pub trait CompletionRepository: Send + Sync {
    async fn add_completion(
        &self,
        proctype: &str,
        ts_from: DateTime<Utc>,
        ts_to: DateTime<Utc>,
    ) -> DbResult<()>;

    async fn add_failure(
        &self,
        proctype: &str,
        ts_from: DateTime<Utc>,
        ts_to: DateTime<Utc>,
        reason: &str,
    ) -> DbResult<()>;

    async fn count_for_proctype(&self, proctype: &str) -> DbResult<u64>;

    /// The most recent entry for a process type
    async fn newest_for_proctype(&self, proctype: &str) -> DbResult<Option<CompletionRecord>>;
}

#[async_trait]
pub trait RobotRepository: Send + Sync {
    async fn get_elo(&self, locale: &str, level: i32) -> DbResult<Option<i32>>;

    async fn upsert_elo(&self, locale: &str, level: i32, elo: i32) -> DbResult<()>;
}

#[async_trait]
pub trait RiddleRepository: Send + Sync {
    async fn get_riddle(&self, date: &str, locale: &str) -> DbResult<Option<RiddleRecord>>;

    async fn get_riddles_for_date(&self, date: &str) -> DbResult<Vec<RiddleRecord>>;

    async fn save_riddle(&self, riddle: &RiddleRecord) -> DbResult<()>;
}

#[async_trait]
pub trait ImageRepository: Send + Sync {
    async fn get_thumbnail(&self, user_id: &str, size: u32) -> DbResult<Option<Vec<u8>>>;

    async fn set_thumbnail(&self, user_id: &str, image: &[u8], size: u32) -> DbResult<()>;

    async fn delete_for_user(&self, user_id: &str) -> DbResult<()>;
}
