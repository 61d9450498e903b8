//! Repository implementations over the embedded document store. Queries
//! are expressed as filtered scans of a kind; the store is an in-process
//! map, so scans are cheap and the semantics stay identical to the
//! relational backend.

use super::{key_segment, kinds, DocKey, DocSession};
use crate::db::{records::*, repos::*, DbError, DbResult};
use crate::utils::ids::generate_id;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

fn decode<T: DeserializeOwned>(doc: Value) -> DbResult<T> {
    Ok(serde_json::from_value(doc)?)
}

fn encode<T: Serialize>(record: &T) -> DbResult<Value> {
    Ok(serde_json::to_value(record)?)
}

/// Decode every document of a scan, failing on the first malformed one
fn decode_all<T: DeserializeOwned>(docs: Vec<(String, Value)>) -> DbResult<Vec<T>> {
    docs.into_iter().map(|(_, doc)| decode(doc)).collect()
}

macro_rules! doc_repository {
    ($name:ident) => {
        pub(crate) struct $name {
            session: Arc<DocSession>,
        }

        impl $name {
            pub fn new(session: Arc<DocSession>) -> Self {
                Self { session }
            }
        }
    };
}

doc_repository!(DocUserRepository);
doc_repository!(DocGameRepository);
doc_repository!(DocEloRepository);
doc_repository!(DocStatsRepository);
doc_repository!(DocFavoriteRepository);
doc_repository!(DocChallengeRepository);
doc_repository!(DocChatRepository);
doc_repository!(DocBlockRepository);
doc_repository!(DocZombieRepository);
doc_repository!(DocRatingRepository);
doc_repository!(DocReportRepository);
doc_repository!(DocPromoRepository);
doc_repository!(DocTransactionRepository);
doc_repository!(DocSubmissionRepository);
doc_repository!(DocCompletionRepository);
doc_repository!(DocRobotRepository);
doc_repository!(DocRiddleRepository);
doc_repository!(DocImageRepository);

fn user_key(user_id: &str) -> DocKey {
    DocKey::new(kinds::USER, user_id)
}

fn user_list_entry(user: &UserRecord) -> UserListEntry {
    UserListEntry {
        id: user.id.clone(),
        nickname: user.nickname.clone(),
        prefs: user.prefs.clone(),
        timestamp: user.timestamp,
        ready: user.ready,
        ready_timed: user.ready_timed,
        human_elo: user.human_elo,
    }
}

#[async_trait]
impl UserRepository for DocUserRepository {
    async fn get(&self, user_id: &str) -> DbResult<Option<UserRecord>> {
        self.session.get(&user_key(user_id)).map(decode).transpose()
    }

    async fn get_by_account(&self, account: &str) -> DbResult<Option<UserRecord>> {
        let mut users: Vec<UserRecord> = decode_all(self.session.scan(kinds::USER))?;
        users.retain(|u| u.account.as_deref() == Some(account));
        users.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(users.into_iter().next())
    }

    async fn get_by_email(&self, email: &str) -> DbResult<Option<UserRecord>> {
        if email.is_empty() {
            return Ok(None);
        }
        let email = email.to_lowercase();
        let mut users: Vec<UserRecord> = decode_all(self.session.scan(kinds::USER))?;
        users.retain(|u| !u.inactive && u.email == email);
        // Prefer users with a positive Elo, then the newest account
        users.sort_by(|a, b| {
            (b.elo > 0, b.timestamp).cmp(&(a.elo > 0, a.timestamp))
        });
        Ok(users.into_iter().next())
    }

    async fn get_by_nickname(&self, nickname: &str) -> DbResult<Option<UserRecord>> {
        let nick = nickname.to_lowercase();
        let users: Vec<UserRecord> = decode_all(self.session.scan(kinds::USER))?;
        Ok(users
            .into_iter()
            .find(|u| !u.inactive && u.nick_lc == nick))
    }

    async fn get_multi(&self, user_ids: &[String]) -> DbResult<Vec<Option<UserRecord>>> {
        let mut result = Vec::with_capacity(user_ids.len());
        for user_id in user_ids {
            result.push(self.get(user_id).await?);
        }
        Ok(result)
    }

    async fn create(&self, user: &UserRecord) -> DbResult<()> {
        self.session.put(&user_key(&user.id), encode(user)?)
    }

    async fn update(&self, user_id: &str, update: UserUpdate) -> DbResult<()> {
        let key = user_key(user_id);
        let doc = self
            .session
            .get(&key)
            .ok_or_else(|| DbError::Doc(format!("update of missing user {user_id}")))?;
        let mut user: UserRecord = decode(doc)?;
        update.apply(&mut user);
        self.session.put(&key, encode(&user)?)
    }

    async fn delete(&self, user_id: &str) -> DbResult<()> {
        self.session.delete(&user_key(user_id)).map(|_| ())
    }

    async fn count(&self) -> DbResult<u64> {
        Ok(self.session.scan(kinds::USER).len() as u64)
    }

    async fn list_prefix(
        &self,
        prefix: &str,
        locale: Option<&str>,
        max_len: usize,
    ) -> DbResult<Vec<UserListEntry>> {
        if prefix.is_empty() {
            return Ok(Vec::new());
        }
        let prefix = prefix.to_lowercase();
        let users: Vec<UserRecord> = decode_all(self.session.scan(kinds::USER))?;
        let candidates: Vec<&UserRecord> = users
            .iter()
            .filter(|u| !u.inactive)
            .filter(|u| locale.map(|lc| u.locale == lc).unwrap_or(true))
            .collect();

        let mut seen: HashSet<&str> = HashSet::new();
        let mut result: Vec<UserListEntry> = Vec::new();

        // Nickname matches first, then full-name matches, as two ordered
        // passes with ids deduplicated across them
        let mut by_nick: Vec<&&UserRecord> = candidates
            .iter()
            .filter(|u| u.nick_lc.starts_with(&prefix))
            .collect();
        by_nick.sort_by(|a, b| a.nick_lc.cmp(&b.nick_lc));
        for user in by_nick {
            if seen.insert(&user.id) {
                result.push(user_list_entry(user));
                if result.len() >= max_len {
                    return Ok(result);
                }
            }
        }

        let mut by_name: Vec<&&UserRecord> = candidates
            .iter()
            .filter(|u| !u.name_lc.is_empty() && u.name_lc.starts_with(&prefix))
            .collect();
        by_name.sort_by(|a, b| a.name_lc.cmp(&b.name_lc));
        for user in by_name {
            if seen.insert(&user.id) {
                result.push(user_list_entry(user));
                if result.len() >= max_len {
                    break;
                }
            }
        }
        Ok(result)
    }

    async fn list_elo_below(
        &self,
        elo: i32,
        locale: Option<&str>,
        max_len: usize,
    ) -> DbResult<Vec<String>> {
        let mut users: Vec<UserRecord> = decode_all(self.session.scan(kinds::USER))?;
        users.retain(|u| {
            !u.inactive
                && u.highest_score > 0
                && u.human_elo < elo
                && locale.map(|lc| u.locale == lc).unwrap_or(true)
        });
        users.sort_by(|a, b| b.human_elo.cmp(&a.human_elo));
        users.truncate(max_len);
        Ok(users.into_iter().map(|u| u.id).collect())
    }

    async fn list_elo_at_or_above(
        &self,
        elo: i32,
        locale: Option<&str>,
        max_len: usize,
    ) -> DbResult<Vec<String>> {
        let mut users: Vec<UserRecord> = decode_all(self.session.scan(kinds::USER))?;
        users.retain(|u| {
            !u.inactive
                && u.highest_score > 0
                && u.human_elo >= elo
                && locale.map(|lc| u.locale == lc).unwrap_or(true)
        });
        users.sort_by(|a, b| a.human_elo.cmp(&b.human_elo));
        users.truncate(max_len);
        Ok(users.into_iter().map(|u| u.id).collect())
    }
}

fn game_key(game_id: &str) -> DocKey {
    DocKey::new(kinds::GAME, game_id)
}

fn finished_game_info(game: &GameRecord, user_id: &str) -> FinishedGameInfo {
    let from_p0 = game.player0_id.as_deref() == Some(user_id);
    let (opp, sc0, sc1, elo_adj, human_elo_adj) = if from_p0 {
        (
            game.player1_id.clone(),
            game.score0,
            game.score1,
            game.elo0_adj,
            game.human_elo0_adj,
        )
    } else {
        (
            game.player0_id.clone(),
            game.score1,
            game.score0,
            game.elo1_adj,
            game.human_elo1_adj,
        )
    };
    FinishedGameInfo {
        uuid: game.id.clone(),
        ts: game.timestamp,
        ts_last_move: game.ts_last_move,
        opp,
        robot_level: game.robot_level,
        sc0,
        sc1,
        elo_adj,
        human_elo_adj,
        prefs: game.prefs.clone(),
        locale: game.locale.clone(),
    }
}

fn live_game_info(game: &GameRecord, user_id: &str) -> LiveGameInfo {
    let from_p0 = game.player0_id.as_deref() == Some(user_id);
    let (opp, sc0, sc1, my_turn) = if from_p0 {
        (game.player1_id.clone(), game.score0, game.score1, game.to_move == 0)
    } else {
        (game.player0_id.clone(), game.score1, game.score0, game.to_move == 1)
    };
    LiveGameInfo {
        uuid: game.id.clone(),
        ts: game.ts_last_move,
        opp,
        robot_level: game.robot_level,
        my_turn,
        sc0,
        sc1,
        prefs: game.prefs.clone(),
        tile_count: game.tile_count,
        locale: game.locale.clone(),
    }
}

fn involves_user(game: &GameRecord, user_id: &str) -> bool {
    game.player0_id.as_deref() == Some(user_id) || game.player1_id.as_deref() == Some(user_id)
}

#[async_trait]
impl GameRepository for DocGameRepository {
    async fn get(&self, game_id: &str) -> DbResult<Option<GameRecord>> {
        self.session.get(&game_key(game_id)).map(decode).transpose()
    }

    async fn create(&self, game: &GameRecord) -> DbResult<()> {
        self.session.put(&game_key(&game.id), encode(game)?)
    }

    async fn update(&self, game_id: &str, update: GameUpdate) -> DbResult<()> {
        let key = game_key(game_id);
        let doc = self
            .session
            .get(&key)
            .ok_or_else(|| DbError::Doc(format!("update of missing game {game_id}")))?;
        let mut game: GameRecord = decode(doc)?;
        update.apply(&mut game);
        self.session.put(&key, encode(&game)?)
    }

    async fn delete(&self, game_id: &str) -> DbResult<()> {
        self.session.delete(&game_key(game_id)).map(|_| ())
    }

    async fn list_finished_games(
        &self,
        user_id: &str,
        versus: Option<&str>,
        max_len: usize,
    ) -> DbResult<Vec<FinishedGameInfo>> {
        let games: Vec<GameRecord> = decode_all(self.session.scan(kinds::GAME))?;
        let mut result: Vec<FinishedGameInfo> = games
            .iter()
            .filter(|g| g.over && involves_user(g, user_id))
            .filter(|g| match versus {
                Some(versus) => involves_user(g, versus),
                None => true,
            })
            .map(|g| finished_game_info(g, user_id))
            .collect();
        result.sort_by(|a, b| b.ts_last_move.cmp(&a.ts_last_move));
        result.truncate(max_len);
        Ok(result)
    }

    async fn list_live_games(
        &self,
        user_id: &str,
        max_len: usize,
    ) -> DbResult<Vec<LiveGameInfo>> {
        let games: Vec<GameRecord> = decode_all(self.session.scan(kinds::GAME))?;
        let mut result: Vec<LiveGameInfo> = games
            .iter()
            .filter(|g| !g.over && involves_user(g, user_id))
            .map(|g| live_game_info(g, user_id))
            .collect();
        result.sort_by(|a, b| b.ts.cmp(&a.ts));
        result.truncate(max_len);
        Ok(result)
    }

    async fn list_finished_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        cursor: Option<(DateTime<Utc>, String)>,
        limit: usize,
    ) -> DbResult<Vec<GameRecord>> {
        let mut games: Vec<GameRecord> = decode_all(self.session.scan(kinds::GAME))?;
        games.retain(|g| g.over && g.ts_last_move > from && g.ts_last_move <= to);
        games.sort_by(|a, b| (a.ts_last_move, &a.id).cmp(&(b.ts_last_move, &b.id)));
        if let Some((cursor_ts, cursor_id)) = cursor {
            games.retain(|g| (g.ts_last_move, g.id.clone()) > (cursor_ts, cursor_id.clone()));
        }
        games.truncate(limit);
        Ok(games)
    }

    async fn detach_user(&self, user_id: &str) -> DbResult<()> {
        let games: Vec<GameRecord> = decode_all(self.session.scan(kinds::GAME))?;
        for mut game in games {
            if !involves_user(&game, user_id) {
                continue;
            }
            if game.player0_id.as_deref() == Some(user_id) {
                game.player0_id = None;
            }
            if game.player1_id.as_deref() == Some(user_id) {
                game.player1_id = None;
            }
            self.session.put(&game_key(&game.id), encode(&game)?)?;
        }
        Ok(())
    }
}

fn elo_key(locale: &str, user_id: &str) -> DocKey {
    user_key(user_id).child(kinds::ELO, locale)
}

#[async_trait]
impl EloRepository for DocEloRepository {
    async fn get(&self, locale: &str, user_id: &str) -> DbResult<Option<EloRecord>> {
        self.session
            .get(&elo_key(locale, user_id))
            .map(decode)
            .transpose()
    }

    async fn upsert(&self, rating: &EloRecord) -> DbResult<()> {
        self.session
            .put(&elo_key(&rating.locale, &rating.user_id), encode(rating)?)
    }

    async fn load_multi(
        &self,
        locale: &str,
        user_ids: &[String],
    ) -> DbResult<HashMap<String, EloRecord>> {
        let mut result = HashMap::new();
        for user_id in user_ids {
            if let Some(rating) = self.get(locale, user_id).await? {
                result.insert(user_id.clone(), rating);
            }
        }
        Ok(result)
    }

    async fn list_rating(
        &self,
        kind: RatingKind,
        locale: &str,
        max_len: usize,
    ) -> DbResult<Vec<EloRecord>> {
        let mut ratings: Vec<EloRecord> = decode_all(self.session.scan(kinds::ELO))?;
        ratings.retain(|r| r.locale == locale);
        ratings.sort_by(|a, b| {
            let (a_elo, b_elo) = match kind {
                RatingKind::All => (a.elo, b.elo),
                RatingKind::Human => (a.human_elo, b.human_elo),
                RatingKind::Manual => (a.manual_elo, b.manual_elo),
            };
            b_elo.cmp(&a_elo)
        });
        ratings.truncate(max_len);
        Ok(ratings)
    }

    async fn delete_for_user(&self, user_id: &str) -> DbResult<()> {
        for (flat, _) in self.session.scan(kinds::ELO) {
            if key_segment(&flat, 0) == Some(user_id) {
                if let Some(locale) = key_segment(&flat, 1) {
                    self.session.delete(&elo_key(locale, user_id))?;
                }
            }
        }
        Ok(())
    }
}

fn stats_elo(record: &StatsRecord, kind: RatingKind) -> i32 {
    match kind {
        RatingKind::All => record.elo,
        RatingKind::Human => record.human_elo,
        RatingKind::Manual => record.manual_elo,
    }
}

#[async_trait]
impl StatsRepository for DocStatsRepository {
    async fn put_multi(&self, records: &[StatsRecord]) -> DbResult<()> {
        for record in records {
            let key = DocKey::new(kinds::STATS, generate_id());
            self.session.put(&key, encode(record)?)?;
        }
        Ok(())
    }

    async fn newest_for_user(&self, user_id: &str) -> DbResult<Option<StatsRecord>> {
        let mut records: Vec<StatsRecord> = decode_all(self.session.scan(kinds::STATS))?;
        records.retain(|r| r.user_id.as_deref() == Some(user_id) && r.robot_level == 0);
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records.into_iter().next())
    }

    async fn newest_before(
        &self,
        ts: DateTime<Utc>,
        user_id: Option<&str>,
        robot_level: i32,
    ) -> DbResult<Option<StatsRecord>> {
        let mut records: Vec<StatsRecord> = decode_all(self.session.scan(kinds::STATS))?;
        records.retain(|r| {
            r.user_id.as_deref() == user_id
                && r.robot_level == robot_level
                && r.timestamp.map(|t| t <= ts).unwrap_or(false)
        });
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records.into_iter().next())
    }

    async fn list_elo(
        &self,
        kind: RatingKind,
        ts: DateTime<Utc>,
        max_len: usize,
    ) -> DbResult<Vec<StatsRecord>> {
        let records: Vec<StatsRecord> = decode_all(self.session.scan(kinds::STATS))?;
        // Newest snapshot per user (or robot level) at or before ts
        let mut newest: HashMap<String, StatsRecord> = HashMap::new();
        for record in records {
            if record.timestamp.map(|t| t > ts).unwrap_or(true) {
                continue;
            }
            let key = record.dict_key();
            match newest.get(&key) {
                Some(existing) if existing.timestamp >= record.timestamp => {}
                _ => {
                    newest.insert(key, record);
                }
            }
        }
        let mut result: Vec<StatsRecord> = newest.into_values().collect();
        result.sort_by(|a, b| stats_elo(b, kind).cmp(&stats_elo(a, kind)));
        result.truncate(max_len);
        Ok(result)
    }

    async fn list_at(&self, ts: DateTime<Utc>) -> DbResult<Vec<StatsRecord>> {
        let mut records: Vec<StatsRecord> = decode_all(self.session.scan(kinds::STATS))?;
        records.retain(|r| r.timestamp == Some(ts));
        Ok(records)
    }

    async fn delete_at(&self, ts: DateTime<Utc>) -> DbResult<()> {
        for (flat, doc) in self.session.scan(kinds::STATS) {
            let record: StatsRecord = decode(doc)?;
            if record.timestamp == Some(ts) {
                if let Some(id) = key_segment(&flat, 0) {
                    self.session.delete(&DocKey::new(kinds::STATS, id))?;
                }
            }
        }
        Ok(())
    }

    async fn delete_for_user(&self, user_id: &str) -> DbResult<()> {
        for (flat, doc) in self.session.scan(kinds::STATS) {
            let record: StatsRecord = decode(doc)?;
            if record.user_id.as_deref() == Some(user_id) {
                if let Some(id) = key_segment(&flat, 0) {
                    self.session.delete(&DocKey::new(kinds::STATS, id))?;
                }
            }
        }
        Ok(())
    }
}

fn favorite_key(src_user_id: &str, dest_user_id: &str) -> DocKey {
    user_key(src_user_id).child(kinds::FAVORITE, dest_user_id)
}

#[async_trait]
impl FavoriteRepository for DocFavoriteRepository {
    async fn list_favorites(&self, user_id: &str, max_len: usize) -> DbResult<Vec<String>> {
        let mut result: Vec<String> = self
            .session
            .scan(kinds::FAVORITE)
            .into_iter()
            .filter(|(flat, _)| key_segment(flat, 0) == Some(user_id))
            .filter_map(|(flat, _)| key_segment(&flat, 1).map(str::to_string))
            .collect();
        result.sort();
        result.truncate(max_len);
        Ok(result)
    }

    async fn has_relation(&self, src_user_id: &str, dest_user_id: &str) -> DbResult<bool> {
        Ok(self
            .session
            .get(&favorite_key(src_user_id, dest_user_id))
            .is_some())
    }

    async fn add_relation(&self, src_user_id: &str, dest_user_id: &str) -> DbResult<()> {
        let doc = serde_json::json!({
            "src_user_id": src_user_id,
            "dest_user_id": dest_user_id,
        });
        self.session.put(&favorite_key(src_user_id, dest_user_id), doc)
    }

    async fn delete_relation(&self, src_user_id: &str, dest_user_id: &str) -> DbResult<()> {
        self.session
            .delete(&favorite_key(src_user_id, dest_user_id))
            .map(|_| ())
    }

    async fn delete_for_user(&self, user_id: &str) -> DbResult<()> {
        for (flat, _) in self.session.scan(kinds::FAVORITE) {
            let src = key_segment(&flat, 0);
            let dest = key_segment(&flat, 1);
            if src == Some(user_id) || dest == Some(user_id) {
                if let (Some(src), Some(dest)) = (src, dest) {
                    self.session.delete(&favorite_key(src, dest))?;
                }
            }
        }
        Ok(())
    }
}

fn challenge_key(src_user_id: &str, key: &str) -> DocKey {
    user_key(src_user_id).child(kinds::CHALLENGE, key)
}

#[async_trait]
impl ChallengeRepository for DocChallengeRepository {
    async fn has_relation(&self, src_user_id: &str, dest_user_id: &str) -> DbResult<bool> {
        Ok(self
            .find_relation(src_user_id, dest_user_id, None)
            .await?
            .is_some())
    }

    async fn find_relation(
        &self,
        src_user_id: &str,
        dest_user_id: &str,
        key: Option<&str>,
    ) -> DbResult<Option<ChallengeRecord>> {
        let mut challenges: Vec<ChallengeRecord> =
            decode_all(self.session.scan(kinds::CHALLENGE))?;
        challenges.retain(|c| {
            c.src_user_id == src_user_id
                && c.dest_user_id == dest_user_id
                && key.map(|k| c.key == k).unwrap_or(true)
        });
        challenges.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(challenges.into_iter().next())
    }

    async fn add_relation(
        &self,
        src_user_id: &str,
        dest_user_id: &str,
        prefs: &PrefsMap,
    ) -> DbResult<String> {
        let record = ChallengeRecord {
            key: generate_id(),
            src_user_id: src_user_id.to_string(),
            dest_user_id: dest_user_id.to_string(),
            prefs: prefs.clone(),
            timestamp: Utc::now(),
        };
        self.session
            .put(&challenge_key(src_user_id, &record.key), encode(&record)?)?;
        Ok(record.key)
    }

    async fn delete_relation(
        &self,
        src_user_id: &str,
        dest_user_id: &str,
        key: Option<&str>,
    ) -> DbResult<Option<PrefsMap>> {
        let mut challenges: Vec<ChallengeRecord> =
            decode_all(self.session.scan(kinds::CHALLENGE))?;
        challenges.retain(|c| {
            c.src_user_id == src_user_id
                && c.dest_user_id == dest_user_id
                && key.map(|k| c.key == k).unwrap_or(true)
        });
        challenges.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        let mut prefs = None;
        for challenge in &challenges {
            if prefs.is_none() {
                prefs = Some(challenge.prefs.clone());
            }
            self.session
                .delete(&challenge_key(src_user_id, &challenge.key))?;
        }
        Ok(prefs)
    }

    async fn list_issued(&self, user_id: &str, max_len: usize) -> DbResult<Vec<ChallengeInfo>> {
        let mut challenges: Vec<ChallengeRecord> =
            decode_all(self.session.scan(kinds::CHALLENGE))?;
        challenges.retain(|c| c.src_user_id == user_id);
        challenges.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        challenges.truncate(max_len);
        Ok(challenges
            .into_iter()
            .map(|c| ChallengeInfo {
                user_id: c.dest_user_id,
                prefs: c.prefs,
                timestamp: c.timestamp,
                key: c.key,
            })
            .collect())
    }

    async fn list_received(
        &self,
        user_id: &str,
        max_len: usize,
    ) -> DbResult<Vec<ChallengeInfo>> {
        let mut challenges: Vec<ChallengeRecord> =
            decode_all(self.session.scan(kinds::CHALLENGE))?;
        challenges.retain(|c| c.dest_user_id == user_id);
        challenges.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        challenges.truncate(max_len);
        Ok(challenges
            .into_iter()
            .map(|c| ChallengeInfo {
                user_id: c.src_user_id,
                prefs: c.prefs,
                timestamp: c.timestamp,
                key: c.key,
            })
            .collect())
    }

    async fn delete_for_user(&self, user_id: &str) -> DbResult<()> {
        let challenges: Vec<ChallengeRecord> = decode_all(self.session.scan(kinds::CHALLENGE))?;
        for challenge in challenges {
            if challenge.src_user_id == user_id || challenge.dest_user_id == user_id {
                self.session
                    .delete(&challenge_key(&challenge.src_user_id, &challenge.key))?;
            }
        }
        Ok(())
    }
}

fn chat_sorted_desc(mut messages: Vec<ChatRecord>) -> Vec<ChatRecord> {
    messages.sort_by(|a, b| (b.timestamp, &b.id).cmp(&(a.timestamp, &a.id)));
    messages
}

/// The direct-message channel between two users, lexicographically
/// normalized
fn direct_channel(a: &str, b: &str) -> String {
    if a < b {
        format!("user:{a}:{b}")
    } else {
        format!("user:{b}:{a}")
    }
}

#[async_trait]
impl ChatRepository for DocChatRepository {
    async fn add_msg(
        &self,
        channel: &str,
        user_id: &str,
        recipient_id: Option<&str>,
        msg: &str,
        timestamp: Option<DateTime<Utc>>,
    ) -> DbResult<DateTime<Utc>> {
        let record = ChatRecord {
            id: generate_id(),
            channel: channel.to_string(),
            user_id: user_id.to_string(),
            recipient_id: recipient_id.map(str::to_string),
            msg: msg.to_string(),
            timestamp: timestamp.unwrap_or_else(Utc::now),
        };
        self.session
            .put(&DocKey::new(kinds::CHAT, &record.id), encode(&record)?)?;
        Ok(record.timestamp)
    }

    async fn list_conversation(
        &self,
        channel: &str,
        max_len: usize,
    ) -> DbResult<Vec<ChatRecord>> {
        let mut messages: Vec<ChatRecord> = decode_all(self.session.scan(kinds::CHAT))?;
        messages.retain(|m| m.channel == channel);
        let messages = chat_sorted_desc(messages);
        let mut result = Vec::new();
        let mut count = 0usize;
        for message in messages {
            let is_marker = message.msg.is_empty();
            result.push(message);
            if !is_marker {
                count += 1;
                if count >= max_len {
                    break;
                }
            }
        }
        Ok(result)
    }

    async fn check_conversation(&self, channel: &str, user_id: &str) -> DbResult<bool> {
        let mut messages: Vec<ChatRecord> = decode_all(self.session.scan(kinds::CHAT))?;
        messages.retain(|m| m.channel == channel);
        for message in chat_sorted_desc(messages) {
            if message.user_id != user_id && !message.msg.is_empty() {
                // A message originated by the other user
                return Ok(true);
            }
            if message.user_id == user_id && message.msg.is_empty() {
                // An 'already seen' marker from the querying user
                return Ok(false);
            }
        }
        Ok(false)
    }

    async fn chat_history(
        &self,
        for_user: &str,
        max_len: usize,
        blocked: &HashSet<String>,
    ) -> DbResult<Vec<ChatHistoryEntry>> {
        let mut messages: Vec<ChatRecord> = decode_all(self.session.scan(kinds::CHAT))?;
        messages.retain(|m| {
            m.channel.starts_with("user:")
                && (m.user_id == for_user || m.recipient_id.as_deref() == Some(for_user))
        });
        let mut seen: HashSet<String> = HashSet::new();
        let mut result = Vec::new();
        for message in chat_sorted_desc(messages) {
            if message.msg.is_empty() {
                continue;
            }
            let other = if message.user_id == for_user {
                match &message.recipient_id {
                    Some(recipient) => recipient.clone(),
                    None => continue,
                }
            } else {
                message.user_id.clone()
            };
            if blocked.contains(&other) || !seen.insert(other.clone()) {
                continue;
            }
            let unread = self
                .check_conversation(&direct_channel(for_user, &other), for_user)
                .await?;
            result.push(ChatHistoryEntry {
                user: other,
                ts: message.timestamp,
                last_msg: message.msg.clone(),
                unread,
            });
            if result.len() >= max_len {
                break;
            }
        }
        Ok(result)
    }

    async fn delete_for_user(&self, user_id: &str) -> DbResult<()> {
        let messages: Vec<ChatRecord> = decode_all(self.session.scan(kinds::CHAT))?;
        for message in messages {
            if message.user_id == user_id {
                self.session.delete(&DocKey::new(kinds::CHAT, &message.id))?;
            }
        }
        Ok(())
    }
}

fn block_key(blocker_id: &str, blocked_id: &str) -> DocKey {
    user_key(blocker_id).child(kinds::BLOCK, blocked_id)
}

#[async_trait]
impl BlockRepository for DocBlockRepository {
    async fn list_blocked_users(&self, user_id: &str, max_len: usize) -> DbResult<Vec<String>> {
        let mut result: Vec<String> = self
            .session
            .scan(kinds::BLOCK)
            .into_iter()
            .filter(|(flat, _)| key_segment(flat, 0) == Some(user_id))
            .filter_map(|(flat, _)| key_segment(&flat, 1).map(str::to_string))
            .collect();
        result.sort();
        result.truncate(max_len);
        Ok(result)
    }

    async fn list_blocked_by(&self, user_id: &str, max_len: usize) -> DbResult<Vec<String>> {
        let mut result: Vec<String> = self
            .session
            .scan(kinds::BLOCK)
            .into_iter()
            .filter(|(flat, _)| key_segment(flat, 1) == Some(user_id))
            .filter_map(|(flat, _)| key_segment(&flat, 0).map(str::to_string))
            .collect();
        result.sort();
        result.truncate(max_len);
        Ok(result)
    }

    async fn block_user(&self, blocker_id: &str, blocked_id: &str) -> DbResult<bool> {
        let key = block_key(blocker_id, blocked_id);
        if self.session.get(&key).is_some() {
            return Ok(false);
        }
        let doc = serde_json::json!({
            "blocker_id": blocker_id,
            "blocked_id": blocked_id,
            "timestamp": Utc::now(),
        });
        self.session.put(&key, doc)?;
        Ok(true)
    }

    async fn unblock_user(&self, blocker_id: &str, blocked_id: &str) -> DbResult<bool> {
        self.session.delete(&block_key(blocker_id, blocked_id))
    }

    async fn is_blocking(&self, blocker_id: &str, blocked_id: &str) -> DbResult<bool> {
        Ok(self.session.get(&block_key(blocker_id, blocked_id)).is_some())
    }

    async fn delete_for_user(&self, user_id: &str) -> DbResult<()> {
        for (flat, _) in self.session.scan(kinds::BLOCK) {
            let blocker = key_segment(&flat, 0);
            let blocked = key_segment(&flat, 1);
            if blocker == Some(user_id) || blocked == Some(user_id) {
                if let (Some(blocker), Some(blocked)) = (blocker, blocked) {
                    self.session.delete(&block_key(blocker, blocked))?;
                }
            }
        }
        Ok(())
    }
}

fn zombie_key(user_id: &str, game_id: &str) -> DocKey {
    user_key(user_id).child(kinds::ZOMBIE, game_id)
}

#[async_trait]
impl ZombieRepository for DocZombieRepository {
    async fn add_game(&self, game_id: &str, user_id: &str) -> DbResult<()> {
        let doc = serde_json::json!({
            "game_id": game_id,
            "user_id": user_id,
        });
        self.session.put(&zombie_key(user_id, game_id), doc)
    }

    async fn delete_game(&self, game_id: &str, user_id: &str) -> DbResult<()> {
        self.session.delete(&zombie_key(user_id, game_id)).map(|_| ())
    }

    async fn list_games(&self, user_id: &str) -> DbResult<Vec<ZombieGameInfo>> {
        let mut result = Vec::new();
        for (flat, _) in self.session.scan(kinds::ZOMBIE) {
            if key_segment(&flat, 0) != Some(user_id) {
                continue;
            }
            let Some(game_id) = key_segment(&flat, 1) else {
                continue;
            };
            let Some(doc) = self.session.get(&game_key(game_id)) else {
                continue;
            };
            let game: GameRecord = decode(doc)?;
            let from_p0 = game.player0_id.as_deref() == Some(user_id);
            let (opp, sc0, sc1) = if from_p0 {
                (game.player1_id.clone(), game.score0, game.score1)
            } else {
                (game.player0_id.clone(), game.score1, game.score0)
            };
            result.push(ZombieGameInfo {
                uuid: game.id.clone(),
                ts: game.ts_last_move,
                opp,
                robot_level: game.robot_level,
                sc0,
                sc1,
            });
        }
        Ok(result)
    }

    async fn delete_for_user(&self, user_id: &str) -> DbResult<()> {
        for (flat, _) in self.session.scan(kinds::ZOMBIE) {
            if key_segment(&flat, 0) == Some(user_id) {
                if let Some(game_id) = key_segment(&flat, 1) {
                    self.session.delete(&zombie_key(user_id, game_id))?;
                }
            }
        }
        Ok(())
    }
}

fn rating_key(kind: &str, rank: i32) -> DocKey {
    DocKey::new(kinds::RATING, format!("{kind}:{rank}"))
}

#[async_trait]
impl RatingRepository for DocRatingRepository {
    async fn replace_all(&self, rows: &[RatingRecord]) -> DbResult<()> {
        for (flat, _) in self.session.scan(kinds::RATING) {
            if let Some(id) = key_segment(&flat, 0) {
                self.session.delete(&DocKey::new(kinds::RATING, id))?;
            }
        }
        for row in rows {
            self.session.put(&rating_key(&row.kind, row.rank), encode(row)?)?;
        }
        Ok(())
    }

    async fn list_rating(&self, kind: RatingKind) -> DbResult<Vec<RatingRecord>> {
        let mut rows: Vec<RatingRecord> = decode_all(self.session.scan(kinds::RATING))?;
        rows.retain(|r| r.kind == kind.as_str());
        rows.sort_by_key(|r| r.rank);
        Ok(rows)
    }
}

#[async_trait]
impl ReportRepository for DocReportRepository {
    async fn report_user(
        &self,
        reporter_id: &str,
        reported_id: &str,
        code: i32,
        text: &str,
    ) -> DbResult<()> {
        let record = ReportRecord {
            reporter_id: reporter_id.to_string(),
            reported_id: reported_id.to_string(),
            code,
            text: text.to_string(),
            timestamp: Utc::now(),
        };
        self.session
            .put(&DocKey::new(kinds::REPORT, generate_id()), encode(&record)?)
    }

    async fn list_reported_by(&self, user_id: &str, max_len: usize) -> DbResult<Vec<String>> {
        let mut reports: Vec<ReportRecord> = decode_all(self.session.scan(kinds::REPORT))?;
        reports.retain(|r| r.reporter_id == user_id);
        reports.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        reports.truncate(max_len);
        Ok(reports.into_iter().map(|r| r.reported_id).collect())
    }

    async fn delete_for_user(&self, user_id: &str) -> DbResult<()> {
        for (flat, doc) in self.session.scan(kinds::REPORT) {
            let record: ReportRecord = decode(doc)?;
            if record.reporter_id == user_id || record.reported_id == user_id {
                if let Some(id) = key_segment(&flat, 0) {
                    self.session.delete(&DocKey::new(kinds::REPORT, id))?;
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl PromoRepository for DocPromoRepository {
    async fn add_promotion(&self, user_id: &str, promotion: &str) -> DbResult<()> {
        let record = PromoRecord {
            user_id: user_id.to_string(),
            promotion: promotion.to_string(),
            timestamp: Utc::now(),
        };
        self.session
            .put(&DocKey::new(kinds::PROMO, generate_id()), encode(&record)?)
    }

    async fn list_promotions(
        &self,
        user_id: &str,
        promotion: &str,
    ) -> DbResult<Vec<DateTime<Utc>>> {
        let mut promos: Vec<PromoRecord> = decode_all(self.session.scan(kinds::PROMO))?;
        promos.retain(|p| p.user_id == user_id && p.promotion == promotion);
        promos.sort_by_key(|p| p.timestamp);
        Ok(promos.into_iter().map(|p| p.timestamp).collect())
    }

    async fn delete_for_user(&self, user_id: &str) -> DbResult<()> {
        for (flat, doc) in self.session.scan(kinds::PROMO) {
            let record: PromoRecord = decode(doc)?;
            if record.user_id == user_id {
                if let Some(id) = key_segment(&flat, 0) {
                    self.session.delete(&DocKey::new(kinds::PROMO, id))?;
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl TransactionRepository for DocTransactionRepository {
    async fn add_transaction(
        &self,
        user_id: &str,
        plan: &str,
        kind: &str,
        op: &str,
    ) -> DbResult<()> {
        let record = TransactionRecord {
            user_id: user_id.to_string(),
            plan: plan.to_string(),
            kind: kind.to_string(),
            op: op.to_string(),
            timestamp: Utc::now(),
        };
        self.session.put(
            &DocKey::new(kinds::TRANSACTION, generate_id()),
            encode(&record)?,
        )
    }

    async fn count_for_user(&self, user_id: &str) -> DbResult<u64> {
        let records: Vec<TransactionRecord> = decode_all(self.session.scan(kinds::TRANSACTION))?;
        Ok(records.iter().filter(|r| r.user_id == user_id).count() as u64)
    }

    async fn delete_for_user(&self, user_id: &str) -> DbResult<()> {
        for (flat, doc) in self.session.scan(kinds::TRANSACTION) {
            let record: TransactionRecord = decode(doc)?;
            if record.user_id == user_id {
                if let Some(id) = key_segment(&flat, 0) {
                    self.session.delete(&DocKey::new(kinds::TRANSACTION, id))?;
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SubmissionRepository for DocSubmissionRepository {
    async fn submit_word(
        &self,
        user_id: &str,
        locale: &str,
        word: &str,
        comment: &str,
    ) -> DbResult<()> {
        let record = SubmissionRecord {
            user_id: user_id.to_string(),
            locale: locale.to_string(),
            word: word.to_string(),
            comment: comment.to_string(),
            timestamp: Utc::now(),
        };
        self.session.put(
            &DocKey::new(kinds::SUBMISSION, generate_id()),
            encode(&record)?,
        )
    }

    async fn count_for_user(&self, user_id: &str) -> DbResult<u64> {
        let records: Vec<SubmissionRecord> = decode_all(self.session.scan(kinds::SUBMISSION))?;
        Ok(records.iter().filter(|r| r.user_id == user_id).count() as u64)
    }

    async fn delete_for_user(&self, user_id: &str) -> DbResult<()> {
        for (flat, doc) in self.session.scan(kinds::SUBMISSION) {
            let record: SubmissionRecord = decode(doc)?;
            if record.user_id == user_id {
                if let Some(id) = key_segment(&flat, 0) {
                    self.session.delete(&DocKey::new(kinds::SUBMISSION, id))?;
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CompletionRepository for DocCompletionRepository {
    async fn add_completion(
        &self,
        proctype: &str,
        ts_from: DateTime<Utc>,
        ts_to: DateTime<Utc>,
    ) -> DbResult<()> {
        let record = CompletionRecord {
            proctype: proctype.to_string(),
            ts_from,
            ts_to,
            success: true,
            reason: String::new(),
            timestamp: Utc::now(),
        };
        self.session.put(
            &DocKey::new(kinds::COMPLETION, generate_id()),
            encode(&record)?,
        )
    }

    async fn add_failure(
        &self,
        proctype: &str,
        ts_from: DateTime<Utc>,
        ts_to: DateTime<Utc>,
        reason: &str,
    ) -> DbResult<()> {
        let record = CompletionRecord {
            proctype: proctype.to_string(),
            ts_from,
            ts_to,
            success: false,
            reason: reason.to_string(),
            timestamp: Utc::now(),
        };
        self.session.put(
            &DocKey::new(kinds::COMPLETION, generate_id()),
            encode(&record)?,
        )
    }

    async fn count_for_proctype(&self, proctype: &str) -> DbResult<u64> {
        let records: Vec<CompletionRecord> = decode_all(self.session.scan(kinds::COMPLETION))?;
        Ok(records.iter().filter(|r| r.proctype == proctype).count() as u64)
    }

    async fn newest_for_proctype(&self, proctype: &str) -> DbResult<Option<CompletionRecord>> {
        let mut records: Vec<CompletionRecord> = decode_all(self.session.scan(kinds::COMPLETION))?;
        records.retain(|r| r.proctype == proctype);
        records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(records.into_iter().next())
    }
}

fn robot_key(locale: &str, level: i32) -> DocKey {
    DocKey::new(kinds::ROBOT, format!("{locale}:{level}"))
}

#[async_trait]
impl RobotRepository for DocRobotRepository {
    async fn get_elo(&self, locale: &str, level: i32) -> DbResult<Option<i32>> {
        match self.session.get(&robot_key(locale, level)) {
            Some(doc) => {
                let record: RobotEloRecord = decode(doc)?;
                Ok(Some(record.elo))
            }
            None => Ok(None),
        }
    }

    async fn upsert_elo(&self, locale: &str, level: i32, elo: i32) -> DbResult<()> {
        let record = RobotEloRecord {
            locale: locale.to_string(),
            level,
            elo,
        };
        self.session.put(&robot_key(locale, level), encode(&record)?)
    }
}

fn riddle_key(date: &str, locale: &str) -> DocKey {
    DocKey::new(kinds::RIDDLE, format!("{date}:{locale}"))
}

#[async_trait]
impl RiddleRepository for DocRiddleRepository {
    async fn get_riddle(&self, date: &str, locale: &str) -> DbResult<Option<RiddleRecord>> {
        self.session
            .get(&riddle_key(date, locale))
            .map(decode)
            .transpose()
    }

    async fn get_riddles_for_date(&self, date: &str) -> DbResult<Vec<RiddleRecord>> {
        let mut riddles: Vec<RiddleRecord> = decode_all(self.session.scan(kinds::RIDDLE))?;
        riddles.retain(|r| r.date == date);
        riddles.sort_by(|a, b| a.locale.cmp(&b.locale));
        Ok(riddles)
    }

    async fn save_riddle(&self, riddle: &RiddleRecord) -> DbResult<()> {
        self.session
            .put(&riddle_key(&riddle.date, &riddle.locale), encode(riddle)?)
    }
}

fn image_key(user_id: &str, size: u32) -> DocKey {
    user_key(user_id).child(kinds::IMAGE, format!("thumb{size}"))
}

#[async_trait]
impl ImageRepository for DocImageRepository {
    async fn get_thumbnail(&self, user_id: &str, size: u32) -> DbResult<Option<Vec<u8>>> {
        match self.session.get(&image_key(user_id, size)) {
            Some(doc) => {
                let image: Vec<u8> = decode(
                    doc.get("image")
                        .cloned()
                        .ok_or_else(|| DbError::Doc("image document without data".to_string()))?,
                )?;
                Ok(Some(image))
            }
            None => Ok(None),
        }
    }

    async fn set_thumbnail(&self, user_id: &str, image: &[u8], size: u32) -> DbResult<()> {
        let doc = serde_json::json!({
            "user_id": user_id,
            "fmt": format!("thumb{size}"),
            "image": image,
        });
        self.session.put(&image_key(user_id, size), doc)
    }

    async fn delete_for_user(&self, user_id: &str) -> DbResult<()> {
        for (flat, _) in self.session.scan(kinds::IMAGE) {
            if key_segment(&flat, 0) == Some(user_id) {
                if let Some(fmt) = key_segment(&flat, 1) {
                    let key = user_key(user_id).child(kinds::IMAGE, fmt);
                    self.session.delete(&key)?;
                }
            }
        }
        Ok(())
    }
}
