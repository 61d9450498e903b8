//! The nightly statistics and rankings pipeline.
//!
//! `run_stats` is the authoritative Elo calculation: it replays the
//! finished games of a time window over per-user accumulators seeded
//! from the previous snapshot, rewrites the Elo fields on every game it
//! processes, and lands one snapshot per touched user at the window
//! boundary. The real-time per-game updates are provisional and are
//! overwritten by this run. `rebuild_ratings` derives the top-100
//! tables from the snapshots.
//!
//! Both entry points are invoked by an external cron, are synchronous
//! on demand and idempotent under retry.

use crate::db::{
    records::{GameUpdate, RatingKind, RatingRecord, RatingSnapshot, StatsRecord, UserUpdate},
    Backend, Session, SessionManager,
};
use crate::error::{CoreError, CoreResult};
use crate::services::elo::{compute_track, DEFAULT_ELO, ESTABLISHED_MARK};
use chrono::{DateTime, Datelike, Duration, TimeZone, Timelike, Utc};
use futures_util::future::FutureExt;
use log::{error, info, warn};
use std::collections::HashMap;

/// Completion-log process types
pub const STATS_PROCTYPE: &str = "stats";
pub const RATINGS_PROCTYPE: &str = "ratings";

/// Games fetched per repository call
const GAME_CHUNK: usize = 250;

/// Size of the ranking tables
const TOP_LIST_LEN: usize = 100;

/// Outcome of a stats run
#[derive(Debug, Clone)]
pub struct StatsRunInfo {
    /// False when the run stopped at the deadline; re-invoke with the
    /// same window to resume
    pub completed: bool,
    pub games_processed: usize,
    pub users_touched: usize,
    /// Position of the last processed game
    pub last_processed: Option<(DateTime<Utc>, String)>,
}

/// A date a number of calendar months away, clamped to month length
pub fn monthdelta(date: DateTime<Utc>, delta: i32) -> DateTime<Utc> {
    let total = date.month0() as i32 + delta;
    let year = date.year() + total.div_euclid(12);
    let month = total.rem_euclid(12) as u32 + 1;
    let day = date.day().min(days_in_month(year, month));
    Utc.with_ymd_and_hms(
        year,
        month,
        day,
        date.time().hour(),
        date.time().minute(),
        date.time().second(),
    )
    .single()
    .unwrap_or(date)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let first = Utc.with_ymd_and_hms(year, month, 1, 0, 0, 0).single();
    let next = Utc
        .with_ymd_and_hms(next_year, next_month, 1, 0, 0, 0)
        .single();
    match (first, next) {
        (Some(first), Some(next)) => (next - first).num_days() as u32,
        _ => 28,
    }
}

/// Encode the resume cursor into a completion-log reason
fn deadline_reason(cursor: &(DateTime<Utc>, String)) -> String {
    format!(
        "deadline exceeded; resume from {}|{}",
        cursor.0.to_rfc3339(),
        cursor.1
    )
}

/// Decode a resume cursor from a completion-log reason
fn parse_deadline_reason(reason: &str) -> Option<(DateTime<Utc>, String)> {
    let rest = reason.strip_prefix("deadline exceeded; resume from ")?;
    let (ts, id) = rest.split_once('|')?;
    let ts = DateTime::parse_from_rfc3339(ts).ok()?.with_timezone(&Utc);
    Some((ts, id.to_string()))
}

#[derive(Default)]
pub struct StatsService;

impl StatsService {
    pub fn new() -> Self {
        Self
    }

    /// Update user statistics and Elo ratings over the window
    /// `from < ts_last_move <= to`. When `deadline` passes mid-run the
    /// accumulators processed so far are written out, the position is
    /// recorded in the completion log, and a later invocation with the
    /// same window resumes from there.
    pub async fn run_stats(
        &self,
        session: &Session,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        deadline: Option<DateTime<Utc>>,
    ) -> CoreResult<StatsRunInfo> {
        if from >= to {
            return Err(CoreError::IllegalState(
                "stats time range is empty".to_string(),
            ));
        }
        info!("Generating stats from {from} to {to}");

        let db = session.backend();

        // A previous deadline-interrupted run of the same window leaves
        // its cursor in the completion log and its partial snapshots at
        // the window boundary; pick both up
        let mut cursor: Option<(DateTime<Utc>, String)> = None;
        let mut users: HashMap<String, StatsRecord> = HashMap::new();
        if let Some(last) = db.completions().newest_for_proctype(STATS_PROCTYPE).await? {
            if !last.success && last.ts_from == from && last.ts_to == to {
                if let Some(resume_from) = parse_deadline_reason(&last.reason) {
                    info!(
                        "Resuming interrupted stats run from {}",
                        resume_from.0
                    );
                    for record in db.stats().list_at(to).await? {
                        users.insert(record.dict_key(), record);
                    }
                    cursor = Some(resume_from);
                }
            }
        }

        let mut games_processed = 0usize;

        loop {
            let chunk = db
                .games()
                .list_finished_between(from, to, cursor.clone(), GAME_CHUNK)
                .await?;
            if chunk.is_empty() {
                break;
            }
            for game in chunk {
                if let Some(deadline) = deadline {
                    if Utc::now() >= deadline {
                        // Stop at the boundary before this game; the
                        // accumulators cover everything up to here
                        warn!(
                            "Stats run hit its deadline after {games_processed} games"
                        );
                        let last = cursor.clone().unwrap_or((from, String::new()));
                        self.write_stats(db, to, &users).await?;
                        db.completions()
                            .add_failure(STATS_PROCTYPE, from, to, &deadline_reason(&last))
                            .await?;
                        return Ok(StatsRunInfo {
                            completed: false,
                            games_processed,
                            users_touched: users.len(),
                            last_processed: Some(last),
                        });
                    }
                }
                cursor = Some((game.ts_last_move, game.id.clone()));

                let (s0, s1) = (game.score0, game.score1);
                if s0 == 0 && s1 == 0 {
                    // A game that ends by resigning immediately is
                    // ignored altogether in the statistics
                    continue;
                }

                let p0 = game.player0_id.clone();
                let p1 = game.player1_id.clone();
                let robot_game = p0.is_none() || p1.is_none();
                let rl = if robot_game { game.robot_level } else { 0 };
                let manual_game = !robot_game && game.manual_wordcheck();

                let k0 = seat_key(p0.as_deref(), rl);
                let k1 = seat_key(p1.as_deref(), rl);
                if k0 == k1 {
                    // A seat cannot meaningfully play itself
                    continue;
                }

                if !users.contains_key(&k0) {
                    let seeded = init_stat(db, from, p0.as_deref(), rl).await?;
                    users.insert(k0.clone(), seeded);
                }
                if !users.contains_key(&k1) {
                    let seeded = init_stat(db, from, p1.as_deref(), rl).await?;
                    users.insert(k1.clone(), seeded);
                }

                let mut update = GameUpdate::default();
                {
                    let mut urec0 = users.remove(&k0).unwrap_or_else(|| {
                        StatsRecord::new(p0.clone(), if p0.is_none() { rl } else { 0 })
                    });
                    let mut urec1 = users.remove(&k1).unwrap_or_else(|| {
                        StatsRecord::new(p1.clone(), if p1.is_none() { rl } else { 0 })
                    });

                    accumulate(&mut urec0, &mut urec1, s0, s1, robot_game, manual_game);

                    // Are the players established at this point?
                    let est0 = urec0.games > ESTABLISHED_MARK;
                    let est1 = urec1.games > ESTABLISHED_MARK;

                    // The all-games track
                    update.elo0 = Some(Some(urec0.elo));
                    update.elo1 = Some(Some(urec1.elo));
                    let adj = compute_track(urec0.elo, urec1.elo, s0, s1, est0, est1, false);
                    update.elo0_adj = Some(Some(adj.0));
                    update.elo1_adj = Some(Some(adj.1));
                    urec0.elo += adj.0;
                    urec1.elo += adj.1;

                    if !robot_game {
                        // The human-only track
                        let h0 = seed(urec0.human_elo);
                        let h1 = seed(urec1.human_elo);
                        update.human_elo0 = Some(Some(h0));
                        update.human_elo1 = Some(Some(h1));
                        let adj = compute_track(h0, h1, s0, s1, est0, est1, false);
                        update.human_elo0_adj = Some(Some(adj.0));
                        update.human_elo1_adj = Some(Some(adj.1));
                        urec0.human_elo = h0 + adj.0;
                        urec1.human_elo = h1 + adj.1;

                        if manual_game {
                            // The manual-wordcheck track
                            let m0 = seed(urec0.manual_elo);
                            let m1 = seed(urec1.manual_elo);
                            update.manual_elo0 = Some(Some(m0));
                            update.manual_elo1 = Some(Some(m1));
                            let adj = compute_track(m0, m1, s0, s1, est0, est1, false);
                            update.manual_elo0_adj = Some(Some(adj.0));
                            update.manual_elo1_adj = Some(Some(adj.1));
                            urec0.manual_elo = m0 + adj.0;
                            urec1.manual_elo = m1 + adj.1;
                        }
                    }

                    users.insert(k0.clone(), urec0);
                    users.insert(k1.clone(), urec1);
                }

                // Rewrite the game with the authoritative Elo state
                db.games().update(&game.id, update).await?;

                games_processed += 1;
                if games_processed % 500 == 0 {
                    info!("Stats processed {games_processed} games");
                }
            }
        }

        info!(
            "Normal completion of stats from {from} to {to}; {games_processed} games and {} users",
            users.len()
        );
        self.write_stats(db, to, &users).await?;
        db.completions()
            .add_completion(STATS_PROCTYPE, from, to)
            .await?;
        Ok(StatsRunInfo {
            completed: true,
            games_processed,
            users_touched: users.len(),
            last_processed: cursor,
        })
    }

    /// Write the freshly calculated snapshots at the window boundary
    /// and refresh the denormalized ratings on the affected users
    async fn write_stats(
        &self,
        db: &dyn Backend,
        timestamp: DateTime<Utc>,
        users: &HashMap<String, StatsRecord>,
    ) -> CoreResult<()> {
        // Delete previous snapshots at the same boundary so retries
        // land exactly one snapshot per user
        db.stats().delete_at(timestamp).await?;

        let mut records: Vec<StatsRecord> = Vec::with_capacity(users.len());
        for record in users.values() {
            let mut record = record.clone();
            record.timestamp = Some(timestamp);
            records.push(record);
        }
        db.stats().put_multi(&records).await?;

        for record in &records {
            let Some(user_id) = &record.user_id else {
                continue;
            };
            // A user may have been deleted since the game was played
            if db.users().get(user_id).await?.is_none() {
                continue;
            }
            db.users()
                .update(
                    user_id,
                    UserUpdate {
                        elo: Some(record.elo),
                        human_elo: Some(record.human_elo),
                        manual_elo: Some(record.manual_elo),
                        ..Default::default()
                    },
                )
                .await?;
        }
        Ok(())
    }

    /// Rebuild the top-100 ranking tables from the snapshot history.
    /// The whole table is deleted and recreated to avoid staleness.
    pub async fn rebuild_ratings(&self, session: &Session) -> CoreResult<()> {
        info!("Starting ratings rebuild");
        let db = session.backend();

        let timestamp = Utc::now();
        let yesterday = timestamp - Duration::days(1);
        let week_ago = timestamp - Duration::days(7);
        let month_ago = monthdelta(timestamp, -1);

        let mut rows: Vec<RatingRecord> =
            Vec::with_capacity(TOP_LIST_LEN * RATING_KINDS.len());
        for kind in RATING_KINDS {
            let top = db.stats().list_elo(kind, timestamp, TOP_LIST_LEN).await?;
            let t_yesterday = ranked_map(db, kind, yesterday).await?;
            let t_week_ago = ranked_map(db, kind, week_ago).await?;
            let t_month_ago = ranked_map(db, kind, month_ago).await?;

            for rank0 in 0..TOP_LIST_LEN {
                let rank = (rank0 + 1) as i32;
                let row = match top.get(rank0) {
                    Some(record) => {
                        let key = record.dict_key();
                        RatingRecord {
                            kind: kind.as_str().to_string(),
                            rank,
                            user_id: record.user_id.clone(),
                            robot_level: record.robot_level,
                            games: kind_games(record, kind),
                            elo: kind_elo(record, kind),
                            score: kind_score(record, kind),
                            score_against: kind_score_against(record, kind),
                            wins: kind_wins(record, kind),
                            losses: kind_losses(record, kind),
                            yesterday: historical(&t_yesterday, &key, kind),
                            week_ago: historical(&t_week_ago, &key, kind),
                            month_ago: historical(&t_month_ago, &key, kind),
                        }
                    }
                    // Sentinel rows fill the unused ranks
                    None => RatingRecord::sentinel(kind.as_str(), rank),
                };
                rows.push(row);
            }
        }

        db.ratings().replace_all(&rows).await?;
        db.completions()
            .add_completion(RATINGS_PROCTYPE, timestamp, timestamp)
            .await?;
        info!("Ratings rebuild finished");
        Ok(())
    }
}

const RATING_KINDS: [RatingKind; 3] = [RatingKind::All, RatingKind::Human, RatingKind::Manual];

fn seat_key(user_id: Option<&str>, robot_level: i32) -> String {
    match user_id {
        Some(user_id) => user_id.to_string(),
        None => format!("robot-{robot_level}"),
    }
}

fn seed(value: i32) -> i32 {
    if value > 0 {
        value
    } else {
        DEFAULT_ELO
    }
}

/// The newest snapshot at or before the window start, or a fresh
/// zeroed accumulator
async fn init_stat(
    db: &dyn Backend,
    from: DateTime<Utc>,
    user_id: Option<&str>,
    robot_level: i32,
) -> CoreResult<StatsRecord> {
    let robot_level = if user_id.is_none() { robot_level } else { 0 };
    match db.stats().newest_before(from, user_id, robot_level).await? {
        Some(mut record) => {
            record.timestamp = None;
            Ok(record)
        }
        None => Ok(StatsRecord::new(user_id.map(str::to_string), robot_level)),
    }
}

/// Apply the per-game counter updates to both accumulators
fn accumulate(
    urec0: &mut StatsRecord,
    urec1: &mut StatsRecord,
    s0: i32,
    s1: i32,
    robot_game: bool,
    manual_game: bool,
) {
    urec0.games += 1;
    urec1.games += 1;
    urec0.score += s0;
    urec1.score += s1;
    urec0.score_against += s1;
    urec1.score_against += s0;
    if s0 > s1 {
        urec0.wins += 1;
        urec1.losses += 1;
    } else if s1 > s0 {
        urec1.wins += 1;
        urec0.losses += 1;
    }
    if !robot_game {
        urec0.human_games += 1;
        urec1.human_games += 1;
        urec0.human_score += s0;
        urec1.human_score += s1;
        urec0.human_score_against += s1;
        urec1.human_score_against += s0;
        if s0 > s1 {
            urec0.human_wins += 1;
            urec1.human_losses += 1;
        } else if s1 > s0 {
            urec1.human_wins += 1;
            urec0.human_losses += 1;
        }
        if manual_game {
            urec0.manual_games += 1;
            urec1.manual_games += 1;
            urec0.manual_score += s0;
            urec1.manual_score += s1;
            urec0.manual_score_against += s1;
            urec1.manual_score_against += s0;
            if s0 > s1 {
                urec0.manual_wins += 1;
                urec1.manual_losses += 1;
            } else if s1 > s0 {
                urec1.manual_wins += 1;
                urec0.manual_losses += 1;
            }
        }
    }
}

/// The top list at a historical point, keyed for lookups, with ranks
async fn ranked_map(
    db: &dyn Backend,
    kind: RatingKind,
    ts: DateTime<Utc>,
) -> CoreResult<HashMap<String, (i32, StatsRecord)>> {
    let list = db.stats().list_elo(kind, ts, TOP_LIST_LEN).await?;
    Ok(list
        .into_iter()
        .enumerate()
        .map(|(ix, record)| (record.dict_key(), ((ix + 1) as i32, record)))
        .collect())
}

fn historical(
    table: &HashMap<String, (i32, StatsRecord)>,
    key: &str,
    kind: RatingKind,
) -> RatingSnapshot {
    match table.get(key) {
        Some((rank, record)) => RatingSnapshot {
            rank: *rank,
            games: kind_games(record, kind),
            elo: kind_elo(record, kind),
            score: kind_score(record, kind),
            score_against: kind_score_against(record, kind),
            wins: kind_wins(record, kind),
            losses: kind_losses(record, kind),
        },
        None => RatingSnapshot::default(),
    }
}

fn kind_games(record: &StatsRecord, kind: RatingKind) -> i32 {
    match kind {
        RatingKind::All => record.games,
        RatingKind::Human => record.human_games,
        RatingKind::Manual => record.manual_games,
    }
}

fn kind_elo(record: &StatsRecord, kind: RatingKind) -> i32 {
    match kind {
        RatingKind::All => record.elo,
        RatingKind::Human => record.human_elo,
        RatingKind::Manual => record.manual_elo,
    }
}

fn kind_score(record: &StatsRecord, kind: RatingKind) -> i32 {
    match kind {
        RatingKind::All => record.score,
        RatingKind::Human => record.human_score,
        RatingKind::Manual => record.manual_score,
    }
}

fn kind_score_against(record: &StatsRecord, kind: RatingKind) -> i32 {
    match kind {
        RatingKind::All => record.score_against,
        RatingKind::Human => record.human_score_against,
        RatingKind::Manual => record.manual_score_against,
    }
}

fn kind_wins(record: &StatsRecord, kind: RatingKind) -> i32 {
    match kind {
        RatingKind::All => record.wins,
        RatingKind::Human => record.human_wins,
        RatingKind::Manual => record.manual_wins,
    }
}

fn kind_losses(record: &StatsRecord, kind: RatingKind) -> i32 {
    match kind {
        RatingKind::All => record.losses,
        RatingKind::Human => record.human_losses,
        RatingKind::Manual => record.manual_losses,
    }
}

/// Scheduler entry point for the nightly stats run. Opens its own
/// request context; on failure a completion-log entry is written in a
/// fresh context so the record survives the rollback.
pub async fn run_stats_job(
    manager: &SessionManager,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    deadline: Option<DateTime<Utc>>,
) -> CoreResult<StatsRunInfo> {
    let service = StatsService::new();
    let result = manager
        .run(move |session| {
            async move { service.run_stats(session, from, to, deadline).await }.boxed()
        })
        .await;
    if let Err(err) = &result {
        error!("Stats run failed: {err}");
        let reason = err.to_string();
        let log_result = manager
            .run(move |session| {
                async move {
                    session
                        .completions()
                        .add_failure(STATS_PROCTYPE, from, to, &reason)
                        .await?;
                    Ok(())
                }
                .boxed()
            })
            .await;
        if let Err(log_err) = log_result {
            error!("Could not record stats failure: {log_err}");
        }
    }
    result
}

/// Scheduler entry point for the ratings rebuild
pub async fn run_ratings_job(manager: &SessionManager) -> CoreResult<()> {
    let service = StatsService::new();
    let result = manager
        .run(move |session| async move { service.rebuild_ratings(session).await }.boxed())
        .await;
    if let Err(err) = &result {
        error!("Ratings rebuild failed: {err}");
        let reason = err.to_string();
        let now = Utc::now();
        let log_result = manager
            .run(move |session| {
                async move {
                    session
                        .completions()
                        .add_failure(RATINGS_PROCTYPE, now, now, &reason)
                        .await?;
                    Ok(())
                }
                .boxed()
            })
            .await;
        if let Err(log_err) = log_result {
            error!("Could not record ratings failure: {log_err}");
        }
    }
    result
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn monthdelta_clamps_to_month_length() {
        let date = Utc.with_ymd_and_hms(2025, 3, 31, 12, 0, 0).single().unwrap();
        let back = monthdelta(date, -1);
        assert_eq!(back.month(), 2);
        assert_eq!(back.day(), 28);

        let forward = monthdelta(date, 1);
        assert_eq!(forward.month(), 4);
        assert_eq!(forward.day(), 30);
    }

    #[test]
    fn monthdelta_crosses_year_boundaries() {
        let date = Utc.with_ymd_and_hms(2025, 1, 15, 0, 0, 0).single().unwrap();
        let back = monthdelta(date, -1);
        assert_eq!(back.year(), 2024);
        assert_eq!(back.month(), 12);
    }

    #[test]
    fn deadline_reason_round_trips() {
        let cursor = (Utc::now(), "game-42".to_string());
        let reason = deadline_reason(&cursor);
        let parsed = parse_deadline_reason(&reason).expect("parseable reason");
        assert_eq!(parsed.1, "game-42");
        assert_eq!(parsed.0.timestamp(), cursor.0.timestamp());
    }

    #[test]
    fn accumulate_counts_triads() {
        let mut a = StatsRecord::new(Some("a".to_string()), 0);
        let mut b = StatsRecord::new(Some("b".to_string()), 0);
        accumulate(&mut a, &mut b, 300, 250, false, true);
        assert_eq!(a.games, 1);
        assert_eq!(a.human_games, 1);
        assert_eq!(a.manual_games, 1);
        assert_eq!(a.wins, 1);
        assert_eq!(b.losses, 1);
        assert_eq!(a.score, 300);
        assert_eq!(a.score_against, 250);
        assert_eq!(b.manual_score, 250);
        assert_eq!(b.manual_score_against, 300);
    }

    #[test]
    fn robot_games_skip_the_human_triads() {
        let mut a = StatsRecord::new(Some("a".to_string()), 0);
        let mut b = StatsRecord::new(None, 8);
        accumulate(&mut a, &mut b, 100, 200, true, false);
        assert_eq!(a.games, 1);
        assert_eq!(a.human_games, 0);
        assert_eq!(b.wins, 1);
    }
}
