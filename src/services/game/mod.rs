//! Game lifecycle: creation, move application with optimistic
//! concurrency, robot turns, timing and finalization.

use crate::db::{
    records::{prefs_bool, GameRecord, GameUpdate, MoveRecord, PrefsMap, UserRecord, UserUpdate},
    Backend, Session,
};
use crate::error::{CoreError, CoreResult};
use crate::locales::Locale;
use crate::services::{
    elo::{self, GameEloUpdate},
    notify_user, MoveGenerator, Notifier, NotifyEvent, WordValidator,
};
use chrono::{DateTime, Duration, Utc};
use log::info;
use rand::Rng;
use std::sync::Arc;

pub mod board;
pub mod moves;
pub mod state;

use moves::PlayedMove;
use state::GameState;

/// The maximum overtime in a game, after which a player automatically
/// loses. Changing this requires external confirmation.
pub const MAX_OVERTIME_SECS: f64 = 10.0 * 60.0;

/// After this many days without a move the game becomes overdue and the
/// waiting player can force the tardy opponent to resign
pub const OVERDUE_DAYS: i64 = 14;

/// The available robot opponents: (name, minimum level)
const AUTOPLAYERS: [(&str, i32); 3] = [
    ("Strongest", 0),
    ("Moderate", 8),
    ("Cautious", 15),
];

/// Display name of the robot at a given difficulty level
pub fn autoplayer_name(level: i32) -> &'static str {
    let mut ix = AUTOPLAYERS.len();
    while ix > 0 {
        ix -= 1;
        if level >= AUTOPLAYERS[ix].1 {
            return AUTOPLAYERS[ix].0;
        }
    }
    AUTOPLAYERS[0].0
}

/// One registered move of a game, with the player who made it
#[derive(Debug, Clone)]
pub struct GameMove {
    pub player: usize,
    pub record: MoveRecord,
}

/// A game in play or completed, reconstructed from its stored record
pub struct Game {
    pub uuid: String,
    pub timestamp: DateTime<Utc>,
    pub ts_last_move: DateTime<Utc>,
    /// None means the seat is held by the robot
    pub player_ids: [Option<String>; 2],
    pub robot_level: i32,
    pub state: GameState,
    pub moves: Vec<GameMove>,
    pub initial_racks: [String; 2],
    pub prefs: PrefsMap,
    pub locale: Locale,
    /// Synthetic summary records produced by finalization
    final_summary: Vec<(usize, MoveRecord)>,
}

impl Game {
    /// Reconstruct a game from its persistent record by replaying the
    /// move list over the initial racks
    pub fn from_record(record: &GameRecord) -> CoreResult<Game> {
        let new_bag = prefs_bool(&record.prefs, "newbag");
        let locale = Locale::for_game(&record.locale, new_bag);

        let mut state = GameState::empty();
        state.set_rack(0, &record.rack0);
        state.set_rack(1, &record.rack1);

        let mut moves = Vec::with_capacity(record.moves.len());
        let mut player = 0usize;
        for move_record in &record.moves {
            let Some(mv) = PlayedMove::from_record(move_record) else {
                continue;
            };
            state.apply_move(&locale, &mv, true)?;
            moves.push(GameMove {
                player,
                record: move_record.clone(),
            });
            player = 1 - player;
        }
        state.recalc_bag(locale.tile_set);

        let mut game = Game {
            uuid: record.id.clone(),
            timestamp: record.timestamp,
            ts_last_move: record.ts_last_move,
            player_ids: [record.player0_id.clone(), record.player1_id.clone()],
            robot_level: record.robot_level,
            state,
            moves,
            initial_racks: [record.irack0.clone(), record.irack1.clone()],
            prefs: record.prefs.clone(),
            locale,
            final_summary: Vec::new(),
        };
        if record.over {
            // Recompute the final adjustments deterministically
            game.finalize_score(Utc::now());
        }
        Ok(game)
    }

    /// Serialize the game into its persistent record shape
    pub fn to_record(&self) -> GameRecord {
        let scores = self.state.final_scores();
        GameRecord {
            id: self.uuid.clone(),
            player0_id: self.player_ids[0].clone(),
            player1_id: self.player_ids[1].clone(),
            locale: self.locale.code.clone(),
            rack0: self.state.rack(0),
            rack1: self.state.rack(1),
            irack0: self.initial_racks[0].clone(),
            irack1: self.initial_racks[1].clone(),
            score0: scores[0],
            score1: scores[1],
            to_move: (self.moves.len() % 2) as i32,
            robot_level: self.robot_level,
            over: self.is_over(Utc::now()),
            timestamp: self.timestamp,
            ts_last_move: self.ts_last_move,
            moves: self.moves.iter().map(|m| m.record.clone()).collect(),
            prefs: self.prefs.clone(),
            tile_count: self.state.board().num_tiles() as i32,
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

    /// Per-player duration in minutes; 0 means untimed
    pub fn duration_minutes(&self) -> i64 {
        self.prefs
            .get("duration")
            .and_then(serde_json::Value::as_i64)
            .unwrap_or(0)
    }

    pub fn manual_wordcheck(&self) -> bool {
        prefs_bool(&self.prefs, "manual")
    }

    /// Elapsed thinking time of both players, in seconds
    pub fn get_elapsed(&self, now: DateTime<Utc>) -> [f64; 2] {
        let mut elapsed = [0.0, 0.0];
        let mut last_ts = self.timestamp;
        for game_move in &self.moves {
            let delta = game_move.record.timestamp - last_ts;
            last_ts = game_move.record.timestamp;
            elapsed[game_move.player] += delta.num_milliseconds() as f64 / 1000.0;
        }
        if !self.state.is_game_over() {
            // Game still going on: the player to move is on the clock
            let delta = now - last_ts;
            elapsed[self.state.player_to_move()] += delta.num_milliseconds() as f64 / 1000.0;
        }
        elapsed
    }

    /// Overtime of both players, in seconds; zero for untimed games
    pub fn overtime(&self, now: DateTime<Utc>) -> [f64; 2] {
        let duration = self.duration_minutes() as f64 * 60.0;
        if duration <= 0.0 {
            return [0.0, 0.0];
        }
        let elapsed = self.get_elapsed(now);
        [
            (elapsed[0] - duration).max(0.0),
            (elapsed[1] - duration).max(0.0),
        ]
    }

    /// Score adjustments due to overtime: 10 points per started minute,
    /// capped at -100
    pub fn overtime_adjustment(&self, now: DateTime<Utc>) -> [i32; 2] {
        let overtime = self.overtime(now);
        let mut adjustment = [0, 0];
        for player in 0..2 {
            if overtime[player] > 0.0 {
                // 0.1 seconds into a new minute already incurs the
                // 10 point deduction
                let started_minutes = ((overtime[player] + 0.9) as i64 + 59) / 60;
                adjustment[player] = (-10 * started_minutes as i32).max(-100);
            }
        }
        adjustment
    }

    /// Which player has exceeded the overtime threshold, if any
    fn lost_on_overtime(&self, now: DateTime<Utc>) -> Option<usize> {
        let overtime = self.overtime(now);
        (0..2).find(|ix| overtime[*ix] >= MAX_OVERTIME_SECS)
    }

    /// The game is over on a terminal move or when either player has
    /// run out the clock; checked on any state query, not only on moves
    pub fn is_over(&self, now: DateTime<Utc>) -> bool {
        if self.state.is_game_over() {
            return true;
        }
        if self.duration_minutes() == 0 {
            return false;
        }
        self.lost_on_overtime(now).is_some()
    }

    /// True if no move has been made for the overdue threshold
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        now - self.ts_last_move >= Duration::days(OVERDUE_DAYS)
    }

    /// Apply the final score adjustments and build the synthetic
    /// summary records ("TIME", "OVER", rack leaves)
    pub fn finalize_score(&mut self, now: DateTime<Utc>) {
        if self.state.is_finalized() {
            return;
        }
        let last_player = match self.moves.last() {
            Some(game_move) => game_move.player,
            None => 1 - self.state.player_to_move(),
        };
        let opponent = 1 - last_player;
        let lost_on_overtime = self.lost_on_overtime(now);
        let overtime_adj = self.overtime_adjustment(now);

        // Racks as they stand before the adjustment
        let last_rack = self.state.rack(last_player);
        let opp_rack = self.state.rack(opponent);
        let opp_rack_score = self.locale.tile_set.score(&opp_rack);
        let last_rack_score = self.locale.tile_set.score(&last_rack);

        self.state.finalize_score(
            last_player,
            lost_on_overtime,
            overtime_adj,
            self.locale.tile_set,
        );

        let summary = |tiles: String, score: i32| MoveRecord {
            coord: String::new(),
            tiles,
            score,
            rack: String::new(),
            timestamp: now,
        };

        let mut records: Vec<(usize, MoveRecord)> = Vec::new();
        if !self.state.is_resigned() {
            let adjustment = self.state.overtime_adjustments();
            if lost_on_overtime.is_none() {
                if last_rack.is_empty() {
                    // Went out: double the opponent's rack leave
                    records.push((opponent, summary("--".to_string(), 0)));
                    records.push((
                        last_player,
                        summary(format!("2 * {opp_rack}"), 2 * opp_rack_score),
                    ));
                } else {
                    // Ended by passes: each side loses their own rack
                    records.push((opponent, summary(opp_rack.clone(), -opp_rack_score)));
                    records.push((last_player, summary(last_rack.clone(), -last_rack_score)));
                }
            }
            if adjustment != [0, 0] {
                records.push((opponent, summary("TIME".to_string(), adjustment[opponent])));
                records.push((
                    last_player,
                    summary("TIME".to_string(), adjustment[last_player]),
                ));
            }
        }
        records.push((opponent, summary("OVER".to_string(), 0)));
        self.final_summary = records;
    }

    /// The synthetic summary records produced by finalization, in the
    /// order they should be displayed after the last real move
    pub fn final_adjustments(&self) -> &[(usize, MoveRecord)] {
        &self.final_summary
    }

    pub fn final_scores(&self) -> [i32; 2] {
        self.state.final_scores()
    }

    pub fn num_moves(&self) -> usize {
        self.moves.len()
    }

    pub fn player_index(&self, user_id: &str) -> Option<usize> {
        (0..2).find(|ix| self.player_ids[*ix].as_deref() == Some(user_id))
    }

    pub fn is_autoplayer(&self, player: usize) -> bool {
        self.player_ids[player].is_none()
    }

    pub fn is_robot_game(&self) -> bool {
        self.is_autoplayer(0) || self.is_autoplayer(1)
    }

    /// User id of the player whose turn it is, or None for the robot
    pub fn player_id_to_move(&self) -> Option<&str> {
        self.player_ids[self.state.player_to_move()].as_deref()
    }

    pub fn my_turn(&self, user_id: &str, now: DateTime<Utc>) -> bool {
        !self.is_over(now) && self.player_id_to_move() == Some(user_id)
    }

    /// Register a move for the player whose turn it is
    pub fn register_move(
        &mut self,
        mv: &PlayedMove,
        now: DateTime<Utc>,
    ) -> CoreResult<state::AppliedMove> {
        let player = self.state.player_to_move();
        let applied = self.state.apply_move(&self.locale, mv, false)?;
        self.ts_last_move = now;
        self.moves.push(GameMove {
            player,
            record: MoveRecord {
                coord: applied.coord.clone(),
                tiles: applied.tiles.clone(),
                score: applied.score,
                rack: self.state.rack(player),
                timestamp: now,
            },
        });
        Ok(applied)
    }

    /// The game state after the first `move_number` moves, replayed
    /// from the initial racks, for review
    pub fn state_after_move(&self, move_number: usize) -> CoreResult<GameState> {
        let mut state = GameState::empty();
        for ix in 0..2 {
            if self.initial_racks[ix].is_empty() {
                // Games stored without rack information fall back to
                // the current racks
                state.set_rack(ix, &self.state.rack(ix));
            } else {
                state.set_rack(ix, &self.initial_racks[ix]);
            }
        }
        for game_move in self.moves.iter().take(move_number) {
            if let Some(mv) = PlayedMove::from_record(&game_move.record) {
                state.apply_move(&self.locale, &mv, true)?;
                state.set_rack(game_move.player, &game_move.record.rack);
            }
        }
        state.recalc_bag(self.locale.tile_set);
        Ok(state)
    }
}

/// The result of a submitted move, as returned to the caller
pub struct MoveOutcome {
    pub game: Game,
    /// The Elo state recorded if this move finalized the game
    pub elo: Option<GameEloUpdate>,
}

#[derive(Clone)]
pub struct GameService {
    generator: Arc<dyn MoveGenerator>,
    validator: Arc<dyn WordValidator>,
    notifier: Arc<dyn Notifier>,
}

impl GameService {
    pub fn new(
        generator: Arc<dyn MoveGenerator>,
        validator: Arc<dyn WordValidator>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            generator,
            validator,
            notifier,
        }
    }

    /// Start a new game. Seats are swapped at random for fair
    /// first-move selection; if the first seat is the robot's, its
    /// opening move is generated before the game is stored.
    pub async fn new_game(
        &self,
        session: &Session,
        player0_id: Option<&str>,
        player1_id: Option<&str>,
        robot_level: i32,
        prefs: PrefsMap,
        locale_code: &str,
    ) -> CoreResult<Game> {
        self.create_game(
            session.backend(),
            player0_id,
            player1_id,
            robot_level,
            prefs,
            locale_code,
        )
        .await
    }

    /// Create and store a game within an already-open unit of work;
    /// used directly when creation must be atomic with other writes,
    /// such as accepting a challenge
    pub(crate) async fn create_game(
        &self,
        db: &dyn Backend,
        player0_id: Option<&str>,
        player1_id: Option<&str>,
        robot_level: i32,
        prefs: PrefsMap,
        locale_code: &str,
    ) -> CoreResult<Game> {
        let (mut p0, mut p1) = (
            player0_id.map(str::to_string),
            player1_id.map(str::to_string),
        );
        if rand::thread_rng().gen_bool(0.5) {
            std::mem::swap(&mut p0, &mut p1);
        }

        let new_bag = prefs_bool(&prefs, "newbag");
        let locale = Locale::for_game(locale_code, new_bag);
        let state = GameState::new(locale.tile_set);
        let now = Utc::now();

        let mut game = Game {
            uuid: db.generate_id(),
            timestamp: now,
            ts_last_move: now,
            player_ids: [p0, p1],
            robot_level,
            initial_racks: [state.rack(0), state.rack(1)],
            state,
            moves: Vec::new(),
            prefs,
            locale,
            final_summary: Vec::new(),
        };

        if game.player_id_to_move().is_none() {
            // The robot moves first
            let mv = self
                .generator
                .generate_move(&game.state, &game.locale, robot_level);
            game.register_move(&mv, Utc::now())?;
        }

        db.games().create(&game.to_record()).await?;
        info!(
            "Started game {} in locale {}",
            game.uuid, game.locale.code
        );
        Ok(game)
    }

    /// Load a game. If a timed game has silently been lost on overtime,
    /// loading it performs the finalization; the move path then sees an
    /// already finished game.
    pub async fn load_game(&self, session: &Session, game_id: &str) -> CoreResult<Option<Game>> {
        let Some(record) = session.games().get(game_id).await? else {
            return Ok(None);
        };
        let now = Utc::now();
        let game = Game::from_record(&record)?;
        if !record.over && game.is_over(now) {
            // Lost on overtime since the last store
            let game_id = game_id.to_string();
            let outcome = session
                .transact(move |db| {
                    Box::pin(async move {
                        let Some(record) = db.games().get(&game_id).await? else {
                            return Err(CoreError::NotFound);
                        };
                        let mut game = Game::from_record(&record)?;
                        let elo = finalize_game(db, &mut game, None).await?;
                        Ok((game, elo))
                    })
                })
                .await?;
            return Ok(Some(outcome.0));
        }
        Ok(Some(game))
    }

    /// Apply a move submitted by a player. `mcount` is the move count
    /// the client saw; a mismatch means a stale client and is rejected
    /// without effect. Finalizing moves trigger the Elo update within
    /// the same unit of work.
    pub async fn submit_move(
        &self,
        session: &Session,
        game_id: &str,
        user_id: &str,
        mcount: usize,
        mv: PlayedMove,
    ) -> CoreResult<MoveOutcome> {
        let generator = self.generator.clone();
        let validator = self.validator.clone();
        let game_id = game_id.to_string();
        let user_id = user_id.to_string();
        let (outcome, opponent) = session
            .transact(move |db| {
                Box::pin(async move {
                    let Some(record) = db.games().get(&game_id).await? else {
                        return Err(CoreError::NotFound);
                    };
                    let now = Utc::now();
                    let mut game = Game::from_record(&record)?;

                    let Some(player) = game.player_index(&user_id) else {
                        return Err(CoreError::Forbidden);
                    };

                    if record.over || game.is_over(now) {
                        if !record.over {
                            // Detected loss on overtime: the move path
                            // performs the transition the reload path
                            // would otherwise make
                            let elo = finalize_game(db, &mut game, Some(&user_id)).await?;
                            return Ok((
                                MoveOutcome {
                                    game,
                                    elo: Some(elo),
                                },
                                None,
                            ));
                        }
                        return Err(CoreError::IllegalState("game is over".to_string()));
                    }

                    if game.state.player_to_move() != player {
                        return Err(CoreError::IllegalState("not your turn".to_string()));
                    }
                    if mcount != game.num_moves() {
                        return Err(CoreError::Conflict(format!(
                            "stale move count {mcount}, game has {}",
                            game.num_moves()
                        )));
                    }

                    let applied = game.register_move(&mv, now)?;
                    if !applied.words.is_empty() && !game.manual_wordcheck() {
                        // Full wordlist validation is delegated
                        if !validator.is_valid_placement(
                            &applied.words,
                            &game.locale,
                            &game.locale.vocabulary,
                        ) {
                            return Err(CoreError::IllegalMove(format!(
                                "invalid word '{}'",
                                applied.words[0]
                            )));
                        }
                    }

                    // The robot answers within the same request
                    let opponent_seat = 1 - player;
                    if game.is_autoplayer(opponent_seat) && !game.is_over(Utc::now()) {
                        let robot_move = generator.generate_move(
                            &game.state,
                            &game.locale,
                            game.robot_level,
                        );
                        game.register_move(&robot_move, Utc::now())?;
                    }

                    let now = Utc::now();
                    let elo = if game.is_over(now) {
                        Some(finalize_game(db, &mut game, Some(&user_id)).await?)
                    } else {
                        store_game(db, &game, None).await?;
                        None
                    };

                    let opponent = game.player_ids[opponent_seat].clone();
                    Ok((MoveOutcome { game, elo }, opponent))
                })
            })
            .await?;

        if let Some(opponent) = opponent {
            notify_user(&self.notifier, &opponent, NotifyEvent::Move).await;
        }
        Ok(outcome)
    }

    /// Force the tardy opponent of an overdue game to resign. Only the
    /// waiting player may do this, and only once the game is overdue.
    pub async fn force_resign(
        &self,
        session: &Session,
        game_id: &str,
        user_id: &str,
        mcount: usize,
    ) -> CoreResult<MoveOutcome> {
        let game_id = game_id.to_string();
        let user_id = user_id.to_string();
        let outcome = session
            .transact(move |db| {
                Box::pin(async move {
                    let Some(record) = db.games().get(&game_id).await? else {
                        return Err(CoreError::NotFound);
                    };
                    let now = Utc::now();
                    let mut game = Game::from_record(&record)?;

                    let Some(player) = game.player_index(&user_id) else {
                        return Err(CoreError::Forbidden);
                    };
                    if record.over || game.is_over(now) {
                        return Err(CoreError::IllegalState("game is over".to_string()));
                    }
                    if game.state.player_to_move() == player {
                        return Err(CoreError::IllegalState(
                            "it is your own turn".to_string(),
                        ));
                    }
                    if !game.is_overdue(now) {
                        return Err(CoreError::IllegalState("game is not overdue".to_string()));
                    }
                    if mcount != game.num_moves() {
                        return Err(CoreError::Conflict(format!(
                            "stale move count {mcount}, game has {}",
                            game.num_moves()
                        )));
                    }

                    // The resignation is registered on behalf of the
                    // player whose turn it is
                    game.register_move(&PlayedMove::Resign, now)?;
                    let elo = finalize_game(db, &mut game, Some(&user_id)).await?;
                    Ok(MoveOutcome {
                        game,
                        elo: Some(elo),
                    })
                })
            })
            .await?;
        Ok(outcome)
    }

    /// Acknowledge a finished game, removing it from the zombie list
    pub async fn acknowledge_finished(
        &self,
        session: &Session,
        game_id: &str,
        user_id: &str,
    ) -> CoreResult<()> {
        session.zombies().delete_game(game_id, user_id).await?;
        Ok(())
    }

    /// Ongoing games of a user, newest move first
    pub async fn live_games(
        &self,
        session: &Session,
        user_id: &str,
        max_len: usize,
    ) -> CoreResult<Vec<crate::db::records::LiveGameInfo>> {
        Ok(session.games().list_live_games(user_id, max_len).await?)
    }

    /// Completed games of a user from their own perspective, newest
    /// last-move first, optionally against one opponent
    pub async fn finished_games(
        &self,
        session: &Session,
        user_id: &str,
        versus: Option<&str>,
        max_len: usize,
    ) -> CoreResult<Vec<crate::db::records::FinishedGameInfo>> {
        Ok(session
            .games()
            .list_finished_games(user_id, versus, max_len)
            .await?)
    }

    /// Finished games the user has not yet acknowledged
    pub async fn zombie_games(
        &self,
        session: &Session,
        user_id: &str,
    ) -> CoreResult<Vec<crate::db::records::ZombieGameInfo>> {
        Ok(session.zombies().list_games(user_id).await?)
    }
}

/// Store the game record, optionally with the Elo-at-finalize fields
async fn store_game(
    db: &dyn Backend,
    game: &Game,
    elo: Option<&GameEloUpdate>,
) -> CoreResult<()> {
    let record = game.to_record();
    let mut update = GameUpdate {
        player0_id: Some(record.player0_id.clone()),
        player1_id: Some(record.player1_id.clone()),
        rack0: Some(record.rack0.clone()),
        rack1: Some(record.rack1.clone()),
        score0: Some(record.score0),
        score1: Some(record.score1),
        to_move: Some(record.to_move),
        over: Some(record.over),
        ts_last_move: Some(record.ts_last_move),
        moves: Some(record.moves.clone()),
        tile_count: Some(record.tile_count),
        ..Default::default()
    };
    if let Some(elo) = elo {
        update.elo0 = Some(elo.elo0);
        update.elo1 = Some(elo.elo1);
        update.elo0_adj = Some(elo.elo0_adj);
        update.elo1_adj = Some(elo.elo1_adj);
        update.human_elo0 = Some(elo.human_elo0);
        update.human_elo1 = Some(elo.human_elo1);
        update.human_elo0_adj = Some(elo.human_elo0_adj);
        update.human_elo1_adj = Some(elo.human_elo1_adj);
        update.manual_elo0 = Some(elo.manual_elo0);
        update.manual_elo1 = Some(elo.manual_elo1);
        update.manual_elo0_adj = Some(elo.manual_elo0_adj);
        update.manual_elo1_adj = Some(elo.manual_elo1_adj);
    }
    db.games().update(&game.uuid, update).await?;
    Ok(())
}

/// Finalize a game that has just ended: settle the score, record the
/// Elo state, store the game, create zombie entries for the human
/// participants other than the acting player, and bump game counters
async fn finalize_game(
    db: &dyn Backend,
    game: &mut Game,
    actor: Option<&str>,
) -> CoreResult<GameEloUpdate> {
    let now = Utc::now();
    game.finalize_score(now);

    let u0 = match &game.player_ids[0] {
        Some(id) => db.users().get(id).await?,
        None => None,
    };
    let u1 = match &game.player_ids[1] {
        Some(id) => db.users().get(id).await?,
        None => None,
    };

    let mut record = game.to_record();
    record.over = true;
    let scores = game.final_scores();
    record.score0 = scores[0];
    record.score1 = scores[1];

    let elo = elo::update_elo_for_game(db, &record, u0.as_ref(), u1.as_ref()).await?;
    store_game(db, game, Some(&elo)).await?;

    for seat in 0..2 {
        if let Some(player_id) = &game.player_ids[seat] {
            if actor != Some(player_id.as_str()) {
                db.zombies().add_game(&game.uuid, player_id).await?;
            }
        }
    }

    // Career game counters
    for user in [&u0, &u1].into_iter().flatten() {
        bump_game_count(db, user).await?;
    }

    info!("Game {} finalized ({} - {})", game.uuid, scores[0], scores[1]);
    Ok(elo)
}

async fn bump_game_count(db: &dyn Backend, user: &UserRecord) -> CoreResult<()> {
    db.users()
        .update(
            &user.id,
            UserUpdate {
                games: Some(user.games + 1),
                ..Default::default()
            },
        )
        .await?;
    Ok(())
}
