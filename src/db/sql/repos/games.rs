use super::{json_to_prefs, prefs_to_json, sql_repository};
use crate::db::{
    records::{FinishedGameInfo, GameRecord, GameUpdate, LiveGameInfo},
    repos::GameRepository,
    sql::entities::games::{self, MoveList},
    DbError, DbResult,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, EntityTrait,
    IntoActiveModel, QueryFilter, QueryOrder, QuerySelect,
};

sql_repository!(SqlGameRepository);

pub(super) fn to_record(model: games::Model) -> GameRecord {
    GameRecord {
        id: model.id,
        player0_id: model.player0_id,
        player1_id: model.player1_id,
        locale: model.locale,
        rack0: model.rack0,
        rack1: model.rack1,
        irack0: model.irack0,
        irack1: model.irack1,
        score0: model.score0,
        score1: model.score1,
        to_move: model.to_move,
        robot_level: model.robot_level,
        over: model.over,
        timestamp: model.timestamp,
        ts_last_move: model.ts_last_move,
        moves: model.moves.0,
        prefs: json_to_prefs(model.prefs),
        tile_count: model.tile_count,
        elo0: model.elo0,
        elo1: model.elo1,
        elo0_adj: model.elo0_adj,
        elo1_adj: model.elo1_adj,
        human_elo0: model.human_elo0,
        human_elo1: model.human_elo1,
        human_elo0_adj: model.human_elo0_adj,
        human_elo1_adj: model.human_elo1_adj,
        manual_elo0: model.manual_elo0,
        manual_elo1: model.manual_elo1,
        manual_elo0_adj: model.manual_elo0_adj,
        manual_elo1_adj: model.manual_elo1_adj,
    }
}

fn from_record(game: &GameRecord) -> games::ActiveModel {
    games::ActiveModel {
        id: Set(game.id.clone()),
        player0_id: Set(game.player0_id.clone()),
        player1_id: Set(game.player1_id.clone()),
        locale: Set(game.locale.clone()),
        rack0: Set(game.rack0.clone()),
        rack1: Set(game.rack1.clone()),
        irack0: Set(game.irack0.clone()),
        irack1: Set(game.irack1.clone()),
        score0: Set(game.score0),
        score1: Set(game.score1),
        to_move: Set(game.to_move),
        robot_level: Set(game.robot_level),
        over: Set(game.over),
        timestamp: Set(game.timestamp),
        ts_last_move: Set(game.ts_last_move),
        moves: Set(MoveList(game.moves.clone())),
        prefs: Set(prefs_to_json(&game.prefs)),
        tile_count: Set(game.tile_count),
        elo0: Set(game.elo0),
        elo1: Set(game.elo1),
        elo0_adj: Set(game.elo0_adj),
        elo1_adj: Set(game.elo1_adj),
        human_elo0: Set(game.human_elo0),
        human_elo1: Set(game.human_elo1),
        human_elo0_adj: Set(game.human_elo0_adj),
        human_elo1_adj: Set(game.human_elo1_adj),
        manual_elo0: Set(game.manual_elo0),
        manual_elo1: Set(game.manual_elo1),
        manual_elo0_adj: Set(game.manual_elo0_adj),
        manual_elo1_adj: Set(game.manual_elo1_adj),
    }
}

fn apply_update(model: games::Model, update: GameUpdate) -> games::ActiveModel {
    let mut active = model.into_active_model();
    if let Some(player0_id) = update.player0_id {
        active.player0_id = Set(player0_id);
    }
    if let Some(player1_id) = update.player1_id {
        active.player1_id = Set(player1_id);
    }
    if let Some(rack0) = update.rack0 {
        active.rack0 = Set(rack0);
    }
    if let Some(rack1) = update.rack1 {
        active.rack1 = Set(rack1);
    }
    if let Some(score0) = update.score0 {
        active.score0 = Set(score0);
    }
    if let Some(score1) = update.score1 {
        active.score1 = Set(score1);
    }
    if let Some(to_move) = update.to_move {
        active.to_move = Set(to_move);
    }
    if let Some(over) = update.over {
        active.over = Set(over);
    }
    if let Some(ts_last_move) = update.ts_last_move {
        active.ts_last_move = Set(ts_last_move);
    }
    if let Some(moves) = update.moves {
        active.moves = Set(MoveList(moves));
    }
    if let Some(tile_count) = update.tile_count {
        active.tile_count = Set(tile_count);
    }
    if let Some(elo0) = update.elo0 {
        active.elo0 = Set(elo0);
    }
    if let Some(elo1) = update.elo1 {
        active.elo1 = Set(elo1);
    }
    if let Some(elo0_adj) = update.elo0_adj {
        active.elo0_adj = Set(elo0_adj);
    }
    if let Some(elo1_adj) = update.elo1_adj {
        active.elo1_adj = Set(elo1_adj);
    }
    if let Some(human_elo0) = update.human_elo0 {
        active.human_elo0 = Set(human_elo0);
    }
    if let Some(human_elo1) = update.human_elo1 {
        active.human_elo1 = Set(human_elo1);
    }
    if let Some(human_elo0_adj) = update.human_elo0_adj {
        active.human_elo0_adj = Set(human_elo0_adj);
    }
    if let Some(human_elo1_adj) = update.human_elo1_adj {
        active.human_elo1_adj = Set(human_elo1_adj);
    }
    if let Some(manual_elo0) = update.manual_elo0 {
        active.manual_elo0 = Set(manual_elo0);
    }
    if let Some(manual_elo1) = update.manual_elo1 {
        active.manual_elo1 = Set(manual_elo1);
    }
    if let Some(manual_elo0_adj) = update.manual_elo0_adj {
        active.manual_elo0_adj = Set(manual_elo0_adj);
    }
    if let Some(manual_elo1_adj) = update.manual_elo1_adj {
        active.manual_elo1_adj = Set(manual_elo1_adj);
    }
    active
}

fn finished_game_info(game: GameRecord, user_id: &str) -> FinishedGameInfo {
    let from_p0 = game.player0_id.as_deref() == Some(user_id);
    let (opp, sc0, sc1, elo_adj, human_elo_adj) = if from_p0 {
        (
            game.player1_id,
            game.score0,
            game.score1,
            game.elo0_adj,
            game.human_elo0_adj,
        )
    } else {
        (
            game.player0_id,
            game.score1,
            game.score0,
            game.elo1_adj,
            game.human_elo1_adj,
        )
    };
    FinishedGameInfo {
        uuid: game.id,
        ts: game.timestamp,
        ts_last_move: game.ts_last_move,
        opp,
        robot_level: game.robot_level,
        sc0,
        sc1,
        elo_adj,
        human_elo_adj,
        prefs: game.prefs,
        locale: game.locale,
    }
}

fn live_game_info(game: GameRecord, user_id: &str) -> LiveGameInfo {
    let from_p0 = game.player0_id.as_deref() == Some(user_id);
    let (opp, sc0, sc1, my_turn) = if from_p0 {
        (game.player1_id, game.score0, game.score1, game.to_move == 0)
    } else {
        (game.player0_id, game.score1, game.score0, game.to_move == 1)
    };
    LiveGameInfo {
        uuid: game.id,
        ts: game.ts_last_move,
        opp,
        robot_level: game.robot_level,
        my_turn,
        sc0,
        sc1,
        prefs: game.prefs,
        tile_count: game.tile_count,
        locale: game.locale,
    }
}

/// Seat condition: the user occupies either side, optionally against a
/// specific opponent
fn seat_condition(user_id: &str, versus: Option<&str>) -> Condition {
    match versus {
        Some(versus) => Condition::any()
            .add(
                Condition::all()
                    .add(games::Column::Player0Id.eq(user_id))
                    .add(games::Column::Player1Id.eq(versus)),
            )
            .add(
                Condition::all()
                    .add(games::Column::Player0Id.eq(versus))
                    .add(games::Column::Player1Id.eq(user_id)),
            ),
        None => Condition::any()
            .add(games::Column::Player0Id.eq(user_id))
            .add(games::Column::Player1Id.eq(user_id)),
    }
}

#[async_trait]
impl GameRepository for SqlGameRepository {
    async fn get(&self, game_id: &str) -> DbResult<Option<GameRecord>> {
        let conn = self.session.conn().await?;
        Ok(games::Entity::find_by_id(game_id)
            .one(&*conn)
            .await?
            .map(to_record))
    }

    async fn create(&self, game: &GameRecord) -> DbResult<()> {
        let conn = self.session.conn().await?;
        from_record(game).insert(&*conn).await?;
        Ok(())
    }

    async fn update(&self, game_id: &str, update: GameUpdate) -> DbResult<()> {
        let conn = self.session.conn().await?;
        let model = games::Entity::find_by_id(game_id)
            .one(&*conn)
            .await?
            .ok_or_else(|| {
                DbError::Sql(sea_orm::DbErr::RecordNotFound(format!("game {game_id}")))
            })?;
        apply_update(model, update).update(&*conn).await?;
        Ok(())
    }

    async fn delete(&self, game_id: &str) -> DbResult<()> {
        let conn = self.session.conn().await?;
        games::Entity::delete_by_id(game_id).exec(&*conn).await?;
        Ok(())
    }

    async fn list_finished_games(
        &self,
        user_id: &str,
        versus: Option<&str>,
        max_len: usize,
    ) -> DbResult<Vec<FinishedGameInfo>> {
        let conn = self.session.conn().await?;
        let models = games::Entity::find()
            .filter(games::Column::Over.eq(true))
            .filter(seat_condition(user_id, versus))
            .order_by_desc(games::Column::TsLastMove)
            .limit(max_len as u64)
            .all(&*conn)
            .await?;
        Ok(models
            .into_iter()
            .map(|model| finished_game_info(to_record(model), user_id))
            .collect())
    }

    async fn list_live_games(
        &self,
        user_id: &str,
        max_len: usize,
    ) -> DbResult<Vec<LiveGameInfo>> {
        let conn = self.session.conn().await?;
        let models = games::Entity::find()
            .filter(games::Column::Over.eq(false))
            .filter(seat_condition(user_id, None))
            .order_by_desc(games::Column::TsLastMove)
            .limit(max_len as u64)
            .all(&*conn)
            .await?;
        Ok(models
            .into_iter()
            .map(|model| live_game_info(to_record(model), user_id))
            .collect())
    }

    async fn list_finished_between(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        cursor: Option<(DateTime<Utc>, String)>,
        limit: usize,
    ) -> DbResult<Vec<GameRecord>> {
        let conn = self.session.conn().await?;
        let mut query = games::Entity::find()
            .filter(games::Column::Over.eq(true))
            .filter(games::Column::TsLastMove.gt(from))
            .filter(games::Column::TsLastMove.lte(to));
        if let Some((cursor_ts, cursor_id)) = cursor {
            query = query.filter(
                Condition::any()
                    .add(games::Column::TsLastMove.gt(cursor_ts))
                    .add(
                        Condition::all()
                            .add(games::Column::TsLastMove.eq(cursor_ts))
                            .add(games::Column::Id.gt(cursor_id)),
                    ),
            );
        }
        let models = query
            .order_by_asc(games::Column::TsLastMove)
            .order_by_asc(games::Column::Id)
            .limit(limit as u64)
            .all(&*conn)
            .await?;
        Ok(models.into_iter().map(to_record).collect())
    }

    async fn detach_user(&self, user_id: &str) -> DbResult<()> {
        let conn = self.session.conn().await?;
        games::Entity::update_many()
            .col_expr(games::Column::Player0Id, Expr::value(Option::<String>::None))
            .filter(games::Column::Player0Id.eq(user_id))
            .exec(&*conn)
            .await?;
        games::Entity::update_many()
            .col_expr(games::Column::Player1Id, Expr::value(Option::<String>::None))
            .filter(games::Column::Player1Id.eq(user_id))
            .exec(&*conn)
            .await?;
        Ok(())
    }
}
