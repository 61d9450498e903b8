use super::sql_repository;
use crate::db::{
    records::{RatingKind, StatsRecord},
    repos::StatsRepository,
    sql::entities::stats,
    DbResult,
};
use crate::utils::ids::generate_id;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, QueryFilter,
    QueryOrder, Statement,
};

sql_repository!(SqlStatsRepository);

/// SQLite's default bind-variable limit caps insert batches
const INSERT_CHUNK: usize = 20;

fn to_record(model: stats::Model) -> StatsRecord {
    StatsRecord {
        user_id: model.user_id,
        robot_level: model.robot_level,
        timestamp: Some(model.timestamp),
        games: model.games,
        human_games: model.human_games,
        manual_games: model.manual_games,
        elo: model.elo,
        human_elo: model.human_elo,
        manual_elo: model.manual_elo,
        score: model.score,
        human_score: model.human_score,
        manual_score: model.manual_score,
        score_against: model.score_against,
        human_score_against: model.human_score_against,
        manual_score_against: model.manual_score_against,
        wins: model.wins,
        losses: model.losses,
        human_wins: model.human_wins,
        human_losses: model.human_losses,
        manual_wins: model.manual_wins,
        manual_losses: model.manual_losses,
    }
}

fn from_record(record: &StatsRecord, timestamp: DateTime<Utc>) -> stats::ActiveModel {
    stats::ActiveModel {
        id: Set(generate_id()),
        user_id: Set(record.user_id.clone()),
        robot_level: Set(record.robot_level),
        timestamp: Set(timestamp),
        games: Set(record.games),
        human_games: Set(record.human_games),
        manual_games: Set(record.manual_games),
        elo: Set(record.elo),
        human_elo: Set(record.human_elo),
        manual_elo: Set(record.manual_elo),
        score: Set(record.score),
        human_score: Set(record.human_score),
        manual_score: Set(record.manual_score),
        score_against: Set(record.score_against),
        human_score_against: Set(record.human_score_against),
        manual_score_against: Set(record.manual_score_against),
        wins: Set(record.wins),
        losses: Set(record.losses),
        human_wins: Set(record.human_wins),
        human_losses: Set(record.human_losses),
        manual_wins: Set(record.manual_wins),
        manual_losses: Set(record.manual_losses),
    }
}

const STATS_COLUMNS: &str = "id, user_id, robot_level, timestamp, games, human_games, \
     manual_games, elo, human_elo, manual_elo, score, human_score, manual_score, \
     score_against, human_score_against, manual_score_against, wins, losses, \
     human_wins, human_losses, manual_wins, manual_losses";

#[async_trait]
impl StatsRepository for SqlStatsRepository {
    async fn put_multi(&self, records: &[StatsRecord]) -> DbResult<()> {
        let conn = self.session.conn().await?;
        for chunk in records.chunks(INSERT_CHUNK) {
            let models: Vec<stats::ActiveModel> = chunk
                .iter()
                .map(|record| {
                    from_record(record, record.timestamp.unwrap_or_else(Utc::now))
                })
                .collect();
            stats::Entity::insert_many(models).exec(&*conn).await?;
        }
        Ok(())
    }

    async fn newest_for_user(&self, user_id: &str) -> DbResult<Option<StatsRecord>> {
        let conn = self.session.conn().await?;
        Ok(stats::Entity::find()
            .filter(stats::Column::UserId.eq(user_id))
            .filter(stats::Column::RobotLevel.eq(0))
            .order_by_desc(stats::Column::Timestamp)
            .one(&*conn)
            .await?
            .map(to_record))
    }

    async fn newest_before(
        &self,
        ts: DateTime<Utc>,
        user_id: Option<&str>,
        robot_level: i32,
    ) -> DbResult<Option<StatsRecord>> {
        let conn = self.session.conn().await?;
        let user_filter = match user_id {
            Some(user_id) => stats::Column::UserId.eq(user_id),
            None => stats::Column::UserId.is_null(),
        };
        Ok(stats::Entity::find()
            .filter(user_filter)
            .filter(stats::Column::RobotLevel.eq(robot_level))
            .filter(stats::Column::Timestamp.lte(ts))
            .order_by_desc(stats::Column::Timestamp)
            .one(&*conn)
            .await?
            .map(to_record))
    }

    async fn list_elo(
        &self,
        kind: RatingKind,
        ts: DateTime<Utc>,
        max_len: usize,
    ) -> DbResult<Vec<StatsRecord>> {
        let conn = self.session.conn().await?;
        let backend = conn.get_database_backend();
        let elo_column = match kind {
            RatingKind::All => "elo",
            RatingKind::Human => "human_elo",
            RatingKind::Manual => "manual_elo",
        };
        // One row per user (or robot level): the newest snapshot at or
        // before the cut-off, ranked by the requested Elo column
        let (p1, p2) = match backend {
            DbBackend::Postgres => ("$1", "$2"),
            _ => ("?", "?"),
        };
        let sql = format!(
            "SELECT {STATS_COLUMNS} FROM ( \
                SELECT *, ROW_NUMBER() OVER ( \
                    PARTITION BY user_id, robot_level \
                    ORDER BY timestamp DESC \
                ) AS rn FROM stats WHERE timestamp <= {p1} \
            ) latest WHERE rn = 1 ORDER BY {elo_column} DESC LIMIT {p2}"
        );
        let statement = Statement::from_sql_and_values(
            backend,
            sql.as_str(),
            [ts.into(), (max_len as i64).into()],
        );
        let models = stats::Entity::find()
            .from_raw_sql(statement)
            .all(&*conn)
            .await?;
        Ok(models.into_iter().map(to_record).collect())
    }

    async fn list_at(&self, ts: DateTime<Utc>) -> DbResult<Vec<StatsRecord>> {
        let conn = self.session.conn().await?;
        let models = stats::Entity::find()
            .filter(stats::Column::Timestamp.eq(ts))
            .all(&*conn)
            .await?;
        Ok(models.into_iter().map(to_record).collect())
    }

    async fn delete_at(&self, ts: DateTime<Utc>) -> DbResult<()> {
        let conn = self.session.conn().await?;
        stats::Entity::delete_many()
            .filter(stats::Column::Timestamp.eq(ts))
            .exec(&*conn)
            .await?;
        Ok(())
    }

    async fn delete_for_user(&self, user_id: &str) -> DbResult<()> {
        let conn = self.session.conn().await?;
        stats::Entity::delete_many()
            .filter(stats::Column::UserId.eq(user_id))
            .exec(&*conn)
            .await?;
        Ok(())
    }
}
