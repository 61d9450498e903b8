use super::sql_repository;
use crate::db::{
    records::{CompletionRecord, RatingKind, RatingRecord, RatingSnapshot, RiddleRecord},
    repos::{
        CompletionRepository, ImageRepository, PromoRepository, RatingRepository,
        ReportRepository, RiddleRepository, SubmissionRepository, TransactionRepository,
    },
    sql::entities::{completions, images, promos, ratings, reports, riddles, submissions,
        transactions},
    DbResult,
};
use crate::utils::ids::generate_id;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

sql_repository!(SqlRatingRepository);
sql_repository!(SqlReportRepository);
sql_repository!(SqlPromoRepository);
sql_repository!(SqlTransactionRepository);
sql_repository!(SqlSubmissionRepository);
sql_repository!(SqlCompletionRepository);
sql_repository!(SqlRiddleRepository);
sql_repository!(SqlImageRepository);

/// SQLite's default bind-variable limit caps insert batches for the
/// wide ratings table
const RATING_INSERT_CHUNK: usize = 20;

fn rating_to_record(model: ratings::Model) -> RatingRecord {
    RatingRecord {
        kind: model.kind,
        rank: model.rank,
        user_id: model.user_id,
        robot_level: model.robot_level,
        games: model.games,
        elo: model.elo,
        score: model.score,
        score_against: model.score_against,
        wins: model.wins,
        losses: model.losses,
        yesterday: RatingSnapshot {
            rank: model.rank_yesterday,
            games: model.games_yesterday,
            elo: model.elo_yesterday,
            score: model.score_yesterday,
            score_against: model.score_against_yesterday,
            wins: model.wins_yesterday,
            losses: model.losses_yesterday,
        },
        week_ago: RatingSnapshot {
            rank: model.rank_week_ago,
            games: model.games_week_ago,
            elo: model.elo_week_ago,
            score: model.score_week_ago,
            score_against: model.score_against_week_ago,
            wins: model.wins_week_ago,
            losses: model.losses_week_ago,
        },
        month_ago: RatingSnapshot {
            rank: model.rank_month_ago,
            games: model.games_month_ago,
            elo: model.elo_month_ago,
            score: model.score_month_ago,
            score_against: model.score_against_month_ago,
            wins: model.wins_month_ago,
            losses: model.losses_month_ago,
        },
    }
}

fn rating_from_record(record: &RatingRecord) -> ratings::ActiveModel {
    ratings::ActiveModel {
        kind: Set(record.kind.clone()),
        rank: Set(record.rank),
        user_id: Set(record.user_id.clone()),
        robot_level: Set(record.robot_level),
        games: Set(record.games),
        elo: Set(record.elo),
        score: Set(record.score),
        score_against: Set(record.score_against),
        wins: Set(record.wins),
        losses: Set(record.losses),
        rank_yesterday: Set(record.yesterday.rank),
        games_yesterday: Set(record.yesterday.games),
        elo_yesterday: Set(record.yesterday.elo),
        score_yesterday: Set(record.yesterday.score),
        score_against_yesterday: Set(record.yesterday.score_against),
        wins_yesterday: Set(record.yesterday.wins),
        losses_yesterday: Set(record.yesterday.losses),
        rank_week_ago: Set(record.week_ago.rank),
        games_week_ago: Set(record.week_ago.games),
        elo_week_ago: Set(record.week_ago.elo),
        score_week_ago: Set(record.week_ago.score),
        score_against_week_ago: Set(record.week_ago.score_against),
        wins_week_ago: Set(record.week_ago.wins),
        losses_week_ago: Set(record.week_ago.losses),
        rank_month_ago: Set(record.month_ago.rank),
        games_month_ago: Set(record.month_ago.games),
        elo_month_ago: Set(record.month_ago.elo),
        score_month_ago: Set(record.month_ago.score),
        score_against_month_ago: Set(record.month_ago.score_against),
        wins_month_ago: Set(record.month_ago.wins),
        losses_month_ago: Set(record.month_ago.losses),
    }
}

#[async_trait]
impl RatingRepository for SqlRatingRepository {
    async fn replace_all(&self, rows: &[RatingRecord]) -> DbResult<()> {
        let conn = self.session.conn().await?;
        ratings::Entity::delete_many().exec(&*conn).await?;
        for chunk in rows.chunks(RATING_INSERT_CHUNK) {
            let models: Vec<ratings::ActiveModel> = chunk.iter().map(rating_from_record).collect();
            ratings::Entity::insert_many(models).exec(&*conn).await?;
        }
        Ok(())
    }

    async fn list_rating(&self, kind: RatingKind) -> DbResult<Vec<RatingRecord>> {
        let conn = self.session.conn().await?;
        let models = ratings::Entity::find()
            .filter(ratings::Column::Kind.eq(kind.as_str()))
            .order_by_asc(ratings::Column::Rank)
            .all(&*conn)
            .await?;
        Ok(models.into_iter().map(rating_to_record).collect())
    }
}

#[async_trait]
impl ReportRepository for SqlReportRepository {
    async fn report_user(
        &self,
        reporter_id: &str,
        reported_id: &str,
        code: i32,
        text: &str,
    ) -> DbResult<()> {
        let conn = self.session.conn().await?;
        reports::ActiveModel {
            id: Set(generate_id()),
            reporter_id: Set(reporter_id.to_string()),
            reported_id: Set(reported_id.to_string()),
            code: Set(code),
            text: Set(text.to_string()),
            timestamp: Set(Utc::now()),
        }
        .insert(&*conn)
        .await?;
        Ok(())
    }

    async fn list_reported_by(&self, user_id: &str, max_len: usize) -> DbResult<Vec<String>> {
        let conn = self.session.conn().await?;
        let models = reports::Entity::find()
            .filter(reports::Column::ReporterId.eq(user_id))
            .order_by_desc(reports::Column::Timestamp)
            .limit(max_len as u64)
            .all(&*conn)
            .await?;
        Ok(models.into_iter().map(|model| model.reported_id).collect())
    }

    async fn delete_for_user(&self, user_id: &str) -> DbResult<()> {
        let conn = self.session.conn().await?;
        reports::Entity::delete_many()
            .filter(
                sea_orm::Condition::any()
                    .add(reports::Column::ReporterId.eq(user_id))
                    .add(reports::Column::ReportedId.eq(user_id)),
            )
            .exec(&*conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PromoRepository for SqlPromoRepository {
    async fn add_promotion(&self, user_id: &str, promotion: &str) -> DbResult<()> {
        let conn = self.session.conn().await?;
        promos::ActiveModel {
            id: Set(generate_id()),
            user_id: Set(user_id.to_string()),
            promotion: Set(promotion.to_string()),
            timestamp: Set(Utc::now()),
        }
        .insert(&*conn)
        .await?;
        Ok(())
    }

    async fn list_promotions(
        &self,
        user_id: &str,
        promotion: &str,
    ) -> DbResult<Vec<DateTime<Utc>>> {
        let conn = self.session.conn().await?;
        let models = promos::Entity::find()
            .filter(promos::Column::UserId.eq(user_id))
            .filter(promos::Column::Promotion.eq(promotion))
            .order_by_asc(promos::Column::Timestamp)
            .all(&*conn)
            .await?;
        Ok(models.into_iter().map(|model| model.timestamp).collect())
    }

    async fn delete_for_user(&self, user_id: &str) -> DbResult<()> {
        let conn = self.session.conn().await?;
        promos::Entity::delete_many()
            .filter(promos::Column::UserId.eq(user_id))
            .exec(&*conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl TransactionRepository for SqlTransactionRepository {
    async fn add_transaction(
        &self,
        user_id: &str,
        plan: &str,
        kind: &str,
        op: &str,
    ) -> DbResult<()> {
        let conn = self.session.conn().await?;
        transactions::ActiveModel {
            id: Set(generate_id()),
            user_id: Set(user_id.to_string()),
            plan: Set(plan.to_string()),
            kind: Set(kind.to_string()),
            op: Set(op.to_string()),
            timestamp: Set(Utc::now()),
        }
        .insert(&*conn)
        .await?;
        Ok(())
    }

    async fn count_for_user(&self, user_id: &str) -> DbResult<u64> {
        let conn = self.session.conn().await?;
        Ok(transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .count(&*conn)
            .await?)
    }

    async fn delete_for_user(&self, user_id: &str) -> DbResult<()> {
        let conn = self.session.conn().await?;
        transactions::Entity::delete_many()
            .filter(transactions::Column::UserId.eq(user_id))
            .exec(&*conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SubmissionRepository for SqlSubmissionRepository {
    async fn submit_word(
        &self,
        user_id: &str,
        locale: &str,
        word: &str,
        comment: &str,
    ) -> DbResult<()> {
        let conn = self.session.conn().await?;
        submissions::ActiveModel {
            id: Set(generate_id()),
            user_id: Set(user_id.to_string()),
            locale: Set(locale.to_string()),
            word: Set(word.to_string()),
            comment: Set(comment.to_string()),
            timestamp: Set(Utc::now()),
        }
        .insert(&*conn)
        .await?;
        Ok(())
    }

    async fn count_for_user(&self, user_id: &str) -> DbResult<u64> {
        let conn = self.session.conn().await?;
        Ok(submissions::Entity::find()
            .filter(submissions::Column::UserId.eq(user_id))
            .count(&*conn)
            .await?)
    }

    async fn delete_for_user(&self, user_id: &str) -> DbResult<()> {
        let conn = self.session.conn().await?;
        submissions::Entity::delete_many()
            .filter(submissions::Column::UserId.eq(user_id))
            .exec(&*conn)
            .await?;
        Ok(())
    }
}

fn completion_to_record(model: completions::Model) -> CompletionRecord {
    CompletionRecord {
        proctype: model.proctype,
        ts_from: model.ts_from,
        ts_to: model.ts_to,
        success: model.success,
        reason: model.reason,
        timestamp: model.timestamp,
    }
}

impl SqlCompletionRepository {
    async fn add(
        &self,
        proctype: &str,
        ts_from: DateTime<Utc>,
        ts_to: DateTime<Utc>,
        success: bool,
        reason: &str,
    ) -> DbResult<()> {
        let conn = self.session.conn().await?;
        completions::ActiveModel {
            id: Set(generate_id()),
            proctype: Set(proctype.to_string()),
            ts_from: Set(ts_from),
            ts_to: Set(ts_to),
            success: Set(success),
            reason: Set(reason.to_string()),
            timestamp: Set(Utc::now()),
        }
        .insert(&*conn)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl CompletionRepository for SqlCompletionRepository {
    async fn add_completion(
        &self,
        proctype: &str,
        ts_from: DateTime<Utc>,
        ts_to: DateTime<Utc>,
    ) -> DbResult<()> {
        self.add(proctype, ts_from, ts_to, true, "").await
    }

    async fn add_failure(
        &self,
        proctype: &str,
        ts_from: DateTime<Utc>,
        ts_to: DateTime<Utc>,
        reason: &str,
    ) -> DbResult<()> {
        self.add(proctype, ts_from, ts_to, false, reason).await
    }

    async fn count_for_proctype(&self, proctype: &str) -> DbResult<u64> {
        let conn = self.session.conn().await?;
        Ok(completions::Entity::find()
            .filter(completions::Column::Proctype.eq(proctype))
            .count(&*conn)
            .await?)
    }

    async fn newest_for_proctype(&self, proctype: &str) -> DbResult<Option<CompletionRecord>> {
        let conn = self.session.conn().await?;
        Ok(completions::Entity::find()
            .filter(completions::Column::Proctype.eq(proctype))
            .order_by_desc(completions::Column::Timestamp)
            .one(&*conn)
            .await?
            .map(completion_to_record))
    }
}

fn riddle_to_record(model: riddles::Model) -> RiddleRecord {
    RiddleRecord {
        date: model.date,
        locale: model.locale,
        riddle_json: model.riddle_json,
        created: model.created,
        version: model.version,
    }
}

#[async_trait]
impl RiddleRepository for SqlRiddleRepository {
    async fn get_riddle(&self, date: &str, locale: &str) -> DbResult<Option<RiddleRecord>> {
        let conn = self.session.conn().await?;
        Ok(
            riddles::Entity::find_by_id((date.to_string(), locale.to_string()))
                .one(&*conn)
                .await?
                .map(riddle_to_record),
        )
    }

    async fn get_riddles_for_date(&self, date: &str) -> DbResult<Vec<RiddleRecord>> {
        let conn = self.session.conn().await?;
        let models = riddles::Entity::find()
            .filter(riddles::Column::Date.eq(date))
            .order_by_asc(riddles::Column::Locale)
            .all(&*conn)
            .await?;
        Ok(models.into_iter().map(riddle_to_record).collect())
    }

    async fn save_riddle(&self, riddle: &RiddleRecord) -> DbResult<()> {
        let conn = self.session.conn().await?;
        let existing =
            riddles::Entity::find_by_id((riddle.date.clone(), riddle.locale.clone()))
                .one(&*conn)
                .await?;
        match existing {
            Some(model) => {
                let mut active: riddles::ActiveModel = model.into();
                active.riddle_json = Set(riddle.riddle_json.clone());
                active.created = Set(riddle.created);
                active.version = Set(riddle.version);
                active.update(&*conn).await?;
            }
            None => {
                riddles::ActiveModel {
                    date: Set(riddle.date.clone()),
                    locale: Set(riddle.locale.clone()),
                    riddle_json: Set(riddle.riddle_json.clone()),
                    created: Set(riddle.created),
                    version: Set(riddle.version),
                }
                .insert(&*conn)
                .await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ImageRepository for SqlImageRepository {
    async fn get_thumbnail(&self, user_id: &str, size: u32) -> DbResult<Option<Vec<u8>>> {
        let conn = self.session.conn().await?;
        Ok(
            images::Entity::find_by_id((user_id.to_string(), format!("thumb{size}")))
                .one(&*conn)
                .await?
                .map(|model| model.image),
        )
    }

    async fn set_thumbnail(&self, user_id: &str, image: &[u8], size: u32) -> DbResult<()> {
        let conn = self.session.conn().await?;
        let fmt = format!("thumb{size}");
        let existing = images::Entity::find_by_id((user_id.to_string(), fmt.clone()))
            .one(&*conn)
            .await?;
        match existing {
            Some(model) => {
                let mut active: images::ActiveModel = model.into();
                active.image = Set(image.to_vec());
                active.update(&*conn).await?;
            }
            None => {
                images::ActiveModel {
                    user_id: Set(user_id.to_string()),
                    fmt: Set(fmt),
                    image: Set(image.to_vec()),
                }
                .insert(&*conn)
                .await?;
            }
        }
        Ok(())
    }

    async fn delete_for_user(&self, user_id: &str) -> DbResult<()> {
        let conn = self.session.conn().await?;
        images::Entity::delete_many()
            .filter(images::Column::UserId.eq(user_id))
            .exec(&*conn)
            .await?;
        Ok(())
    }
}
