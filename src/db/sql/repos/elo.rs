use super::sql_repository;
use crate::db::{
    records::{EloRecord, RatingKind},
    repos::{EloRepository, RobotRepository},
    sql::entities::{elo_ratings, robots},
    DbResult,
};
use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, QuerySelect,
};
use std::collections::HashMap;

sql_repository!(SqlEloRepository);
sql_repository!(SqlRobotRepository);

fn to_record(model: elo_ratings::Model) -> EloRecord {
    EloRecord {
        user_id: model.user_id,
        locale: model.locale,
        elo: model.elo,
        human_elo: model.human_elo,
        manual_elo: model.manual_elo,
        timestamp: model.timestamp,
    }
}

#[async_trait]
impl EloRepository for SqlEloRepository {
    async fn get(&self, locale: &str, user_id: &str) -> DbResult<Option<EloRecord>> {
        let conn = self.session.conn().await?;
        Ok(
            elo_ratings::Entity::find_by_id((user_id.to_string(), locale.to_string()))
                .one(&*conn)
                .await?
                .map(to_record),
        )
    }

    async fn upsert(&self, rating: &EloRecord) -> DbResult<()> {
        let conn = self.session.conn().await?;
        let existing =
            elo_ratings::Entity::find_by_id((rating.user_id.clone(), rating.locale.clone()))
                .one(&*conn)
                .await?;
        match existing {
            Some(model) => {
                let mut active = model.into_active_model();
                active.elo = Set(rating.elo);
                active.human_elo = Set(rating.human_elo);
                active.manual_elo = Set(rating.manual_elo);
                active.timestamp = Set(rating.timestamp);
                active.update(&*conn).await?;
            }
            None => {
                elo_ratings::ActiveModel {
                    user_id: Set(rating.user_id.clone()),
                    locale: Set(rating.locale.clone()),
                    elo: Set(rating.elo),
                    human_elo: Set(rating.human_elo),
                    manual_elo: Set(rating.manual_elo),
                    timestamp: Set(rating.timestamp),
                }
                .insert(&*conn)
                .await?;
            }
        }
        Ok(())
    }

    async fn load_multi(
        &self,
        locale: &str,
        user_ids: &[String],
    ) -> DbResult<HashMap<String, EloRecord>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let conn = self.session.conn().await?;
        let models = elo_ratings::Entity::find()
            .filter(elo_ratings::Column::Locale.eq(locale))
            .filter(elo_ratings::Column::UserId.is_in(user_ids.iter().cloned()))
            .all(&*conn)
            .await?;
        Ok(models
            .into_iter()
            .map(|model| (model.user_id.clone(), to_record(model)))
            .collect())
    }

    async fn list_rating(
        &self,
        kind: RatingKind,
        locale: &str,
        max_len: usize,
    ) -> DbResult<Vec<EloRecord>> {
        let conn = self.session.conn().await?;
        let order_column = match kind {
            RatingKind::All => elo_ratings::Column::Elo,
            RatingKind::Human => elo_ratings::Column::HumanElo,
            RatingKind::Manual => elo_ratings::Column::ManualElo,
        };
        let models = elo_ratings::Entity::find()
            .filter(elo_ratings::Column::Locale.eq(locale))
            .order_by_desc(order_column)
            .limit(max_len as u64)
            .all(&*conn)
            .await?;
        Ok(models.into_iter().map(to_record).collect())
    }

    async fn delete_for_user(&self, user_id: &str) -> DbResult<()> {
        let conn = self.session.conn().await?;
        elo_ratings::Entity::delete_many()
            .filter(elo_ratings::Column::UserId.eq(user_id))
            .exec(&*conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl RobotRepository for SqlRobotRepository {
    async fn get_elo(&self, locale: &str, level: i32) -> DbResult<Option<i32>> {
        let conn = self.session.conn().await?;
        Ok(robots::Entity::find_by_id((locale.to_string(), level))
            .one(&*conn)
            .await?
            .map(|model| model.elo))
    }

    async fn upsert_elo(&self, locale: &str, level: i32, elo: i32) -> DbResult<()> {
        let conn = self.session.conn().await?;
        let existing = robots::Entity::find_by_id((locale.to_string(), level))
            .one(&*conn)
            .await?;
        match existing {
            Some(model) => {
                let mut active = model.into_active_model();
                active.elo = Set(elo);
                active.update(&*conn).await?;
            }
            None => {
                robots::ActiveModel {
                    locale: Set(locale.to_string()),
                    level: Set(level),
                    elo: Set(elo),
                }
                .insert(&*conn)
                .await?;
            }
        }
        Ok(())
    }
}
