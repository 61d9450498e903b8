use super::{json_to_prefs, prefs_to_json, sql_repository};
use crate::db::{
    records::{ChallengeInfo, ChallengeRecord, PrefsMap, ZombieGameInfo},
    repos::{BlockRepository, ChallengeRepository, FavoriteRepository, ZombieRepository},
    sql::entities::{blocks, challenges, favorites, games, zombies},
    DbResult,
};
use crate::utils::ids::generate_id;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect,
};

sql_repository!(SqlFavoriteRepository);
sql_repository!(SqlChallengeRepository);
sql_repository!(SqlBlockRepository);
sql_repository!(SqlZombieRepository);

#[async_trait]
impl FavoriteRepository for SqlFavoriteRepository {
    async fn list_favorites(&self, user_id: &str, max_len: usize) -> DbResult<Vec<String>> {
        let conn = self.session.conn().await?;
        let models = favorites::Entity::find()
            .filter(favorites::Column::SrcUserId.eq(user_id))
            .order_by_asc(favorites::Column::DestUserId)
            .limit(max_len as u64)
            .all(&*conn)
            .await?;
        Ok(models.into_iter().map(|model| model.dest_user_id).collect())
    }

    async fn has_relation(&self, src_user_id: &str, dest_user_id: &str) -> DbResult<bool> {
        let conn = self.session.conn().await?;
        Ok(favorites::Entity::find_by_id((
            src_user_id.to_string(),
            dest_user_id.to_string(),
        ))
        .one(&*conn)
        .await?
        .is_some())
    }

    async fn add_relation(&self, src_user_id: &str, dest_user_id: &str) -> DbResult<()> {
        if self.has_relation(src_user_id, dest_user_id).await? {
            return Ok(());
        }
        let conn = self.session.conn().await?;
        favorites::ActiveModel {
            src_user_id: Set(src_user_id.to_string()),
            dest_user_id: Set(dest_user_id.to_string()),
        }
        .insert(&*conn)
        .await?;
        Ok(())
    }

    async fn delete_relation(&self, src_user_id: &str, dest_user_id: &str) -> DbResult<()> {
        let conn = self.session.conn().await?;
        favorites::Entity::delete_by_id((src_user_id.to_string(), dest_user_id.to_string()))
            .exec(&*conn)
            .await?;
        Ok(())
    }

    async fn delete_for_user(&self, user_id: &str) -> DbResult<()> {
        let conn = self.session.conn().await?;
        favorites::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(favorites::Column::SrcUserId.eq(user_id))
                    .add(favorites::Column::DestUserId.eq(user_id)),
            )
            .exec(&*conn)
            .await?;
        Ok(())
    }
}

fn challenge_to_record(model: challenges::Model) -> ChallengeRecord {
    ChallengeRecord {
        key: model.id,
        src_user_id: model.src_user_id,
        dest_user_id: model.dest_user_id,
        prefs: json_to_prefs(model.prefs),
        timestamp: model.timestamp,
    }
}

#[async_trait]
impl ChallengeRepository for SqlChallengeRepository {
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
        let conn = self.session.conn().await?;
        let mut query = challenges::Entity::find()
            .filter(challenges::Column::SrcUserId.eq(src_user_id))
            .filter(challenges::Column::DestUserId.eq(dest_user_id))
            .order_by_asc(challenges::Column::Timestamp);
        if let Some(key) = key {
            query = query.filter(challenges::Column::Id.eq(key));
        }
        Ok(query.one(&*conn).await?.map(challenge_to_record))
    }

    async fn add_relation(
        &self,
        src_user_id: &str,
        dest_user_id: &str,
        prefs: &PrefsMap,
    ) -> DbResult<String> {
        let conn = self.session.conn().await?;
        let key = generate_id();
        challenges::ActiveModel {
            id: Set(key.clone()),
            src_user_id: Set(src_user_id.to_string()),
            dest_user_id: Set(dest_user_id.to_string()),
            prefs: Set(prefs_to_json(prefs)),
            timestamp: Set(Utc::now()),
        }
        .insert(&*conn)
        .await?;
        Ok(key)
    }

    async fn delete_relation(
        &self,
        src_user_id: &str,
        dest_user_id: &str,
        key: Option<&str>,
    ) -> DbResult<Option<PrefsMap>> {
        let conn = self.session.conn().await?;
        let mut query = challenges::Entity::find()
            .filter(challenges::Column::SrcUserId.eq(src_user_id))
            .filter(challenges::Column::DestUserId.eq(dest_user_id))
            .order_by_asc(challenges::Column::Timestamp);
        if let Some(key) = key {
            query = query.filter(challenges::Column::Id.eq(key));
        }
        let matching = query.all(&*conn).await?;
        let mut prefs = None;
        for model in matching {
            if prefs.is_none() {
                prefs = Some(json_to_prefs(model.prefs.clone()));
            }
            challenges::Entity::delete_by_id(model.id)
                .exec(&*conn)
                .await?;
        }
        Ok(prefs)
    }

    async fn list_issued(&self, user_id: &str, max_len: usize) -> DbResult<Vec<ChallengeInfo>> {
        let conn = self.session.conn().await?;
        let models = challenges::Entity::find()
            .filter(challenges::Column::SrcUserId.eq(user_id))
            .order_by_asc(challenges::Column::Timestamp)
            .limit(max_len as u64)
            .all(&*conn)
            .await?;
        Ok(models
            .into_iter()
            .map(|model| ChallengeInfo {
                user_id: model.dest_user_id.clone(),
                prefs: json_to_prefs(model.prefs.clone()),
                timestamp: model.timestamp,
                key: model.id,
            })
            .collect())
    }

    async fn list_received(
        &self,
        user_id: &str,
        max_len: usize,
    ) -> DbResult<Vec<ChallengeInfo>> {
        let conn = self.session.conn().await?;
        let models = challenges::Entity::find()
            .filter(challenges::Column::DestUserId.eq(user_id))
            .order_by_asc(challenges::Column::Timestamp)
            .limit(max_len as u64)
            .all(&*conn)
            .await?;
        Ok(models
            .into_iter()
            .map(|model| ChallengeInfo {
                user_id: model.src_user_id.clone(),
                prefs: json_to_prefs(model.prefs.clone()),
                timestamp: model.timestamp,
                key: model.id,
            })
            .collect())
    }

    async fn delete_for_user(&self, user_id: &str) -> DbResult<()> {
        let conn = self.session.conn().await?;
        challenges::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(challenges::Column::SrcUserId.eq(user_id))
                    .add(challenges::Column::DestUserId.eq(user_id)),
            )
            .exec(&*conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl BlockRepository for SqlBlockRepository {
    async fn list_blocked_users(&self, user_id: &str, max_len: usize) -> DbResult<Vec<String>> {
        let conn = self.session.conn().await?;
        let models = blocks::Entity::find()
            .filter(blocks::Column::BlockerId.eq(user_id))
            .order_by_asc(blocks::Column::BlockedId)
            .limit(max_len as u64)
            .all(&*conn)
            .await?;
        Ok(models.into_iter().map(|model| model.blocked_id).collect())
    }

    async fn list_blocked_by(&self, user_id: &str, max_len: usize) -> DbResult<Vec<String>> {
        let conn = self.session.conn().await?;
        let models = blocks::Entity::find()
            .filter(blocks::Column::BlockedId.eq(user_id))
            .order_by_asc(blocks::Column::BlockerId)
            .limit(max_len as u64)
            .all(&*conn)
            .await?;
        Ok(models.into_iter().map(|model| model.blocker_id).collect())
    }

    async fn block_user(&self, blocker_id: &str, blocked_id: &str) -> DbResult<bool> {
        if self.is_blocking(blocker_id, blocked_id).await? {
            return Ok(false);
        }
        let conn = self.session.conn().await?;
        blocks::ActiveModel {
            blocker_id: Set(blocker_id.to_string()),
            blocked_id: Set(blocked_id.to_string()),
            timestamp: Set(Utc::now()),
        }
        .insert(&*conn)
        .await?;
        Ok(true)
    }

    async fn unblock_user(&self, blocker_id: &str, blocked_id: &str) -> DbResult<bool> {
        let conn = self.session.conn().await?;
        let result =
            blocks::Entity::delete_by_id((blocker_id.to_string(), blocked_id.to_string()))
                .exec(&*conn)
                .await?;
        Ok(result.rows_affected > 0)
    }

    async fn is_blocking(&self, blocker_id: &str, blocked_id: &str) -> DbResult<bool> {
        let conn = self.session.conn().await?;
        Ok(
            blocks::Entity::find_by_id((blocker_id.to_string(), blocked_id.to_string()))
                .one(&*conn)
                .await?
                .is_some(),
        )
    }

    async fn delete_for_user(&self, user_id: &str) -> DbResult<()> {
        let conn = self.session.conn().await?;
        blocks::Entity::delete_many()
            .filter(
                Condition::any()
                    .add(blocks::Column::BlockerId.eq(user_id))
                    .add(blocks::Column::BlockedId.eq(user_id)),
            )
            .exec(&*conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ZombieRepository for SqlZombieRepository {
    async fn add_game(&self, game_id: &str, user_id: &str) -> DbResult<()> {
        let conn = self.session.conn().await?;
        let exists = zombies::Entity::find_by_id((game_id.to_string(), user_id.to_string()))
            .one(&*conn)
            .await?
            .is_some();
        if exists {
            return Ok(());
        }
        zombies::ActiveModel {
            game_id: Set(game_id.to_string()),
            user_id: Set(user_id.to_string()),
        }
        .insert(&*conn)
        .await?;
        Ok(())
    }

    async fn delete_game(&self, game_id: &str, user_id: &str) -> DbResult<()> {
        let conn = self.session.conn().await?;
        zombies::Entity::delete_by_id((game_id.to_string(), user_id.to_string()))
            .exec(&*conn)
            .await?;
        Ok(())
    }

    async fn list_games(&self, user_id: &str) -> DbResult<Vec<ZombieGameInfo>> {
        let conn = self.session.conn().await?;
        let entries = zombies::Entity::find()
            .filter(zombies::Column::UserId.eq(user_id))
            .all(&*conn)
            .await?;
        let mut result = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(game) = games::Entity::find_by_id(entry.game_id.clone())
                .one(&*conn)
                .await?
            else {
                continue;
            };
            let from_p0 = game.player0_id.as_deref() == Some(user_id);
            let (opp, sc0, sc1) = if from_p0 {
                (game.player1_id, game.score0, game.score1)
            } else {
                (game.player0_id, game.score1, game.score0)
            };
            result.push(ZombieGameInfo {
                uuid: game.id,
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
        let conn = self.session.conn().await?;
        zombies::Entity::delete_many()
            .filter(zombies::Column::UserId.eq(user_id))
            .exec(&*conn)
            .await?;
        Ok(())
    }
}
