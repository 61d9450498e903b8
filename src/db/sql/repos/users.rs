use super::{json_to_prefs, prefs_to_json, sql_repository};
use crate::db::{
    records::{UserListEntry, UserRecord, UserUpdate},
    repos::UserRepository,
    sql::entities::users,
    DbError, DbResult,
};
use async_trait::async_trait;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, EntityTrait,
    IntoActiveModel, Order, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};

sql_repository!(SqlUserRepository);

fn to_record(model: users::Model) -> UserRecord {
    UserRecord {
        id: model.id,
        account: model.account,
        email: model.email,
        nickname: model.nickname,
        nick_lc: model.nick_lc,
        name_lc: model.name_lc,
        image: model.image,
        image_blob: model.image_blob,
        locale: model.locale,
        location: model.location,
        prefs: json_to_prefs(model.prefs),
        inactive: model.inactive,
        ready: model.ready,
        ready_timed: model.ready_timed,
        chat_disabled: model.chat_disabled,
        plan: model.plan,
        elo: model.elo,
        human_elo: model.human_elo,
        manual_elo: model.manual_elo,
        highest_score: model.highest_score,
        highest_score_game: model.highest_score_game,
        best_word: model.best_word,
        best_word_score: model.best_word_score,
        best_word_game: model.best_word_game,
        games: model.games,
        timestamp: model.timestamp,
        last_login: model.last_login,
    }
}

fn to_list_entry(model: users::Model) -> UserListEntry {
    UserListEntry {
        id: model.id,
        nickname: model.nickname,
        prefs: json_to_prefs(model.prefs),
        timestamp: model.timestamp,
        ready: model.ready,
        ready_timed: model.ready_timed,
        human_elo: model.human_elo,
    }
}

fn from_record(user: &UserRecord) -> users::ActiveModel {
    users::ActiveModel {
        id: Set(user.id.clone()),
        account: Set(user.account.clone()),
        email: Set(user.email.clone()),
        nickname: Set(user.nickname.clone()),
        nick_lc: Set(user.nick_lc.clone()),
        name_lc: Set(user.name_lc.clone()),
        image: Set(user.image.clone()),
        image_blob: Set(user.image_blob.clone()),
        locale: Set(user.locale.clone()),
        location: Set(user.location.clone()),
        prefs: Set(prefs_to_json(&user.prefs)),
        inactive: Set(user.inactive),
        ready: Set(user.ready),
        ready_timed: Set(user.ready_timed),
        chat_disabled: Set(user.chat_disabled),
        plan: Set(user.plan.clone()),
        elo: Set(user.elo),
        human_elo: Set(user.human_elo),
        manual_elo: Set(user.manual_elo),
        highest_score: Set(user.highest_score),
        highest_score_game: Set(user.highest_score_game.clone()),
        best_word: Set(user.best_word.clone()),
        best_word_score: Set(user.best_word_score),
        best_word_game: Set(user.best_word_game.clone()),
        games: Set(user.games),
        timestamp: Set(user.timestamp),
        last_login: Set(user.last_login),
    }
}

fn apply_update(model: users::Model, update: UserUpdate) -> users::ActiveModel {
    let mut active = model.into_active_model();
    if let Some(account) = update.account {
        active.account = Set(account);
    }
    if let Some(email) = update.email {
        active.email = Set(email);
    }
    if let Some(nickname) = update.nickname {
        active.nickname = Set(nickname);
    }
    if let Some(nick_lc) = update.nick_lc {
        active.nick_lc = Set(nick_lc);
    }
    if let Some(name_lc) = update.name_lc {
        active.name_lc = Set(name_lc);
    }
    if let Some(image) = update.image {
        active.image = Set(image);
    }
    if let Some(image_blob) = update.image_blob {
        active.image_blob = Set(image_blob);
    }
    if let Some(locale) = update.locale {
        active.locale = Set(locale);
    }
    if let Some(location) = update.location {
        active.location = Set(location);
    }
    if let Some(prefs) = update.prefs {
        active.prefs = Set(prefs_to_json(&prefs));
    }
    if let Some(inactive) = update.inactive {
        active.inactive = Set(inactive);
    }
    if let Some(ready) = update.ready {
        active.ready = Set(ready);
    }
    if let Some(ready_timed) = update.ready_timed {
        active.ready_timed = Set(ready_timed);
    }
    if let Some(chat_disabled) = update.chat_disabled {
        active.chat_disabled = Set(chat_disabled);
    }
    if let Some(plan) = update.plan {
        active.plan = Set(plan);
    }
    if let Some(elo) = update.elo {
        active.elo = Set(elo);
    }
    if let Some(human_elo) = update.human_elo {
        active.human_elo = Set(human_elo);
    }
    if let Some(manual_elo) = update.manual_elo {
        active.manual_elo = Set(manual_elo);
    }
    if let Some(highest_score) = update.highest_score {
        active.highest_score = Set(highest_score);
    }
    if let Some(highest_score_game) = update.highest_score_game {
        active.highest_score_game = Set(highest_score_game);
    }
    if let Some(best_word) = update.best_word {
        active.best_word = Set(best_word);
    }
    if let Some(best_word_score) = update.best_word_score {
        active.best_word_score = Set(best_word_score);
    }
    if let Some(best_word_game) = update.best_word_game {
        active.best_word_game = Set(best_word_game);
    }
    if let Some(games) = update.games {
        active.games = Set(games);
    }
    if let Some(last_login) = update.last_login {
        active.last_login = Set(Some(last_login));
    }
    active
}

#[async_trait]
impl UserRepository for SqlUserRepository {
    async fn get(&self, user_id: &str) -> DbResult<Option<UserRecord>> {
        let conn = self.session.conn().await?;
        Ok(users::Entity::find_by_id(user_id)
            .one(&*conn)
            .await?
            .map(to_record))
    }

    async fn get_by_account(&self, account: &str) -> DbResult<Option<UserRecord>> {
        let conn = self.session.conn().await?;
        Ok(users::Entity::find()
            .filter(users::Column::Account.eq(account))
            .order_by_desc(users::Column::Timestamp)
            .one(&*conn)
            .await?
            .map(to_record))
    }

    async fn get_by_email(&self, email: &str) -> DbResult<Option<UserRecord>> {
        if email.is_empty() {
            return Ok(None);
        }
        let conn = self.session.conn().await?;
        // Prefer users with a positive Elo, then the newest account
        Ok(users::Entity::find()
            .filter(users::Column::Email.eq(email.to_lowercase()))
            .filter(users::Column::Inactive.eq(false))
            .order_by(Expr::cust("elo > 0"), Order::Desc)
            .order_by_desc(users::Column::Timestamp)
            .one(&*conn)
            .await?
            .map(to_record))
    }

    async fn get_by_nickname(&self, nickname: &str) -> DbResult<Option<UserRecord>> {
        let conn = self.session.conn().await?;
        Ok(users::Entity::find()
            .filter(users::Column::NickLc.eq(nickname.to_lowercase()))
            .filter(users::Column::Inactive.eq(false))
            .one(&*conn)
            .await?
            .map(to_record))
    }

    async fn get_multi(&self, user_ids: &[String]) -> DbResult<Vec<Option<UserRecord>>> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.session.conn().await?;
        let found = users::Entity::find()
            .filter(users::Column::Id.is_in(user_ids.iter().cloned()))
            .all(&*conn)
            .await?;
        let mut by_id: std::collections::HashMap<String, UserRecord> = found
            .into_iter()
            .map(|model| (model.id.clone(), to_record(model)))
            .collect();
        Ok(user_ids.iter().map(|id| by_id.remove(id)).collect())
    }

    async fn create(&self, user: &UserRecord) -> DbResult<()> {
        let conn = self.session.conn().await?;
        from_record(user).insert(&*conn).await?;
        Ok(())
    }

    async fn update(&self, user_id: &str, update: UserUpdate) -> DbResult<()> {
        let conn = self.session.conn().await?;
        let model = users::Entity::find_by_id(user_id)
            .one(&*conn)
            .await?
            .ok_or_else(|| {
                DbError::Sql(sea_orm::DbErr::RecordNotFound(format!("user {user_id}")))
            })?;
        apply_update(model, update).update(&*conn).await?;
        Ok(())
    }

    async fn delete(&self, user_id: &str) -> DbResult<()> {
        let conn = self.session.conn().await?;
        users::Entity::delete_by_id(user_id).exec(&*conn).await?;
        Ok(())
    }

    async fn count(&self) -> DbResult<u64> {
        let conn = self.session.conn().await?;
        Ok(users::Entity::find().count(&*conn).await?)
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
        let pattern = format!("{}%", prefix.replace('%', "").replace('_', ""));
        let conn = self.session.conn().await?;

        let base = |column: users::Column| {
            let mut query = users::Entity::find()
                .filter(users::Column::Inactive.eq(false))
                .filter(column.like(&pattern))
                .order_by_asc(column)
                .limit(max_len as u64);
            if let Some(locale) = locale {
                query = query.filter(users::Column::Locale.eq(locale));
            }
            query
        };

        let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();
        let mut result = Vec::new();

        // Nickname matches first, then full-name matches
        for model in base(users::Column::NickLc).all(&*conn).await? {
            if seen.insert(model.id.clone()) {
                result.push(to_list_entry(model));
                if result.len() >= max_len {
                    return Ok(result);
                }
            }
        }
        for model in base(users::Column::NameLc).all(&*conn).await? {
            if seen.insert(model.id.clone()) {
                result.push(to_list_entry(model));
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
        let conn = self.session.conn().await?;
        let mut query = users::Entity::find()
            .filter(
                Condition::all()
                    .add(users::Column::Inactive.eq(false))
                    .add(users::Column::HighestScore.gt(0))
                    .add(users::Column::HumanElo.lt(elo)),
            )
            .order_by_desc(users::Column::HumanElo)
            .limit(max_len as u64);
        if let Some(locale) = locale {
            query = query.filter(users::Column::Locale.eq(locale));
        }
        Ok(query
            .all(&*conn)
            .await?
            .into_iter()
            .map(|model| model.id)
            .collect())
    }

    async fn list_elo_at_or_above(
        &self,
        elo: i32,
        locale: Option<&str>,
        max_len: usize,
    ) -> DbResult<Vec<String>> {
        let conn = self.session.conn().await?;
        let mut query = users::Entity::find()
            .filter(
                Condition::all()
                    .add(users::Column::Inactive.eq(false))
                    .add(users::Column::HighestScore.gt(0))
                    .add(users::Column::HumanElo.gte(elo)),
            )
            .order_by_asc(users::Column::HumanElo)
            .limit(max_len as u64);
        if let Some(locale) = locale {
            query = query.filter(users::Column::Locale.eq(locale));
        }
        Ok(query
            .all(&*conn)
            .await?
            .into_iter()
            .map(|model| model.id)
            .collect())
    }
}
