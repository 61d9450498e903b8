//! Account management: creation, lookup, preference updates, the
//! similar-Elo neighborhood, favorites, blocks, reports and the
//! cascading account deletion.

use crate::db::{
    records::{prefs_str, PrefsMap, UserListEntry, UserRecord, UserUpdate},
    Session,
};
use crate::error::{CoreError, CoreResult};
use crate::locales::DEFAULT_LOCALE;
use chrono::Utc;
use email_address::EmailAddress;
use log::info;
use serde_json::Value;

/// The maximum number of favorites a user can have
pub const MAX_FAVORITES: usize = 100;

/// Default length of search result lists
const DEFAULT_LIST_LEN: usize = 50;

/// Parameters for creating a user on first authentication
pub struct CreateUser {
    /// The already-resolved account identifier from the auth layer
    pub user_id: String,
    pub account: String,
    pub email: String,
    pub nickname: String,
    pub image: String,
    pub preferences: Option<PrefsMap>,
    pub locale: Option<String>,
}

#[derive(Default)]
pub struct UserService;

impl UserService {
    pub fn new() -> Self {
        Self
    }

    /// Create a user record for a freshly authenticated account and
    /// return its id plus the effective preference map
    pub async fn create(
        &self,
        session: &Session,
        params: CreateUser,
    ) -> CoreResult<(String, PrefsMap)> {
        if !params.email.is_empty() && !EmailAddress::is_valid(&params.email) {
            return Err(CoreError::IllegalState(format!(
                "invalid email address '{}'",
                params.email
            )));
        }

        let mut prefs = default_prefs();
        if let Some(provided) = params.preferences {
            for (key, value) in provided {
                prefs.insert(key, value);
            }
        }
        let full_name = prefs_str(&prefs, "fullName").unwrap_or("").to_string();
        let now = Utc::now();

        let user = UserRecord {
            id: params.user_id.clone(),
            account: Some(params.account),
            email: params.email.to_lowercase(),
            nick_lc: params.nickname.to_lowercase(),
            nickname: params.nickname,
            name_lc: full_name.to_lowercase(),
            image: params.image,
            image_blob: None,
            locale: params.locale.unwrap_or_else(|| DEFAULT_LOCALE.to_string()),
            location: String::new(),
            prefs: prefs.clone(),
            inactive: false,
            ready: true,
            ready_timed: true,
            chat_disabled: false,
            plan: None,
            elo: 0,
            human_elo: 0,
            manual_elo: 0,
            highest_score: 0,
            highest_score_game: None,
            best_word: None,
            best_word_score: 0,
            best_word_game: None,
            games: 0,
            timestamp: now,
            last_login: Some(now),
        };
        session.users().create(&user).await?;
        info!("Created user {}", user.id);
        Ok((params.user_id, prefs))
    }

    pub async fn get(&self, session: &Session, user_id: &str) -> CoreResult<Option<UserRecord>> {
        Ok(session.users().get(user_id).await?)
    }

    pub async fn get_by_account(
        &self,
        session: &Session,
        account: &str,
    ) -> CoreResult<Option<UserRecord>> {
        Ok(session.users().get_by_account(account).await?)
    }

    pub async fn get_by_email(
        &self,
        session: &Session,
        email: &str,
    ) -> CoreResult<Option<UserRecord>> {
        Ok(session.users().get_by_email(email).await?)
    }

    pub async fn get_by_nickname(
        &self,
        session: &Session,
        nickname: &str,
    ) -> CoreResult<Option<UserRecord>> {
        Ok(session.users().get_by_nickname(nickname).await?)
    }

    pub async fn get_multi(
        &self,
        session: &Session,
        user_ids: &[String],
    ) -> CoreResult<Vec<Option<UserRecord>>> {
        Ok(session.users().get_multi(user_ids).await?)
    }

    /// Record a login, refreshing the last-login timestamp
    pub async fn login(&self, session: &Session, user_id: &str) -> CoreResult<()> {
        session
            .users()
            .update(
                user_id,
                UserUpdate {
                    last_login: Some(Utc::now()),
                    ..Default::default()
                },
            )
            .await?;
        Ok(())
    }

    /// Apply a profile update. The lowercase search fields are
    /// recomputed whenever the nickname or the full name change.
    pub async fn update(
        &self,
        session: &Session,
        user_id: &str,
        mut update: UserUpdate,
    ) -> CoreResult<()> {
        if let Some(nickname) = &update.nickname {
            update.nick_lc = Some(nickname.to_lowercase());
        }
        if let Some(prefs) = &update.prefs {
            if let Some(full_name) = prefs_str(prefs, "fullName") {
                update.name_lc = Some(full_name.to_lowercase());
            }
        }
        session.users().update(user_id, update).await?;
        Ok(())
    }

    /// Users whose nickname or full name starts with the prefix
    pub async fn list_prefix(
        &self,
        session: &Session,
        prefix: &str,
        locale: Option<&str>,
        max_len: Option<usize>,
    ) -> CoreResult<Vec<UserListEntry>> {
        Ok(session
            .users()
            .list_prefix(prefix, locale, max_len.unwrap_or(DEFAULT_LIST_LEN))
            .await?)
    }

    /// A balanced neighborhood of users around a target human Elo:
    /// roughly half strictly below the target, half at or above it,
    /// concatenated in ascending order
    pub async fn list_similar_elo(
        &self,
        session: &Session,
        elo: i32,
        locale: Option<&str>,
        max_len: usize,
    ) -> CoreResult<Vec<String>> {
        // Fetch max_len candidates on each side, then balance
        let mut lower = session.users().list_elo_below(elo, locale, max_len).await?;
        // Returned in descending order; make ascending
        lower.reverse();
        let higher = session
            .users()
            .list_elo_at_or_above(elo, locale, max_len)
            .await?;

        let len_lower = lower.len();
        let len_higher = higher.len();
        let half_len = max_len / 2;
        // Starting index into the lower range
        let mut ix = 0;
        if len_lower >= half_len {
            // Enough entries below the target for a balanced result,
            // if the upper range allows
            ix = len_lower - half_len;
            if len_higher < half_len {
                // Too few entries above: shift the balance downwards
                let missing = half_len - len_higher;
                ix = ix.saturating_sub(missing);
            }
        }
        let mut result: Vec<String> = lower[ix..].to_vec();
        let take_higher = max_len.saturating_sub(result.len()).min(len_higher);
        result.extend(higher[..take_higher].iter().cloned());
        Ok(result)
    }

    /// Delete an account, cascading to everything the user owns. Games
    /// are retained with the player's seat nulled so scoreboards stay
    /// coherent.
    pub async fn delete_account(&self, session: &Session, user_id: &str) -> CoreResult<()> {
        let user_id = user_id.to_string();
        session
            .transact(move |db| {
                Box::pin(async move {
                    if db.users().get(&user_id).await?.is_none() {
                        return Err(CoreError::NotFound);
                    }
                    db.elo().delete_for_user(&user_id).await?;
                    db.favorites().delete_for_user(&user_id).await?;
                    db.blocks().delete_for_user(&user_id).await?;
                    db.challenges().delete_for_user(&user_id).await?;
                    db.stats().delete_for_user(&user_id).await?;
                    db.chat().delete_for_user(&user_id).await?;
                    db.zombies().delete_for_user(&user_id).await?;
                    db.reports().delete_for_user(&user_id).await?;
                    db.promos().delete_for_user(&user_id).await?;
                    db.transactions().delete_for_user(&user_id).await?;
                    db.submissions().delete_for_user(&user_id).await?;
                    db.images().delete_for_user(&user_id).await?;
                    db.games().detach_user(&user_id).await?;
                    db.users().delete(&user_id).await?;
                    info!("Deleted user {user_id} and all owned entities");
                    Ok(())
                })
            })
            .await
    }

    // Favorites

    pub async fn add_favorite(
        &self,
        session: &Session,
        user_id: &str,
        dest_user_id: &str,
    ) -> CoreResult<()> {
        let existing = session
            .favorites()
            .list_favorites(user_id, MAX_FAVORITES)
            .await?;
        if existing.len() >= MAX_FAVORITES {
            return Err(CoreError::IllegalState("favorite list is full".to_string()));
        }
        Ok(session.favorites().add_relation(user_id, dest_user_id).await?)
    }

    pub async fn remove_favorite(
        &self,
        session: &Session,
        user_id: &str,
        dest_user_id: &str,
    ) -> CoreResult<()> {
        Ok(session
            .favorites()
            .delete_relation(user_id, dest_user_id)
            .await?)
    }

    pub async fn has_favorite(
        &self,
        session: &Session,
        user_id: &str,
        dest_user_id: &str,
    ) -> CoreResult<bool> {
        Ok(session.favorites().has_relation(user_id, dest_user_id).await?)
    }

    pub async fn list_favorites(
        &self,
        session: &Session,
        user_id: &str,
    ) -> CoreResult<Vec<String>> {
        Ok(session
            .favorites()
            .list_favorites(user_id, MAX_FAVORITES)
            .await?)
    }

    // Blocks

    pub async fn block(
        &self,
        session: &Session,
        blocker_id: &str,
        blocked_id: &str,
    ) -> CoreResult<bool> {
        Ok(session.blocks().block_user(blocker_id, blocked_id).await?)
    }

    pub async fn unblock(
        &self,
        session: &Session,
        blocker_id: &str,
        blocked_id: &str,
    ) -> CoreResult<bool> {
        Ok(session.blocks().unblock_user(blocker_id, blocked_id).await?)
    }

    pub async fn is_blocking(
        &self,
        session: &Session,
        blocker_id: &str,
        blocked_id: &str,
    ) -> CoreResult<bool> {
        Ok(session.blocks().is_blocking(blocker_id, blocked_id).await?)
    }

    pub async fn list_blocked(
        &self,
        session: &Session,
        user_id: &str,
        max_len: usize,
    ) -> CoreResult<Vec<String>> {
        Ok(session.blocks().list_blocked_users(user_id, max_len).await?)
    }

    // Reports

    pub async fn report(
        &self,
        session: &Session,
        reporter_id: &str,
        reported_id: &str,
        code: i32,
        text: &str,
    ) -> CoreResult<()> {
        Ok(session
            .reports()
            .report_user(reporter_id, reported_id, code, text)
            .await?)
    }
}

/// The preference defaults every new account starts from
fn default_prefs() -> PrefsMap {
    let mut prefs = PrefsMap::new();
    prefs.insert("beginner".to_string(), Value::Bool(true));
    prefs.insert("fairplay".to_string(), Value::Bool(false));
    prefs.insert("fanfare".to_string(), Value::Bool(true));
    prefs.insert("audio".to_string(), Value::Bool(true));
    prefs
}
