//! Matchmaking: the directed challenge graph and the accept handoff
//! that turns a challenge into a live game.

use crate::db::{
    records::{ChallengeInfo, PrefsMap},
    Session,
};
use crate::error::{CoreError, CoreResult};
use crate::services::{game::Game, notify_user, GameService, Notifier, NotifyEvent};
use std::sync::Arc;

/// Default length of challenge lists
const DEFAULT_LIST_LEN: usize = 20;

pub struct ChallengeService {
    notifier: Arc<dyn Notifier>,
}

impl ChallengeService {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Issue a challenge from one user to another. Multiple concurrent
    /// challenges between the same pair with different prefs are
    /// permitted; the returned key disambiguates them.
    pub async fn issue(
        &self,
        session: &Session,
        src_user_id: &str,
        dest_user_id: &str,
        prefs: &PrefsMap,
    ) -> CoreResult<String> {
        if session.blocks().is_blocking(dest_user_id, src_user_id).await? {
            return Err(CoreError::Forbidden);
        }
        let key = session
            .challenges()
            .add_relation(src_user_id, dest_user_id, prefs)
            .await?;
        notify_user(&self.notifier, dest_user_id, NotifyEvent::Challenge).await;
        Ok(key)
    }

    /// Withdraw a challenge previously issued; returns its prefs
    pub async fn retract(
        &self,
        session: &Session,
        src_user_id: &str,
        dest_user_id: &str,
        key: Option<&str>,
    ) -> CoreResult<Option<PrefsMap>> {
        let prefs = session
            .challenges()
            .delete_relation(src_user_id, dest_user_id, key)
            .await?;
        if prefs.is_some() {
            notify_user(&self.notifier, dest_user_id, NotifyEvent::Challenge).await;
        }
        Ok(prefs)
    }

    /// Decline a received challenge; returns its prefs
    pub async fn decline(
        &self,
        session: &Session,
        issuer_id: &str,
        user_id: &str,
        key: Option<&str>,
    ) -> CoreResult<Option<PrefsMap>> {
        let prefs = session
            .challenges()
            .delete_relation(issuer_id, user_id, key)
            .await?;
        if prefs.is_some() {
            notify_user(&self.notifier, issuer_id, NotifyEvent::Challenge).await;
        }
        Ok(prefs)
    }

    /// Accept a received challenge: atomically delete the edge and
    /// instantiate the game with the challenge's preferences
    pub async fn accept(
        &self,
        session: &Session,
        games: &GameService,
        issuer_id: &str,
        user_id: &str,
        key: Option<&str>,
    ) -> CoreResult<Game> {
        let challenge = session
            .challenges()
            .find_relation(issuer_id, user_id, key)
            .await?
            .ok_or_else(|| CoreError::IllegalState("challenge not found".to_string()))?;

        let locale = session
            .users()
            .get(user_id)
            .await?
            .map(|user| user.locale)
            .unwrap_or_else(|| crate::locales::DEFAULT_LOCALE.to_string());

        // Deleting the challenge and creating the game share one
        // transaction scope
        let games = games.clone();
        let issuer = issuer_id.to_string();
        let me = user_id.to_string();
        let challenge_key = challenge.key.clone();
        let prefs = challenge.prefs.clone();
        let game = session
            .transact(move |db| {
                Box::pin(async move {
                    let removed = db
                        .challenges()
                        .delete_relation(&issuer, &me, Some(&challenge_key))
                        .await?;
                    if removed.is_none() {
                        return Err(CoreError::IllegalState(
                            "challenge no longer exists".to_string(),
                        ));
                    }
                    // The challenger takes seat 0 before the fairness swap
                    games
                        .create_game(db, Some(&issuer), Some(&me), 0, prefs, &locale)
                        .await
                })
            })
            .await?;
        notify_user(&self.notifier, issuer_id, NotifyEvent::Challenge).await;
        Ok(game)
    }

    pub async fn list_issued(
        &self,
        session: &Session,
        user_id: &str,
        max_len: Option<usize>,
    ) -> CoreResult<Vec<ChallengeInfo>> {
        Ok(session
            .challenges()
            .list_issued(user_id, max_len.unwrap_or(DEFAULT_LIST_LEN))
            .await?)
    }

    pub async fn list_received(
        &self,
        session: &Session,
        user_id: &str,
        max_len: Option<usize>,
    ) -> CoreResult<Vec<ChallengeInfo>> {
        Ok(session
            .challenges()
            .list_received(user_id, max_len.unwrap_or(DEFAULT_LIST_LEN))
            .await?)
    }

    pub async fn has_challenge(
        &self,
        session: &Session,
        src_user_id: &str,
        dest_user_id: &str,
    ) -> CoreResult<bool> {
        Ok(session
            .challenges()
            .has_relation(src_user_id, dest_user_id)
            .await?)
    }
}
