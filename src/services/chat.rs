//! Chat: channel normalization, the read-marker protocol and
//! conversation history.
//!
//! There is no separate "seen" table; a user's own empty message on a
//! channel is the high-water mark for what they have read. The
//! newest-to-oldest scan in the repositories is the canonical unread
//! check.

use crate::db::{
    records::{ChatHistoryEntry, ChatRecord},
    Session,
};
use crate::error::{CoreError, CoreResult};
use crate::services::{notify_user, Notifier, NotifyEvent};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;

/// Default maximum number of real messages returned per conversation
const DEFAULT_CONVERSATION_LEN: usize = 250;

/// The in-game channel of a game
pub fn game_channel(game_id: &str) -> String {
    format!("game:{game_id}")
}

/// The direct channel between two users, lexicographically normalized
pub fn user_channel(a: &str, b: &str) -> String {
    if a < b {
        format!("user:{a}:{b}")
    } else {
        format!("user:{b}:{a}")
    }
}

pub struct ChatService {
    notifier: Arc<dyn Notifier>,
}

impl ChatService {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }

    /// Send a message on a channel. An empty `text` is a read marker.
    /// For a game channel the sender must be a participant of the
    /// game; other authorization happens outside this service.
    pub async fn add_msg(
        &self,
        session: &Session,
        channel: &str,
        from_user_id: &str,
        to_user_id: Option<&str>,
        text: &str,
        timestamp: Option<DateTime<Utc>>,
    ) -> CoreResult<DateTime<Utc>> {
        let channel = self.normalize(channel, from_user_id, to_user_id)?;

        if let Some(game_id) = channel.strip_prefix("game:") {
            let game = session
                .games()
                .get(game_id)
                .await?
                .ok_or(CoreError::NotFound)?;
            let participant = game.player0_id.as_deref() == Some(from_user_id)
                || game.player1_id.as_deref() == Some(from_user_id);
            if !participant {
                return Err(CoreError::Forbidden);
            }
        }

        let ts = session
            .chat()
            .add_msg(&channel, from_user_id, to_user_id, text, timestamp)
            .await?;

        if !text.is_empty() {
            if let Some(recipient) = to_user_id {
                notify_user(&self.notifier, recipient, NotifyEvent::Chat).await;
            }
        }
        Ok(ts)
    }

    /// Rewrite a direct channel into its normalized ordering; game
    /// channels pass through unchanged
    fn normalize(
        &self,
        channel: &str,
        from_user_id: &str,
        to_user_id: Option<&str>,
    ) -> CoreResult<String> {
        if channel.starts_with("game:") {
            return Ok(channel.to_string());
        }
        if channel.starts_with("user:") {
            let recipient = to_user_id.ok_or_else(|| {
                CoreError::IllegalState("direct message without a recipient".to_string())
            })?;
            return Ok(user_channel(from_user_id, recipient));
        }
        Err(CoreError::IllegalState(format!(
            "unknown channel format '{channel}'"
        )))
    }

    /// True if the channel holds messages the user has not yet seen
    pub async fn check_unread(
        &self,
        session: &Session,
        channel: &str,
        user_id: &str,
    ) -> CoreResult<bool> {
        Ok(session.chat().check_conversation(channel, user_id).await?)
    }

    /// The newest messages of a conversation, newest first. `max_len`
    /// counts only real messages; read markers in between are included.
    pub async fn list_conversation(
        &self,
        session: &Session,
        channel: &str,
        max_len: Option<usize>,
    ) -> CoreResult<Vec<ChatRecord>> {
        Ok(session
            .chat()
            .list_conversation(channel, max_len.unwrap_or(DEFAULT_CONVERSATION_LEN))
            .await?)
    }

    /// Per distinct correspondent, the most recent message and whether
    /// the conversation holds unread messages, filtered by the caller's
    /// block set
    pub async fn history(
        &self,
        session: &Session,
        for_user: &str,
        max_len: usize,
        blocked: &HashSet<String>,
    ) -> CoreResult<Vec<ChatHistoryEntry>> {
        Ok(session.chat().chat_history(for_user, max_len, blocked).await?)
    }
}
