use super::sql_repository;
use crate::db::{
    records::{ChatHistoryEntry, ChatRecord},
    repos::ChatRepository,
    sql::entities::chats,
    DbResult,
};
use crate::utils::ids::generate_id;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use std::collections::HashSet;

sql_repository!(SqlChatRepository);

/// Page size for newest-to-oldest channel scans
const CHUNK_SIZE: u64 = 40;

fn to_record(model: chats::Model) -> ChatRecord {
    ChatRecord {
        id: model.id,
        channel: model.channel,
        user_id: model.user_id,
        recipient_id: model.recipient_id,
        msg: model.msg,
        timestamp: model.timestamp,
    }
}

/// The direct-message channel between two users, lexicographically
/// normalized
fn direct_channel(a: &str, b: &str) -> String {
    if a < b {
        format!("user:{a}:{b}")
    } else {
        format!("user:{b}:{a}")
    }
}

impl SqlChatRepository {
    /// Fetch one page of a channel, newest first
    async fn channel_page(&self, channel: &str, page: u64) -> DbResult<Vec<chats::Model>> {
        let conn = self.session.conn().await?;
        Ok(chats::Entity::find()
            .filter(chats::Column::Channel.eq(channel))
            .order_by_desc(chats::Column::Timestamp)
            .order_by_desc(chats::Column::Id)
            .offset(page * CHUNK_SIZE)
            .limit(CHUNK_SIZE)
            .all(&*conn)
            .await?)
    }
}

#[async_trait]
impl ChatRepository for SqlChatRepository {
    async fn add_msg(
        &self,
        channel: &str,
        user_id: &str,
        recipient_id: Option<&str>,
        msg: &str,
        timestamp: Option<DateTime<Utc>>,
    ) -> DbResult<DateTime<Utc>> {
        let conn = self.session.conn().await?;
        let timestamp = timestamp.unwrap_or_else(Utc::now);
        chats::ActiveModel {
            id: Set(generate_id()),
            channel: Set(channel.to_string()),
            user_id: Set(user_id.to_string()),
            recipient_id: Set(recipient_id.map(str::to_string)),
            msg: Set(msg.to_string()),
            timestamp: Set(timestamp),
        }
        .insert(&*conn)
        .await?;
        Ok(timestamp)
    }

    async fn list_conversation(
        &self,
        channel: &str,
        max_len: usize,
    ) -> DbResult<Vec<ChatRecord>> {
        let mut result = Vec::new();
        let mut count = 0usize;
        let mut page = 0u64;
        'outer: loop {
            let models = self.channel_page(channel, page).await?;
            if models.is_empty() {
                break;
            }
            for model in models {
                let is_marker = model.msg.is_empty();
                result.push(to_record(model));
                if !is_marker {
                    count += 1;
                    if count >= max_len {
                        break 'outer;
                    }
                }
            }
            page += 1;
        }
        Ok(result)
    }

    async fn check_conversation(&self, channel: &str, user_id: &str) -> DbResult<bool> {
        let mut page = 0u64;
        loop {
            let models = self.channel_page(channel, page).await?;
            if models.is_empty() {
                return Ok(false);
            }
            for model in models {
                if model.user_id != user_id && !model.msg.is_empty() {
                    // A message originated by the other user
                    return Ok(true);
                }
                if model.user_id == user_id && model.msg.is_empty() {
                    // An 'already seen' marker from the querying user
                    return Ok(false);
                }
            }
            page += 1;
        }
    }

    async fn chat_history(
        &self,
        for_user: &str,
        max_len: usize,
        blocked: &HashSet<String>,
    ) -> DbResult<Vec<ChatHistoryEntry>> {
        let models = {
            let conn = self.session.conn().await?;
            chats::Entity::find()
                .filter(chats::Column::Channel.like("user:%"))
                .filter(
                    Condition::any()
                        .add(chats::Column::UserId.eq(for_user))
                        .add(chats::Column::RecipientId.eq(for_user)),
                )
                .order_by_desc(chats::Column::Timestamp)
                .order_by_desc(chats::Column::Id)
                // Overfetch to cover repeated correspondents and markers
                .limit((max_len * 10) as u64)
                .all(&*conn)
                .await?
        };

        let mut seen: HashSet<String> = HashSet::new();
        let mut result = Vec::new();
        for model in models {
            if model.msg.is_empty() {
                continue;
            }
            let other = if model.user_id == for_user {
                match &model.recipient_id {
                    Some(recipient) => recipient.clone(),
                    None => continue,
                }
            } else {
                model.user_id.clone()
            };
            if blocked.contains(&other) || !seen.insert(other.clone()) {
                continue;
            }
            let unread = self
                .check_conversation(&direct_channel(for_user, &other), for_user)
                .await?;
            result.push(ChatHistoryEntry {
                user: other,
                ts: model.timestamp,
                last_msg: model.msg.clone(),
                unread,
            });
            if result.len() >= max_len {
                break;
            }
        }
        Ok(result)
    }

    async fn delete_for_user(&self, user_id: &str) -> DbResult<()> {
        let conn = self.session.conn().await?;
        chats::Entity::delete_many()
            .filter(chats::Column::UserId.eq(user_id))
            .exec(&*conn)
            .await?;
        Ok(())
    }
}
