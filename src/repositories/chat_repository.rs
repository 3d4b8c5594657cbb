use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, options::IndexOptions, Collection, IndexModel};

use crate::{
    db::{Database, CHAT_MESSAGES, CHAT_SESSIONS},
    errors::AppResult,
    models::domain::{ChatMessage, ChatSession},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatRepository: Send + Sync {
    async fn create_session(&self, session: ChatSession) -> AppResult<ChatSession>;
    async fn find_session(&self, id: &str) -> AppResult<Option<ChatSession>>;
    /// Most recently updated first.
    async fn list_sessions(&self, user_id: &str) -> AppResult<Vec<ChatSession>>;
    async fn update_session(&self, session: &ChatSession) -> AppResult<()>;
    /// Removes the session and all of its messages.
    async fn delete_session(&self, id: &str) -> AppResult<bool>;
    async fn add_message(&self, message: ChatMessage) -> AppResult<ChatMessage>;
    /// Chronological. With `limit`, only the latest `limit` messages.
    async fn list_messages(&self, session_id: &str, limit: Option<i64>)
        -> AppResult<Vec<ChatMessage>>;
}

pub struct MongoChatRepository {
    sessions: Collection<ChatSession>,
    messages: Collection<ChatMessage>,
}

impl MongoChatRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            sessions: db.get_collection(CHAT_SESSIONS),
            messages: db.get_collection(CHAT_MESSAGES),
        }
    }

    pub async fn ensure_indexes(&self) -> AppResult<()> {
        log::info!("Creating indexes for chat collections");

        let session_id_index = IndexModel::builder()
            .keys(doc! { "id": 1 })
            .options(
                IndexOptions::builder()
                    .unique(true)
                    .name("id_unique".to_string())
                    .build(),
            )
            .build();

        let user_updated_index = IndexModel::builder()
            .keys(doc! { "user_id": 1, "updated_at": -1 })
            .options(
                IndexOptions::builder()
                    .name("user_updated".to_string())
                    .build(),
            )
            .build();

        let message_session_index = IndexModel::builder()
            .keys(doc! { "session_id": 1, "created_at": 1 })
            .options(
                IndexOptions::builder()
                    .name("session_created".to_string())
                    .build(),
            )
            .build();

        self.sessions.create_index(session_id_index).await?;
        self.sessions.create_index(user_updated_index).await?;
        self.messages.create_index(message_session_index).await?;

        log::info!("Successfully created indexes for chat collections");
        Ok(())
    }
}

#[async_trait]
impl ChatRepository for MongoChatRepository {
    async fn create_session(&self, session: ChatSession) -> AppResult<ChatSession> {
        self.sessions.insert_one(&session).await?;
        Ok(session)
    }

    async fn find_session(&self, id: &str) -> AppResult<Option<ChatSession>> {
        let session = self.sessions.find_one(doc! { "id": id }).await?;
        Ok(session)
    }

    async fn list_sessions(&self, user_id: &str) -> AppResult<Vec<ChatSession>> {
        let sessions = self
            .sessions
            .find(doc! { "user_id": user_id })
            .sort(doc! { "updated_at": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(sessions)
    }

    async fn update_session(&self, session: &ChatSession) -> AppResult<()> {
        self.sessions
            .replace_one(doc! { "id": &session.id }, session)
            .await?;
        Ok(())
    }

    async fn delete_session(&self, id: &str) -> AppResult<bool> {
        self.messages
            .delete_many(doc! { "session_id": id })
            .await?;
        let result = self.sessions.delete_one(doc! { "id": id }).await?;
        Ok(result.deleted_count > 0)
    }

    async fn add_message(&self, message: ChatMessage) -> AppResult<ChatMessage> {
        self.messages.insert_one(&message).await?;
        Ok(message)
    }

    async fn list_messages(
        &self,
        session_id: &str,
        limit: Option<i64>,
    ) -> AppResult<Vec<ChatMessage>> {
        let filter = doc! { "session_id": session_id };

        let mut messages: Vec<ChatMessage> = match limit {
            Some(limit) => {
                self.messages
                    .find(filter)
                    .sort(doc! { "created_at": -1 })
                    .limit(limit)
                    .await?
                    .try_collect()
                    .await?
            }
            None => {
                self.messages
                    .find(filter)
                    .sort(doc! { "created_at": 1 })
                    .await?
                    .try_collect()
                    .await?
            }
        };

        if limit.is_some() {
            messages.reverse();
        }
        Ok(messages)
    }
}
