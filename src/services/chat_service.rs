use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use chrono::Utc;
use serde::Serialize;
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
};

use crate::{
    auth::require_owner,
    constants::prompts::CHAT_ASSISTANT_SYSTEM_PROMPT,
    errors::{AppError, AppResult},
    models::domain::{
        chat::{ChatRole, DEFAULT_CHAT_TITLE},
        usage::{TokenUsage, UsageFeature},
        ChatMessage, ChatSession,
    },
    repositories::ChatRepository,
    services::{
        llm_client::{ChunkReceiver, CompletionRequest, LlmMessage, StreamChunk},
        provider_registry::ProviderRegistry,
        usage_service::UsageService,
    },
};

pub const CONTEXT_MESSAGES: i64 = 20;
pub const TITLE_CHARS: usize = 48;
const EVENT_BUFFER: usize = 64;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    Delta { content: String },
    Complete { message: ChatMessage },
    Error { message: String },
}

impl ChatEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ChatEvent::Delta { .. } => "delta",
            ChatEvent::Complete { .. } => "complete",
            ChatEvent::Error { .. } => "error",
        }
    }
}

type InFlight = Arc<Mutex<HashMap<String, (u64, JoinHandle<()>)>>>;

pub struct ChatService {
    repository: Arc<dyn ChatRepository>,
    providers: Arc<ProviderRegistry>,
    usage: Arc<UsageService>,
    in_flight: InFlight,
    next_send: AtomicU64,
}

impl ChatService {
    pub fn new(
        repository: Arc<dyn ChatRepository>,
        providers: Arc<ProviderRegistry>,
        usage: Arc<UsageService>,
    ) -> Self {
        Self {
            repository,
            providers,
            usage,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
            next_send: AtomicU64::new(1),
        }
    }

    pub async fn create_session(
        &self,
        user_id: &str,
        title: Option<&str>,
        provider: Option<&str>,
        preferred_provider: Option<&str>,
        model: Option<&str>,
    ) -> AppResult<ChatSession> {
        let client = self.providers.resolve(provider, preferred_provider)?;
        let model = model
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| client.default_model());

        let session = ChatSession::new(user_id, title, &client.provider_name(), &model);
        log::info!("Created chat session {} for user {}", session.id, user_id);
        self.repository.create_session(session).await
    }

    pub async fn list_sessions(&self, user_id: &str) -> AppResult<Vec<ChatSession>> {
        self.repository.list_sessions(user_id).await
    }

    pub async fn get_session(&self, user_id: &str, session_id: &str) -> AppResult<ChatSession> {
        let session = self
            .repository
            .find_session(session_id)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Chat session with id '{}' not found", session_id))
            })?;

        require_owner(user_id, &session.user_id, "chat session")?;
        Ok(session)
    }

    pub async fn messages(&self, user_id: &str, session_id: &str) -> AppResult<Vec<ChatMessage>> {
        self.get_session(user_id, session_id).await?;
        self.repository.list_messages(session_id, None).await
    }

    pub async fn delete_session(&self, user_id: &str, session_id: &str) -> AppResult<()> {
        self.get_session(user_id, session_id).await?;
        self.abort_in_flight(session_id).await;
        self.repository.delete_session(session_id).await?;
        log::info!("Deleted chat session {} for user {}", session_id, user_id);
        Ok(())
    }

    /// Abort the session's in-flight reply, if any.
    pub async fn cancel(&self, user_id: &str, session_id: &str) -> AppResult<bool> {
        self.get_session(user_id, session_id).await?;
        Ok(self.abort_in_flight(session_id).await)
    }

    async fn abort_in_flight(&self, session_id: &str) -> bool {
        match self.in_flight.lock().await.remove(session_id) {
            Some((send_id, handle)) => {
                handle.abort();
                log::info!("Aborted reply {} on chat session {}", send_id, session_id);
                true
            }
            None => false,
        }
    }

    /// Persist the user's message and stream the assistant reply. Any reply
    /// already streaming on the session is aborted first.
    pub async fn send_message(
        &self,
        user_id: &str,
        session_id: &str,
        content: &str,
    ) -> AppResult<mpsc::Receiver<ChatEvent>> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::ValidationError(
                "Message content must not be empty".to_string(),
            ));
        }

        let mut session = self.get_session(user_id, session_id).await?;
        self.abort_in_flight(session_id).await;

        self.repository
            .add_message(ChatMessage::new(session_id, ChatRole::User, content))
            .await?;

        if session.message_count == 0 && session.title == DEFAULT_CHAT_TITLE {
            session.title = derive_title(content);
        }
        session.message_count += 1;
        session.updated_at = Utc::now();
        self.repository.update_session(&session).await?;

        let history = self
            .repository
            .list_messages(session_id, Some(CONTEXT_MESSAGES))
            .await?;

        let client = self.providers.resolve(None, Some(&session.provider))?;
        let mut request = CompletionRequest::new(build_context(&history));
        request.model = Some(session.model.clone());

        let chunks = client.stream_chat(request).await?;
        let provider = client.provider_name();

        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let send_id = self.next_send.fetch_add(1, Ordering::Relaxed);

        let reply = ReplyTask {
            repository: self.repository.clone(),
            usage: self.usage.clone(),
            in_flight: self.in_flight.clone(),
            session,
            provider,
            send_id,
            events: tx,
        };

        // The task's own cleanup needs this lock, so it cannot finish before
        // its handle is registered.
        let mut in_flight = self.in_flight.lock().await;
        let handle = tokio::spawn(reply.run(chunks));
        in_flight.insert(session_id.to_string(), (send_id, handle));

        Ok(rx)
    }
}

/// Streams one assistant reply and persists it once the provider is done.
struct ReplyTask {
    repository: Arc<dyn ChatRepository>,
    usage: Arc<UsageService>,
    in_flight: InFlight,
    session: ChatSession,
    provider: String,
    send_id: u64,
    events: mpsc::Sender<ChatEvent>,
}

impl ReplyTask {
    async fn run(self, chunks: ChunkReceiver) {
        let outcome = self.stream(chunks).await;
        if let Err(e) = &outcome {
            log::warn!("Chat reply on session {} failed: {}", self.session.id, e);
            let _ = self
                .events
                .send(ChatEvent::Error {
                    message: e.to_string(),
                })
                .await;
        }

        let mut in_flight = self.in_flight.lock().await;
        if in_flight
            .get(&self.session.id)
            .is_some_and(|(id, _)| *id == self.send_id)
        {
            in_flight.remove(&self.session.id);
        }
    }

    async fn stream(&self, mut chunks: ChunkReceiver) -> AppResult<()> {
        let mut reply = String::new();
        let mut usage = TokenUsage::default();

        while let Some(chunk) = chunks.recv().await {
            match chunk? {
                StreamChunk::Content(delta) => {
                    reply.push_str(&delta);
                    if self
                        .events
                        .send(ChatEvent::Delta { content: delta })
                        .await
                        .is_err()
                    {
                        log::info!("Client left chat session {} mid-reply", self.session.id);
                        return Ok(());
                    }
                }
                StreamChunk::Usage(u) => usage.add(u),
                StreamChunk::Done => return self.finish(reply, usage).await,
            }
        }

        Err(AppError::ProviderError(
            "Chat stream closed before completion".to_string(),
        ))
    }

    async fn finish(&self, reply: String, usage: TokenUsage) -> AppResult<()> {
        let message = self
            .repository
            .add_message(ChatMessage::new(&self.session.id, ChatRole::Assistant, reply))
            .await?;

        if let Some(mut session) = self.repository.find_session(&self.session.id).await? {
            session.message_count += 1;
            session.updated_at = Utc::now();
            self.repository.update_session(&session).await?;
        }

        self.usage
            .record_quietly(
                &self.session.user_id,
                &self.provider,
                &self.session.model,
                UsageFeature::Chat,
                usage,
            )
            .await;

        let _ = self.events.send(ChatEvent::Complete { message }).await;
        Ok(())
    }
}

/// System prompt followed by the recent transcript.
pub fn build_context(history: &[ChatMessage]) -> Vec<LlmMessage> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(LlmMessage::system(CHAT_ASSISTANT_SYSTEM_PROMPT));
    messages.extend(
        history
            .iter()
            .filter(|m| m.role != ChatRole::System)
            .map(|m| LlmMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            }),
    );
    messages
}

pub fn derive_title(content: &str) -> String {
    let line = content.lines().next().unwrap_or_default().trim();
    if line.chars().count() <= TITLE_CHARS {
        return line.to_string();
    }
    let truncated: String = line.chars().take(TITLE_CHARS).collect();
    format!("{}...", truncated.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_starts_with_system_prompt() {
        let history = vec![
            ChatMessage::new("s1", ChatRole::User, "What is ATP?"),
            ChatMessage::new("s1", ChatRole::Assistant, "An energy carrier."),
            ChatMessage::new("s1", ChatRole::System, "ignored"),
        ];
        let context = build_context(&history);
        assert_eq!(context.len(), 3);
        assert_eq!(context[0].role, "system");
        assert_eq!(context[1].content, "What is ATP?");
        assert_eq!(context[2].role, "assistant");
    }

    #[test]
    fn title_is_first_line_truncated() {
        assert_eq!(derive_title("Explain mitosis\nplease"), "Explain mitosis");
        let long = "word ".repeat(30);
        let title = derive_title(&long);
        assert!(title.ends_with("..."));
        assert!(title.chars().count() <= TITLE_CHARS + 3);
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let event = ChatEvent::Delta {
            content: "Hi".into(),
        };
        assert_eq!(event.name(), "delta");
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            serde_json::json!({"type": "delta", "content": "Hi"})
        );
    }
}
