use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    errors::AppResult,
    models::{
        domain::{preferences::ExportFormat, ChatMessage, ChatSession, QuizSession},
        dto::response::{HistoryGroup, QuizSessionSummary},
    },
    repositories::{ChatRepository, QuizSessionFilter},
    services::{
        preferences_service::PreferencesService,
        quiz_session_service::{QuizSessionService, MAX_PAGE_SIZE},
    },
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    #[default]
    Quizzes,
    Chats,
}

impl ExportKind {
    fn file_stem(&self) -> &'static str {
        match self {
            ExportKind::Quizzes => "quiz-history",
            ExportKind::Chats => "chat-history",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: &'static str,
    pub body: String,
}

#[derive(Debug, Serialize)]
struct ChatTranscript {
    session: ChatSession,
    messages: Vec<ChatMessage>,
}

pub struct HistoryService {
    sessions: Arc<QuizSessionService>,
    chat: Arc<dyn ChatRepository>,
    preferences: Arc<PreferencesService>,
}

impl HistoryService {
    pub fn new(
        sessions: Arc<QuizSessionService>,
        chat: Arc<dyn ChatRepository>,
        preferences: Arc<PreferencesService>,
    ) -> Self {
        Self {
            sessions,
            chat,
            preferences,
        }
    }

    /// Applies the user's retention window before listing.
    pub async fn list(
        &self,
        user_id: &str,
        filter: &QuizSessionFilter,
        offset: u64,
        limit: Option<i64>,
    ) -> AppResult<(Vec<QuizSession>, u64)> {
        let preferences = self.preferences.get(user_id).await?;
        if let Some(days) = preferences.retention_days {
            self.sessions.purge_expired(user_id, days).await?;
        }
        self.sessions.list(user_id, filter, offset, limit).await
    }

    pub async fn grouped(
        &self,
        user_id: &str,
        filter: &QuizSessionFilter,
        offset: u64,
        limit: Option<i64>,
    ) -> AppResult<Vec<HistoryGroup>> {
        let (sessions, _) = self.list(user_id, filter, offset, limit).await?;
        Ok(group_by_day(&sessions))
    }

    pub async fn export(
        &self,
        user_id: &str,
        kind: ExportKind,
        format: Option<ExportFormat>,
    ) -> AppResult<ExportFile> {
        let format = match format {
            Some(format) => format,
            None => self.preferences.get(user_id).await?.default_export_format,
        };

        let body = match kind {
            ExportKind::Quizzes => {
                let sessions = self.all_sessions(user_id).await?;
                match format {
                    ExportFormat::Json => serde_json::to_string_pretty(&sessions)?,
                    ExportFormat::Csv => quiz_sessions_csv(&sessions),
                }
            }
            ExportKind::Chats => {
                let transcripts = self.all_transcripts(user_id).await?;
                match format {
                    ExportFormat::Json => serde_json::to_string_pretty(&transcripts)?,
                    ExportFormat::Csv => chat_csv(&transcripts),
                }
            }
        };

        log::info!(
            "Exported {:?} history for user {} as {}",
            kind,
            user_id,
            format.extension()
        );

        Ok(ExportFile {
            filename: format!("{}.{}", kind.file_stem(), format.extension()),
            content_type: format.content_type(),
            body,
        })
    }

    async fn all_sessions(&self, user_id: &str) -> AppResult<Vec<QuizSession>> {
        let filter = QuizSessionFilter::default();
        let mut all = Vec::new();
        loop {
            let (page, total) = self
                .list(user_id, &filter, all.len() as u64, Some(MAX_PAGE_SIZE))
                .await?;
            let fetched = page.len();
            all.extend(page);
            if fetched == 0 || all.len() as u64 >= total {
                return Ok(all);
            }
        }
    }

    async fn all_transcripts(&self, user_id: &str) -> AppResult<Vec<ChatTranscript>> {
        let sessions = self.chat.list_sessions(user_id).await?;
        let mut transcripts = Vec::with_capacity(sessions.len());
        for session in sessions {
            let messages = self.chat.list_messages(&session.id, None).await?;
            transcripts.push(ChatTranscript { session, messages });
        }
        Ok(transcripts)
    }
}

/// Newest day first; sessions keep their order within a day.
pub fn group_by_day(sessions: &[QuizSession]) -> Vec<HistoryGroup> {
    let mut sorted: Vec<&QuizSession> = sessions.iter().collect();
    sorted.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));

    let mut groups: Vec<HistoryGroup> = Vec::new();
    for session in sorted {
        let date = session.completed_at.format("%Y-%m-%d").to_string();
        match groups.last_mut() {
            Some(group) if group.date == date => group.sessions.push(session.into()),
            _ => groups.push(HistoryGroup {
                date,
                sessions: vec![QuizSessionSummary::from(session)],
            }),
        }
    }
    groups
}

/// RFC 4180 field quoting.
pub fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_row(fields: &[String]) -> String {
    let mut row = fields
        .iter()
        .map(|f| csv_field(f))
        .collect::<Vec<_>>()
        .join(",");
    row.push_str("\r\n");
    row
}

pub fn quiz_sessions_csv(sessions: &[QuizSession]) -> String {
    let mut out = csv_row(
        &[
            "id",
            "title",
            "completed_at",
            "score",
            "total_scored",
            "percentage",
            "question_count",
            "fallback_count",
            "time_spent_seconds",
            "ai_service",
            "ai_model",
        ]
        .map(String::from),
    );

    for s in sessions {
        out.push_str(&csv_row(&[
            s.id.clone(),
            s.source.title.clone(),
            s.completed_at.to_rfc3339(),
            s.score.to_string(),
            s.total_scored.to_string(),
            format!("{:.1}", s.percentage),
            s.questions.len().to_string(),
            s.fallback_count.to_string(),
            s.time_spent_seconds.to_string(),
            s.ai_service.clone(),
            s.ai_model.clone(),
        ]));
    }
    out
}

fn chat_csv(transcripts: &[ChatTranscript]) -> String {
    let mut out = csv_row(
        &["session_id", "session_title", "role", "content", "created_at"].map(String::from),
    );
    for transcript in transcripts {
        for message in &transcript.messages {
            out.push_str(&csv_row(&[
                transcript.session.id.clone(),
                transcript.session.title.clone(),
                message.role.as_str().to_string(),
                message.content.clone(),
                message.created_at.to_rfc3339(),
            ]));
        }
    }
    out
}
