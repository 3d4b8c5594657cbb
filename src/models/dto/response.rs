use async_graphql::SimpleObject;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::domain::{
    quiz_session::QuizSession, AdvancedQuestion, ChatSession,
};
use crate::services::quiz_scoring_service::QuizScore;

#[derive(Debug, Clone, PartialEq, Serialize, SimpleObject)]
pub struct QuizSessionSummary {
    pub id: String,
    pub title: String,
    pub source_kind: String,
    pub score: u32,
    pub total_scored: u32,
    pub percentage: f64,
    pub question_count: u32,
    pub answered_count: u32,
    pub fallback_count: u32,
    pub time_spent_seconds: u64,
    pub ai_service: String,
    pub ai_model: String,
    pub completed_at: DateTime<Utc>,
}

impl From<&QuizSession> for QuizSessionSummary {
    fn from(session: &QuizSession) -> Self {
        let source_kind = serde_json::to_value(session.source.kind)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();

        QuizSessionSummary {
            id: session.id.clone(),
            title: session.source.title.clone(),
            source_kind,
            score: session.score,
            total_scored: session.total_scored,
            percentage: session.percentage,
            question_count: session.questions.len() as u32,
            answered_count: session.answered_count() as u32,
            fallback_count: session.fallback_count,
            time_spent_seconds: session.time_spent_seconds,
            ai_service: session.ai_service.clone(),
            ai_model: session.ai_model.clone(),
            completed_at: session.completed_at,
        }
    }
}

/// Sessions completed on one calendar day (`YYYY-MM-DD`, UTC).
#[derive(Debug, Clone, PartialEq, Serialize, SimpleObject)]
pub struct HistoryGroup {
    pub date: String,
    pub sessions: Vec<QuizSessionSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, SimpleObject)]
pub struct ChatSessionSummary {
    pub id: String,
    pub title: String,
    pub provider: String,
    pub model: String,
    pub message_count: u32,
    pub updated_at: DateTime<Utc>,
}

impl From<ChatSession> for ChatSessionSummary {
    fn from(session: ChatSession) -> Self {
        ChatSessionSummary {
            id: session.id,
            title: session.title,
            provider: session.provider,
            model: session.model,
            message_count: session.message_count,
            updated_at: session.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GenerateQuizResponse {
    pub questions: Vec<AdvancedQuestion>,
    pub generated_count: usize,
    pub fallback_count: usize,
    pub attempts: u32,
    pub warnings: Vec<String>,
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Serialize)]
pub struct CompleteQuizResponse {
    pub session_id: String,
    pub saved: bool,
    #[serde(flatten)]
    pub score: QuizScore,
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T: Serialize> {
    pub items: Vec<T>,
    pub total: u64,
    pub offset: u64,
    pub limit: i64,
}

#[derive(Debug, Serialize, SimpleObject)]
pub struct DeleteResponse {
    pub message: String,
    pub deleted: u64,
}
