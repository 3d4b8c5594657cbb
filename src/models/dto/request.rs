use async_graphql::InputObject;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use validator::Validate;

use crate::models::domain::{
    preferences::ExportFormat,
    quiz_config::ContentType,
    quiz_session::SourceReference,
    AdvancedQuestion, QuizConfig,
};
use crate::repositories::QuizSessionFilter;
use crate::services::history_service::ExportKind;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GenerateQuizRequestDto {
    #[validate(length(min = 50, max = 200000, message = "Content must be 50-200000 characters"))]
    pub content: String,

    #[serde(default)]
    pub config: QuizConfig,

    #[validate(length(min = 1, max = 50))]
    pub provider: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SourceDto {
    #[serde(default)]
    pub kind: ContentType,

    #[validate(length(min = 1, max = 100))]
    pub id: Option<String>,

    #[validate(length(min = 1, max = 200))]
    pub title: String,

    /// Original material, used only to fingerprint the source.
    #[validate(length(max = 200000))]
    pub content: Option<String>,
}

impl From<SourceDto> for SourceReference {
    fn from(dto: SourceDto) -> Self {
        let source = SourceReference::new(dto.kind, dto.id, dto.title.trim());
        match dto.content.as_deref() {
            Some(content) if !content.trim().is_empty() => source.with_content(content),
            _ => source,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ScoreQuizRequestDto {
    #[validate(length(min = 1, max = 50))]
    pub questions: Vec<AdvancedQuestion>,
    pub answers: Vec<Option<Value>>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CompleteQuizRequestDto {
    #[validate(nested)]
    pub source: SourceDto,

    #[serde(default)]
    pub config: QuizConfig,

    #[validate(length(min = 1, max = 50))]
    pub questions: Vec<AdvancedQuestion>,

    pub answers: Vec<Option<Value>>,

    #[serde(default)]
    pub time_spent_seconds: u64,

    #[validate(length(min = 1, max = 50))]
    pub ai_service: String,

    #[validate(length(min = 1, max = 100))]
    pub ai_model: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SaveProgressRequestDto {
    #[serde(default)]
    pub config: QuizConfig,

    #[validate(length(min = 1, max = 50))]
    pub questions: Vec<AdvancedQuestion>,

    pub answers: Vec<Option<Value>>,

    #[serde(default)]
    pub current_index: u32,

    #[serde(default)]
    pub elapsed_seconds: u64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateChatSessionRequest {
    #[validate(length(max = 100))]
    pub title: Option<String>,

    #[validate(length(min = 1, max = 50))]
    pub provider: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 8000, message = "Message must be 1-8000 characters"))]
    pub content: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, InputObject)]
pub struct HistoryQueryParams {
    #[validate(length(max = 200))]
    pub search: Option<String>,

    pub from: Option<DateTime<Utc>>,

    pub to: Option<DateTime<Utc>>,

    #[validate(range(min = 0.0, max = 100.0))]
    pub min_percentage: Option<f64>,

    #[validate(range(min = 0))]
    pub offset: Option<u64>,

    #[validate(range(min = 1, max = 100))]
    pub limit: Option<i64>,
}

impl HistoryQueryParams {
    pub fn filter(&self) -> QuizSessionFilter {
        QuizSessionFilter {
            search: self.search.clone(),
            from: self.from,
            to: self.to,
            min_percentage: self.min_percentage,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportParams {
    #[serde(default)]
    pub kind: ExportKind,
    pub format: Option<ExportFormat>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePreferencesRequest {
    #[validate(length(max = 50))]
    pub preferred_provider: Option<String>,

    #[validate(length(max = 100))]
    pub preferred_model: Option<String>,

    pub default_export_format: Option<ExportFormat>,

    #[validate(range(min = 1, max = 3650))]
    pub retention_days: Option<u32>,

    #[serde(default)]
    pub clear_retention: bool,

    pub auto_save: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddQuoteRequest {
    #[validate(length(min = 1, max = 500))]
    pub quote: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UsageQueryParams {
    pub since: Option<DateTime<Utc>>,
}
