use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::domain::question::AdvancedQuestion;
use crate::models::domain::quiz_config::QuizConfig;

/// Resumable snapshot of a quiz in progress. One per user.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct QuizProgress {
    pub user_id: String,
    pub config: QuizConfig,
    pub questions: Vec<AdvancedQuestion>,
    pub answers: Vec<Option<Value>>,
    #[serde(default)]
    pub current_index: u32,
    pub elapsed_seconds: u64,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
