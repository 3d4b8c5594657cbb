use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

use crate::{
    errors::{AppError, AppResult},
    models::domain::{AdvancedQuestion, QuizConfig, QuizProgress},
    repositories::QuizProgressRepository,
};

pub struct QuizProgressService {
    repository: Arc<dyn QuizProgressRepository>,
}

impl QuizProgressService {
    pub fn new(repository: Arc<dyn QuizProgressRepository>) -> Self {
        Self { repository }
    }

    pub async fn get(&self, user_id: &str) -> AppResult<Option<QuizProgress>> {
        self.repository.find(user_id).await
    }

    /// Upsert the user's snapshot, keeping the original start time.
    pub async fn save(
        &self,
        user_id: &str,
        config: QuizConfig,
        questions: Vec<AdvancedQuestion>,
        answers: Vec<Option<Value>>,
        current_index: u32,
        elapsed_seconds: u64,
    ) -> AppResult<QuizProgress> {
        if answers.len() != questions.len() {
            return Err(AppError::ValidationError(format!(
                "Progress has {} questions but {} answers",
                questions.len(),
                answers.len()
            )));
        }
        if questions.is_empty() || current_index as usize >= questions.len() {
            return Err(AppError::ValidationError(
                "current_index must point at one of the questions".to_string(),
            ));
        }

        let now = Utc::now();
        let started_at = self
            .repository
            .find(user_id)
            .await?
            .map(|existing| existing.started_at)
            .unwrap_or(now);

        self.repository
            .upsert(QuizProgress {
                user_id: user_id.to_string(),
                config,
                questions,
                answers,
                current_index,
                elapsed_seconds,
                started_at,
                updated_at: now,
            })
            .await
    }

    pub async fn clear(&self, user_id: &str) -> AppResult<bool> {
        self.repository.delete(user_id).await
    }
}
