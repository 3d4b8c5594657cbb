use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::{
    auth::require_owner,
    errors::{AppError, AppResult},
    models::domain::{
        quiz_session::SourceReference, AdvancedQuestion, QuizConfig, QuizSession,
    },
    repositories::{QuizProgressRepository, QuizSessionFilter, QuizSessionRepository},
    services::quiz_scoring_service::{score_quiz, QuizScore},
};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Everything the client submits when finishing a quiz.
#[derive(Debug, Clone)]
pub struct CompletedQuiz {
    pub source: SourceReference,
    pub config: QuizConfig,
    pub questions: Vec<AdvancedQuestion>,
    pub answers: Vec<Option<Value>>,
    pub time_spent_seconds: u64,
    pub ai_service: String,
    pub ai_model: String,
}

pub struct QuizSessionService {
    sessions: Arc<dyn QuizSessionRepository>,
    progress: Arc<dyn QuizProgressRepository>,
}

impl QuizSessionService {
    pub fn new(
        sessions: Arc<dyn QuizSessionRepository>,
        progress: Arc<dyn QuizProgressRepository>,
    ) -> Self {
        Self { sessions, progress }
    }

    /// Score a completed quiz into a session record without persisting it.
    /// The score is returned alongside for callers that report it directly.
    pub fn build_session(
        user_id: &str,
        quiz: CompletedQuiz,
    ) -> AppResult<(QuizSession, QuizScore)> {
        let result = score_quiz(&quiz.questions, &quiz.answers)?;

        let session = QuizSession {
            id: Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            source: quiz.source,
            config: quiz.config,
            questions: quiz.questions,
            answers: quiz.answers,
            score: result.score,
            total_scored: result.total_scored,
            percentage: result.percentage,
            category_scores: result.category_scores.clone(),
            time_spent_seconds: quiz.time_spent_seconds,
            ai_service: quiz.ai_service,
            ai_model: quiz.ai_model,
            fallback_count: result.fallback_count,
            completed_at: Utc::now(),
        };
        Ok((session, result))
    }

    /// Persist a session and clear the user's resumable progress.
    pub async fn save(&self, session: QuizSession) -> AppResult<QuizSession> {
        if session.answers.len() != session.questions.len() {
            return Err(AppError::ValidationError(format!(
                "Session has {} questions but {} answers",
                session.questions.len(),
                session.answers.len()
            )));
        }

        let user_id = session.user_id.clone();
        let saved = self.sessions.create(session).await?;
        self.progress.delete(&user_id).await?;

        log::info!(
            "Saved quiz session {} for user {} ({}/{})",
            saved.id,
            user_id,
            saved.score,
            saved.total_scored
        );
        Ok(saved)
    }

    pub async fn get(&self, user_id: &str, id: &str) -> AppResult<QuizSession> {
        let session = self
            .sessions
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Quiz session with id '{}' not found", id)))?;

        require_owner(user_id, &session.user_id, "quiz session")?;
        Ok(session)
    }

    pub async fn list(
        &self,
        user_id: &str,
        filter: &QuizSessionFilter,
        offset: u64,
        limit: Option<i64>,
    ) -> AppResult<(Vec<QuizSession>, u64)> {
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        self.sessions.find_by_user(user_id, filter, offset, limit).await
    }

    pub async fn delete(&self, user_id: &str, id: &str) -> AppResult<()> {
        self.get(user_id, id).await?;
        if !self.sessions.delete(user_id, id).await? {
            return Err(AppError::NotFound(format!(
                "Quiz session with id '{}' not found",
                id
            )));
        }
        Ok(())
    }

    pub async fn delete_all(&self, user_id: &str) -> AppResult<u64> {
        let deleted = self.sessions.delete_all_for_user(user_id).await?;
        log::info!("Deleted {} quiz session(s) for user {}", deleted, user_id);
        Ok(deleted)
    }

    pub async fn purge_expired(&self, user_id: &str, retention_days: u32) -> AppResult<u64> {
        let cutoff = Utc::now() - Duration::days(i64::from(retention_days));
        let purged = self.sessions.delete_older_than(user_id, cutoff).await?;
        if purged > 0 {
            log::info!(
                "Purged {} quiz session(s) older than {} day(s) for user {}",
                purged,
                retention_days,
                user_id
            );
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::domain::{quiz_config::ContentType, QuestionType};
    use crate::test_utils::fixtures::{sample_config, sample_question};
    use serde_json::json;

    fn completed(answers: Vec<Option<Value>>) -> CompletedQuiz {
        CompletedQuiz {
            source: SourceReference::new(ContentType::Text, None, "Photosynthesis"),
            config: sample_config(),
            questions: vec![
                sample_question(QuestionType::MultipleChoice),
                sample_question(QuestionType::TrueFalseExplained),
            ],
            answers,
            time_spent_seconds: 120,
            ai_service: "openai".into(),
            ai_model: "gpt-4o-mini".into(),
        }
    }

    #[test]
    fn build_session_scores_answers() {
        let (session, score) =
            QuizSessionService::build_session("u1", completed(vec![Some(json!("B")), None]))
                .unwrap();
        assert_eq!(session.user_id, "u1");
        assert_eq!(score.score, session.score);
        assert_eq!(score.results.len(), 2);
        assert_eq!(session.score, 1);
        assert_eq!(session.total_scored, 2);
        assert_eq!(session.percentage, 50.0);
        assert_eq!(session.answered_count(), 1);
    }

    #[test]
    fn build_session_rejects_missing_answer_slots() {
        let result = QuizSessionService::build_session("u1", completed(vec![Some(json!("B"))]));
        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }
}
