use std::sync::Arc;

use actix_web::{delete, get, post, put, web, HttpResponse};
use validator::Validate;

use crate::{
    app_state::AppState,
    auth::AuthenticatedUser,
    errors::AppError,
    models::{
        domain::{usage::UsageFeature, AdvancedQuestion},
        dto::{
            request::{
                CompleteQuizRequestDto, GenerateQuizRequestDto, HistoryQueryParams,
                SaveProgressRequestDto, ScoreQuizRequestDto,
            },
            response::{
                CompleteQuizResponse, DeleteResponse, GenerateQuizResponse, PaginatedResponse,
                QuizSessionSummary,
            },
        },
    },
    services::{
        quiz_scoring_service::score_quiz,
        quiz_session_service::{CompletedQuiz, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE},
        QuizSessionService,
    },
};

#[post("/quizzes/generate")]
pub async fn generate_quiz(
    state: web::Data<Arc<AppState>>,
    request: web::Json<GenerateQuizRequestDto>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    request.validate()?;

    let preferences = state.preferences_service.get(auth.id()).await?;
    let provider = state.providers.resolve(
        request.provider.as_deref(),
        preferences.preferred_provider.as_deref(),
    )?;

    // A stored model preference only applies to the stored provider.
    let model = request.model.clone().or_else(|| {
        let uses_preferred = request.provider.is_none()
            && preferences.preferred_provider.as_deref() == Some(provider.provider_name().as_str());
        if uses_preferred {
            preferences.preferred_model.clone()
        } else {
            None
        }
    });

    let outcome = state
        .generation_service
        .generate(auth.id(), &request.content, &request.config, provider, model)
        .await?;

    state
        .usage_service
        .record_quietly(
            auth.id(),
            &outcome.provider,
            &outcome.model,
            UsageFeature::QuizGeneration,
            outcome.usage,
        )
        .await;

    Ok(HttpResponse::Ok().json(GenerateQuizResponse {
        questions: outcome.questions,
        generated_count: outcome.generated_count,
        fallback_count: outcome.fallback_count,
        attempts: outcome.attempts,
        warnings: outcome.warnings,
        provider: outcome.provider,
        model: outcome.model,
    }))
}

#[get("/quizzes/schema")]
pub async fn question_schema(_auth: AuthenticatedUser) -> Result<HttpResponse, AppError> {
    let schema = schemars::schema_for!(AdvancedQuestion);
    Ok(HttpResponse::Ok().json(schema))
}

#[post("/quizzes/score")]
pub async fn score_answers(
    request: web::Json<ScoreQuizRequestDto>,
    _auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    request.validate()?;

    let result = score_quiz(&request.questions, &request.answers)?;
    Ok(HttpResponse::Ok().json(result))
}

/// Scores the quiz and answers right away; the save runs in the background
/// and its failures are only logged. `saved` reports whether a save was
/// started. Preferences that cannot be read count as auto-save on.
#[post("/quiz-sessions")]
pub async fn complete_quiz(
    state: web::Data<Arc<AppState>>,
    request: web::Json<CompleteQuizRequestDto>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    request.validate()?;

    let (session, score) = QuizSessionService::build_session(
        auth.id(),
        CompletedQuiz {
            source: request.source.into(),
            config: request.config,
            questions: request.questions,
            answers: request.answers,
            time_spent_seconds: request.time_spent_seconds,
            ai_service: request.ai_service,
            ai_model: request.ai_model,
        },
    )?;
    let session_id = session.id.clone();

    let saved = match state.preferences_service.get(auth.id()).await {
        Ok(preferences) => preferences.auto_save,
        Err(e) => {
            log::error!(
                "Failed to load preferences for user {}, saving session {} anyway: {}",
                auth.id(),
                session_id,
                e
            );
            true
        }
    };
    if saved {
        let sessions = state.session_service.clone();
        let id = session_id.clone();
        tokio::spawn(async move {
            if let Err(e) = sessions.save(session).await {
                log::error!("Failed to save quiz session {}: {}", id, e);
            }
        });
    } else {
        log::debug!("Auto-save disabled for user {}, session {} not stored", auth.id(), session_id);
    }

    Ok(HttpResponse::Created().json(CompleteQuizResponse {
        session_id,
        saved,
        score,
    }))
}

#[get("/quiz-sessions")]
pub async fn list_sessions(
    state: web::Data<Arc<AppState>>,
    query: web::Query<HistoryQueryParams>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    params.validate()?;

    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let (sessions, total) = state
        .history_service
        .list(auth.id(), &params.filter(), offset, Some(limit))
        .await?;

    Ok(HttpResponse::Ok().json(PaginatedResponse {
        items: sessions.iter().map(QuizSessionSummary::from).collect(),
        total,
        offset,
        limit,
    }))
}

#[get("/quiz-sessions/{id}")]
pub async fn get_session(
    state: web::Data<Arc<AppState>>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let session = state.session_service.get(auth.id(), &id).await?;
    Ok(HttpResponse::Ok().json(session))
}

#[delete("/quiz-sessions/{id}")]
pub async fn delete_session(
    state: web::Data<Arc<AppState>>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    state.session_service.delete(auth.id(), &id).await?;
    Ok(HttpResponse::Ok().json(DeleteResponse {
        message: format!("Quiz session '{}' deleted", id),
        deleted: 1,
    }))
}

#[delete("/quiz-sessions")]
pub async fn delete_all_sessions(
    state: web::Data<Arc<AppState>>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let deleted = state.session_service.delete_all(auth.id()).await?;
    Ok(HttpResponse::Ok().json(DeleteResponse {
        message: "Quiz history cleared".to_string(),
        deleted,
    }))
}

#[get("/quiz-progress")]
pub async fn get_progress(
    state: web::Data<Arc<AppState>>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    match state.progress_service.get(auth.id()).await? {
        Some(progress) => Ok(HttpResponse::Ok().json(progress)),
        None => Err(AppError::NotFound("No quiz in progress".to_string())),
    }
}

#[put("/quiz-progress")]
pub async fn save_progress(
    state: web::Data<Arc<AppState>>,
    request: web::Json<SaveProgressRequestDto>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    request.validate()?;

    let progress = state
        .progress_service
        .save(
            auth.id(),
            request.config,
            request.questions,
            request.answers,
            request.current_index,
            request.elapsed_seconds,
        )
        .await?;
    Ok(HttpResponse::Ok().json(progress))
}

#[delete("/quiz-progress")]
pub async fn clear_progress(
    state: web::Data<Arc<AppState>>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let cleared = state.progress_service.clear(auth.id()).await?;
    Ok(HttpResponse::Ok().json(DeleteResponse {
        message: "Quiz progress cleared".to_string(),
        deleted: u64::from(cleared),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        auth::{AuthMiddleware, JwtService},
        config::Config,
        models::domain::{HistoryPreferences, QuestionType},
        repositories::{
            chat_repository::MockChatRepository,
            preferences_repository::MockPreferencesRepository,
            quiz_progress_repository::MockQuizProgressRepository,
            quiz_session_repository::MockQuizSessionRepository,
            usage_repository::MockUsageRepository,
        },
        services::ProviderRegistry,
        test_utils::{fixtures::sample_question, test_helpers::assert_success_status},
    };
    use actix_web::{http::StatusCode, test, App};
    use serde_json::{json, Value};

    fn state(
        sessions: MockQuizSessionRepository,
        preferences: MockPreferencesRepository,
    ) -> Arc<AppState> {
        Arc::new(AppState::from_parts(
            Config::test_config(),
            Arc::new(ProviderRegistry::from_clients(Vec::new())),
            Arc::new(sessions),
            Arc::new(MockQuizProgressRepository::new()),
            Arc::new(MockChatRepository::new()),
            Arc::new(preferences),
            Arc::new(MockUsageRepository::new()),
        ))
    }

    fn completion_body() -> Value {
        json!({
            "source": { "kind": "note", "title": "Photosynthesis" },
            "questions": [
                sample_question(QuestionType::MultipleChoice),
                sample_question(QuestionType::TrueFalseExplained),
            ],
            "answers": ["B", false],
            "time_spent_seconds": 90,
            "ai_service": "openai",
            "ai_model": "gpt-4o-mini"
        })
    }

    async fn post_completion(state: Arc<AppState>) -> (StatusCode, Value) {
        let jwt = JwtService::new(&Config::test_config().jwt_secret, 1);
        let token = jwt.create_token("learner-1", "learner@example.com").unwrap();
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(jwt))
                .app_data(web::Data::new(state))
                .service(web::scope("/api").wrap(AuthMiddleware).service(complete_quiz)),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/quiz-sessions")
            .insert_header(("Authorization", format!("Bearer {}", token)))
            .set_json(completion_body())
            .to_request();
        let resp = test::call_service(&app, req).await;
        let status = resp.status();
        (status, test::read_body_json(resp).await)
    }

    #[actix_web::test]
    async fn score_is_returned_when_storage_is_down() {
        let mut sessions = MockQuizSessionRepository::new();
        sessions
            .expect_create()
            .returning(|_| Err(AppError::DatabaseError("connection refused".to_string())));
        let mut preferences = MockPreferencesRepository::new();
        preferences
            .expect_find()
            .returning(|_| Err(AppError::DatabaseError("connection refused".to_string())));

        let (status, body) = post_completion(state(sessions, preferences)).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["saved"], true);
        assert_eq!(body["score"], 1);
        assert_eq!(body["total_scored"], 2);
        assert_eq!(body["percentage"], 50.0);
    }

    #[actix_web::test]
    async fn disabled_auto_save_skips_storage() {
        let mut sessions = MockQuizSessionRepository::new();
        sessions.expect_create().never();
        let mut preferences = MockPreferencesRepository::new();
        preferences.expect_find().returning(|user_id| {
            let mut stored = HistoryPreferences::new(user_id);
            stored.auto_save = false;
            Ok(Some(stored))
        });

        let (status, body) = post_completion(state(sessions, preferences)).await;

        assert_success_status(status);
        assert_eq!(body["saved"], false);
        assert_eq!(body["score"], 1);
        assert!(body["session_id"].as_str().is_some_and(|id| !id.is_empty()));
    }
}
