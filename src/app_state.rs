use std::sync::Arc;

use crate::{
    config::Config,
    db::Database,
    errors::AppResult,
    repositories::{
        ChatRepository, MongoChatRepository, MongoPreferencesRepository,
        MongoQuizProgressRepository, MongoQuizSessionRepository, MongoUsageRepository,
        PreferencesRepository, QuizProgressRepository, QuizSessionRepository, UsageRepository,
    },
    services::{
        ChatService, HistoryService, PreferencesService, ProviderRegistry, QuizGenerationService,
        QuizProgressService, QuizSessionService, UsageService,
    },
};

#[derive(Clone)]
pub struct AppState {
    /// Absent when services run over non-Mongo repositories.
    pub db: Option<Database>,
    pub providers: Arc<ProviderRegistry>,
    pub generation_service: Arc<QuizGenerationService>,
    pub session_service: Arc<QuizSessionService>,
    pub progress_service: Arc<QuizProgressService>,
    pub chat_service: Arc<ChatService>,
    pub history_service: Arc<HistoryService>,
    pub preferences_service: Arc<PreferencesService>,
    pub usage_service: Arc<UsageService>,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let db = Database::connect(&config).await?;

        let session_repository = Arc::new(MongoQuizSessionRepository::new(&db));
        session_repository.ensure_indexes().await?;
        let progress_repository = Arc::new(MongoQuizProgressRepository::new(&db));
        progress_repository.ensure_indexes().await?;
        let chat_repository = Arc::new(MongoChatRepository::new(&db));
        chat_repository.ensure_indexes().await?;
        let preferences_repository = Arc::new(MongoPreferencesRepository::new(&db));
        preferences_repository.ensure_indexes().await?;
        let usage_repository = Arc::new(MongoUsageRepository::new(&db));
        usage_repository.ensure_indexes().await?;

        let providers = Arc::new(ProviderRegistry::from_config(&config)?);

        let mut state = Self::from_parts(
            config,
            providers,
            session_repository,
            progress_repository,
            chat_repository,
            preferences_repository,
            usage_repository,
        );
        state.db = Some(db);
        Ok(state)
    }

    /// Wire services over any repository implementations.
    pub fn from_parts(
        config: Config,
        providers: Arc<ProviderRegistry>,
        sessions: Arc<dyn QuizSessionRepository>,
        progress: Arc<dyn QuizProgressRepository>,
        chat: Arc<dyn ChatRepository>,
        preferences: Arc<dyn PreferencesRepository>,
        usage: Arc<dyn UsageRepository>,
    ) -> Self {
        let usage_service = Arc::new(UsageService::new(usage));
        let preferences_service = Arc::new(PreferencesService::new(preferences));
        let session_service = Arc::new(QuizSessionService::new(sessions, progress.clone()));
        let progress_service = Arc::new(QuizProgressService::new(progress));
        let chat_service = Arc::new(ChatService::new(
            chat.clone(),
            providers.clone(),
            usage_service.clone(),
        ));
        let history_service = Arc::new(HistoryService::new(
            session_service.clone(),
            chat,
            preferences_service.clone(),
        ));
        let generation_service =
            Arc::new(QuizGenerationService::new(config.generation_max_attempts));

        Self {
            db: None,
            providers,
            generation_service,
            session_service,
            progress_service,
            chat_service,
            history_service,
            preferences_service,
            usage_service,
            config: Arc::new(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_state_is_cloneable() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<AppState>();
    }
}
