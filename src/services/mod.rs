pub mod answer_normalizer;
pub mod chat_service;
pub mod history_service;
pub mod llm_client;
pub mod preferences_service;
pub mod prompt_engine;
pub mod provider_registry;
pub mod quiz_generation_service;
pub mod quiz_progress_service;
pub mod quiz_scoring_service;
pub mod quiz_session_service;
pub mod quiz_validator;
pub mod response_parser;
pub mod usage_service;

pub use chat_service::{ChatEvent, ChatService};
pub use history_service::HistoryService;
pub use preferences_service::PreferencesService;
pub use provider_registry::ProviderRegistry;
pub use quiz_generation_service::QuizGenerationService;
pub use quiz_progress_service::QuizProgressService;
pub use quiz_session_service::QuizSessionService;
pub use usage_service::UsageService;
