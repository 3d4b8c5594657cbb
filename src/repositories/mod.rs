pub mod chat_repository;
pub mod preferences_repository;
pub mod quiz_progress_repository;
pub mod quiz_session_repository;
pub mod usage_repository;

pub use chat_repository::{ChatRepository, MongoChatRepository};
pub use preferences_repository::{MongoPreferencesRepository, PreferencesRepository};
pub use quiz_progress_repository::{MongoQuizProgressRepository, QuizProgressRepository};
pub use quiz_session_repository::{
    MongoQuizSessionRepository, QuizSessionFilter, QuizSessionRepository,
};
pub use usage_repository::{MongoUsageRepository, UsageRepository};
