pub mod chat;
pub mod preferences;
pub mod question;
pub mod quiz_config;
pub mod quiz_progress;
pub mod quiz_session;
pub mod sortable_timestamp;
pub mod usage;
pub use chat::{ChatMessage, ChatSession};
pub use preferences::HistoryPreferences;
pub use question::{AdvancedQuestion, QuestionType};
pub use quiz_config::QuizConfig;
pub use quiz_progress::QuizProgress;
pub use quiz_session::QuizSession;
pub use usage::UsageRecord;
