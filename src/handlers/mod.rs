pub mod chat_handler;
pub mod health_handler;
pub mod history_handler;
pub mod quiz_handler;

use actix_web::web;

pub use health_handler::{health_check, health_check_ready};

/// Routes mounted under the authenticated `/api` scope.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(health_handler::list_providers)
        .service(quiz_handler::generate_quiz)
        .service(quiz_handler::question_schema)
        .service(quiz_handler::score_answers)
        .service(quiz_handler::complete_quiz)
        .service(quiz_handler::list_sessions)
        .service(quiz_handler::delete_all_sessions)
        .service(quiz_handler::get_session)
        .service(quiz_handler::delete_session)
        .service(quiz_handler::get_progress)
        .service(quiz_handler::save_progress)
        .service(quiz_handler::clear_progress)
        .service(chat_handler::create_chat_session)
        .service(chat_handler::list_chat_sessions)
        .service(chat_handler::list_chat_messages)
        .service(chat_handler::send_chat_message)
        .service(chat_handler::cancel_chat_reply)
        .service(chat_handler::delete_chat_session)
        .service(history_handler::export_history)
        .service(history_handler::get_preferences)
        .service(history_handler::update_preferences)
        .service(history_handler::add_favorite_quote)
        .service(history_handler::usage_summary);
}
