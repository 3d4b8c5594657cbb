use std::sync::Arc;

use actix_web::{delete, get, post, web, HttpResponse};
use serde_json::json;
use validator::Validate;

use crate::{
    app_state::AppState,
    auth::AuthenticatedUser,
    errors::AppError,
    models::dto::{
        request::{CreateChatSessionRequest, SendMessageRequest},
        response::{ChatSessionSummary, DeleteResponse},
    },
    services::ChatEvent,
};

/// One server-sent event frame.
pub fn sse_frame(event: &ChatEvent) -> String {
    let data = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    format!("event: {}\ndata: {}\n\n", event.name(), data)
}

#[post("/chat/sessions")]
pub async fn create_chat_session(
    state: web::Data<Arc<AppState>>,
    request: web::Json<CreateChatSessionRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    request.validate()?;

    let preferences = state.preferences_service.get(auth.id()).await?;
    let session = state
        .chat_service
        .create_session(
            auth.id(),
            request.title.as_deref(),
            request.provider.as_deref(),
            preferences.preferred_provider.as_deref(),
            request.model.as_deref(),
        )
        .await?;
    Ok(HttpResponse::Created().json(session))
}

#[get("/chat/sessions")]
pub async fn list_chat_sessions(
    state: web::Data<Arc<AppState>>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let sessions: Vec<ChatSessionSummary> = state
        .chat_service
        .list_sessions(auth.id())
        .await?
        .into_iter()
        .map(ChatSessionSummary::from)
        .collect();
    Ok(HttpResponse::Ok().json(sessions))
}

#[get("/chat/sessions/{id}/messages")]
pub async fn list_chat_messages(
    state: web::Data<Arc<AppState>>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let messages = state.chat_service.messages(auth.id(), &id).await?;
    Ok(HttpResponse::Ok().json(messages))
}

/// Streams the assistant reply as `delta` events followed by one `complete`
/// or `error` event. Dropping the connection cancels the reply.
#[post("/chat/sessions/{id}/messages")]
pub async fn send_chat_message(
    state: web::Data<Arc<AppState>>,
    id: web::Path<String>,
    request: web::Json<SendMessageRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    request.validate()?;

    let events = state
        .chat_service
        .send_message(auth.id(), &id, &request.content)
        .await?;

    let body = futures::stream::unfold(events, |mut events| async move {
        let event = events.recv().await?;
        let frame = web::Bytes::from(sse_frame(&event));
        Some((Ok::<_, actix_web::Error>(frame), events))
    });

    Ok(HttpResponse::Ok()
        .content_type("text/event-stream")
        .insert_header(("Cache-Control", "no-cache"))
        .streaming(body))
}

#[post("/chat/sessions/{id}/cancel")]
pub async fn cancel_chat_reply(
    state: web::Data<Arc<AppState>>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let cancelled = state.chat_service.cancel(auth.id(), &id).await?;
    Ok(HttpResponse::Ok().json(json!({ "cancelled": cancelled })))
}

#[delete("/chat/sessions/{id}")]
pub async fn delete_chat_session(
    state: web::Data<Arc<AppState>>,
    id: web::Path<String>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    state.chat_service.delete_session(auth.id(), &id).await?;
    Ok(HttpResponse::Ok().json(DeleteResponse {
        message: format!("Chat session '{}' deleted", id),
        deleted: 1,
    }))
}
