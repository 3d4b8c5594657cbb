use std::sync::Arc;

use actix_web::{
    get, http::header::{ContentDisposition, DispositionParam, DispositionType},
    post, put, web, HttpResponse,
};
use validator::Validate;

use crate::{
    app_state::AppState,
    auth::AuthenticatedUser,
    errors::AppError,
    models::dto::request::{AddQuoteRequest, ExportParams, UpdatePreferencesRequest, UsageQueryParams},
    services::preferences_service::PreferencesUpdate,
};

#[get("/history/export")]
pub async fn export_history(
    state: web::Data<Arc<AppState>>,
    query: web::Query<ExportParams>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let file = state
        .history_service
        .export(auth.id(), params.kind, params.format)
        .await?;

    Ok(HttpResponse::Ok()
        .content_type(file.content_type)
        .insert_header(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(file.filename)],
        })
        .body(file.body))
}

#[get("/preferences")]
pub async fn get_preferences(
    state: web::Data<Arc<AppState>>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let preferences = state.preferences_service.get(auth.id()).await?;
    Ok(HttpResponse::Ok().json(preferences))
}

#[put("/preferences")]
pub async fn update_preferences(
    state: web::Data<Arc<AppState>>,
    request: web::Json<UpdatePreferencesRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    request.validate()?;

    if let Some(name) = request.preferred_provider.as_deref().filter(|n| !n.trim().is_empty()) {
        // Only configured providers can be stored.
        state.providers.resolve(Some(name), None)?;
    }

    let preferences = state
        .preferences_service
        .update(
            auth.id(),
            PreferencesUpdate {
                preferred_provider: request.preferred_provider,
                preferred_model: request.preferred_model,
                default_export_format: request.default_export_format,
                retention_days: request.retention_days,
                clear_retention: request.clear_retention,
                auto_save: request.auto_save,
            },
        )
        .await?;
    Ok(HttpResponse::Ok().json(preferences))
}

#[post("/preferences/quotes")]
pub async fn add_favorite_quote(
    state: web::Data<Arc<AppState>>,
    request: web::Json<AddQuoteRequest>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let request = request.into_inner();
    request.validate()?;

    let preferences = state
        .preferences_service
        .add_favorite_quote(auth.id(), &request.quote)
        .await?;
    Ok(HttpResponse::Ok().json(preferences))
}

#[get("/usage")]
pub async fn usage_summary(
    state: web::Data<Arc<AppState>>,
    query: web::Query<UsageQueryParams>,
    auth: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let summary = state
        .usage_service
        .summarize(auth.id(), query.into_inner().since)
        .await?;
    Ok(HttpResponse::Ok().json(summary))
}
