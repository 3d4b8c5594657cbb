use async_graphql::{Context, Object, ID};

use crate::{
    app_state::AppState,
    auth::extract_claims_from_context,
    errors::AppResult,
    models::dto::response::DeleteResponse,
};

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn delete_quiz_session(&self, ctx: &Context<'_>, id: ID) -> AppResult<DeleteResponse> {
        let state = ctx.data::<AppState>()?;
        let claims = extract_claims_from_context(ctx)?;

        state.session_service.delete(&claims.sub, &id).await?;
        Ok(DeleteResponse {
            message: format!("Quiz session '{}' deleted", id.as_str()),
            deleted: 1,
        })
    }

    async fn delete_chat_session(&self, ctx: &Context<'_>, id: ID) -> AppResult<DeleteResponse> {
        let state = ctx.data::<AppState>()?;
        let claims = extract_claims_from_context(ctx)?;

        state.chat_service.delete_session(&claims.sub, &id).await?;
        Ok(DeleteResponse {
            message: format!("Chat session '{}' deleted", id.as_str()),
            deleted: 1,
        })
    }

    /// Hard-deletes every completed quiz of the caller.
    async fn clear_quiz_history(&self, ctx: &Context<'_>) -> AppResult<DeleteResponse> {
        let state = ctx.data::<AppState>()?;
        let claims = extract_claims_from_context(ctx)?;

        let deleted = state.session_service.delete_all(&claims.sub).await?;
        Ok(DeleteResponse {
            message: "Quiz history cleared".to_string(),
            deleted,
        })
    }
}
