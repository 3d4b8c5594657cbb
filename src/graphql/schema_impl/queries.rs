use async_graphql::{Context, Object};
use chrono::{DateTime, Utc};
use validator::Validate;

use crate::{
    app_state::AppState,
    auth::extract_claims_from_context,
    errors::AppResult,
    models::{
        domain::usage::UsageSummary,
        dto::{
            request::HistoryQueryParams,
            response::{ChatSessionSummary, HistoryGroup},
        },
    },
};

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Completed quizzes grouped by the day they finished, newest first.
    async fn quiz_history(
        &self,
        ctx: &Context<'_>,
        filter: Option<HistoryQueryParams>,
    ) -> AppResult<Vec<HistoryGroup>> {
        let state = ctx.data::<AppState>()?;
        let claims = extract_claims_from_context(ctx)?;

        let filter = filter.unwrap_or_default();
        filter.validate()?;

        state
            .history_service
            .grouped(
                &claims.sub,
                &filter.filter(),
                filter.offset.unwrap_or(0),
                filter.limit,
            )
            .await
    }

    async fn chat_sessions(&self, ctx: &Context<'_>) -> AppResult<Vec<ChatSessionSummary>> {
        let state = ctx.data::<AppState>()?;
        let claims = extract_claims_from_context(ctx)?;

        let sessions = state.chat_service.list_sessions(&claims.sub).await?;
        Ok(sessions.into_iter().map(ChatSessionSummary::from).collect())
    }

    async fn usage_summary(
        &self,
        ctx: &Context<'_>,
        since: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<UsageSummary>> {
        let state = ctx.data::<AppState>()?;
        let claims = extract_claims_from_context(ctx)?;

        state.usage_service.summarize(&claims.sub, since).await
    }
}
