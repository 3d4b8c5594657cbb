use async_graphql::Context;

use crate::{
    auth::Claims,
    errors::{AppError, AppResult},
};

/// Fails with `Forbidden` unless `user_id` owns the resource.
pub fn require_owner(user_id: &str, resource_owner: &str, resource: &str) -> AppResult<()> {
    if user_id != resource_owner {
        return Err(AppError::Forbidden(format!(
            "You do not have access to this {}",
            resource
        )));
    }
    Ok(())
}

pub fn extract_claims_from_context(ctx: &Context<'_>) -> AppResult<Claims> {
    ctx.data::<Claims>()
        .cloned()
        .map_err(|_| AppError::Unauthorized("Authentication required".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_owner_success() {
        assert!(require_owner("john", "john", "quiz session").is_ok());
    }

    #[test]
    fn test_require_owner_failure() {
        match require_owner("john", "jane", "chat session") {
            Err(AppError::Forbidden(msg)) => assert!(msg.contains("chat session")),
            other => panic!("Expected Forbidden error, got {:?}", other),
        }
    }
}
