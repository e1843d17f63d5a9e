use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

use super::tokens;
use crate::error::ApiError;
use crate::state::AppState;

/// Resolves the bearer token to the authenticated user's id.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or(ApiError::AuthenticationRequired)?;

        // Expect "Bearer <key>"
        let key = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or(ApiError::AuthenticationRequired)?;

        let user_id = tokens::find_active_user(&state.db, key)
            .await?
            .ok_or(ApiError::AuthenticationRequired)?;

        Ok(AuthUser(user_id))
    }
}
