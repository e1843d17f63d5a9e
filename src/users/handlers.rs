use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{info, instrument, warn};

use super::dto::{CreateUserRequest, TokenRequest, TokenResponse, UpdateMeRequest, UserResponse};
use super::repo::User;
use super::services;
use crate::auth::{extractors::AuthUser, tokens};
use crate::error::ApiError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_user))
        .route("/token", post(create_token))
        // POST on /me falls through to the router's 405
        .route("/me", get(me).put(update_me).patch(update_me))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let email = payload.email.unwrap_or_default();
    let password = payload.password.unwrap_or_default();
    let user = services::create_user(&state.db, &email, &password, &payload.name).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state, payload))]
pub async fn create_token(
    State(state): State<AppState>,
    Json(payload): Json<TokenRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let email = payload.email.unwrap_or_default();
    let password = payload.password.unwrap_or_default();
    if email.is_empty() {
        return Err(ApiError::field("email", "must not be empty"));
    }
    if password.is_empty() {
        return Err(ApiError::field("password", "must not be empty"));
    }

    let Some(user) = services::authenticate(&state.db, &email, &password).await? else {
        warn!(email = %email, "token request with bad credentials");
        return Err(ApiError::field(
            "credentials",
            "unable to authenticate with provided credentials",
        ));
    };

    let token = tokens::get_or_create(&state.db, user.id).await?;
    info!(user_id = %user.id, "token issued");
    Ok(Json(TokenResponse { token }))
}

#[instrument(skip(state))]
pub async fn me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<UserResponse>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(ApiError::AuthenticationRequired)?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateMeRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = User::find_by_id(&state.db, user_id)
        .await?
        .ok_or(ApiError::AuthenticationRequired)?;
    let updated = services::update_user(&state.db, user, payload).await?;
    Ok(Json(updated.into()))
}
