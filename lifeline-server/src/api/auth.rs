//! Registration and login handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use lifeline_core::credentials;
use lifeline_core::entities::account::Account;
use lifeline_core::entities::profiles::Profile;
use lifeline_sdk::objects::auth::{AuthResponse, LoginRequest, RegisterRequest};
use lifeline_sdk::token;

use super::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

/// `POST /auth/register` — create an account with its role profile and
/// hand back a fresh token.
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let registered = credentials::register(&*state.store, body).await?;
    let response = auth_response(&state, &registered.account, registered.profile.as_ref()).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// `POST /auth/login` — authenticate by email and secret.
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let account = credentials::authenticate(&*state.store, &body.email, &body.secret).await?;
    let profile = state
        .store
        .profile_for(&account)
        .await
        .map_err(ApiError::Core)?;
    let response = auth_response(&state, &account, profile.as_ref()).await?;
    Ok(Json(response))
}

async fn auth_response(
    state: &AppState,
    account: &Account,
    profile: Option<&Profile>,
) -> Result<AuthResponse, ApiError> {
    let config = state.config.read().await;
    let token = token::issue_token(account.id, account.role.into(), &config.token_key)
        .map_err(|_| ApiError::Internal("token issuance failed"))?;
    drop(config);

    Ok(AuthResponse {
        token,
        account: account.to_view(),
        profile: profile.map(Profile::to_view),
    })
}
