//! HTTP API handlers.
//!
//! Route groups:
//! - `/auth`    – register, login (public)
//! - `/donor`   – nearby search, accept, availability (role: donor)
//! - `/patient` – blood and ambulance requests (role: patient)
//! - `/driver`  – trips, status, location (role: driver)
//! - `/requests`, `/accounts` – assignment and administration (role: admin)
//! - `/events`  – WebSocket notification channel (any authenticated role)
//!
//! Every core error is mapped here to an HTTP status with a stable
//! machine-readable code; internal detail is logged, never surfaced.

pub mod admin;
pub mod auth;
pub mod donor;
pub mod driver;
pub mod events;
pub mod extractors;
pub mod patient;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lifeline_core::entities::ambulance_request::AmbulanceRequest;
use lifeline_core::error::CoreError;
use lifeline_core::store::Store;
use lifeline_sdk::objects::ambulance::AmbulanceRequestView;
use lifeline_sdk::token::TokenError;
use serde::Serialize;

/// Wire shape of every error response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

/// Errors surfaced by API handlers.
#[derive(Debug)]
pub enum ApiError {
    Core(CoreError),
    Token(TokenError),
    /// Something the client cannot correct; logged, reported
    /// generically.
    Internal(&'static str),
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        Self::Core(err)
    }
}

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        Self::Token(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::Core(err) => match err {
                CoreError::Validation { .. } => {
                    (StatusCode::BAD_REQUEST, "validation_error", err.to_string())
                }
                CoreError::Conflict(_) => (StatusCode::CONFLICT, "conflict", err.to_string()),
                CoreError::NotFound => (
                    StatusCode::NOT_FOUND,
                    "not_found",
                    "no such request".to_owned(),
                ),
                CoreError::InvalidTransition { .. } => (
                    StatusCode::CONFLICT,
                    "invalid_transition",
                    err.to_string(),
                ),
                CoreError::InvalidCredentials => (
                    StatusCode::UNAUTHORIZED,
                    "invalid_credentials",
                    "invalid email or secret".to_owned(),
                ),
                CoreError::AccountDeactivated => (
                    StatusCode::FORBIDDEN,
                    "account_deactivated",
                    "this account has been deactivated".to_owned(),
                ),
                CoreError::Unauthenticated => (
                    StatusCode::UNAUTHORIZED,
                    "unauthenticated",
                    "missing or invalid bearer token".to_owned(),
                ),
                CoreError::Forbidden => (
                    StatusCode::FORBIDDEN,
                    "forbidden",
                    "this role may not perform the operation".to_owned(),
                ),
                CoreError::InvalidConfiguration(detail) => {
                    tracing::error!(detail, "invalid guard configuration");
                    internal()
                }
                CoreError::Hash => {
                    tracing::error!("secret hashing failed");
                    internal()
                }
                CoreError::Database(e) => {
                    tracing::error!(error = %e, "database error");
                    internal()
                }
            },
            ApiError::Token(err) => match err {
                TokenError::Expired => (
                    StatusCode::UNAUTHORIZED,
                    "token_expired",
                    "bearer token has expired".to_owned(),
                ),
                _ => (
                    StatusCode::UNAUTHORIZED,
                    "token_invalid",
                    "bearer token is invalid".to_owned(),
                ),
            },
            ApiError::Internal(context) => {
                tracing::error!(context, "internal error");
                internal()
            }
        };

        (status, Json(ErrorBody { error, message })).into_response()
    }
}

fn internal() -> (StatusCode, &'static str, String) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "internal_error",
        "internal server error".to_owned(),
    )
}

/// Convert a trip record to its API view, attaching its track points.
pub(crate) async fn trip_view(
    store: &dyn Store,
    request: &AmbulanceRequest,
) -> Result<AmbulanceRequestView, ApiError> {
    let updates = store.location_updates(request.id).await?;
    Ok(request.to_view(&updates))
}
