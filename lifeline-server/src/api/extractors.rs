//! Bearer-token authentication extractors.
//!
//! [`Identity`] parses and verifies the `Authorization: Bearer` header,
//! re-checks that the account is still active (deactivation takes
//! effect immediately, despite any still-valid token), and attaches the
//! resolved identity to the request extensions for downstream use.
//!
//! The per-role extractors wrap `Identity` with the matching
//! [`RoleGuard`] from application state.
//!
//! [`RoleGuard`]: lifeline_core::auth::RoleGuard

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use lifeline_core::auth::AuthIdentity;
use lifeline_core::error::CoreError;
use lifeline_sdk::token;

use super::ApiError;
use crate::state::AppState;

/// Any authenticated account, regardless of role.
pub struct Identity(pub AuthIdentity);

impl FromRequestParts<AppState> for Identity {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<AuthIdentity>() {
            return Ok(Identity(*identity));
        }

        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(ApiError::Core(CoreError::Unauthenticated))?
            .to_str()
            .map_err(|_| ApiError::Core(CoreError::Unauthenticated))?;
        let raw_token = header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Core(CoreError::Unauthenticated))?;

        let config = state.config.read().await;
        let claims = token::verify_token(raw_token, &config.token_key)?;
        drop(config);

        // The token alone is not enough: a deactivated account loses
        // access before its token expires.
        let account = state
            .store
            .account_by_id(claims.sub)
            .await
            .map_err(ApiError::Core)?
            .ok_or(ApiError::Core(CoreError::Unauthenticated))?;
        if !account.active {
            return Err(ApiError::Core(CoreError::AccountDeactivated));
        }

        let identity = AuthIdentity {
            account_id: account.id,
            role: account.role,
        };
        parts.extensions.insert(identity);
        Ok(Identity(identity))
    }
}

macro_rules! role_extractor {
    ($name:ident, $guard:ident) => {
        pub struct $name(pub AuthIdentity);

        impl FromRequestParts<AppState> for $name {
            type Rejection = ApiError;

            async fn from_request_parts(
                parts: &mut Parts,
                state: &AppState,
            ) -> Result<Self, Self::Rejection> {
                let Identity(identity) = Identity::from_request_parts(parts, state).await?;
                state
                    .guards
                    .$guard
                    .check(Some(&identity))
                    .map_err(ApiError::Core)?;
                Ok($name(identity))
            }
        }
    };
}

role_extractor!(DonorAuth, donor);
role_extractor!(PatientAuth, patient);
role_extractor!(DriverAuth, driver);
role_extractor!(AdminAuth, admin);
