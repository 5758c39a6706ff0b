//! Donor API handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};
use lifeline_core::lifecycle;
use lifeline_sdk::objects::auth::UpdateAvailability;
use lifeline_sdk::objects::blood::{BloodRequestView, SearchScope};
use serde::Deserialize;
use uuid::Uuid;

use super::extractors::DonorAuth;
use super::ApiError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/requests/nearby", get(nearby_requests))
        .route("/requests", get(accepted_requests))
        .route("/requests/{id}/accept", put(accept_request))
        .route("/availability", put(update_availability))
}

#[derive(Debug, Deserialize)]
struct NearbyQuery {
    #[serde(default)]
    scope: SearchScope,
}

/// `GET /donor/requests/nearby` — pending requests matching this
/// donor's blood group, nearest first. `?scope=urgent` widens the
/// radius.
async fn nearby_requests(
    State(state): State<AppState>,
    DonorAuth(identity): DonorAuth,
    Query(query): Query<NearbyQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let matching = state.config.read().await.matching;
    let results = lifecycle::find_nearby_blood_requests(
        &*state.store,
        &matching,
        identity.account_id,
        query.scope,
    )
    .await?;

    let views: Vec<BloodRequestView> = results
        .iter()
        .map(|(request, distance)| request.to_view(Some(*distance)))
        .collect();
    Ok(Json(views))
}

/// `GET /donor/requests` — requests this donor has accepted.
async fn accepted_requests(
    State(state): State<AppState>,
    DonorAuth(identity): DonorAuth,
) -> Result<impl IntoResponse, ApiError> {
    let requests = state
        .store
        .blood_requests_for_donor(identity.account_id)
        .await
        .map_err(ApiError::Core)?;
    let views: Vec<BloodRequestView> = requests.iter().map(|r| r.to_view(None)).collect();
    Ok(Json(views))
}

/// `PUT /donor/requests/{id}/accept` — atomically claim a pending
/// request. A request someone else already claimed reports 404.
async fn accept_request(
    State(state): State<AppState>,
    DonorAuth(identity): DonorAuth,
    Path(request_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = lifecycle::accept_blood_request(
        &*state.store,
        &state.hub,
        request_id,
        identity.account_id,
    )
    .await?;
    Ok(Json(updated.to_view(None)))
}

/// `PUT /donor/availability` — opt in or out of matching.
async fn update_availability(
    State(state): State<AppState>,
    DonorAuth(identity): DonorAuth,
    Json(body): Json<UpdateAvailability>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .store
        .set_donor_availability(identity.account_id, body.is_available)
        .await
        .map_err(ApiError::Core)?;
    Ok(StatusCode::NO_CONTENT)
}
