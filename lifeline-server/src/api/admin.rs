//! Admin API handlers: ambulance assignment and account management.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};
use lifeline_core::lifecycle;
use lifeline_sdk::objects::ambulance::{
    AmbulanceRequestView, AssignDriverRequest, DriverCandidateView,
};
use lifeline_sdk::objects::blood::SearchScope;
use lifeline_sdk::objects::TripStatus as SdkTripStatus;
use serde::Deserialize;
use uuid::Uuid;

use super::extractors::AdminAuth;
use super::{trip_view, ApiError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/requests/ambulance", get(list_requests))
        .route("/requests/ambulance/{id}/assign", put(assign_driver))
        .route("/requests/ambulance/{id}/candidates", get(candidates))
        .route("/accounts/{id}/active", put(set_account_active))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    status: Option<SdkTripStatus>,
}

/// `GET /requests/ambulance?status=pending` — assignment queue view.
async fn list_requests(
    State(state): State<AppState>,
    AdminAuth(_): AdminAuth,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let requests = state
        .store
        .ambulance_requests_by_status(query.status.map(Into::into))
        .await
        .map_err(ApiError::Core)?;

    let mut views: Vec<AmbulanceRequestView> = Vec::with_capacity(requests.len());
    for request in &requests {
        views.push(trip_view(&*state.store, request).await?);
    }
    Ok(Json(views))
}

#[derive(Debug, Deserialize)]
struct CandidateQuery {
    #[serde(default)]
    scope: SearchScope,
}

/// `GET /requests/ambulance/{id}/candidates` — available drivers near
/// the pickup point, nearest first.
async fn candidates(
    State(state): State<AppState>,
    AdminAuth(_): AdminAuth,
    Path(request_id): Path<Uuid>,
    Query(query): Query<CandidateQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let matching = state.config.read().await.matching;
    let drivers =
        lifecycle::driver_candidates(&*state.store, &matching, request_id, query.scope).await?;

    let views: Vec<DriverCandidateView> = drivers
        .iter()
        .map(|(driver, distance)| DriverCandidateView {
            account_id: driver.account_id,
            name: driver.name.clone(),
            vehicle_type: driver.vehicle_type.into(),
            vehicle_registration: driver.vehicle_registration.to_string(),
            location: driver.location(),
            distance_m: *distance,
        })
        .collect();
    Ok(Json(views))
}

/// `PUT /requests/ambulance/{id}/assign` — dispatch a driver to a
/// pending request; the driver and the owning patient are notified.
async fn assign_driver(
    State(state): State<AppState>,
    AdminAuth(_): AdminAuth,
    Path(request_id): Path<Uuid>,
    Json(body): Json<AssignDriverRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let updated =
        lifecycle::assign_driver(&*state.store, &state.hub, request_id, body.driver_id).await?;
    let view = trip_view(&*state.store, &updated).await?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
struct SetActive {
    active: bool,
}

/// `PUT /accounts/{id}/active` — activate or deactivate an account.
/// Deactivation locks the account out on its next request, regardless
/// of token expiry.
async fn set_account_active(
    State(state): State<AppState>,
    AdminAuth(_): AdminAuth,
    Path(account_id): Path<Uuid>,
    Json(body): Json<SetActive>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .store
        .set_account_active(account_id, body.active)
        .await
        .map_err(ApiError::Core)?;
    Ok(StatusCode::NO_CONTENT)
}
