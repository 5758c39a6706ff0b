//! Patient API handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use lifeline_core::lifecycle;
use lifeline_sdk::objects::ambulance::{AmbulanceRequestView, CreateAmbulanceRequest};
use lifeline_sdk::objects::blood::{BloodRequestView, CreateBloodRequest};
use uuid::Uuid;

use super::extractors::PatientAuth;
use super::{trip_view, ApiError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/blood-requests",
            post(create_blood_request).get(list_blood_requests),
        )
        .route("/blood-requests/{id}/cancel", put(cancel_blood_request))
        .route("/blood-requests/{id}/fulfill", put(fulfill_blood_request))
        .route(
            "/ambulance-requests",
            post(create_ambulance_request).get(list_ambulance_requests),
        )
        .route(
            "/ambulance-requests/{id}/cancel",
            put(cancel_ambulance_request),
        )
}

/// `POST /patient/blood-requests` — open a request; eligible connected
/// donors are notified immediately.
async fn create_blood_request(
    State(state): State<AppState>,
    PatientAuth(identity): PatientAuth,
    Json(body): Json<CreateBloodRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let request =
        lifecycle::create_blood_request(&*state.store, &state.hub, identity.account_id, body)
            .await?;
    Ok((StatusCode::CREATED, Json(request.to_view(None))))
}

/// `GET /patient/blood-requests` — this patient's requests.
async fn list_blood_requests(
    State(state): State<AppState>,
    PatientAuth(identity): PatientAuth,
) -> Result<impl IntoResponse, ApiError> {
    let requests = state
        .store
        .blood_requests_for_patient(identity.account_id)
        .await
        .map_err(ApiError::Core)?;
    let views: Vec<BloodRequestView> = requests.iter().map(|r| r.to_view(None)).collect();
    Ok(Json(views))
}

/// `PUT /patient/blood-requests/{id}/cancel` — cancel while pending.
async fn cancel_blood_request(
    State(state): State<AppState>,
    PatientAuth(identity): PatientAuth,
    Path(request_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let updated =
        lifecycle::cancel_blood_request(&*state.store, request_id, identity.account_id).await?;
    Ok(Json(updated.to_view(None)))
}

/// `PUT /patient/blood-requests/{id}/fulfill` — confirm the donation
/// after an accepted donor came through.
async fn fulfill_blood_request(
    State(state): State<AppState>,
    PatientAuth(identity): PatientAuth,
    Path(request_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = lifecycle::fulfill_blood_request(
        &*state.store,
        &state.hub,
        request_id,
        identity.account_id,
    )
    .await?;
    Ok(Json(updated.to_view(None)))
}

/// `POST /patient/ambulance-requests` — request a pickup.
async fn create_ambulance_request(
    State(state): State<AppState>,
    PatientAuth(identity): PatientAuth,
    Json(body): Json<CreateAmbulanceRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let request =
        lifecycle::create_ambulance_request(&*state.store, identity.account_id, body).await?;
    let view = trip_view(&*state.store, &request).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// `GET /patient/ambulance-requests` — this patient's trips, including
/// track points.
async fn list_ambulance_requests(
    State(state): State<AppState>,
    PatientAuth(identity): PatientAuth,
) -> Result<impl IntoResponse, ApiError> {
    let requests = state
        .store
        .ambulance_requests_for_patient(identity.account_id)
        .await
        .map_err(ApiError::Core)?;

    let mut views: Vec<AmbulanceRequestView> = Vec::with_capacity(requests.len());
    for request in &requests {
        views.push(trip_view(&*state.store, request).await?);
    }
    Ok(Json(views))
}

/// `PUT /patient/ambulance-requests/{id}/cancel` — cancel before the
/// trip starts.
async fn cancel_ambulance_request(
    State(state): State<AppState>,
    PatientAuth(identity): PatientAuth,
    Path(request_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = lifecycle::cancel_ambulance_request(
        &*state.store,
        &state.hub,
        request_id,
        identity.account_id,
    )
    .await?;
    let view = trip_view(&*state.store, &updated).await?;
    Ok(Json(view))
}
