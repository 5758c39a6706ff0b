//! Driver API handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use lifeline_core::lifecycle;
use lifeline_sdk::objects::ambulance::{AmbulanceRequestView, LocationPing, UpdateTripStatus};
use lifeline_sdk::objects::auth::UpdateAvailability;
use uuid::Uuid;

use super::extractors::DriverAuth;
use super::{trip_view, ApiError};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/trips", get(list_trips))
        .route("/trips/{id}/status", put(update_trip_status))
        .route("/location", post(update_location))
        .route("/availability", put(update_availability))
}

/// `GET /driver/trips` — trips assigned to this driver, including
/// track points.
async fn list_trips(
    State(state): State<AppState>,
    DriverAuth(identity): DriverAuth,
) -> Result<impl IntoResponse, ApiError> {
    let trips = state
        .store
        .trips_for_driver(identity.account_id)
        .await
        .map_err(ApiError::Core)?;

    let mut views: Vec<AmbulanceRequestView> = Vec::with_capacity(trips.len());
    for trip in &trips {
        views.push(trip_view(&*state.store, trip).await?);
    }
    Ok(Json(views))
}

/// `PUT /driver/trips/{id}/status` — advance an assigned trip along
/// its state machine. Illegal jumps report `invalid_transition`.
async fn update_trip_status(
    State(state): State<AppState>,
    DriverAuth(identity): DriverAuth,
    Path(trip_id): Path<Uuid>,
    Json(body): Json<UpdateTripStatus>,
) -> Result<impl IntoResponse, ApiError> {
    let updated = lifecycle::update_trip_status(
        &*state.store,
        &state.hub,
        trip_id,
        identity.account_id,
        body.status.into(),
    )
    .await?;
    let view = trip_view(&*state.store, &updated).await?;
    Ok(Json(view))
}

/// `POST /driver/location` — report the vehicle's current position.
/// Feeds matching queries and, while a trip is in progress, its track.
async fn update_location(
    State(state): State<AppState>,
    DriverAuth(identity): DriverAuth,
    Json(body): Json<LocationPing>,
) -> Result<impl IntoResponse, ApiError> {
    lifecycle::record_driver_location(&*state.store, identity.account_id, body.location).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `PUT /driver/availability` — opt in or out of assignment.
async fn update_availability(
    State(state): State<AppState>,
    DriverAuth(identity): DriverAuth,
    Json(body): Json<UpdateAvailability>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .store
        .set_driver_availability(identity.account_id, body.is_available)
        .await
        .map_err(ApiError::Core)?;
    Ok(StatusCode::NO_CONTENT)
}
