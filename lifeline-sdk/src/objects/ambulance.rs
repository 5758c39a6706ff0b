//! Ambulance trip DTOs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::auth::VehicleType;
use super::geo::Point;

/// Lifecycle status of an ambulance request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripStatus {
    Pending,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

/// A geographic point with a human-readable address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub location: Point,
    pub address: String,
}

/// Request body for `POST /patient/ambulance-requests`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAmbulanceRequest {
    pub pickup: Waypoint,
    pub destination: Waypoint,
}

/// A recorded position of the ambulance while a trip is in progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackPoint {
    pub location: Point,
    pub recorded_at: i64,
}

/// Ambulance request representation returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AmbulanceRequestView {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub pickup: Waypoint,
    pub destination: Waypoint,
    pub status: TripStatus,
    pub requested_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_minutes: Option<i32>,
    #[serde(default)]
    pub location_updates: Vec<TrackPoint>,
}

/// Request body for `PUT /driver/trips/{id}/status`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UpdateTripStatus {
    pub status: TripStatus,
}

/// Request body for `POST /driver/location`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LocationPing {
    pub location: Point,
}

/// Request body for `PUT /requests/ambulance/{id}/assign`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AssignDriverRequest {
    pub driver_id: Uuid,
}

/// One row of the admin-facing driver candidate list, nearest first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverCandidateView {
    pub account_id: Uuid,
    pub name: String,
    pub vehicle_type: VehicleType,
    pub vehicle_registration: String,
    pub location: Point,
    pub distance_m: f64,
}
