//! Blood request DTOs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::auth::BloodGroup;
use super::geo::Point;

/// Lifecycle status of a blood request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BloodRequestStatus {
    Pending,
    Accepted,
    Fulfilled,
    Cancelled,
}

/// How urgently the blood is needed. Drives the default search radius
/// presented to donors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

/// Request body for `POST /patient/blood-requests`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBloodRequest {
    pub blood_group: BloodGroup,
    pub units_required: i16,
    pub urgency: Urgency,
    pub location: Point,
    #[serde(default)]
    pub hospital: Option<String>,
}

/// Blood request representation returned to clients.
///
/// `distance_m` is populated only by the nearby search, where results
/// are ordered nearest-first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BloodRequestView {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub donor_id: Option<Uuid>,
    pub blood_group: BloodGroup,
    pub units_required: i16,
    pub urgency: Urgency,
    pub location: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hospital: Option<String>,
    pub status: BloodRequestStatus,
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
}

/// Radius class for the nearby search. `Urgent` widens the search to the
/// configured urgent radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchScope {
    #[default]
    Default,
    Urgent,
}
