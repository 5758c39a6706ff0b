use lifeline_sdk::objects::ambulance::{AmbulanceRequestView, TrackPoint, Waypoint};
use lifeline_sdk::objects::Point;
use uuid::Uuid;

use super::TripStatus;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct AmbulanceRequest {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub driver_id: Option<Uuid>,
    pub pickup_longitude: f64,
    pub pickup_latitude: f64,
    pub pickup_address: String,
    pub destination_longitude: f64,
    pub destination_latitude: f64,
    pub destination_address: String,
    pub status: TripStatus,
    pub requested_at: time::OffsetDateTime,
    pub assigned_at: Option<time::OffsetDateTime>,
    pub completed_at: Option<time::OffsetDateTime>,
    pub estimated_minutes: Option<i32>,
    pub actual_minutes: Option<i32>,
}

impl AmbulanceRequest {
    pub fn pickup(&self) -> Point {
        Point::new(self.pickup_longitude, self.pickup_latitude)
    }

    pub fn destination(&self) -> Point {
        Point::new(self.destination_longitude, self.destination_latitude)
    }

    pub fn to_view(&self, updates: &[LocationUpdate]) -> AmbulanceRequestView {
        AmbulanceRequestView {
            id: self.id,
            patient_id: self.patient_id,
            driver_id: self.driver_id,
            pickup: Waypoint {
                location: self.pickup(),
                address: self.pickup_address.clone(),
            },
            destination: Waypoint {
                location: self.destination(),
                address: self.destination_address.clone(),
            },
            status: self.status.into(),
            requested_at: self.requested_at.unix_timestamp(),
            assigned_at: self.assigned_at.map(|t| t.unix_timestamp()),
            completed_at: self.completed_at.map(|t| t.unix_timestamp()),
            estimated_minutes: self.estimated_minutes,
            actual_minutes: self.actual_minutes,
            location_updates: updates
                .iter()
                .map(|u| TrackPoint {
                    location: Point::new(u.longitude, u.latitude),
                    recorded_at: u.recorded_at.unix_timestamp(),
                })
                .collect(),
        }
    }
}

impl TripStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TripStatus::Completed | TripStatus::Cancelled)
    }

    /// Edges of the ambulance state machine: no skipped states, nothing
    /// leaves a terminal state.
    pub fn can_transition_to(self, next: TripStatus) -> bool {
        matches!(
            (self, next),
            (TripStatus::Pending, TripStatus::Assigned)
                | (TripStatus::Pending, TripStatus::Cancelled)
                | (TripStatus::Assigned, TripStatus::InProgress)
                | (TripStatus::Assigned, TripStatus::Cancelled)
                | (TripStatus::InProgress, TripStatus::Completed)
        )
    }
}

/// One position report recorded while a trip is in progress.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct LocationUpdate {
    pub request_id: Uuid,
    pub longitude: f64,
    pub latitude: f64,
    pub recorded_at: time::OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAmbulanceRequest {
    pub patient_id: Uuid,
    pub pickup: Waypoint,
    pub destination: Waypoint,
}
