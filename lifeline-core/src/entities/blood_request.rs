use lifeline_sdk::objects::blood::BloodRequestView;
use lifeline_sdk::objects::Point;
use uuid::Uuid;

use super::{BloodGroup, BloodRequestStatus, Urgency};

/// Inclusive bounds on `units_required`.
pub const MIN_UNITS: i16 = 1;
pub const MAX_UNITS: i16 = 5;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct BloodRequest {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub donor_id: Option<Uuid>,
    pub blood_group: BloodGroup,
    pub units_required: i16,
    pub urgency: Urgency,
    pub longitude: f64,
    pub latitude: f64,
    pub hospital: Option<String>,
    pub status: BloodRequestStatus,
    pub created_at: time::OffsetDateTime,
}

impl BloodRequest {
    pub fn location(&self) -> Point {
        Point::new(self.longitude, self.latitude)
    }

    pub fn to_view(&self, distance_m: Option<f64>) -> BloodRequestView {
        BloodRequestView {
            id: self.id,
            patient_id: self.patient_id,
            donor_id: self.donor_id,
            blood_group: self.blood_group.into(),
            units_required: self.units_required,
            urgency: self.urgency.into(),
            location: self.location(),
            hospital: self.hospital.clone(),
            status: self.status.into(),
            created_at: self.created_at.unix_timestamp(),
            distance_m,
        }
    }
}

impl BloodRequestStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            BloodRequestStatus::Fulfilled | BloodRequestStatus::Cancelled
        )
    }

    /// Edges of the blood request state machine. Anything else is
    /// illegal.
    pub fn can_transition_to(self, next: BloodRequestStatus) -> bool {
        matches!(
            (self, next),
            (BloodRequestStatus::Pending, BloodRequestStatus::Accepted)
                | (BloodRequestStatus::Pending, BloodRequestStatus::Cancelled)
                | (BloodRequestStatus::Accepted, BloodRequestStatus::Fulfilled)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBloodRequest {
    pub patient_id: Uuid,
    pub blood_group: BloodGroup,
    pub units_required: i16,
    pub urgency: Urgency,
    pub location: Point,
    pub hospital: Option<String>,
}
