pub mod account;
pub mod ambulance_request;
pub mod blood_request;
pub mod profiles;

use lifeline_sdk::objects::auth::{
    BloodGroup as SdkBloodGroup, Role as SdkRole, VehicleType as SdkVehicleType,
};
use lifeline_sdk::objects::blood::{
    BloodRequestStatus as SdkBloodRequestStatus, Urgency as SdkUrgency,
};
use lifeline_sdk::objects::TripStatus as SdkTripStatus;

/// Account role for database operations.
///
/// This is the sqlx::Type version. For API/DTO use, see
/// `lifeline_sdk::objects::auth::Role`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "snake_case", type_name = "account_role")]
pub enum Role {
    Donor,
    Patient,
    Driver,
    Admin,
}

impl From<Role> for SdkRole {
    fn from(value: Role) -> Self {
        match value {
            Role::Donor => SdkRole::Donor,
            Role::Patient => SdkRole::Patient,
            Role::Driver => SdkRole::Driver,
            Role::Admin => SdkRole::Admin,
        }
    }
}

impl From<SdkRole> for Role {
    fn from(value: SdkRole) -> Self {
        match value {
            SdkRole::Donor => Role::Donor,
            SdkRole::Patient => Role::Patient,
            SdkRole::Driver => Role::Driver,
            SdkRole::Admin => Role::Admin,
        }
    }
}

/// ABO/Rh blood group for database operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "snake_case", type_name = "blood_group")]
pub enum BloodGroup {
    APositive,
    ANegative,
    BPositive,
    BNegative,
    AbPositive,
    AbNegative,
    OPositive,
    ONegative,
}

impl From<BloodGroup> for SdkBloodGroup {
    fn from(value: BloodGroup) -> Self {
        match value {
            BloodGroup::APositive => SdkBloodGroup::APositive,
            BloodGroup::ANegative => SdkBloodGroup::ANegative,
            BloodGroup::BPositive => SdkBloodGroup::BPositive,
            BloodGroup::BNegative => SdkBloodGroup::BNegative,
            BloodGroup::AbPositive => SdkBloodGroup::AbPositive,
            BloodGroup::AbNegative => SdkBloodGroup::AbNegative,
            BloodGroup::OPositive => SdkBloodGroup::OPositive,
            BloodGroup::ONegative => SdkBloodGroup::ONegative,
        }
    }
}

impl From<SdkBloodGroup> for BloodGroup {
    fn from(value: SdkBloodGroup) -> Self {
        match value {
            SdkBloodGroup::APositive => BloodGroup::APositive,
            SdkBloodGroup::ANegative => BloodGroup::ANegative,
            SdkBloodGroup::BPositive => BloodGroup::BPositive,
            SdkBloodGroup::BNegative => BloodGroup::BNegative,
            SdkBloodGroup::AbPositive => BloodGroup::AbPositive,
            SdkBloodGroup::AbNegative => BloodGroup::AbNegative,
            SdkBloodGroup::OPositive => BloodGroup::OPositive,
            SdkBloodGroup::ONegative => BloodGroup::ONegative,
        }
    }
}

/// Ambulance vehicle classification for database operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "snake_case", type_name = "vehicle_type")]
pub enum VehicleType {
    Basic,
    Advanced,
    Neonatal,
}

impl From<VehicleType> for SdkVehicleType {
    fn from(value: VehicleType) -> Self {
        match value {
            VehicleType::Basic => SdkVehicleType::Basic,
            VehicleType::Advanced => SdkVehicleType::Advanced,
            VehicleType::Neonatal => SdkVehicleType::Neonatal,
        }
    }
}

impl From<SdkVehicleType> for VehicleType {
    fn from(value: SdkVehicleType) -> Self {
        match value {
            SdkVehicleType::Basic => VehicleType::Basic,
            SdkVehicleType::Advanced => VehicleType::Advanced,
            SdkVehicleType::Neonatal => VehicleType::Neonatal,
        }
    }
}

/// Blood request urgency for database operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "snake_case", type_name = "urgency")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

impl From<Urgency> for SdkUrgency {
    fn from(value: Urgency) -> Self {
        match value {
            Urgency::Low => SdkUrgency::Low,
            Urgency::Medium => SdkUrgency::Medium,
            Urgency::High => SdkUrgency::High,
            Urgency::Critical => SdkUrgency::Critical,
        }
    }
}

impl From<SdkUrgency> for Urgency {
    fn from(value: SdkUrgency) -> Self {
        match value {
            SdkUrgency::Low => Urgency::Low,
            SdkUrgency::Medium => Urgency::Medium,
            SdkUrgency::High => Urgency::High,
            SdkUrgency::Critical => Urgency::Critical,
        }
    }
}

/// Blood request status for database operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "snake_case", type_name = "blood_request_status")]
pub enum BloodRequestStatus {
    Pending,
    Accepted,
    Fulfilled,
    Cancelled,
}

impl From<BloodRequestStatus> for SdkBloodRequestStatus {
    fn from(value: BloodRequestStatus) -> Self {
        match value {
            BloodRequestStatus::Pending => SdkBloodRequestStatus::Pending,
            BloodRequestStatus::Accepted => SdkBloodRequestStatus::Accepted,
            BloodRequestStatus::Fulfilled => SdkBloodRequestStatus::Fulfilled,
            BloodRequestStatus::Cancelled => SdkBloodRequestStatus::Cancelled,
        }
    }
}

/// Ambulance trip status for database operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "snake_case", type_name = "trip_status")]
pub enum TripStatus {
    Pending,
    Assigned,
    InProgress,
    Completed,
    Cancelled,
}

impl From<TripStatus> for SdkTripStatus {
    fn from(value: TripStatus) -> Self {
        match value {
            TripStatus::Pending => SdkTripStatus::Pending,
            TripStatus::Assigned => SdkTripStatus::Assigned,
            TripStatus::InProgress => SdkTripStatus::InProgress,
            TripStatus::Completed => SdkTripStatus::Completed,
            TripStatus::Cancelled => SdkTripStatus::Cancelled,
        }
    }
}

impl From<SdkTripStatus> for TripStatus {
    fn from(value: SdkTripStatus) -> Self {
        match value {
            SdkTripStatus::Pending => TripStatus::Pending,
            SdkTripStatus::Assigned => TripStatus::Assigned,
            SdkTripStatus::InProgress => TripStatus::InProgress,
            SdkTripStatus::Completed => TripStatus::Completed,
            SdkTripStatus::Cancelled => TripStatus::Cancelled,
        }
    }
}

impl std::fmt::Display for TripStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TripStatus::Pending => "pending",
            TripStatus::Assigned => "assigned",
            TripStatus::InProgress => "in_progress",
            TripStatus::Completed => "completed",
            TripStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}
