//! Registration, login, and account/profile response types.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::geo::Point;

/// Actor role attached to every account and every bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Donor,
    Patient,
    Driver,
    Admin,
}

/// The eight ABO/Rh blood groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BloodGroup {
    #[serde(rename = "A+")]
    APositive,
    #[serde(rename = "A-")]
    ANegative,
    #[serde(rename = "B+")]
    BPositive,
    #[serde(rename = "B-")]
    BNegative,
    #[serde(rename = "AB+")]
    AbPositive,
    #[serde(rename = "AB-")]
    AbNegative,
    #[serde(rename = "O+")]
    OPositive,
    #[serde(rename = "O-")]
    ONegative,
}

/// Ambulance vehicle classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    Basic,
    Advanced,
    Neonatal,
}

/// Request body for `POST /auth/register`.
///
/// The optional fields are role-specific; the server rejects a
/// registration with a field-level validation error when a field
/// required for the chosen role is missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub secret: String,
    pub phone: String,
    pub role: Role,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub age: Option<i16>,
    #[serde(default)]
    pub blood_group: Option<BloodGroup>,
    #[serde(default)]
    pub location: Option<Point>,
    #[serde(default)]
    pub license_number: Option<String>,
    #[serde(default)]
    pub vehicle_type: Option<VehicleType>,
    #[serde(default)]
    pub vehicle_registration: Option<String>,
    #[serde(default)]
    pub vehicle_capacity: Option<i16>,
}

/// Request body for `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub secret: String,
}

/// Account representation returned to clients. Never carries the secret
/// hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountView {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub phone: String,
    pub active: bool,
    pub created_at: i64,
}

/// Role-specific profile attached to an account, tagged by role.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum ProfileView {
    Donor {
        name: String,
        age: i16,
        blood_group: BloodGroup,
        location: Point,
        is_available: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        last_donation_date: Option<time::Date>,
    },
    Patient {
        name: String,
        age: i16,
        blood_group: BloodGroup,
    },
    Driver {
        name: String,
        license_number: String,
        vehicle_type: VehicleType,
        vehicle_registration: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        vehicle_capacity: Option<i16>,
        location: Point,
        is_available: bool,
    },
}

/// Response body for successful register/login calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub account: AccountView,
    pub profile: Option<ProfileView>,
}

/// Body for the donor/driver availability toggles.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct UpdateAvailability {
    pub is_available: bool,
}
