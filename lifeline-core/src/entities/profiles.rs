//! Role-specific profile records, each owned 1:1 by an account.

use compact_str::CompactString;
use lifeline_sdk::objects::auth::ProfileView;
use lifeline_sdk::objects::Point;
use uuid::Uuid;

use super::{BloodGroup, VehicleType};

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct DonorProfile {
    pub account_id: Uuid,
    pub name: String,
    pub age: i16,
    pub blood_group: BloodGroup,
    pub longitude: f64,
    pub latitude: f64,
    pub is_available: bool,
    pub last_donation_date: Option<time::Date>,
}

impl DonorProfile {
    pub fn location(&self) -> Point {
        Point::new(self.longitude, self.latitude)
    }
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct PatientProfile {
    pub account_id: Uuid,
    pub name: String,
    pub age: i16,
    pub blood_group: BloodGroup,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct DriverProfile {
    pub account_id: Uuid,
    pub name: String,
    pub license_number: CompactString,
    pub vehicle_type: VehicleType,
    pub vehicle_registration: CompactString,
    pub vehicle_capacity: Option<i16>,
    pub longitude: f64,
    pub latitude: f64,
    pub is_available: bool,
}

impl DriverProfile {
    pub fn location(&self) -> Point {
        Point::new(self.longitude, self.latitude)
    }
}

/// Closed union over the three profile kinds, keyed by the account's
/// role. Resolved through an explicit match wherever a profile is
/// attached to a response.
#[derive(Debug, Clone, PartialEq)]
pub enum Profile {
    Donor(DonorProfile),
    Patient(PatientProfile),
    Driver(DriverProfile),
}

impl Profile {
    pub fn to_view(&self) -> ProfileView {
        match self {
            Profile::Donor(p) => ProfileView::Donor {
                name: p.name.clone(),
                age: p.age,
                blood_group: p.blood_group.into(),
                location: p.location(),
                is_available: p.is_available,
                last_donation_date: p.last_donation_date,
            },
            Profile::Patient(p) => ProfileView::Patient {
                name: p.name.clone(),
                age: p.age,
                blood_group: p.blood_group.into(),
            },
            Profile::Driver(p) => ProfileView::Driver {
                name: p.name.clone(),
                license_number: p.license_number.to_string(),
                vehicle_type: p.vehicle_type.into(),
                vehicle_registration: p.vehicle_registration.to_string(),
                vehicle_capacity: p.vehicle_capacity,
                location: p.location(),
                is_available: p.is_available,
            },
        }
    }
}

/// Profile fields collected at registration, before an account id
/// exists.
#[derive(Debug, Clone, PartialEq)]
pub enum NewProfile {
    Donor {
        name: String,
        age: i16,
        blood_group: BloodGroup,
        location: Point,
    },
    Patient {
        name: String,
        age: i16,
        blood_group: BloodGroup,
    },
    Driver {
        name: String,
        license_number: CompactString,
        vehicle_type: VehicleType,
        vehicle_registration: CompactString,
        vehicle_capacity: Option<i16>,
        location: Point,
    },
}

impl NewProfile {
    /// Attach the owning account id, producing the persistable profile.
    pub fn into_profile(self, account_id: Uuid) -> Profile {
        match self {
            NewProfile::Donor {
                name,
                age,
                blood_group,
                location,
            } => Profile::Donor(DonorProfile {
                account_id,
                name,
                age,
                blood_group,
                longitude: location.longitude,
                latitude: location.latitude,
                is_available: true,
                last_donation_date: None,
            }),
            NewProfile::Patient {
                name,
                age,
                blood_group,
            } => Profile::Patient(PatientProfile {
                account_id,
                name,
                age,
                blood_group,
            }),
            NewProfile::Driver {
                name,
                license_number,
                vehicle_type,
                vehicle_registration,
                vehicle_capacity,
                location,
            } => Profile::Driver(DriverProfile {
                account_id,
                name,
                license_number,
                vehicle_type,
                vehicle_registration,
                vehicle_capacity,
                longitude: location.longitude,
                latitude: location.latitude,
                is_available: true,
            }),
        }
    }
}
