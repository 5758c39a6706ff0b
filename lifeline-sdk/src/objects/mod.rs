pub mod ambulance;
pub mod auth;
pub mod blood;
pub mod geo;
pub mod ws;

pub use ambulance::{AmbulanceRequestView, TripStatus, Waypoint};
pub use auth::{AccountView, BloodGroup, ProfileView, Role, VehicleType};
pub use blood::{BloodRequestStatus, BloodRequestView, Urgency};
pub use geo::Point;
pub use ws::ServerEvent;
