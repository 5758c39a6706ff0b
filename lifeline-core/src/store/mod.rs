//! Persistence traits for accounts/profiles and request records.
//!
//! Two backends implement these traits: [`postgres::PgStore`] for
//! production and [`memory::MemoryStore`] for tests and local
//! development. Every state transition is a single atomic conditional
//! write in both backends: callers pass the precondition, the store
//! either commits and returns the updated row or reports `None` when
//! the precondition no longer held. Racing callers are serialized by
//! the store, never by application-level read-then-write.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use lifeline_sdk::objects::Point;
use uuid::Uuid;

use crate::entities::account::{Account, NewAccount};
use crate::entities::ambulance_request::{
    AmbulanceRequest, LocationUpdate, NewAmbulanceRequest,
};
use crate::entities::blood_request::{BloodRequest, NewBloodRequest};
use crate::entities::profiles::{DonorProfile, DriverProfile, NewProfile, PatientProfile, Profile};
use crate::entities::{BloodGroup, Role, TripStatus};
use crate::error::CoreError;

/// A newly registered account together with its profile.
#[derive(Debug, Clone)]
pub struct RegisteredAccount {
    pub account: Account,
    pub profile: Option<Profile>,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Create an account and (for the three profile roles) exactly one
    /// profile row, atomically. A duplicate email, license number, or
    /// vehicle registration fails with `Conflict` and leaves nothing
    /// behind.
    async fn create_account(
        &self,
        account: NewAccount,
        profile: Option<NewProfile>,
    ) -> Result<RegisteredAccount, CoreError>;

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, CoreError>;

    async fn account_by_id(&self, id: Uuid) -> Result<Option<Account>, CoreError>;

    /// Activate or deactivate an account. `NotFound` for an unknown id.
    async fn set_account_active(&self, id: Uuid, active: bool) -> Result<(), CoreError>;

    async fn donor_profile(&self, account_id: Uuid) -> Result<Option<DonorProfile>, CoreError>;

    async fn patient_profile(&self, account_id: Uuid)
        -> Result<Option<PatientProfile>, CoreError>;

    async fn driver_profile(&self, account_id: Uuid) -> Result<Option<DriverProfile>, CoreError>;

    /// Resolve the profile collection from the account's role. This is
    /// the one place the role-to-profile mapping is decided.
    async fn profile_for(&self, account: &Account) -> Result<Option<Profile>, CoreError> {
        Ok(match account.role {
            Role::Donor => self.donor_profile(account.id).await?.map(Profile::Donor),
            Role::Patient => self
                .patient_profile(account.id)
                .await?
                .map(Profile::Patient),
            Role::Driver => self.driver_profile(account.id).await?.map(Profile::Driver),
            Role::Admin => None,
        })
    }

    /// `NotFound` when the account has no donor profile.
    async fn set_donor_availability(
        &self,
        account_id: Uuid,
        is_available: bool,
    ) -> Result<(), CoreError>;

    /// `NotFound` when the account has no driver profile.
    async fn set_driver_availability(
        &self,
        account_id: Uuid,
        is_available: bool,
    ) -> Result<(), CoreError>;

    /// `NotFound` when the account has no driver profile.
    async fn set_driver_location(
        &self,
        account_id: Uuid,
        location: Point,
    ) -> Result<(), CoreError>;

    /// Available drivers within `radius_m` of `origin`, nearest first,
    /// with their distance in meters.
    async fn available_drivers_near(
        &self,
        origin: Point,
        radius_m: f64,
    ) -> Result<Vec<(DriverProfile, f64)>, CoreError>;
}

#[async_trait]
pub trait RequestStore: Send + Sync {
    async fn insert_blood_request(
        &self,
        request: NewBloodRequest,
    ) -> Result<BloodRequest, CoreError>;

    async fn blood_request(&self, id: Uuid) -> Result<Option<BloodRequest>, CoreError>;

    /// Pending requests of the given blood group within `radius_m` of
    /// `origin`, nearest first, with their distance in meters.
    async fn pending_blood_requests_near(
        &self,
        origin: Point,
        radius_m: f64,
        blood_group: BloodGroup,
    ) -> Result<Vec<(BloodRequest, f64)>, CoreError>;

    /// Atomic conditional accept: pending → accepted, stamping the
    /// donor. `None` when the request is missing or no longer pending;
    /// under concurrent accepts exactly one caller gets `Some`.
    async fn accept_blood_request(
        &self,
        id: Uuid,
        donor_id: Uuid,
    ) -> Result<Option<BloodRequest>, CoreError>;

    /// Atomic conditional fulfill: accepted → fulfilled, owner only.
    async fn fulfill_blood_request(
        &self,
        id: Uuid,
        patient_id: Uuid,
    ) -> Result<Option<BloodRequest>, CoreError>;

    /// Atomic conditional cancel: pending → cancelled, owner only.
    async fn cancel_blood_request(
        &self,
        id: Uuid,
        patient_id: Uuid,
    ) -> Result<Option<BloodRequest>, CoreError>;

    async fn blood_requests_for_patient(
        &self,
        patient_id: Uuid,
    ) -> Result<Vec<BloodRequest>, CoreError>;

    async fn blood_requests_for_donor(
        &self,
        donor_id: Uuid,
    ) -> Result<Vec<BloodRequest>, CoreError>;

    async fn insert_ambulance_request(
        &self,
        request: NewAmbulanceRequest,
    ) -> Result<AmbulanceRequest, CoreError>;

    async fn ambulance_request(&self, id: Uuid) -> Result<Option<AmbulanceRequest>, CoreError>;

    /// Atomic conditional assign: pending → assigned, stamping driver,
    /// assigned-at, and the travel estimate.
    async fn assign_driver(
        &self,
        id: Uuid,
        driver_id: Uuid,
        estimated_minutes: Option<i32>,
    ) -> Result<Option<AmbulanceRequest>, CoreError>;

    /// Atomic conditional status advance for the assigned driver,
    /// keyed on the observed `from` status. Completion stamps
    /// completed-at and the actual trip duration.
    async fn transition_trip(
        &self,
        id: Uuid,
        driver_id: Uuid,
        from: TripStatus,
        to: TripStatus,
    ) -> Result<Option<AmbulanceRequest>, CoreError>;

    /// Atomic conditional cancel: pending|assigned → cancelled, owner
    /// only.
    async fn cancel_ambulance_request(
        &self,
        id: Uuid,
        patient_id: Uuid,
    ) -> Result<Option<AmbulanceRequest>, CoreError>;

    /// Append a track point iff the trip is in progress and owned by
    /// this driver. Returns whether the point was persisted; a stray
    /// ping outside those conditions is dropped without error.
    async fn append_location_update(
        &self,
        id: Uuid,
        driver_id: Uuid,
        location: Point,
    ) -> Result<bool, CoreError>;

    /// Track points for a trip, oldest first.
    async fn location_updates(&self, id: Uuid) -> Result<Vec<LocationUpdate>, CoreError>;

    async fn ambulance_requests_for_patient(
        &self,
        patient_id: Uuid,
    ) -> Result<Vec<AmbulanceRequest>, CoreError>;

    async fn trips_for_driver(
        &self,
        driver_id: Uuid,
    ) -> Result<Vec<AmbulanceRequest>, CoreError>;

    async fn ambulance_requests_by_status(
        &self,
        status: Option<TripStatus>,
    ) -> Result<Vec<AmbulanceRequest>, CoreError>;
}

/// Convenience supertrait for components that need both stores.
pub trait Store: CredentialStore + RequestStore {}

impl<T: CredentialStore + RequestStore> Store for T {}
