//! In-memory store backend.
//!
//! Backs the test suite and `--memory` development mode. All maps live
//! behind one `tokio::sync::RwLock`; every conditional transition runs
//! entirely under the write lock, which gives the same
//! serialize-at-the-store guarantee as the SQL backend's conditional
//! `UPDATE`.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use compact_str::CompactString;
use itertools::Itertools;
use lifeline_sdk::objects::Point;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CredentialStore, RegisteredAccount, RequestStore};
use crate::entities::account::{Account, NewAccount};
use crate::entities::ambulance_request::{
    AmbulanceRequest, LocationUpdate, NewAmbulanceRequest,
};
use crate::entities::blood_request::{BloodRequest, NewBloodRequest};
use crate::entities::profiles::{DonorProfile, DriverProfile, NewProfile, PatientProfile, Profile};
use crate::entities::{BloodGroup, BloodRequestStatus, TripStatus};
use crate::error::CoreError;
use crate::geo::haversine_distance_m;

#[derive(Default)]
struct Inner {
    accounts: HashMap<Uuid, Account>,
    emails: HashMap<CompactString, Uuid>,
    donors: HashMap<Uuid, DonorProfile>,
    patients: HashMap<Uuid, PatientProfile>,
    drivers: HashMap<Uuid, DriverProfile>,
    licenses: HashSet<CompactString>,
    registrations: HashSet<CompactString>,
    blood_requests: HashMap<Uuid, BloodRequest>,
    ambulance_requests: HashMap<Uuid, AmbulanceRequest>,
    track_points: HashMap<Uuid, Vec<LocationUpdate>>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn now() -> time::OffsetDateTime {
    time::OffsetDateTime::now_utc()
}

fn minutes_between(from: time::OffsetDateTime, to: time::OffsetDateTime) -> i32 {
    let seconds = (to - from).whole_seconds().max(0);
    ((seconds + 59) / 60) as i32
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn create_account(
        &self,
        account: NewAccount,
        profile: Option<NewProfile>,
    ) -> Result<RegisteredAccount, CoreError> {
        let mut inner = self.inner.write().await;

        // All uniqueness checks happen before any insert, so a conflict
        // leaves no partial rows behind.
        if inner.emails.contains_key(&account.email) {
            return Err(CoreError::Conflict("email"));
        }
        if let Some(NewProfile::Driver {
            license_number,
            vehicle_registration,
            ..
        }) = &profile
        {
            if inner.licenses.contains(license_number) {
                return Err(CoreError::Conflict("license_number"));
            }
            if inner.registrations.contains(vehicle_registration) {
                return Err(CoreError::Conflict("vehicle_registration"));
            }
        }

        let id = Uuid::new_v4();
        let stored = Account {
            id,
            email: account.email.clone(),
            secret_hash: account.secret_hash,
            role: account.role,
            phone: account.phone,
            active: true,
            created_at: now(),
        };
        inner.emails.insert(account.email, id);
        inner.accounts.insert(id, stored.clone());

        let stored_profile = profile.map(|p| p.into_profile(id));
        match &stored_profile {
            Some(Profile::Donor(p)) => {
                inner.donors.insert(id, p.clone());
            }
            Some(Profile::Patient(p)) => {
                inner.patients.insert(id, p.clone());
            }
            Some(Profile::Driver(p)) => {
                inner.licenses.insert(p.license_number.clone());
                inner.registrations.insert(p.vehicle_registration.clone());
                inner.drivers.insert(id, p.clone());
            }
            None => {}
        }

        Ok(RegisteredAccount {
            account: stored,
            profile: stored_profile,
        })
    }

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, CoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .emails
            .get(email)
            .and_then(|id| inner.accounts.get(id))
            .cloned())
    }

    async fn account_by_id(&self, id: Uuid) -> Result<Option<Account>, CoreError> {
        Ok(self.inner.read().await.accounts.get(&id).cloned())
    }

    async fn set_account_active(&self, id: Uuid, active: bool) -> Result<(), CoreError> {
        let mut inner = self.inner.write().await;
        let account = inner.accounts.get_mut(&id).ok_or(CoreError::NotFound)?;
        account.active = active;
        Ok(())
    }

    async fn donor_profile(&self, account_id: Uuid) -> Result<Option<DonorProfile>, CoreError> {
        Ok(self.inner.read().await.donors.get(&account_id).cloned())
    }

    async fn patient_profile(
        &self,
        account_id: Uuid,
    ) -> Result<Option<PatientProfile>, CoreError> {
        Ok(self.inner.read().await.patients.get(&account_id).cloned())
    }

    async fn driver_profile(&self, account_id: Uuid) -> Result<Option<DriverProfile>, CoreError> {
        Ok(self.inner.read().await.drivers.get(&account_id).cloned())
    }

    async fn set_donor_availability(
        &self,
        account_id: Uuid,
        is_available: bool,
    ) -> Result<(), CoreError> {
        let mut inner = self.inner.write().await;
        let donor = inner.donors.get_mut(&account_id).ok_or(CoreError::NotFound)?;
        donor.is_available = is_available;
        Ok(())
    }

    async fn set_driver_availability(
        &self,
        account_id: Uuid,
        is_available: bool,
    ) -> Result<(), CoreError> {
        let mut inner = self.inner.write().await;
        let driver = inner
            .drivers
            .get_mut(&account_id)
            .ok_or(CoreError::NotFound)?;
        driver.is_available = is_available;
        Ok(())
    }

    async fn set_driver_location(
        &self,
        account_id: Uuid,
        location: Point,
    ) -> Result<(), CoreError> {
        let mut inner = self.inner.write().await;
        let driver = inner
            .drivers
            .get_mut(&account_id)
            .ok_or(CoreError::NotFound)?;
        driver.longitude = location.longitude;
        driver.latitude = location.latitude;
        Ok(())
    }

    async fn available_drivers_near(
        &self,
        origin: Point,
        radius_m: f64,
    ) -> Result<Vec<(DriverProfile, f64)>, CoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .drivers
            .values()
            .filter(|d| d.is_available)
            .map(|d| (d.clone(), haversine_distance_m(origin, d.location())))
            .filter(|(_, distance)| *distance <= radius_m)
            .sorted_by(|a, b| a.1.total_cmp(&b.1))
            .collect())
    }
}

#[async_trait]
impl RequestStore for MemoryStore {
    async fn insert_blood_request(
        &self,
        request: NewBloodRequest,
    ) -> Result<BloodRequest, CoreError> {
        let stored = BloodRequest {
            id: Uuid::new_v4(),
            patient_id: request.patient_id,
            donor_id: None,
            blood_group: request.blood_group,
            units_required: request.units_required,
            urgency: request.urgency,
            longitude: request.location.longitude,
            latitude: request.location.latitude,
            hospital: request.hospital,
            status: BloodRequestStatus::Pending,
            created_at: now(),
        };
        self.inner
            .write()
            .await
            .blood_requests
            .insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn blood_request(&self, id: Uuid) -> Result<Option<BloodRequest>, CoreError> {
        Ok(self.inner.read().await.blood_requests.get(&id).cloned())
    }

    async fn pending_blood_requests_near(
        &self,
        origin: Point,
        radius_m: f64,
        blood_group: BloodGroup,
    ) -> Result<Vec<(BloodRequest, f64)>, CoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .blood_requests
            .values()
            .filter(|r| r.status == BloodRequestStatus::Pending && r.blood_group == blood_group)
            .map(|r| (r.clone(), haversine_distance_m(origin, r.location())))
            .filter(|(_, distance)| *distance <= radius_m)
            .sorted_by(|a, b| a.1.total_cmp(&b.1))
            .collect())
    }

    async fn accept_blood_request(
        &self,
        id: Uuid,
        donor_id: Uuid,
    ) -> Result<Option<BloodRequest>, CoreError> {
        let mut inner = self.inner.write().await;
        let Some(request) = inner.blood_requests.get_mut(&id) else {
            return Ok(None);
        };
        if request.status != BloodRequestStatus::Pending {
            return Ok(None);
        }
        request.status = BloodRequestStatus::Accepted;
        request.donor_id = Some(donor_id);
        Ok(Some(request.clone()))
    }

    async fn fulfill_blood_request(
        &self,
        id: Uuid,
        patient_id: Uuid,
    ) -> Result<Option<BloodRequest>, CoreError> {
        let mut inner = self.inner.write().await;
        let Some(request) = inner.blood_requests.get_mut(&id) else {
            return Ok(None);
        };
        if request.patient_id != patient_id || request.status != BloodRequestStatus::Accepted {
            return Ok(None);
        }
        request.status = BloodRequestStatus::Fulfilled;
        Ok(Some(request.clone()))
    }

    async fn cancel_blood_request(
        &self,
        id: Uuid,
        patient_id: Uuid,
    ) -> Result<Option<BloodRequest>, CoreError> {
        let mut inner = self.inner.write().await;
        let Some(request) = inner.blood_requests.get_mut(&id) else {
            return Ok(None);
        };
        if request.patient_id != patient_id || request.status != BloodRequestStatus::Pending {
            return Ok(None);
        }
        request.status = BloodRequestStatus::Cancelled;
        Ok(Some(request.clone()))
    }

    async fn blood_requests_for_patient(
        &self,
        patient_id: Uuid,
    ) -> Result<Vec<BloodRequest>, CoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .blood_requests
            .values()
            .filter(|r| r.patient_id == patient_id)
            .sorted_by_key(|r| r.created_at)
            .cloned()
            .collect())
    }

    async fn blood_requests_for_donor(
        &self,
        donor_id: Uuid,
    ) -> Result<Vec<BloodRequest>, CoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .blood_requests
            .values()
            .filter(|r| r.donor_id == Some(donor_id))
            .sorted_by_key(|r| r.created_at)
            .cloned()
            .collect())
    }

    async fn insert_ambulance_request(
        &self,
        request: NewAmbulanceRequest,
    ) -> Result<AmbulanceRequest, CoreError> {
        let stored = AmbulanceRequest {
            id: Uuid::new_v4(),
            patient_id: request.patient_id,
            driver_id: None,
            pickup_longitude: request.pickup.location.longitude,
            pickup_latitude: request.pickup.location.latitude,
            pickup_address: request.pickup.address,
            destination_longitude: request.destination.location.longitude,
            destination_latitude: request.destination.location.latitude,
            destination_address: request.destination.address,
            status: TripStatus::Pending,
            requested_at: now(),
            assigned_at: None,
            completed_at: None,
            estimated_minutes: None,
            actual_minutes: None,
        };
        self.inner
            .write()
            .await
            .ambulance_requests
            .insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn ambulance_request(&self, id: Uuid) -> Result<Option<AmbulanceRequest>, CoreError> {
        Ok(self.inner.read().await.ambulance_requests.get(&id).cloned())
    }

    async fn assign_driver(
        &self,
        id: Uuid,
        driver_id: Uuid,
        estimated_minutes: Option<i32>,
    ) -> Result<Option<AmbulanceRequest>, CoreError> {
        let mut inner = self.inner.write().await;
        let Some(request) = inner.ambulance_requests.get_mut(&id) else {
            return Ok(None);
        };
        if request.status != TripStatus::Pending {
            return Ok(None);
        }
        request.status = TripStatus::Assigned;
        request.driver_id = Some(driver_id);
        request.assigned_at = Some(now());
        request.estimated_minutes = estimated_minutes;
        Ok(Some(request.clone()))
    }

    async fn transition_trip(
        &self,
        id: Uuid,
        driver_id: Uuid,
        from: TripStatus,
        to: TripStatus,
    ) -> Result<Option<AmbulanceRequest>, CoreError> {
        let mut inner = self.inner.write().await;
        let Some(request) = inner.ambulance_requests.get_mut(&id) else {
            return Ok(None);
        };
        if request.driver_id != Some(driver_id) || request.status != from {
            return Ok(None);
        }
        request.status = to;
        if to == TripStatus::Completed {
            let completed = now();
            request.completed_at = Some(completed);
            request.actual_minutes = request
                .assigned_at
                .map(|assigned| minutes_between(assigned, completed));
        }
        Ok(Some(request.clone()))
    }

    async fn cancel_ambulance_request(
        &self,
        id: Uuid,
        patient_id: Uuid,
    ) -> Result<Option<AmbulanceRequest>, CoreError> {
        let mut inner = self.inner.write().await;
        let Some(request) = inner.ambulance_requests.get_mut(&id) else {
            return Ok(None);
        };
        if request.patient_id != patient_id
            || !matches!(request.status, TripStatus::Pending | TripStatus::Assigned)
        {
            return Ok(None);
        }
        request.status = TripStatus::Cancelled;
        // driver_id is only set in post-assignment, non-cancelled states.
        request.driver_id = None;
        Ok(Some(request.clone()))
    }

    async fn append_location_update(
        &self,
        id: Uuid,
        driver_id: Uuid,
        location: Point,
    ) -> Result<bool, CoreError> {
        let mut inner = self.inner.write().await;
        let eligible = inner
            .ambulance_requests
            .get(&id)
            .is_some_and(|r| r.driver_id == Some(driver_id) && r.status == TripStatus::InProgress);
        if !eligible {
            return Ok(false);
        }
        inner.track_points.entry(id).or_default().push(LocationUpdate {
            request_id: id,
            longitude: location.longitude,
            latitude: location.latitude,
            recorded_at: now(),
        });
        Ok(true)
    }

    async fn location_updates(&self, id: Uuid) -> Result<Vec<LocationUpdate>, CoreError> {
        Ok(self
            .inner
            .read()
            .await
            .track_points
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }

    async fn ambulance_requests_for_patient(
        &self,
        patient_id: Uuid,
    ) -> Result<Vec<AmbulanceRequest>, CoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .ambulance_requests
            .values()
            .filter(|r| r.patient_id == patient_id)
            .sorted_by_key(|r| r.requested_at)
            .cloned()
            .collect())
    }

    async fn trips_for_driver(
        &self,
        driver_id: Uuid,
    ) -> Result<Vec<AmbulanceRequest>, CoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .ambulance_requests
            .values()
            .filter(|r| r.driver_id == Some(driver_id))
            .sorted_by_key(|r| r.requested_at)
            .cloned()
            .collect())
    }

    async fn ambulance_requests_by_status(
        &self,
        status: Option<TripStatus>,
    ) -> Result<Vec<AmbulanceRequest>, CoreError> {
        let inner = self.inner.read().await;
        Ok(inner
            .ambulance_requests
            .values()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .sorted_by_key(|r| r.requested_at)
            .cloned()
            .collect())
    }
}
