//! Request lifecycle and matching operations.
//!
//! The façade composing store, matching, and fan-out: every externally
//! visible operation validates its input, performs at most one
//! conditional write through the store, and only then publishes events.
//! A notification is never emitted for a transition that did not
//! commit, and a fan-out failure never affects the triggering caller's
//! result.

use lifeline_sdk::objects::ambulance::CreateAmbulanceRequest;
use lifeline_sdk::objects::blood::{CreateBloodRequest, SearchScope};
use lifeline_sdk::objects::ws::{Notice, NoticeKind};
use lifeline_sdk::objects::{Point, ServerEvent};
use uuid::Uuid;

use crate::dispatch::NotificationHub;
use crate::entities::ambulance_request::{AmbulanceRequest, NewAmbulanceRequest};
use crate::entities::blood_request::{BloodRequest, NewBloodRequest, MAX_UNITS, MIN_UNITS};
use crate::entities::profiles::DriverProfile;
use crate::entities::{Role, TripStatus};
use crate::error::CoreError;
use crate::geo::{haversine_distance_m, validate_point};
use crate::store::Store;

/// Assumed average ambulance speed for the travel estimate stamped at
/// assignment, in meters per minute (30 km/h).
pub const AVERAGE_SPEED_M_PER_MIN: f64 = 500.0;

/// Search radii for proximity matching.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchingConfig {
    pub default_radius_m: f64,
    pub urgent_radius_m: f64,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            default_radius_m: 10_000.0,
            urgent_radius_m: 50_000.0,
        }
    }
}

impl MatchingConfig {
    pub fn radius_for(&self, scope: SearchScope) -> f64 {
        match scope {
            SearchScope::Default => self.default_radius_m,
            SearchScope::Urgent => self.urgent_radius_m,
        }
    }
}

/// Create a blood request and broadcast it to eligible donors.
pub async fn create_blood_request<S: Store + ?Sized>(
    store: &S,
    hub: &NotificationHub,
    patient_id: Uuid,
    body: CreateBloodRequest,
) -> Result<BloodRequest, CoreError> {
    if !(MIN_UNITS..=MAX_UNITS).contains(&body.units_required) {
        return Err(CoreError::validation(
            "units_required",
            format!("must be between {MIN_UNITS} and {MAX_UNITS}"),
        ));
    }
    validate_point("location", body.location)?;

    let request = store
        .insert_blood_request(NewBloodRequest {
            patient_id,
            blood_group: body.blood_group.into(),
            units_required: body.units_required,
            urgency: body.urgency.into(),
            location: body.location,
            hospital: body.hospital,
        })
        .await?;

    let group = request.blood_group;
    let event = ServerEvent::NewBloodRequest {
        request: request.to_view(None),
    };
    match hub
        .broadcast_to_eligible(&event, |c| {
            c.role == Role::Donor && c.is_available && c.blood_group == Some(group)
        })
        .await
    {
        Ok(delivered) => {
            tracing::debug!(request_id = %request.id, delivered, "broadcast new blood request");
        }
        Err(e) => {
            tracing::error!(error = %e, request_id = %request.id, "blood request broadcast failed");
        }
    }

    Ok(request)
}

/// Pending requests matching the donor's blood group within the chosen
/// radius, nearest first. An empty result is a valid outcome, not an
/// error.
pub async fn find_nearby_blood_requests<S: Store + ?Sized>(
    store: &S,
    config: &MatchingConfig,
    donor_id: Uuid,
    scope: SearchScope,
) -> Result<Vec<(BloodRequest, f64)>, CoreError> {
    let donor = store
        .donor_profile(donor_id)
        .await?
        .ok_or(CoreError::NotFound)?;
    store
        .pending_blood_requests_near(donor.location(), config.radius_for(scope), donor.blood_group)
        .await
}

/// Accept a pending blood request.
///
/// The store performs a single conditional update keyed on
/// status = pending; under concurrent accepts exactly one donor wins
/// and every other caller observes `NotFound`, indistinguishable from a
/// request that never existed.
pub async fn accept_blood_request<S: Store + ?Sized>(
    store: &S,
    hub: &NotificationHub,
    request_id: Uuid,
    donor_id: Uuid,
) -> Result<BloodRequest, CoreError> {
    store
        .donor_profile(donor_id)
        .await?
        .ok_or(CoreError::NotFound)?;

    let updated = store
        .accept_blood_request(request_id, donor_id)
        .await?
        .ok_or(CoreError::NotFound)?;

    notify(
        hub,
        updated.patient_id,
        NoticeKind::BloodRequestAccepted,
        updated.id,
        "a donor accepted your blood request",
    )
    .await;

    Ok(updated)
}

/// Owner confirms the donation happened: accepted → fulfilled.
pub async fn fulfill_blood_request<S: Store + ?Sized>(
    store: &S,
    hub: &NotificationHub,
    request_id: Uuid,
    patient_id: Uuid,
) -> Result<BloodRequest, CoreError> {
    let updated = store
        .fulfill_blood_request(request_id, patient_id)
        .await?
        .ok_or(CoreError::NotFound)?;

    if let Some(donor_id) = updated.donor_id {
        notify(
            hub,
            donor_id,
            NoticeKind::BloodRequestFulfilled,
            updated.id,
            "the patient confirmed your donation",
        )
        .await;
    }
    Ok(updated)
}

/// Owner cancels a still-pending blood request.
pub async fn cancel_blood_request<S: Store + ?Sized>(
    store: &S,
    request_id: Uuid,
    patient_id: Uuid,
) -> Result<BloodRequest, CoreError> {
    store
        .cancel_blood_request(request_id, patient_id)
        .await?
        .ok_or(CoreError::NotFound)
}

/// Create an ambulance request. Assignment happens separately, through
/// [`assign_driver`].
pub async fn create_ambulance_request<S: Store + ?Sized>(
    store: &S,
    patient_id: Uuid,
    body: CreateAmbulanceRequest,
) -> Result<AmbulanceRequest, CoreError> {
    validate_point("pickup.location", body.pickup.location)?;
    validate_point("destination.location", body.destination.location)?;
    if body.pickup.address.trim().is_empty() {
        return Err(CoreError::validation("pickup.address", "must not be empty"));
    }
    if body.destination.address.trim().is_empty() {
        return Err(CoreError::validation(
            "destination.address",
            "must not be empty",
        ));
    }

    store
        .insert_ambulance_request(NewAmbulanceRequest {
            patient_id,
            pickup: body.pickup,
            destination: body.destination,
        })
        .await
}

/// Available drivers near the request's pickup point, nearest first.
pub async fn driver_candidates<S: Store + ?Sized>(
    store: &S,
    config: &MatchingConfig,
    request_id: Uuid,
    scope: SearchScope,
) -> Result<Vec<(DriverProfile, f64)>, CoreError> {
    let request = store
        .ambulance_request(request_id)
        .await?
        .ok_or(CoreError::NotFound)?;
    store
        .available_drivers_near(request.pickup(), config.radius_for(scope))
        .await
}

/// Assign a driver to a pending ambulance request.
///
/// Same conditional-update pattern as the blood accept: a request that
/// is no longer pending reports `NotFound`. Stamps assigned-at and a
/// distance-derived travel estimate; notifies the driver and the owner.
pub async fn assign_driver<S: Store + ?Sized>(
    store: &S,
    hub: &NotificationHub,
    request_id: Uuid,
    driver_id: Uuid,
) -> Result<AmbulanceRequest, CoreError> {
    let driver = store
        .driver_profile(driver_id)
        .await?
        .ok_or(CoreError::NotFound)?;
    if !driver.is_available {
        return Err(CoreError::validation(
            "driver_id",
            "driver is not available",
        ));
    }

    let request = store
        .ambulance_request(request_id)
        .await?
        .ok_or(CoreError::NotFound)?;
    let estimate = travel_estimate_minutes(driver.location(), request.pickup());

    let updated = store
        .assign_driver(request_id, driver_id, Some(estimate))
        .await?
        .ok_or(CoreError::NotFound)?;

    let assignment = ServerEvent::NewAssignment {
        trip: updated.to_view(&[]),
    };
    if let Err(e) = hub.notify_account(driver_id, assignment).await {
        tracing::error!(error = %e, request_id = %updated.id, "driver assignment notify failed");
    }
    notify(
        hub,
        updated.patient_id,
        NoticeKind::TripAssigned,
        updated.id,
        "an ambulance has been assigned to your request",
    )
    .await;

    Ok(updated)
}

/// Advance a trip's status as its assigned driver.
///
/// Transition legality is checked against the state diagram first, so
/// an illegal jump (e.g. pending → in_progress) reports
/// `InvalidTransition` with the offending edge; the write itself is
/// still conditional on the observed status, so a racing transition
/// surfaces as `NotFound`.
pub async fn update_trip_status<S: Store + ?Sized>(
    store: &S,
    hub: &NotificationHub,
    request_id: Uuid,
    driver_id: Uuid,
    new_status: TripStatus,
) -> Result<AmbulanceRequest, CoreError> {
    let current = store
        .ambulance_request(request_id)
        .await?
        .ok_or(CoreError::NotFound)?;

    if !current.status.can_transition_to(new_status) {
        return Err(CoreError::InvalidTransition {
            from: current.status,
            to: new_status,
        });
    }
    if current.driver_id != Some(driver_id) {
        return Err(CoreError::Forbidden);
    }

    let updated = store
        .transition_trip(request_id, driver_id, current.status, new_status)
        .await?
        .ok_or(CoreError::NotFound)?;

    notify(
        hub,
        updated.patient_id,
        NoticeKind::TripStatusChanged,
        updated.id,
        format!("your ambulance trip is now {}", updated.status),
    )
    .await;

    Ok(updated)
}

/// Owner cancels a not-yet-started trip (pending or assigned).
pub async fn cancel_ambulance_request<S: Store + ?Sized>(
    store: &S,
    hub: &NotificationHub,
    request_id: Uuid,
    patient_id: Uuid,
) -> Result<AmbulanceRequest, CoreError> {
    // Cancellation detaches the driver, so capture them first for the
    // farewell notification.
    let prior_driver = store
        .ambulance_request(request_id)
        .await?
        .and_then(|r| r.driver_id);

    let updated = store
        .cancel_ambulance_request(request_id, patient_id)
        .await?
        .ok_or(CoreError::NotFound)?;

    if let Some(driver_id) = prior_driver {
        notify(
            hub,
            driver_id,
            NoticeKind::TripStatusChanged,
            updated.id,
            "the trip was cancelled by the patient",
        )
        .await;
    }
    Ok(updated)
}

/// Append a track point to a trip.
///
/// Policy for stray pings (trip not in progress, or not this driver's):
/// the point is dropped and the call still succeeds, returning `false`.
pub async fn record_location_update<S: Store + ?Sized>(
    store: &S,
    request_id: Uuid,
    driver_id: Uuid,
    location: Point,
) -> Result<bool, CoreError> {
    validate_point("location", location)?;
    store
        .append_location_update(request_id, driver_id, location)
        .await
}

/// Update the driver's current position, feeding both future matching
/// queries and the track of any trip currently in progress.
pub async fn record_driver_location<S: Store + ?Sized>(
    store: &S,
    driver_id: Uuid,
    location: Point,
) -> Result<(), CoreError> {
    validate_point("location", location)?;
    store.set_driver_location(driver_id, location).await?;

    let trips = store.trips_for_driver(driver_id).await?;
    if let Some(active) = trips
        .iter()
        .find(|t| t.status == TripStatus::InProgress)
    {
        store
            .append_location_update(active.id, driver_id, location)
            .await?;
    }
    Ok(())
}

fn travel_estimate_minutes(from: Point, to: Point) -> i32 {
    let minutes = haversine_distance_m(from, to) / AVERAGE_SPEED_M_PER_MIN;
    (minutes.ceil() as i32).max(1)
}

/// Directed notification helper; delivery failures are logged, never
/// propagated.
async fn notify(
    hub: &NotificationHub,
    account_id: Uuid,
    kind: NoticeKind,
    request_id: Uuid,
    message: impl Into<String>,
) {
    let event = ServerEvent::Notification {
        notice: Notice {
            kind,
            request_id,
            message: message.into(),
        },
    };
    if let Err(e) = hub.notify_account(account_id, event).await {
        tracing::error!(error = %e, %account_id, "notification dispatch failed");
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::panic)]

    use std::sync::Arc;

    use super::*;
    use crate::dispatch::ClientProfile;
    use crate::entities::account::NewAccount;
    use crate::entities::profiles::NewProfile;
    use crate::entities::{BloodGroup, BloodRequestStatus};
    use crate::store::memory::MemoryStore;
    use crate::store::{CredentialStore, RequestStore};
    use lifeline_sdk::objects::ambulance::Waypoint;
    use lifeline_sdk::objects::blood::Urgency as SdkUrgency;
    use lifeline_sdk::objects::auth::BloodGroup as SdkBloodGroup;
    use lifeline_sdk::objects::ws::NoticeKind;

    // Biratnagar and nearby offsets; one degree of latitude ~ 111 km,
    // so 0.01 degrees ~ 1.1 km.
    const ORIGIN: Point = Point {
        longitude: 87.28,
        latitude: 26.81,
    };

    fn offset_km(km: f64) -> Point {
        Point::new(ORIGIN.longitude, ORIGIN.latitude + km / 111.195)
    }

    async fn setup() -> (Arc<MemoryStore>, Arc<NotificationHub>) {
        let store = Arc::new(MemoryStore::new());
        let hub = Arc::new(NotificationHub::new());
        hub.initialize().await.unwrap();
        (store, hub)
    }

    async fn seed_account(store: &MemoryStore, role: Role, profile: Option<NewProfile>) -> Uuid {
        let account = NewAccount {
            email: format!("{}@example.com", Uuid::new_v4()).into(),
            secret_hash: "seeded".into(),
            role,
            phone: "+977-1".into(),
        };
        store
            .create_account(account, profile)
            .await
            .unwrap()
            .account
            .id
    }

    async fn seed_patient(store: &MemoryStore) -> Uuid {
        seed_account(
            store,
            Role::Patient,
            Some(NewProfile::Patient {
                name: "Patient".into(),
                age: 40,
                blood_group: BloodGroup::OPositive,
            }),
        )
        .await
    }

    async fn seed_donor(store: &MemoryStore, group: BloodGroup, location: Point) -> Uuid {
        seed_account(
            store,
            Role::Donor,
            Some(NewProfile::Donor {
                name: "Donor".into(),
                age: 30,
                blood_group: group,
                location,
            }),
        )
        .await
    }

    async fn seed_driver(store: &MemoryStore, location: Point) -> Uuid {
        seed_account(
            store,
            Role::Driver,
            Some(NewProfile::Driver {
                name: "Driver".into(),
                license_number: format!("L-{}", Uuid::new_v4()).into(),
                vehicle_type: crate::entities::VehicleType::Basic,
                vehicle_registration: format!("R-{}", Uuid::new_v4()).into(),
                vehicle_capacity: Some(2),
                location,
            }),
        )
        .await
    }

    fn blood_body(group: SdkBloodGroup, location: Point) -> CreateBloodRequest {
        CreateBloodRequest {
            blood_group: group,
            units_required: 2,
            urgency: SdkUrgency::Critical,
            location,
            hospital: Some("Koshi Hospital".into()),
        }
    }

    fn ambulance_body() -> CreateAmbulanceRequest {
        CreateAmbulanceRequest {
            pickup: Waypoint {
                location: ORIGIN,
                address: "Main Road 12".into(),
            },
            destination: Waypoint {
                location: offset_km(4.0),
                address: "Koshi Hospital".into(),
            },
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn exactly_one_concurrent_accept_wins() {
        let (store, hub) = setup().await;
        let patient = seed_patient(&store).await;
        let request =
            create_blood_request(&*store, &hub, patient, blood_body(SdkBloodGroup::OPositive, ORIGIN))
                .await
                .unwrap();

        let mut donors = Vec::new();
        for _ in 0..8 {
            donors.push(seed_donor(&store, BloodGroup::OPositive, offset_km(1.0)).await);
        }

        let mut handles = Vec::new();
        for donor in donors {
            let store = Arc::clone(&store);
            let hub = Arc::clone(&hub);
            let request_id = request.id;
            handles.push(tokio::spawn(async move {
                accept_blood_request(&*store, &hub, request_id, donor).await
            }));
        }

        let mut winners = 0;
        let mut losers = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(updated) => {
                    winners += 1;
                    assert_eq!(updated.status, BloodRequestStatus::Accepted);
                }
                Err(CoreError::NotFound) => losers += 1,
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(winners, 1);
        assert_eq!(losers, 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn two_nearby_donors_race_for_a_critical_request() {
        let (store, hub) = setup().await;
        let patient = seed_patient(&store).await;
        let request =
            create_blood_request(&*store, &hub, patient, blood_body(SdkBloodGroup::OPositive, ORIGIN))
                .await
                .unwrap();

        let d1 = seed_donor(&store, BloodGroup::OPositive, offset_km(1.0)).await;
        let d2 = seed_donor(&store, BloodGroup::OPositive, offset_km(3.0)).await;

        let (r1, r2) = tokio::join!(
            accept_blood_request(&*store, &hub, request.id, d1),
            accept_blood_request(&*store, &hub, request.id, d2),
        );

        let (winner_id, winner, loser) = match (r1, r2) {
            (Ok(w), Err(l)) => (d1, w, l),
            (Err(l), Ok(w)) => (d2, w, l),
            other => panic!("expected exactly one winner, got {other:?}"),
        };
        assert_eq!(winner.status, BloodRequestStatus::Accepted);
        assert_eq!(winner.donor_id, Some(winner_id));
        assert!(matches!(loser, CoreError::NotFound));
    }

    #[tokio::test]
    async fn nearby_search_filters_group_status_and_radius() {
        let (store, hub) = setup().await;
        let patient = seed_patient(&store).await;
        let config = MatchingConfig::default();

        let near = create_blood_request(
            &*store,
            &hub,
            patient,
            blood_body(SdkBloodGroup::OPositive, offset_km(2.0)),
        )
        .await
        .unwrap();
        let mid = create_blood_request(
            &*store,
            &hub,
            patient,
            blood_body(SdkBloodGroup::OPositive, offset_km(6.0)),
        )
        .await
        .unwrap();
        // Outside the default radius, wrong group, and cancelled: none
        // of these may surface.
        let far = create_blood_request(
            &*store,
            &hub,
            patient,
            blood_body(SdkBloodGroup::OPositive, offset_km(25.0)),
        )
        .await
        .unwrap();
        create_blood_request(
            &*store,
            &hub,
            patient,
            blood_body(SdkBloodGroup::ANegative, offset_km(2.0)),
        )
        .await
        .unwrap();
        let cancelled = create_blood_request(
            &*store,
            &hub,
            patient,
            blood_body(SdkBloodGroup::OPositive, offset_km(3.0)),
        )
        .await
        .unwrap();
        cancel_blood_request(&*store, cancelled.id, patient)
            .await
            .unwrap();

        let donor = seed_donor(&store, BloodGroup::OPositive, ORIGIN).await;
        let results =
            find_nearby_blood_requests(&*store, &config, donor, SearchScope::Default)
                .await
                .unwrap();

        let ids: Vec<Uuid> = results.iter().map(|(r, _)| r.id).collect();
        assert_eq!(ids, vec![near.id, mid.id], "nearest first, filtered");
        for (request, distance) in &results {
            assert_eq!(request.status, BloodRequestStatus::Pending);
            assert_eq!(request.blood_group, BloodGroup::OPositive);
            assert!(*distance <= config.default_radius_m);
        }

        // The urgent scope widens the radius enough to reach the far
        // request.
        let urgent =
            find_nearby_blood_requests(&*store, &config, donor, SearchScope::Urgent)
                .await
                .unwrap();
        assert!(urgent.iter().any(|(r, _)| r.id == far.id));
    }

    #[tokio::test]
    async fn losing_racer_triggers_no_notification() {
        let (store, hub) = setup().await;
        let patient = seed_patient(&store).await;
        let request =
            create_blood_request(&*store, &hub, patient, blood_body(SdkBloodGroup::OPositive, ORIGIN))
                .await
                .unwrap();
        let d1 = seed_donor(&store, BloodGroup::OPositive, ORIGIN).await;
        let d2 = seed_donor(&store, BloodGroup::OPositive, ORIGIN).await;

        accept_blood_request(&*store, &hub, request.id, d1)
            .await
            .unwrap();

        // Patient connects after the accept; the losing attempt must
        // not produce a frame for a transition that never committed.
        let mut patient_sub = hub
            .join(ClientProfile {
                account_id: patient,
                role: Role::Patient,
                blood_group: None,
                is_available: false,
            })
            .await
            .unwrap();

        let lost = accept_blood_request(&*store, &hub, request.id, d2).await;
        assert!(matches!(lost, Err(CoreError::NotFound)));
        assert!(patient_sub.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn accept_notifies_the_owning_patient() {
        let (store, hub) = setup().await;
        let patient = seed_patient(&store).await;
        let mut patient_sub = hub
            .join(ClientProfile {
                account_id: patient,
                role: Role::Patient,
                blood_group: None,
                is_available: false,
            })
            .await
            .unwrap();

        let request =
            create_blood_request(&*store, &hub, patient, blood_body(SdkBloodGroup::OPositive, ORIGIN))
                .await
                .unwrap();
        let donor = seed_donor(&store, BloodGroup::OPositive, ORIGIN).await;
        accept_blood_request(&*store, &hub, request.id, donor)
            .await
            .unwrap();

        match patient_sub.events.try_recv().unwrap() {
            ServerEvent::Notification { notice } => {
                assert_eq!(notice.kind, NoticeKind::BloodRequestAccepted);
                assert_eq!(notice.request_id, request.id);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn new_request_broadcast_reaches_matching_available_donors_only() {
        let (store, hub) = setup().await;
        let patient = seed_patient(&store).await;

        let matching = seed_donor(&store, BloodGroup::OPositive, ORIGIN).await;
        let wrong_group = seed_donor(&store, BloodGroup::ANegative, ORIGIN).await;

        let mut matching_sub = hub
            .join(ClientProfile {
                account_id: matching,
                role: Role::Donor,
                blood_group: Some(BloodGroup::OPositive),
                is_available: true,
            })
            .await
            .unwrap();
        let mut wrong_sub = hub
            .join(ClientProfile {
                account_id: wrong_group,
                role: Role::Donor,
                blood_group: Some(BloodGroup::ANegative),
                is_available: true,
            })
            .await
            .unwrap();

        let request =
            create_blood_request(&*store, &hub, patient, blood_body(SdkBloodGroup::OPositive, ORIGIN))
                .await
                .unwrap();

        match matching_sub.events.try_recv().unwrap() {
            ServerEvent::NewBloodRequest { request: view } => {
                assert_eq!(view.id, request.id);
            }
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(wrong_sub.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn pending_trip_cannot_jump_to_in_progress() {
        let (store, hub) = setup().await;
        let patient = seed_patient(&store).await;
        let driver = seed_driver(&store, ORIGIN).await;
        let trip = create_ambulance_request(&*store, patient, ambulance_body())
            .await
            .unwrap();

        let result =
            update_trip_status(&*store, &hub, trip.id, driver, TripStatus::InProgress).await;
        assert!(matches!(
            result,
            Err(CoreError::InvalidTransition {
                from: TripStatus::Pending,
                to: TripStatus::InProgress,
            })
        ));

        let unchanged = store.ambulance_request(trip.id).await.unwrap().unwrap();
        assert_eq!(unchanged.status, TripStatus::Pending);
    }

    #[tokio::test]
    async fn full_trip_lifecycle_with_stamps_and_notifications() {
        let (store, hub) = setup().await;
        let patient = seed_patient(&store).await;
        let driver = seed_driver(&store, offset_km(2.0)).await;

        let mut driver_sub = hub
            .join(ClientProfile {
                account_id: driver,
                role: Role::Driver,
                blood_group: None,
                is_available: true,
            })
            .await
            .unwrap();

        let trip = create_ambulance_request(&*store, patient, ambulance_body())
            .await
            .unwrap();
        assert_eq!(trip.status, TripStatus::Pending);
        assert!(trip.driver_id.is_none());

        let assigned = assign_driver(&*store, &hub, trip.id, driver).await.unwrap();
        assert_eq!(assigned.status, TripStatus::Assigned);
        assert_eq!(assigned.driver_id, Some(driver));
        assert!(assigned.assigned_at.is_some());
        assert!(assigned.estimated_minutes.unwrap() >= 1);
        match driver_sub.events.try_recv().unwrap() {
            ServerEvent::NewAssignment { trip: view } => assert_eq!(view.id, trip.id),
            other => panic!("unexpected event: {other:?}"),
        }

        let started =
            update_trip_status(&*store, &hub, trip.id, driver, TripStatus::InProgress)
                .await
                .unwrap();
        assert_eq!(started.status, TripStatus::InProgress);

        let completed =
            update_trip_status(&*store, &hub, trip.id, driver, TripStatus::Completed)
                .await
                .unwrap();
        assert_eq!(completed.status, TripStatus::Completed);
        assert!(completed.completed_at.is_some());
        assert!(completed.actual_minutes.is_some());
    }

    #[tokio::test]
    async fn only_the_assigned_driver_may_advance_a_trip() {
        let (store, hub) = setup().await;
        let patient = seed_patient(&store).await;
        let driver = seed_driver(&store, ORIGIN).await;
        let other_driver = seed_driver(&store, ORIGIN).await;

        let trip = create_ambulance_request(&*store, patient, ambulance_body())
            .await
            .unwrap();
        assign_driver(&*store, &hub, trip.id, driver).await.unwrap();

        let result = update_trip_status(
            &*store,
            &hub,
            trip.id,
            other_driver,
            TripStatus::InProgress,
        )
        .await;
        assert!(matches!(result, Err(CoreError::Forbidden)));
    }

    #[tokio::test]
    async fn stray_pings_are_dropped_without_error() {
        let (store, hub) = setup().await;
        let patient = seed_patient(&store).await;
        let driver = seed_driver(&store, ORIGIN).await;
        let trip = create_ambulance_request(&*store, patient, ambulance_body())
            .await
            .unwrap();
        assign_driver(&*store, &hub, trip.id, driver).await.unwrap();

        // Assigned but not yet started: the ping succeeds but nothing
        // is persisted.
        let recorded = record_location_update(&*store, trip.id, driver, offset_km(1.0))
            .await
            .unwrap();
        assert!(!recorded);
        assert!(store.location_updates(trip.id).await.unwrap().is_empty());

        update_trip_status(&*store, &hub, trip.id, driver, TripStatus::InProgress)
            .await
            .unwrap();
        let recorded = record_location_update(&*store, trip.id, driver, offset_km(1.5))
            .await
            .unwrap();
        assert!(recorded);
        assert_eq!(store.location_updates(trip.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn driver_location_feeds_profile_and_active_trip() {
        let (store, hub) = setup().await;
        let patient = seed_patient(&store).await;
        let driver = seed_driver(&store, ORIGIN).await;
        let trip = create_ambulance_request(&*store, patient, ambulance_body())
            .await
            .unwrap();
        assign_driver(&*store, &hub, trip.id, driver).await.unwrap();
        update_trip_status(&*store, &hub, trip.id, driver, TripStatus::InProgress)
            .await
            .unwrap();

        let position = offset_km(0.5);
        record_driver_location(&*store, driver, position).await.unwrap();

        let profile = store.driver_profile(driver).await.unwrap().unwrap();
        assert_eq!(profile.latitude, position.latitude);
        assert_eq!(store.location_updates(trip.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn owner_cancel_is_limited_to_early_states() {
        let (store, hub) = setup().await;
        let patient = seed_patient(&store).await;
        let stranger = seed_patient(&store).await;
        let driver = seed_driver(&store, ORIGIN).await;

        // Blood: only while pending, only by the owner.
        let blood =
            create_blood_request(&*store, &hub, patient, blood_body(SdkBloodGroup::OPositive, ORIGIN))
                .await
                .unwrap();
        assert!(matches!(
            cancel_blood_request(&*store, blood.id, stranger).await,
            Err(CoreError::NotFound)
        ));
        let donor = seed_donor(&store, BloodGroup::OPositive, ORIGIN).await;
        accept_blood_request(&*store, &hub, blood.id, donor)
            .await
            .unwrap();
        assert!(matches!(
            cancel_blood_request(&*store, blood.id, patient).await,
            Err(CoreError::NotFound)
        ));

        // Ambulance: pending and assigned cancel, in-progress does not.
        let trip = create_ambulance_request(&*store, patient, ambulance_body())
            .await
            .unwrap();
        assign_driver(&*store, &hub, trip.id, driver).await.unwrap();
        let cancelled = cancel_ambulance_request(&*store, &hub, trip.id, patient)
            .await
            .unwrap();
        assert_eq!(cancelled.status, TripStatus::Cancelled);

        let second = create_ambulance_request(&*store, patient, ambulance_body())
            .await
            .unwrap();
        assign_driver(&*store, &hub, second.id, driver).await.unwrap();
        update_trip_status(&*store, &hub, second.id, driver, TripStatus::InProgress)
            .await
            .unwrap();
        assert!(matches!(
            cancel_ambulance_request(&*store, &hub, second.id, patient).await,
            Err(CoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn assignment_requires_an_available_driver() {
        let (store, hub) = setup().await;
        let patient = seed_patient(&store).await;
        let driver = seed_driver(&store, ORIGIN).await;
        store.set_driver_availability(driver, false).await.unwrap();

        let trip = create_ambulance_request(&*store, patient, ambulance_body())
            .await
            .unwrap();
        assert!(matches!(
            assign_driver(&*store, &hub, trip.id, driver).await,
            Err(CoreError::Validation { field: "driver_id", .. })
        ));
    }

    #[tokio::test]
    async fn driver_candidates_are_ordered_by_distance() {
        let (store, _hub) = setup().await;
        let patient = seed_patient(&store).await;
        let config = MatchingConfig::default();

        let close = seed_driver(&store, offset_km(1.0)).await;
        let closer = seed_driver(&store, offset_km(0.3)).await;
        let unavailable = seed_driver(&store, offset_km(0.1)).await;
        store
            .set_driver_availability(unavailable, false)
            .await
            .unwrap();
        let _far = seed_driver(&store, offset_km(30.0)).await;

        let trip = create_ambulance_request(&*store, patient, ambulance_body())
            .await
            .unwrap();

        let candidates = driver_candidates(&*store, &config, trip.id, SearchScope::Default)
            .await
            .unwrap();
        let ids: Vec<Uuid> = candidates.iter().map(|(d, _)| d.account_id).collect();
        assert_eq!(ids, vec![closer, close]);
    }

    #[tokio::test]
    async fn register_authenticate_token_round_trip_for_a_driver() {
        use lifeline_sdk::objects::auth::{
            RegisterRequest, Role as SdkRole, VehicleType as SdkVehicleType,
        };
        use lifeline_sdk::token;

        let (store, _hub) = setup().await;
        let registered = crate::credentials::register(
            &*store,
            RegisterRequest {
                email: "driver@example.com".into(),
                secret: "a-strong-secret".into(),
                phone: "+977-980".into(),
                role: SdkRole::Driver,
                name: Some("Bikram".into()),
                age: None,
                blood_group: None,
                location: Some(ORIGIN),
                license_number: Some("LIC-99".into()),
                vehicle_type: Some(SdkVehicleType::Advanced),
                vehicle_registration: Some("BA-2-CHA-1234".into()),
                vehicle_capacity: Some(2),
            },
        )
        .await
        .unwrap();

        let account =
            crate::credentials::authenticate(&*store, "driver@example.com", "a-strong-secret")
                .await
                .unwrap();
        assert_eq!(account.id, registered.account.id);

        let key = b"server-token-secret";
        let token = token::issue_token(account.id, account.role.into(), key).unwrap();
        let claims = token::verify_token(&token, key).unwrap();
        assert_eq!(claims.sub, account.id);
        assert_eq!(claims.role, SdkRole::Driver);
    }

    #[tokio::test]
    async fn invalid_units_and_points_are_field_level_errors() {
        let (store, hub) = setup().await;
        let patient = seed_patient(&store).await;

        let mut too_many = blood_body(SdkBloodGroup::OPositive, ORIGIN);
        too_many.units_required = 6;
        assert!(matches!(
            create_blood_request(&*store, &hub, patient, too_many).await,
            Err(CoreError::Validation { field: "units_required", .. })
        ));

        let mut bad_point = blood_body(SdkBloodGroup::OPositive, ORIGIN);
        bad_point.location = Point::new(200.0, 0.0);
        assert!(matches!(
            create_blood_request(&*store, &hub, patient, bad_point).await,
            Err(CoreError::Validation { field: "location", .. })
        ));
    }
}
