#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Property-based state machine tests for the request lifecycle.
//!
//! Random operation sequences run against the in-memory store; after
//! every operation the observed status may only have moved along an
//! edge of the defined state diagram, and a failed operation must leave
//! the status untouched.

use proptest::prelude::*;
use uuid::Uuid;

use lifeline_core::dispatch::NotificationHub;
use lifeline_core::entities::account::NewAccount;
use lifeline_core::entities::profiles::NewProfile;
use lifeline_core::entities::{BloodGroup, BloodRequestStatus, Role, TripStatus, VehicleType};
use lifeline_core::lifecycle;
use lifeline_core::store::memory::MemoryStore;
use lifeline_core::store::{CredentialStore, RequestStore};
use lifeline_sdk::objects::ambulance::{CreateAmbulanceRequest, Waypoint};
use lifeline_sdk::objects::blood::{CreateBloodRequest, Urgency};
use lifeline_sdk::objects::auth::BloodGroup as SdkBloodGroup;
use lifeline_sdk::objects::Point;

// ── Operations ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
enum TripOp {
    Assign,
    Start,
    Complete,
    CancelByOwner,
}

#[derive(Debug, Clone, Copy)]
enum BloodOp {
    Accept,
    CancelByOwner,
    Fulfill,
}

fn trip_op() -> impl Strategy<Value = TripOp> {
    prop_oneof![
        Just(TripOp::Assign),
        Just(TripOp::Start),
        Just(TripOp::Complete),
        Just(TripOp::CancelByOwner),
    ]
}

fn blood_op() -> impl Strategy<Value = BloodOp> {
    prop_oneof![
        Just(BloodOp::Accept),
        Just(BloodOp::CancelByOwner),
        Just(BloodOp::Fulfill),
    ]
}

// ── Helpers ───────────────────────────────────────────────────────────────────

const ORIGIN: Point = Point {
    longitude: 87.28,
    latitude: 26.81,
};

async fn seed_account(store: &MemoryStore, role: Role, profile: Option<NewProfile>) -> Uuid {
    store
        .create_account(
            NewAccount {
                email: format!("{}@example.com", Uuid::new_v4()).into(),
                secret_hash: "seeded".into(),
                role,
                phone: "+977-1".into(),
            },
            profile,
        )
        .await
        .unwrap()
        .account
        .id
}

struct World {
    store: MemoryStore,
    hub: NotificationHub,
    patient: Uuid,
    donor: Uuid,
    driver: Uuid,
}

async fn world() -> World {
    let store = MemoryStore::new();
    let hub = NotificationHub::new();
    hub.initialize().await.unwrap();

    let patient = seed_account(
        &store,
        Role::Patient,
        Some(NewProfile::Patient {
            name: "Patient".into(),
            age: 35,
            blood_group: BloodGroup::OPositive,
        }),
    )
    .await;
    let donor = seed_account(
        &store,
        Role::Donor,
        Some(NewProfile::Donor {
            name: "Donor".into(),
            age: 28,
            blood_group: BloodGroup::OPositive,
            location: ORIGIN,
        }),
    )
    .await;
    let driver = seed_account(
        &store,
        Role::Driver,
        Some(NewProfile::Driver {
            name: "Driver".into(),
            license_number: "L-1".into(),
            vehicle_type: VehicleType::Basic,
            vehicle_registration: "R-1".into(),
            vehicle_capacity: None,
            location: ORIGIN,
        }),
    )
    .await;

    World {
        store,
        hub,
        patient,
        donor,
        driver,
    }
}

// ── proptest! blocks ──────────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// An ambulance request's status only ever moves along edges of its
    /// state diagram, whatever order operations arrive in; a rejected
    /// operation leaves the status untouched.
    #[test]
    fn trip_status_only_moves_along_legal_edges(ops in proptest::collection::vec(trip_op(), 0..14)) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async move {
            let w = world().await;
            let trip = lifecycle::create_ambulance_request(
                &w.store,
                w.patient,
                CreateAmbulanceRequest {
                    pickup: Waypoint { location: ORIGIN, address: "A".into() },
                    destination: Waypoint { location: ORIGIN, address: "B".into() },
                },
            )
            .await
            .unwrap();
            assert_eq!(trip.status, TripStatus::Pending);

            let mut observed = trip.status;
            for op in ops {
                let result = match op {
                    TripOp::Assign => {
                        lifecycle::assign_driver(&w.store, &w.hub, trip.id, w.driver)
                            .await
                            .map(|r| r.status)
                    }
                    TripOp::Start => {
                        lifecycle::update_trip_status(
                            &w.store, &w.hub, trip.id, w.driver, TripStatus::InProgress,
                        )
                        .await
                        .map(|r| r.status)
                    }
                    TripOp::Complete => {
                        lifecycle::update_trip_status(
                            &w.store, &w.hub, trip.id, w.driver, TripStatus::Completed,
                        )
                        .await
                        .map(|r| r.status)
                    }
                    TripOp::CancelByOwner => {
                        lifecycle::cancel_ambulance_request(&w.store, &w.hub, trip.id, w.patient)
                            .await
                            .map(|r| r.status)
                    }
                };

                let current = w
                    .store
                    .ambulance_request(trip.id)
                    .await
                    .unwrap()
                    .unwrap();

                match result {
                    Ok(new_status) => {
                        assert_eq!(current.status, new_status);
                        assert!(
                            observed.can_transition_to(new_status),
                            "illegal committed edge {observed:?} -> {new_status:?}"
                        );
                    }
                    Err(_) => {
                        assert_eq!(
                            current.status, observed,
                            "a rejected operation changed the status"
                        );
                    }
                }

                // driver_id is set exactly in the post-assignment states.
                let expect_driver = matches!(
                    current.status,
                    TripStatus::Assigned | TripStatus::InProgress | TripStatus::Completed
                );
                assert_eq!(current.driver_id.is_some(), expect_driver);

                observed = current.status;
            }
        });
    }

    /// A blood request's status only moves along legal edges, and
    /// donor_id is null exactly while the request is pending or was
    /// cancelled before acceptance.
    #[test]
    fn blood_status_only_moves_along_legal_edges(ops in proptest::collection::vec(blood_op(), 0..12)) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async move {
            let w = world().await;
            let request = lifecycle::create_blood_request(
                &w.store,
                &w.hub,
                w.patient,
                CreateBloodRequest {
                    blood_group: SdkBloodGroup::OPositive,
                    units_required: 2,
                    urgency: Urgency::High,
                    location: ORIGIN,
                    hospital: None,
                },
            )
            .await
            .unwrap();

            let mut observed = request.status;
            for op in ops {
                let result = match op {
                    BloodOp::Accept => {
                        lifecycle::accept_blood_request(&w.store, &w.hub, request.id, w.donor)
                            .await
                            .map(|r| r.status)
                    }
                    BloodOp::CancelByOwner => {
                        lifecycle::cancel_blood_request(&w.store, request.id, w.patient)
                            .await
                            .map(|r| r.status)
                    }
                    BloodOp::Fulfill => {
                        lifecycle::fulfill_blood_request(&w.store, &w.hub, request.id, w.patient)
                            .await
                            .map(|r| r.status)
                    }
                };

                let current = w.store.blood_request(request.id).await.unwrap().unwrap();

                match result {
                    Ok(new_status) => {
                        assert_eq!(current.status, new_status);
                        assert!(
                            observed.can_transition_to(new_status),
                            "illegal committed edge {observed:?} -> {new_status:?}"
                        );
                    }
                    Err(_) => {
                        assert_eq!(
                            current.status, observed,
                            "a rejected operation changed the status"
                        );
                    }
                }

                // donor_id is null iff the request never left pending.
                match current.status {
                    BloodRequestStatus::Pending => assert!(current.donor_id.is_none()),
                    BloodRequestStatus::Accepted | BloodRequestStatus::Fulfilled => {
                        assert_eq!(current.donor_id, Some(w.donor));
                    }
                    BloodRequestStatus::Cancelled => assert!(current.donor_id.is_none()),
                }

                observed = current.status;
            }
        });
    }
}
