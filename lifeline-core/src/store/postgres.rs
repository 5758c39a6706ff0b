//! Postgres store backend.
//!
//! Conditional transitions are single `UPDATE ... WHERE id = $1 AND
//! status = $expected RETURNING *` statements; the row count is the
//! race outcome. Proximity queries compute the haversine distance in
//! SQL and order by it, so the store returns candidates nearest-first.

use async_trait::async_trait;
use lifeline_sdk::objects::Point;
use sqlx::PgPool;
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

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Map a unique-index violation onto the conflicting field; everything
/// else stays a database error.
fn map_unique_violation(err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            let constraint = db.constraint().unwrap_or_default();
            return if constraint.contains("email") {
                CoreError::Conflict("email")
            } else if constraint.contains("license") {
                CoreError::Conflict("license_number")
            } else if constraint.contains("registration") {
                CoreError::Conflict("vehicle_registration")
            } else {
                CoreError::Conflict("unique")
            };
        }
    }
    CoreError::Database(err)
}

#[derive(sqlx::FromRow)]
struct BloodRequestRow {
    #[sqlx(flatten)]
    request: BloodRequest,
    distance_m: f64,
}

#[derive(sqlx::FromRow)]
struct DriverRow {
    #[sqlx(flatten)]
    profile: DriverProfile,
    distance_m: f64,
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn create_account(
        &self,
        account: NewAccount,
        profile: Option<NewProfile>,
    ) -> Result<RegisteredAccount, CoreError> {
        // Account and profile insert share one transaction; a profile
        // conflict rolls the account back.
        let mut tx = self.pool.begin().await?;

        let stored = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (email, secret_hash, role, phone)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(account.email.as_str())
        .bind(&account.secret_hash)
        .bind(account.role)
        .bind(account.phone.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(map_unique_violation)?;

        let stored_profile = match profile.map(|p| p.into_profile(stored.id)) {
            Some(Profile::Donor(p)) => {
                let row = sqlx::query_as::<_, DonorProfile>(
                    r#"
                    INSERT INTO donor_profiles
                        (account_id, name, age, blood_group, longitude, latitude)
                    VALUES ($1, $2, $3, $4, $5, $6)
                    RETURNING *
                    "#,
                )
                .bind(p.account_id)
                .bind(&p.name)
                .bind(p.age)
                .bind(p.blood_group)
                .bind(p.longitude)
                .bind(p.latitude)
                .fetch_one(&mut *tx)
                .await
                .map_err(map_unique_violation)?;
                Some(Profile::Donor(row))
            }
            Some(Profile::Patient(p)) => {
                let row = sqlx::query_as::<_, PatientProfile>(
                    r#"
                    INSERT INTO patient_profiles (account_id, name, age, blood_group)
                    VALUES ($1, $2, $3, $4)
                    RETURNING *
                    "#,
                )
                .bind(p.account_id)
                .bind(&p.name)
                .bind(p.age)
                .bind(p.blood_group)
                .fetch_one(&mut *tx)
                .await
                .map_err(map_unique_violation)?;
                Some(Profile::Patient(row))
            }
            Some(Profile::Driver(p)) => {
                let row = sqlx::query_as::<_, DriverProfile>(
                    r#"
                    INSERT INTO driver_profiles
                        (account_id, name, license_number, vehicle_type,
                         vehicle_registration, vehicle_capacity, longitude, latitude)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    RETURNING *
                    "#,
                )
                .bind(p.account_id)
                .bind(&p.name)
                .bind(p.license_number.as_str())
                .bind(p.vehicle_type)
                .bind(p.vehicle_registration.as_str())
                .bind(p.vehicle_capacity)
                .bind(p.longitude)
                .bind(p.latitude)
                .fetch_one(&mut *tx)
                .await
                .map_err(map_unique_violation)?;
                Some(Profile::Driver(row))
            }
            None => None,
        };

        tx.commit().await?;
        Ok(RegisteredAccount {
            account: stored,
            profile: stored_profile,
        })
    }

    async fn account_by_email(&self, email: &str) -> Result<Option<Account>, CoreError> {
        let account =
            sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE email = $1")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(account)
    }

    async fn account_by_id(&self, id: Uuid) -> Result<Option<Account>, CoreError> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM accounts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }

    async fn set_account_active(&self, id: Uuid, active: bool) -> Result<(), CoreError> {
        let result = sqlx::query("UPDATE accounts SET active = $2 WHERE id = $1")
            .bind(id)
            .bind(active)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound);
        }
        Ok(())
    }

    async fn donor_profile(&self, account_id: Uuid) -> Result<Option<DonorProfile>, CoreError> {
        let profile = sqlx::query_as::<_, DonorProfile>(
            "SELECT * FROM donor_profiles WHERE account_id = $1",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    async fn patient_profile(
        &self,
        account_id: Uuid,
    ) -> Result<Option<PatientProfile>, CoreError> {
        let profile = sqlx::query_as::<_, PatientProfile>(
            "SELECT * FROM patient_profiles WHERE account_id = $1",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    async fn driver_profile(&self, account_id: Uuid) -> Result<Option<DriverProfile>, CoreError> {
        let profile = sqlx::query_as::<_, DriverProfile>(
            "SELECT * FROM driver_profiles WHERE account_id = $1",
        )
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    async fn set_donor_availability(
        &self,
        account_id: Uuid,
        is_available: bool,
    ) -> Result<(), CoreError> {
        let result =
            sqlx::query("UPDATE donor_profiles SET is_available = $2 WHERE account_id = $1")
                .bind(account_id)
                .bind(is_available)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound);
        }
        Ok(())
    }

    async fn set_driver_availability(
        &self,
        account_id: Uuid,
        is_available: bool,
    ) -> Result<(), CoreError> {
        let result =
            sqlx::query("UPDATE driver_profiles SET is_available = $2 WHERE account_id = $1")
                .bind(account_id)
                .bind(is_available)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound);
        }
        Ok(())
    }

    async fn set_driver_location(
        &self,
        account_id: Uuid,
        location: Point,
    ) -> Result<(), CoreError> {
        let result = sqlx::query(
            "UPDATE driver_profiles SET longitude = $2, latitude = $3 WHERE account_id = $1",
        )
        .bind(account_id)
        .bind(location.longitude)
        .bind(location.latitude)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::NotFound);
        }
        Ok(())
    }

    async fn available_drivers_near(
        &self,
        origin: Point,
        radius_m: f64,
    ) -> Result<Vec<(DriverProfile, f64)>, CoreError> {
        let rows = sqlx::query_as::<_, DriverRow>(
            r#"
            SELECT * FROM (
                SELECT *,
                    2 * 6371000 * asin(least(1.0, sqrt(
                        power(sin(radians(latitude - $2) / 2), 2) +
                        cos(radians($2)) * cos(radians(latitude)) *
                        power(sin(radians(longitude - $1) / 2), 2)
                    ))) AS distance_m
                FROM driver_profiles
                WHERE is_available
            ) AS candidates
            WHERE distance_m <= $3
            ORDER BY distance_m ASC
            "#,
        )
        .bind(origin.longitude)
        .bind(origin.latitude)
        .bind(radius_m)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| (r.profile, r.distance_m)).collect())
    }
}

#[async_trait]
impl RequestStore for PgStore {
    async fn insert_blood_request(
        &self,
        request: NewBloodRequest,
    ) -> Result<BloodRequest, CoreError> {
        let stored = sqlx::query_as::<_, BloodRequest>(
            r#"
            INSERT INTO blood_requests
                (patient_id, blood_group, units_required, urgency,
                 longitude, latitude, hospital)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(request.patient_id)
        .bind(request.blood_group)
        .bind(request.units_required)
        .bind(request.urgency)
        .bind(request.location.longitude)
        .bind(request.location.latitude)
        .bind(&request.hospital)
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }

    async fn blood_request(&self, id: Uuid) -> Result<Option<BloodRequest>, CoreError> {
        let request =
            sqlx::query_as::<_, BloodRequest>("SELECT * FROM blood_requests WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(request)
    }

    async fn pending_blood_requests_near(
        &self,
        origin: Point,
        radius_m: f64,
        blood_group: BloodGroup,
    ) -> Result<Vec<(BloodRequest, f64)>, CoreError> {
        let rows = sqlx::query_as::<_, BloodRequestRow>(
            r#"
            SELECT * FROM (
                SELECT *,
                    2 * 6371000 * asin(least(1.0, sqrt(
                        power(sin(radians(latitude - $2) / 2), 2) +
                        cos(radians($2)) * cos(radians(latitude)) *
                        power(sin(radians(longitude - $1) / 2), 2)
                    ))) AS distance_m
                FROM blood_requests
                WHERE status = 'pending' AND blood_group = $3
            ) AS candidates
            WHERE distance_m <= $4
            ORDER BY distance_m ASC
            "#,
        )
        .bind(origin.longitude)
        .bind(origin.latitude)
        .bind(blood_group)
        .bind(radius_m)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| (r.request, r.distance_m)).collect())
    }

    async fn accept_blood_request(
        &self,
        id: Uuid,
        donor_id: Uuid,
    ) -> Result<Option<BloodRequest>, CoreError> {
        // The concurrency guarantee: one conditional UPDATE, zero rows
        // means another donor won.
        let updated = sqlx::query_as::<_, BloodRequest>(
            r#"
            UPDATE blood_requests
            SET status = $3, donor_id = $2
            WHERE id = $1 AND status = $4
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(donor_id)
        .bind(BloodRequestStatus::Accepted)
        .bind(BloodRequestStatus::Pending)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn fulfill_blood_request(
        &self,
        id: Uuid,
        patient_id: Uuid,
    ) -> Result<Option<BloodRequest>, CoreError> {
        let updated = sqlx::query_as::<_, BloodRequest>(
            r#"
            UPDATE blood_requests
            SET status = $3
            WHERE id = $1 AND patient_id = $2 AND status = $4
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patient_id)
        .bind(BloodRequestStatus::Fulfilled)
        .bind(BloodRequestStatus::Accepted)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn cancel_blood_request(
        &self,
        id: Uuid,
        patient_id: Uuid,
    ) -> Result<Option<BloodRequest>, CoreError> {
        let updated = sqlx::query_as::<_, BloodRequest>(
            r#"
            UPDATE blood_requests
            SET status = $3
            WHERE id = $1 AND patient_id = $2 AND status = $4
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patient_id)
        .bind(BloodRequestStatus::Cancelled)
        .bind(BloodRequestStatus::Pending)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn blood_requests_for_patient(
        &self,
        patient_id: Uuid,
    ) -> Result<Vec<BloodRequest>, CoreError> {
        let requests = sqlx::query_as::<_, BloodRequest>(
            "SELECT * FROM blood_requests WHERE patient_id = $1 ORDER BY created_at",
        )
        .bind(patient_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    async fn blood_requests_for_donor(
        &self,
        donor_id: Uuid,
    ) -> Result<Vec<BloodRequest>, CoreError> {
        let requests = sqlx::query_as::<_, BloodRequest>(
            "SELECT * FROM blood_requests WHERE donor_id = $1 ORDER BY created_at",
        )
        .bind(donor_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    async fn insert_ambulance_request(
        &self,
        request: NewAmbulanceRequest,
    ) -> Result<AmbulanceRequest, CoreError> {
        let stored = sqlx::query_as::<_, AmbulanceRequest>(
            r#"
            INSERT INTO ambulance_requests
                (patient_id, pickup_longitude, pickup_latitude, pickup_address,
                 destination_longitude, destination_latitude, destination_address)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(request.patient_id)
        .bind(request.pickup.location.longitude)
        .bind(request.pickup.location.latitude)
        .bind(&request.pickup.address)
        .bind(request.destination.location.longitude)
        .bind(request.destination.location.latitude)
        .bind(&request.destination.address)
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }

    async fn ambulance_request(&self, id: Uuid) -> Result<Option<AmbulanceRequest>, CoreError> {
        let request = sqlx::query_as::<_, AmbulanceRequest>(
            "SELECT * FROM ambulance_requests WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(request)
    }

    async fn assign_driver(
        &self,
        id: Uuid,
        driver_id: Uuid,
        estimated_minutes: Option<i32>,
    ) -> Result<Option<AmbulanceRequest>, CoreError> {
        let updated = sqlx::query_as::<_, AmbulanceRequest>(
            r#"
            UPDATE ambulance_requests
            SET status = $3, driver_id = $2, assigned_at = now(),
                estimated_minutes = $4
            WHERE id = $1 AND status = $5
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(driver_id)
        .bind(TripStatus::Assigned)
        .bind(estimated_minutes)
        .bind(TripStatus::Pending)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn transition_trip(
        &self,
        id: Uuid,
        driver_id: Uuid,
        from: TripStatus,
        to: TripStatus,
    ) -> Result<Option<AmbulanceRequest>, CoreError> {
        let updated = sqlx::query_as::<_, AmbulanceRequest>(
            r#"
            UPDATE ambulance_requests
            SET status = $4,
                completed_at = CASE WHEN $4 = 'completed'::trip_status
                    THEN now() ELSE completed_at END,
                actual_minutes = CASE WHEN $4 = 'completed'::trip_status
                    THEN ceil(extract(epoch FROM (now() - assigned_at)) / 60.0)::int
                    ELSE actual_minutes END
            WHERE id = $1 AND driver_id = $2 AND status = $3
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(driver_id)
        .bind(from)
        .bind(to)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn cancel_ambulance_request(
        &self,
        id: Uuid,
        patient_id: Uuid,
    ) -> Result<Option<AmbulanceRequest>, CoreError> {
        let updated = sqlx::query_as::<_, AmbulanceRequest>(
            r#"
            UPDATE ambulance_requests
            SET status = $3, driver_id = NULL
            WHERE id = $1 AND patient_id = $2 AND status IN ($4, $5)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(patient_id)
        .bind(TripStatus::Cancelled)
        .bind(TripStatus::Pending)
        .bind(TripStatus::Assigned)
        .fetch_optional(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn append_location_update(
        &self,
        id: Uuid,
        driver_id: Uuid,
        location: Point,
    ) -> Result<bool, CoreError> {
        // Guarded insert: the WHERE clause drops the row when the trip
        // is not in progress or belongs to another driver.
        let result = sqlx::query(
            r#"
            INSERT INTO ambulance_location_updates (request_id, longitude, latitude)
            SELECT id, $3, $4 FROM ambulance_requests
            WHERE id = $1 AND driver_id = $2 AND status = $5
            "#,
        )
        .bind(id)
        .bind(driver_id)
        .bind(location.longitude)
        .bind(location.latitude)
        .bind(TripStatus::InProgress)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn location_updates(&self, id: Uuid) -> Result<Vec<LocationUpdate>, CoreError> {
        let updates = sqlx::query_as::<_, LocationUpdate>(
            "SELECT request_id, longitude, latitude, recorded_at
             FROM ambulance_location_updates
             WHERE request_id = $1 ORDER BY recorded_at",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;
        Ok(updates)
    }

    async fn ambulance_requests_for_patient(
        &self,
        patient_id: Uuid,
    ) -> Result<Vec<AmbulanceRequest>, CoreError> {
        let requests = sqlx::query_as::<_, AmbulanceRequest>(
            "SELECT * FROM ambulance_requests WHERE patient_id = $1 ORDER BY requested_at",
        )
        .bind(patient_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    async fn trips_for_driver(
        &self,
        driver_id: Uuid,
    ) -> Result<Vec<AmbulanceRequest>, CoreError> {
        let requests = sqlx::query_as::<_, AmbulanceRequest>(
            "SELECT * FROM ambulance_requests WHERE driver_id = $1 ORDER BY requested_at",
        )
        .bind(driver_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }

    async fn ambulance_requests_by_status(
        &self,
        status: Option<TripStatus>,
    ) -> Result<Vec<AmbulanceRequest>, CoreError> {
        let requests = sqlx::query_as::<_, AmbulanceRequest>(
            r#"
            SELECT * FROM ambulance_requests
            WHERE $1::trip_status IS NULL OR status = $1
            ORDER BY requested_at
            "#,
        )
        .bind(status)
        .fetch_all(&self.pool)
        .await?;
        Ok(requests)
    }
}
