//! Registration and authentication over a [`CredentialStore`].

use compact_str::CompactString;
use lifeline_sdk::objects::auth::RegisterRequest;

use crate::entities::account::{Account, NewAccount};
use crate::entities::profiles::NewProfile;
use crate::entities::Role;
use crate::error::CoreError;
use crate::geo::validate_point;
use crate::secrets::{hash_secret, verify_secret};
use crate::store::{CredentialStore, RegisteredAccount};

const MIN_SECRET_LEN: usize = 8;

/// Register an account with its role-specific profile.
///
/// Validation is field-level: the first missing or malformed field is
/// reported by name. The store creates the account and profile
/// atomically, so a profile conflict (duplicate license, registration)
/// leaves no account behind.
pub async fn register<S: CredentialStore + ?Sized>(
    store: &S,
    request: RegisterRequest,
) -> Result<RegisteredAccount, CoreError> {
    let email = normalize_email(&request.email)?;
    if request.secret.len() < MIN_SECRET_LEN {
        return Err(CoreError::validation(
            "secret",
            format!("must be at least {MIN_SECRET_LEN} characters"),
        ));
    }
    let phone = request.phone.trim();
    if phone.is_empty() {
        return Err(CoreError::validation("phone", "must not be empty"));
    }

    let role = Role::from(request.role);
    let profile = profile_fields(role, &request)?;
    let account = NewAccount {
        email,
        secret_hash: hash_secret(&request.secret)?,
        role,
        phone: CompactString::from(phone),
    };
    store.create_account(account, profile).await
}

/// Authenticate by email and secret.
///
/// Unknown email and hash mismatch are indistinguishable to the caller;
/// a deactivated account is only reported after the secret verified.
pub async fn authenticate<S: CredentialStore + ?Sized>(
    store: &S,
    email: &str,
    secret: &str,
) -> Result<Account, CoreError> {
    let email = normalize_email(email)?;
    let account = store
        .account_by_email(&email)
        .await?
        .ok_or(CoreError::InvalidCredentials)?;
    if !verify_secret(secret, &account.secret_hash) {
        return Err(CoreError::InvalidCredentials);
    }
    if !account.active {
        return Err(CoreError::AccountDeactivated);
    }
    Ok(account)
}

fn normalize_email(raw: &str) -> Result<CompactString, CoreError> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(CoreError::validation("email", "must be a valid address"));
    }
    Ok(CompactString::from(email))
}

fn required<T>(field: &'static str, value: Option<T>) -> Result<T, CoreError> {
    value.ok_or(CoreError::validation(field, "required for this role"))
}

fn required_name(value: &Option<String>) -> Result<String, CoreError> {
    let name = required("name", value.as_deref())?.trim().to_owned();
    if name.is_empty() {
        return Err(CoreError::validation("name", "must not be empty"));
    }
    Ok(name)
}

fn required_age(value: Option<i16>) -> Result<i16, CoreError> {
    let age = required("age", value)?;
    if !(1..=120).contains(&age) {
        return Err(CoreError::validation("age", "must be between 1 and 120"));
    }
    Ok(age)
}

/// Collect and validate the role-specific profile fields.
fn profile_fields(
    role: Role,
    request: &RegisterRequest,
) -> Result<Option<NewProfile>, CoreError> {
    match role {
        Role::Admin => Ok(None),
        Role::Donor => {
            let name = required_name(&request.name)?;
            let age = required_age(request.age)?;
            let blood_group = required("blood_group", request.blood_group)?;
            let location = required("location", request.location)?;
            validate_point("location", location)?;
            Ok(Some(NewProfile::Donor {
                name,
                age,
                blood_group: blood_group.into(),
                location,
            }))
        }
        Role::Patient => {
            let name = required_name(&request.name)?;
            let age = required_age(request.age)?;
            let blood_group = required("blood_group", request.blood_group)?;
            Ok(Some(NewProfile::Patient {
                name,
                age,
                blood_group: blood_group.into(),
            }))
        }
        Role::Driver => {
            let name = required_name(&request.name)?;
            let license_number = required("license_number", request.license_number.as_deref())?;
            let vehicle_type = required("vehicle_type", request.vehicle_type)?;
            let vehicle_registration =
                required("vehicle_registration", request.vehicle_registration.as_deref())?;
            let location = required("location", request.location)?;
            validate_point("location", location)?;
            if license_number.trim().is_empty() {
                return Err(CoreError::validation("license_number", "must not be empty"));
            }
            if vehicle_registration.trim().is_empty() {
                return Err(CoreError::validation(
                    "vehicle_registration",
                    "must not be empty",
                ));
            }
            Ok(Some(NewProfile::Driver {
                name,
                license_number: CompactString::from(license_number.trim()),
                vehicle_type: vehicle_type.into(),
                vehicle_registration: CompactString::from(vehicle_registration.trim()),
                vehicle_capacity: request.vehicle_capacity,
                location,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::store::memory::MemoryStore;
    use lifeline_sdk::objects::auth::{
        BloodGroup as SdkBloodGroup, Role as SdkRole, VehicleType as SdkVehicleType,
    };
    use lifeline_sdk::objects::Point;

    fn donor_request(email: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            secret: "a-strong-secret".into(),
            phone: "+977-980-000000".into(),
            role: SdkRole::Donor,
            name: Some("Asha".into()),
            age: Some(29),
            blood_group: Some(SdkBloodGroup::OPositive),
            location: Some(Point::new(87.28, 26.81)),
            license_number: None,
            vehicle_type: None,
            vehicle_registration: None,
            vehicle_capacity: None,
        }
    }

    fn driver_request(email: &str, license: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.into(),
            secret: "a-strong-secret".into(),
            phone: "+977-980-111111".into(),
            role: SdkRole::Driver,
            name: Some("Bikram".into()),
            age: None,
            blood_group: None,
            location: Some(Point::new(87.27, 26.80)),
            license_number: Some(license.into()),
            vehicle_type: Some(SdkVehicleType::Basic),
            vehicle_registration: Some(format!("BA-{license}")),
            vehicle_capacity: Some(2),
        }
    }

    #[tokio::test]
    async fn register_then_authenticate() {
        let store = MemoryStore::new();
        let registered = register(&store, donor_request("asha@example.com"))
            .await
            .unwrap();
        assert_eq!(registered.account.role, Role::Donor);
        assert!(registered.profile.is_some());

        let account = authenticate(&store, "Asha@Example.com", "a-strong-secret")
            .await
            .unwrap();
        assert_eq!(account.id, registered.account.id);
    }

    #[tokio::test]
    async fn wrong_secret_is_invalid_credentials() {
        let store = MemoryStore::new();
        register(&store, donor_request("asha@example.com"))
            .await
            .unwrap();
        assert!(matches!(
            authenticate(&store, "asha@example.com", "guessed-wrong").await,
            Err(CoreError::InvalidCredentials)
        ));
        assert!(matches!(
            authenticate(&store, "nobody@example.com", "a-strong-secret").await,
            Err(CoreError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn deactivated_account_is_rejected_after_secret_check() {
        use crate::store::CredentialStore;

        let store = MemoryStore::new();
        let registered = register(&store, donor_request("asha@example.com"))
            .await
            .unwrap();
        store
            .set_account_active(registered.account.id, false)
            .await
            .unwrap();
        assert!(matches!(
            authenticate(&store, "asha@example.com", "a-strong-secret").await,
            Err(CoreError::AccountDeactivated)
        ));
        // The secret is still checked first.
        assert!(matches!(
            authenticate(&store, "asha@example.com", "guessed-wrong").await,
            Err(CoreError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn missing_role_fields_are_field_level_errors() {
        let store = MemoryStore::new();

        let mut no_group = donor_request("a@example.com");
        no_group.blood_group = None;
        assert!(matches!(
            register(&store, no_group).await,
            Err(CoreError::Validation { field: "blood_group", .. })
        ));

        let mut no_vehicle = driver_request("b@example.com", "L-1");
        no_vehicle.vehicle_type = None;
        assert!(matches!(
            register(&store, no_vehicle).await,
            Err(CoreError::Validation { field: "vehicle_type", .. })
        ));
    }

    #[tokio::test]
    async fn duplicate_email_is_a_conflict() {
        let store = MemoryStore::new();
        register(&store, donor_request("asha@example.com"))
            .await
            .unwrap();
        assert!(matches!(
            register(&store, donor_request("asha@example.com")).await,
            Err(CoreError::Conflict("email"))
        ));
    }

    #[tokio::test]
    async fn duplicate_license_rolls_back_the_account() {
        use crate::store::CredentialStore;

        let store = MemoryStore::new();
        register(&store, driver_request("first@example.com", "LIC-42"))
            .await
            .unwrap();

        let result = register(&store, driver_request("second@example.com", "LIC-42")).await;
        assert!(matches!(result, Err(CoreError::Conflict("license_number"))));

        // No partial account row survives the failed registration.
        assert!(store
            .account_by_email("second@example.com")
            .await
            .unwrap()
            .is_none());
    }
}
