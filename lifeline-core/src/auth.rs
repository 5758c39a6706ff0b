//! Role authorization.
//!
//! Token signing and verification live in `lifeline_sdk::token`; this
//! module covers what happens after a token is verified: the resolved
//! identity and the role guard that protects each route group.

use uuid::Uuid;

use crate::entities::Role;
use crate::error::CoreError;

/// The identity resolved from a verified bearer token, attached to the
/// request context for downstream handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthIdentity {
    pub account_id: Uuid,
    pub role: Role,
}

/// An allow-list of roles, constructed once per route group.
#[derive(Debug, Clone)]
pub struct RoleGuard {
    allowed: Vec<Role>,
}

impl RoleGuard {
    /// Construction fails on an empty role list; a guard that allows
    /// nothing is a configuration bug, not a runtime condition.
    pub fn new(allowed: &[Role]) -> Result<Self, CoreError> {
        if allowed.is_empty() {
            return Err(CoreError::InvalidConfiguration("empty role list"));
        }
        Ok(Self {
            allowed: allowed.to_vec(),
        })
    }

    /// `Unauthenticated` when no identity is attached, `Forbidden` when
    /// the identity's role is not in the allow-list.
    pub fn check(&self, identity: Option<&AuthIdentity>) -> Result<(), CoreError> {
        let identity = identity.ok_or(CoreError::Unauthenticated)?;
        if self.allowed.contains(&identity.role) {
            Ok(())
        } else {
            Err(CoreError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn identity(role: Role) -> AuthIdentity {
        AuthIdentity {
            account_id: Uuid::new_v4(),
            role,
        }
    }

    #[test]
    fn empty_role_list_is_invalid_configuration() {
        assert!(matches!(
            RoleGuard::new(&[]),
            Err(CoreError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn wrong_role_is_forbidden() {
        let guard = RoleGuard::new(&[Role::Donor]).unwrap();
        assert!(matches!(
            guard.check(Some(&identity(Role::Driver))),
            Err(CoreError::Forbidden)
        ));
        assert!(guard.check(Some(&identity(Role::Donor))).is_ok());
    }

    #[test]
    fn missing_identity_is_unauthenticated() {
        let guard = RoleGuard::new(&[Role::Admin]).unwrap();
        assert!(matches!(
            guard.check(None),
            Err(CoreError::Unauthenticated)
        ));
    }

    #[test]
    fn multiple_roles_allowed() {
        let guard = RoleGuard::new(&[Role::Donor, Role::Admin]).unwrap();
        assert!(guard.check(Some(&identity(Role::Admin))).is_ok());
        assert!(guard.check(Some(&identity(Role::Patient))).is_err());
    }
}
