//! The error taxonomy shared by the stores, the matching engine, and the
//! request lifecycle.
//!
//! Every operation returns a typed [`CoreError`]; the server maps each
//! variant to an HTTP status and a stable machine-readable code. A
//! failed conditional state transition is reported as [`NotFound`] so a
//! losing racer learns nothing about the winner.
//!
//! [`NotFound`]: CoreError::NotFound

use crate::entities::TripStatus;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Malformed or missing input, with field-level detail.
    #[error("validation failed on {field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },

    /// A unique field (email, license, vehicle registration) is taken.
    #[error("conflict on {0}")]
    Conflict(&'static str),

    /// No such entity, or a conditional transition precondition was not
    /// met.
    #[error("not found")]
    NotFound,

    /// An illegal ambulance status change was attempted.
    #[error("illegal transition from {from} to {to}")]
    InvalidTransition { from: TripStatus, to: TripStatus },

    /// Unknown email or secret mismatch.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The account exists but has been deactivated.
    #[error("account deactivated")]
    AccountDeactivated,

    /// No identity attached to the request.
    #[error("unauthenticated")]
    Unauthenticated,

    /// Valid identity, wrong role.
    #[error("forbidden")]
    Forbidden,

    /// A guard or service was constructed with malformed parameters.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(&'static str),

    /// Secret hashing failed; the cause is deliberately not carried.
    #[error("secret hashing failed")]
    Hash,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl CoreError {
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }
}
