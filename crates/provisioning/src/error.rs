//! Provisioning error types.

use common::IdentityId;
use domain::{DomainError, PersonKind};
use record_store::StoreError;
use thiserror::Error;

use crate::state::ProvisionState;

/// Message returned when a student email is already registered.
pub const EMAIL_TAKEN_MESSAGE: &str = "A user with this email address has already been registered";

/// Errors raised by an identity service adapter.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// An identity with this email already exists.
    #[error("Email already registered: {0}")]
    EmailTaken(String),

    #[error("Identity not found: {0}")]
    NotFound(IdentityId),

    /// The service answered with an error status.
    #[error("Identity service rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Identity service unavailable: {0}")]
    Unavailable(String),

    /// The service answered 2xx with a body we could not read.
    #[error("Malformed identity service response: {0}")]
    Malformed(String),

    #[error("Invalid identity service URL: {0}")]
    InvalidUrl(String),

    /// Transport-level failure.
    #[error("Identity service request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors that can occur while provisioning or deprovisioning a user.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Required input missing or malformed. Raised before any mutation.
    #[error(transparent)]
    Validation(#[from] DomainError),

    /// The code or email is already taken.
    #[error("{0}")]
    Conflict(String),

    /// The record store failed.
    #[error("{0}")]
    Store(#[from] StoreError),

    /// The identity service failed.
    #[error("{0}")]
    Identity(#[from] IdentityError),

    #[error("Invalid provisioning transition from {from} to {to}")]
    InvalidTransition {
        from: ProvisionState,
        to: ProvisionState,
    },
}

impl ProvisionError {
    /// Conflict raised when a person with the same code already exists.
    pub fn duplicate_code(kind: PersonKind) -> Self {
        ProvisionError::Conflict(format!(
            "{} with this {} already exists",
            kind.title(),
            kind.code_label()
        ))
    }

    pub fn email_taken() -> Self {
        ProvisionError::Conflict(EMAIL_TAKEN_MESSAGE.to_string())
    }

    /// True for errors caused by the caller's input rather than a collaborator.
    pub fn is_client_error(&self) -> bool {
        matches!(self, ProvisionError::Validation(_) | ProvisionError::Conflict(_))
    }
}

/// A failed provisioning request.
///
/// Carries the error that stopped the workflow plus any warnings raised while
/// compensating. Warnings never replace the primary error.
#[derive(Debug, Error)]
#[error("{error}")]
pub struct ProvisionFailure {
    pub error: ProvisionError,
    pub warnings: Vec<String>,
}

impl From<ProvisionError> for ProvisionFailure {
    fn from(error: ProvisionError) -> Self {
        Self {
            error,
            warnings: Vec::new(),
        }
    }
}

/// Convenience type alias for provisioning results.
pub type Result<T> = std::result::Result<T, ProvisionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_code_messages() {
        assert_eq!(
            ProvisionError::duplicate_code(PersonKind::Student).to_string(),
            "Student with this registration number already exists"
        );
        assert_eq!(
            ProvisionError::duplicate_code(PersonKind::Teacher).to_string(),
            "Teacher with this teacher code already exists"
        );
    }

    #[test]
    fn test_validation_message_is_passed_through() {
        let err = ProvisionError::from(DomainError::MissingField("reg_no"));
        assert_eq!(err.to_string(), "Missing required field: reg_no");
        assert!(err.is_client_error());
    }

    #[test]
    fn test_upstream_errors_are_not_client_errors() {
        let err = ProvisionError::from(StoreError::Unavailable("down".to_string()));
        assert_eq!(err.to_string(), "Record store unavailable: down");
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_failure_displays_primary_error() {
        let failure = ProvisionFailure {
            error: ProvisionError::email_taken(),
            warnings: vec!["cleanup failed".to_string()],
        };
        assert_eq!(failure.to_string(), EMAIL_TAKEN_MESSAGE);
    }
}
