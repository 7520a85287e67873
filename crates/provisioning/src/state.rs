//! Provisioning state machine.

use serde::{Deserialize, Serialize};

/// The state of a single provisioning request.
///
/// State transitions:
/// ```text
/// Pending ──► Validating ──► CreatingIdentity ──► CreatingPerson ──► CreatingProfile ──┬──► Committed
///                                                                                      └──► CreatingEnrollment ──► Committed
///
/// any non-terminal state ──► Compensating ──► Failed
/// any non-terminal state ──► Failed            (nothing to undo)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum ProvisionState {
    /// Request received, nothing checked yet.
    #[default]
    Pending,

    /// Deriving the login email and checking the code is free.
    Validating,

    CreatingIdentity,

    CreatingPerson,

    CreatingProfile,

    CreatingEnrollment,

    /// Every record exists (terminal state).
    Committed,

    /// A step failed and created records are being deleted.
    Compensating,

    /// The request failed; no partial state is left behind (terminal state).
    Failed,
}

impl ProvisionState {
    /// Returns true if `next` is a legal successor of this state.
    pub fn can_transition_to(&self, next: ProvisionState) -> bool {
        use ProvisionState::*;

        match (self, next) {
            (Pending, Validating)
            | (Validating, CreatingIdentity)
            | (CreatingIdentity, CreatingPerson)
            | (CreatingPerson, CreatingProfile)
            | (CreatingProfile, CreatingEnrollment)
            | (CreatingProfile, Committed)
            | (CreatingEnrollment, Committed)
            | (Compensating, Failed) => true,
            (from, Compensating | Failed) => !from.is_terminal() && *from != Compensating,
            _ => false,
        }
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProvisionState::Committed | ProvisionState::Failed)
    }

    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvisionState::Pending => "Pending",
            ProvisionState::Validating => "Validating",
            ProvisionState::CreatingIdentity => "CreatingIdentity",
            ProvisionState::CreatingPerson => "CreatingPerson",
            ProvisionState::CreatingProfile => "CreatingProfile",
            ProvisionState::CreatingEnrollment => "CreatingEnrollment",
            ProvisionState::Committed => "Committed",
            ProvisionState::Compensating => "Compensating",
            ProvisionState::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for ProvisionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
