//! Reverse-order cleanup list for partially provisioned users.

use common::{IdentityId, RecordId};
use domain::PersonKind;

/// Undo action for one record created by the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compensation {
    DeleteIdentity(IdentityId),
    DeletePerson(PersonKind, RecordId),
    DeleteProfile(RecordId),
    DeleteEnrollment(RecordId),
}

impl Compensation {
    /// Short label used in warnings, logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Compensation::DeleteIdentity(_) => "delete_identity",
            Compensation::DeletePerson(..) => "delete_person",
            Compensation::DeleteProfile(_) => "delete_profile",
            Compensation::DeleteEnrollment(_) => "delete_enrollment",
        }
    }
}

impl std::fmt::Display for Compensation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Compensation::DeleteIdentity(id) => write!(f, "delete identity {id}"),
            Compensation::DeletePerson(kind, id) => write!(f, "delete {kind} {id}"),
            Compensation::DeleteProfile(id) => write!(f, "delete profile {id}"),
            Compensation::DeleteEnrollment(id) => write!(f, "delete enrollment {id}"),
        }
    }
}

/// Records created during one request, in creation order.
#[derive(Debug, Clone, Default)]
pub struct CompensationLog {
    steps: Vec<Compensation>,
}

impl CompensationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the undo action for a record that now exists.
    pub fn push(&mut self, step: Compensation) {
        self.steps.push(step);
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Removes and returns the undo actions, most recent first.
    pub fn drain_reverse(&mut self) -> Vec<Compensation> {
        let mut steps = std::mem::take(&mut self.steps);
        steps.reverse();
        steps
    }
}
