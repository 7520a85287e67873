//! Results returned by the provisioning workflow.

use common::{IdentityId, RecordId};
use domain::PersonKind;
use serde::Serialize;

/// A successfully provisioned user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProvisionOutcome {
    pub kind: PersonKind,
    pub identity_id: IdentityId,
    pub person_id: RecordId,
    pub profile_id: RecordId,
    pub enrollment_id: Option<RecordId>,
    /// The login email, as given or derived from the code.
    pub email: String,
    /// True when an existing identity was reused instead of created.
    pub reused_identity: bool,
}

/// What a deprovisioning request removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeprovisionReport {
    pub kind: PersonKind,
    pub deleted_persons: u64,
    pub deleted_profiles: u64,
    pub deleted_enrollments: u64,
    pub identity_deleted: bool,
    pub warnings: Vec<String>,
}

impl DeprovisionReport {
    pub fn new(kind: PersonKind) -> Self {
        Self {
            kind,
            deleted_persons: 0,
            deleted_profiles: 0,
            deleted_enrollments: 0,
            identity_deleted: false,
            warnings: Vec::new(),
        }
    }

    pub fn warn(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }
}
