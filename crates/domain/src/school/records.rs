//! Rows held by the record store.

use chrono::{DateTime, NaiveDate, Utc};
use common::{IdentityId, RecordId};
use serde::{Deserialize, Serialize};

use super::value_objects::{PersonKind, Role};

/// Kind-specific columns of a person record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PersonDetails {
    Student {
        date_of_birth: Option<NaiveDate>,
        gender: Option<String>,
        guardian_name: Option<String>,
        guardian_phone: Option<String>,
    },
    Teacher {
        subject: Option<String>,
    },
}

impl PersonDetails {
    pub fn kind(&self) -> PersonKind {
        match self {
            PersonDetails::Student { .. } => PersonKind::Student,
            PersonDetails::Teacher { .. } => PersonKind::Teacher,
        }
    }
}

/// A person record to be inserted. The store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPerson {
    pub user_id: IdentityId,
    pub code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub details: PersonDetails,
}

impl NewPerson {
    pub fn kind(&self) -> PersonKind {
        self.details.kind()
    }
}

/// A stored student or teacher row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: RecordId,
    pub user_id: IdentityId,
    pub code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub details: PersonDetails,
    pub created_at: DateTime<Utc>,
}

impl Person {
    /// Materializes a stored row from its insert form.
    pub fn from_new(id: RecordId, new: NewPerson, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: new.user_id,
            code: new.code,
            first_name: new.first_name,
            last_name: new.last_name,
            email: new.email,
            phone: new.phone,
            details: new.details,
            created_at,
        }
    }

    pub fn kind(&self) -> PersonKind {
        self.details.kind()
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProfile {
    pub role: Role,
    pub person_id: RecordId,
    pub user_id: IdentityId,
}

/// Role binding used for authorization routing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: RecordId,
    pub role: Role,
    pub person_id: RecordId,
    pub user_id: IdentityId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEnrollment {
    pub student_id: RecordId,
    pub class_id: RecordId,
}

/// Links a student to a class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: RecordId,
    pub student_id: RecordId,
    pub class_id: RecordId,
    pub created_at: DateTime<Utc>,
}
