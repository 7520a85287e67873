use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::RecordId;
use domain::{Enrollment, NewEnrollment, NewPerson, NewProfile, Person, PersonKind, Profile};
use tokio::sync::RwLock;

use crate::store::{RecordStore, person_table};
use crate::{Result, StoreError};

/// Store operations that can be made to fail on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    FindPerson,
    InsertPerson,
    DeletePerson,
    InsertProfile,
    DeleteProfile,
    InsertEnrollment,
    DeleteEnrollment,
}

#[derive(Debug, Default)]
struct Tables {
    persons: HashMap<RecordId, Person>,
    profiles: HashMap<RecordId, Profile>,
    enrollments: HashMap<RecordId, Enrollment>,
    failing: HashSet<StoreOperation>,
}

impl Tables {
    fn check(&self, op: StoreOperation) -> Result<()> {
        if self.failing.contains(&op) {
            return Err(StoreError::Unavailable(format!("{op:?} rejected by store")));
        }
        Ok(())
    }
}

/// In-memory record store for tests and local runs.
///
/// Emulates the constraints of the Postgres schema: codes are unique per
/// person kind and a student cannot be deleted while enrollments reference it.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryRecordStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the store to fail every call of the given operation.
    pub async fn set_fail_on(&self, op: StoreOperation, fail: bool) {
        let mut tables = self.tables.write().await;
        if fail {
            tables.failing.insert(op);
        } else {
            tables.failing.remove(&op);
        }
    }

    /// Returns the number of person rows of the given kind.
    pub async fn person_count(&self, kind: PersonKind) -> usize {
        self.tables
            .read()
            .await
            .persons
            .values()
            .filter(|p| p.kind() == kind)
            .count()
    }

    pub async fn profile_count(&self) -> usize {
        self.tables.read().await.profiles.len()
    }

    pub async fn enrollment_count(&self) -> usize {
        self.tables.read().await.enrollments.len()
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn find_person_by_code(&self, kind: PersonKind, code: &str) -> Result<Option<Person>> {
        let tables = self.tables.read().await;
        tables.check(StoreOperation::FindPerson)?;
        Ok(tables
            .persons
            .values()
            .find(|p| p.kind() == kind && p.code == code)
            .cloned())
    }

    async fn get_person(&self, kind: PersonKind, id: RecordId) -> Result<Option<Person>> {
        let tables = self.tables.read().await;
        Ok(tables
            .persons
            .get(&id)
            .filter(|p| p.kind() == kind)
            .cloned())
    }

    async fn insert_person(&self, person: NewPerson) -> Result<Person> {
        let mut tables = self.tables.write().await;
        tables.check(StoreOperation::InsertPerson)?;

        let kind = person.kind();
        if tables
            .persons
            .values()
            .any(|p| p.kind() == kind && p.code == person.code)
        {
            let table = person_table(kind);
            return Err(StoreError::UniqueViolation {
                table,
                constraint: format!("{table}_code_key"),
            });
        }

        let row = Person::from_new(RecordId::new(), person, Utc::now());
        tables.persons.insert(row.id, row.clone());
        Ok(row)
    }

    async fn delete_person(&self, kind: PersonKind, id: RecordId) -> Result<u64> {
        let mut tables = self.tables.write().await;
        tables.check(StoreOperation::DeletePerson)?;

        if !tables.persons.get(&id).is_some_and(|p| p.kind() == kind) {
            return Ok(0);
        }
        if tables.enrollments.values().any(|e| e.student_id == id) {
            return Err(StoreError::ForeignKeyViolation {
                table: person_table(kind),
                detail: format!("enrollments still reference {id}"),
            });
        }
        tables.persons.remove(&id);
        Ok(1)
    }

    async fn insert_profile(&self, profile: NewProfile) -> Result<Profile> {
        let mut tables = self.tables.write().await;
        tables.check(StoreOperation::InsertProfile)?;

        let row = Profile {
            id: RecordId::new(),
            role: profile.role,
            person_id: profile.person_id,
            user_id: profile.user_id,
            created_at: Utc::now(),
        };
        tables.profiles.insert(row.id, row.clone());
        Ok(row)
    }

    async fn profiles_for_person(&self, person_id: RecordId) -> Result<Vec<Profile>> {
        let tables = self.tables.read().await;
        Ok(tables
            .profiles
            .values()
            .filter(|p| p.person_id == person_id)
            .cloned()
            .collect())
    }

    async fn delete_profile(&self, id: RecordId) -> Result<u64> {
        let mut tables = self.tables.write().await;
        tables.check(StoreOperation::DeleteProfile)?;
        Ok(u64::from(tables.profiles.remove(&id).is_some()))
    }

    async fn delete_profiles_for_person(&self, person_id: RecordId) -> Result<u64> {
        let mut tables = self.tables.write().await;
        tables.check(StoreOperation::DeleteProfile)?;
        let before = tables.profiles.len();
        tables.profiles.retain(|_, p| p.person_id != person_id);
        Ok((before - tables.profiles.len()) as u64)
    }

    async fn insert_enrollment(&self, enrollment: NewEnrollment) -> Result<Enrollment> {
        let mut tables = self.tables.write().await;
        tables.check(StoreOperation::InsertEnrollment)?;

        let student_exists = tables
            .persons
            .get(&enrollment.student_id)
            .is_some_and(|p| p.kind() == PersonKind::Student);
        if !student_exists {
            return Err(StoreError::ForeignKeyViolation {
                table: "enrollments",
                detail: format!("student {} does not exist", enrollment.student_id),
            });
        }

        let row = Enrollment {
            id: RecordId::new(),
            student_id: enrollment.student_id,
            class_id: enrollment.class_id,
            created_at: Utc::now(),
        };
        tables.enrollments.insert(row.id, row.clone());
        Ok(row)
    }

    async fn enrollments_for_student(&self, student_id: RecordId) -> Result<Vec<Enrollment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .enrollments
            .values()
            .filter(|e| e.student_id == student_id)
            .cloned()
            .collect())
    }

    async fn delete_enrollment(&self, id: RecordId) -> Result<u64> {
        let mut tables = self.tables.write().await;
        tables.check(StoreOperation::DeleteEnrollment)?;
        Ok(u64::from(tables.enrollments.remove(&id).is_some()))
    }

    async fn delete_enrollments_for_student(&self, student_id: RecordId) -> Result<u64> {
        let mut tables = self.tables.write().await;
        tables.check(StoreOperation::DeleteEnrollment)?;
        let before = tables.enrollments.len();
        tables.enrollments.retain(|_, e| e.student_id != student_id);
        Ok((before - tables.enrollments.len()) as u64)
    }
}
