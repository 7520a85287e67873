use std::sync::Arc;

use async_trait::async_trait;
use common::RecordId;
use domain::{Enrollment, NewEnrollment, NewPerson, NewProfile, Person, PersonKind, Profile};

use crate::Result;

/// Core trait for record store implementations.
///
/// Each method maps to one insert/select/delete against a single table with
/// equality filters. Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Looks up a person by their unique code within a kind.
    async fn find_person_by_code(&self, kind: PersonKind, code: &str) -> Result<Option<Person>>;

    /// Loads a person by primary key.
    async fn get_person(&self, kind: PersonKind, id: RecordId) -> Result<Option<Person>>;

    /// Inserts a person record.
    ///
    /// Fails with `UniqueViolation` if the code is already taken for the kind.
    async fn insert_person(&self, person: NewPerson) -> Result<Person>;

    /// Deletes a person record, returning the number of rows removed.
    ///
    /// Fails with `ForeignKeyViolation` while enrollments still reference a student.
    async fn delete_person(&self, kind: PersonKind, id: RecordId) -> Result<u64>;

    async fn insert_profile(&self, profile: NewProfile) -> Result<Profile>;

    async fn profiles_for_person(&self, person_id: RecordId) -> Result<Vec<Profile>>;

    /// Deletes a single profile by primary key.
    async fn delete_profile(&self, id: RecordId) -> Result<u64>;

    /// Deletes every profile bound to a person.
    async fn delete_profiles_for_person(&self, person_id: RecordId) -> Result<u64>;

    async fn insert_enrollment(&self, enrollment: NewEnrollment) -> Result<Enrollment>;

    async fn enrollments_for_student(&self, student_id: RecordId) -> Result<Vec<Enrollment>>;

    /// Deletes a single enrollment by primary key.
    async fn delete_enrollment(&self, id: RecordId) -> Result<u64>;

    /// Deletes every enrollment of a student.
    async fn delete_enrollments_for_student(&self, student_id: RecordId) -> Result<u64>;
}

#[async_trait]
impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
    async fn find_person_by_code(&self, kind: PersonKind, code: &str) -> Result<Option<Person>> {
        (**self).find_person_by_code(kind, code).await
    }

    async fn get_person(&self, kind: PersonKind, id: RecordId) -> Result<Option<Person>> {
        (**self).get_person(kind, id).await
    }

    async fn insert_person(&self, person: NewPerson) -> Result<Person> {
        (**self).insert_person(person).await
    }

    async fn delete_person(&self, kind: PersonKind, id: RecordId) -> Result<u64> {
        (**self).delete_person(kind, id).await
    }

    async fn insert_profile(&self, profile: NewProfile) -> Result<Profile> {
        (**self).insert_profile(profile).await
    }

    async fn profiles_for_person(&self, person_id: RecordId) -> Result<Vec<Profile>> {
        (**self).profiles_for_person(person_id).await
    }

    async fn delete_profile(&self, id: RecordId) -> Result<u64> {
        (**self).delete_profile(id).await
    }

    async fn delete_profiles_for_person(&self, person_id: RecordId) -> Result<u64> {
        (**self).delete_profiles_for_person(person_id).await
    }

    async fn insert_enrollment(&self, enrollment: NewEnrollment) -> Result<Enrollment> {
        (**self).insert_enrollment(enrollment).await
    }

    async fn enrollments_for_student(&self, student_id: RecordId) -> Result<Vec<Enrollment>> {
        (**self).enrollments_for_student(student_id).await
    }

    async fn delete_enrollment(&self, id: RecordId) -> Result<u64> {
        (**self).delete_enrollment(id).await
    }

    async fn delete_enrollments_for_student(&self, student_id: RecordId) -> Result<u64> {
        (**self).delete_enrollments_for_student(student_id).await
    }
}

/// Table holding the given kind of person.
pub(crate) fn person_table(kind: PersonKind) -> &'static str {
    match kind {
        PersonKind::Student => "students",
        PersonKind::Teacher => "teachers",
    }
}
