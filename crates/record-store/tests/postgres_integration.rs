//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p record-store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use common::{IdentityId, RecordId};
use domain::{NewEnrollment, NewPerson, NewProfile, PersonDetails, PersonKind, Role};
use record_store::{PostgresRecordStore, RecordStore, StoreError};
use serial_test::serial;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            PostgresRecordStore::new(temp_pool.clone())
                .run_migrations()
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresRecordStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE enrollments, profiles, classes, students, teachers")
        .execute(&pool)
        .await
        .unwrap();

    PostgresRecordStore::new(pool)
}

async fn create_class(store: &PostgresRecordStore, name: &str) -> RecordId {
    let id = RecordId::new();
    sqlx::query("INSERT INTO classes (id, name) VALUES ($1, $2)")
        .bind(id.as_uuid())
        .bind(name)
        .execute(store.pool())
        .await
        .unwrap();
    id
}

fn student(code: &str) -> NewPerson {
    NewPerson {
        user_id: IdentityId::new(),
        code: code.to_string(),
        first_name: "Ada".to_string(),
        last_name: "Lovelace".to_string(),
        email: format!("{}@school.local", code.to_lowercase()),
        phone: Some("0700000000".to_string()),
        details: PersonDetails::Student {
            date_of_birth: chrono::NaiveDate::from_ymd_opt(2011, 4, 2),
            gender: Some("female".to_string()),
            guardian_name: Some("Anne".to_string()),
            guardian_phone: None,
        },
    }
}

fn teacher(code: &str) -> NewPerson {
    NewPerson {
        user_id: IdentityId::new(),
        code: code.to_string(),
        first_name: "Grace".to_string(),
        last_name: "Hopper".to_string(),
        email: format!("{}@school.local", code.to_lowercase()),
        phone: None,
        details: PersonDetails::Teacher {
            subject: Some("Computing".to_string()),
        },
    }
}

#[tokio::test]
#[serial]
async fn insert_and_find_student() {
    let store = get_test_store().await;
    let new = student("S100");

    let inserted = store.insert_person(new.clone()).await.unwrap();
    assert_eq!(inserted.code, "S100");
    assert_eq!(inserted.details, new.details);

    let found = store
        .find_person_by_code(PersonKind::Student, "S100")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, inserted.id);
    assert_eq!(found.user_id, new.user_id);

    let by_id = store
        .get_person(PersonKind::Student, inserted.id)
        .await
        .unwrap();
    assert!(by_id.is_some());
}

#[tokio::test]
#[serial]
async fn insert_and_find_teacher() {
    let store = get_test_store().await;
    let inserted = store.insert_person(teacher("T-1")).await.unwrap();

    let found = store
        .find_person_by_code(PersonKind::Teacher, "T-1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, inserted.id);
    assert_eq!(
        found.details,
        PersonDetails::Teacher {
            subject: Some("Computing".to_string())
        }
    );

    assert!(
        store
            .find_person_by_code(PersonKind::Student, "T-1")
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
#[serial]
async fn duplicate_code_is_unique_violation() {
    let store = get_test_store().await;
    store.insert_person(student("S7")).await.unwrap();

    let err = store.insert_person(student("S7")).await.unwrap_err();
    match err {
        StoreError::UniqueViolation { table, constraint } => {
            assert_eq!(table, "students");
            assert_eq!(constraint, "students_reg_no_key");
        }
        other => panic!("expected unique violation, got {other:?}"),
    }
}

#[tokio::test]
#[serial]
async fn profiles_round_trip_and_delete_counts() {
    let store = get_test_store().await;
    let person = store.insert_person(teacher("T-2")).await.unwrap();

    let profile = store
        .insert_profile(NewProfile {
            role: Role::Teacher,
            person_id: person.id,
            user_id: person.user_id,
        })
        .await
        .unwrap();
    store
        .insert_profile(NewProfile {
            role: Role::Admin,
            person_id: person.id,
            user_id: person.user_id,
        })
        .await
        .unwrap();

    let profiles = store.profiles_for_person(person.id).await.unwrap();
    assert_eq!(profiles.len(), 2);
    assert!(profiles.iter().any(|p| p.role == Role::Admin));

    assert_eq!(store.delete_profile(profile.id).await.unwrap(), 1);
    assert_eq!(store.delete_profiles_for_person(person.id).await.unwrap(), 1);
    assert_eq!(store.delete_profiles_for_person(person.id).await.unwrap(), 0);
}

#[tokio::test]
#[serial]
async fn enrollments_block_student_delete_until_removed() {
    let store = get_test_store().await;
    let person = store.insert_person(student("S8")).await.unwrap();
    let math = create_class(&store, "Math 7").await;
    let art = create_class(&store, "Art 7").await;

    for class_id in [math, art] {
        store
            .insert_enrollment(NewEnrollment {
                student_id: person.id,
                class_id,
            })
            .await
            .unwrap();
    }
    assert_eq!(store.enrollments_for_student(person.id).await.unwrap().len(), 2);

    let err = store
        .delete_person(PersonKind::Student, person.id)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ForeignKeyViolation { .. }));

    assert_eq!(store.delete_enrollments_for_student(person.id).await.unwrap(), 2);
    assert_eq!(
        store.delete_person(PersonKind::Student, person.id).await.unwrap(),
        1
    );
}

#[tokio::test]
#[serial]
async fn enrollment_into_unknown_class_is_rejected() {
    let store = get_test_store().await;
    let person = store.insert_person(student("S9")).await.unwrap();

    let err = store
        .insert_enrollment(NewEnrollment {
            student_id: person.id,
            class_id: RecordId::new(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ForeignKeyViolation { .. }));
}

#[tokio::test]
#[serial]
async fn deleting_missing_rows_reports_zero() {
    let store = get_test_store().await;
    let id = RecordId::new();

    assert_eq!(store.delete_person(PersonKind::Teacher, id).await.unwrap(), 0);
    assert_eq!(store.delete_enrollment(id).await.unwrap(), 0);
    assert_eq!(store.delete_profile(id).await.unwrap(), 0);
}
