use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use common::{IdentityId, RecordId};
use domain::{
    Enrollment, NewEnrollment, NewPerson, NewProfile, Person, PersonDetails, PersonKind, Profile,
    Role,
};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::store::{RecordStore, person_table};
use crate::{Result, StoreError};

const STUDENT_COLUMNS: &str = "id, user_id, reg_no, first_name, last_name, email, phone, \
     date_of_birth, gender, guardian_name, guardian_phone, created_at";

const TEACHER_COLUMNS: &str =
    "id, user_id, teacher_code, first_name, last_name, email, phone, subject, created_at";

/// PostgreSQL-backed record store.
#[derive(Clone)]
pub struct PostgresRecordStore {
    pool: PgPool,
}

impl PostgresRecordStore {
    /// Creates a new PostgreSQL record store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_person(kind: PersonKind, row: PgRow) -> Result<Person> {
        let (code_column, details) = match kind {
            PersonKind::Student => (
                "reg_no",
                PersonDetails::Student {
                    date_of_birth: row.try_get::<Option<NaiveDate>, _>("date_of_birth")?,
                    gender: row.try_get("gender")?,
                    guardian_name: row.try_get("guardian_name")?,
                    guardian_phone: row.try_get("guardian_phone")?,
                },
            ),
            PersonKind::Teacher => (
                "teacher_code",
                PersonDetails::Teacher {
                    subject: row.try_get("subject")?,
                },
            ),
        };

        Ok(Person {
            id: RecordId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: IdentityId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            code: row.try_get(code_column)?,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            details,
            created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        })
    }

    fn row_to_profile(row: PgRow) -> Result<Profile> {
        let role: String = row.try_get("role")?;
        let role = role.parse::<Role>().map_err(|e| StoreError::CorruptRow {
            table: "profiles",
            reason: e.to_string(),
        })?;

        Ok(Profile {
            id: RecordId::from_uuid(row.try_get::<Uuid, _>("id")?),
            role,
            person_id: RecordId::from_uuid(row.try_get::<Uuid, _>("person_id")?),
            user_id: IdentityId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_enrollment(row: PgRow) -> Result<Enrollment> {
        Ok(Enrollment {
            id: RecordId::from_uuid(row.try_get::<Uuid, _>("id")?),
            student_id: RecordId::from_uuid(row.try_get::<Uuid, _>("student_id")?),
            class_id: RecordId::from_uuid(row.try_get::<Uuid, _>("class_id")?),
            created_at: row.try_get("created_at")?,
        })
    }

    fn columns(kind: PersonKind) -> &'static str {
        match kind {
            PersonKind::Student => STUDENT_COLUMNS,
            PersonKind::Teacher => TEACHER_COLUMNS,
        }
    }

    fn code_column(kind: PersonKind) -> &'static str {
        match kind {
            PersonKind::Student => "reg_no",
            PersonKind::Teacher => "teacher_code",
        }
    }
}

/// Maps constraint violations onto their store-level meaning.
fn classify(table: &'static str, err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return StoreError::UniqueViolation {
                table,
                constraint: db_err.constraint().unwrap_or("unique").to_string(),
            };
        }
        if db_err.is_foreign_key_violation() {
            return StoreError::ForeignKeyViolation {
                table,
                detail: db_err.message().to_string(),
            };
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    async fn find_person_by_code(&self, kind: PersonKind, code: &str) -> Result<Option<Person>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = $1",
            Self::columns(kind),
            person_table(kind),
            Self::code_column(kind)
        );
        let row = sqlx::query(&sql)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| Self::row_to_person(kind, r)).transpose()
    }

    async fn get_person(&self, kind: PersonKind, id: RecordId) -> Result<Option<Person>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = $1",
            Self::columns(kind),
            person_table(kind)
        );
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| Self::row_to_person(kind, r)).transpose()
    }

    async fn insert_person(&self, person: NewPerson) -> Result<Person> {
        let kind = person.kind();
        let table = person_table(kind);
        let id = RecordId::new();

        let row = match &person.details {
            PersonDetails::Student {
                date_of_birth,
                gender,
                guardian_name,
                guardian_phone,
            } => {
                let sql = format!(
                    r#"
                    INSERT INTO students (id, user_id, reg_no, first_name, last_name, email, phone,
                                          date_of_birth, gender, guardian_name, guardian_phone)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                    RETURNING {STUDENT_COLUMNS}
                    "#
                );
                sqlx::query(&sql)
                    .bind(id.as_uuid())
                    .bind(person.user_id.as_uuid())
                    .bind(&person.code)
                    .bind(&person.first_name)
                    .bind(&person.last_name)
                    .bind(&person.email)
                    .bind(&person.phone)
                    .bind(date_of_birth)
                    .bind(gender)
                    .bind(guardian_name)
                    .bind(guardian_phone)
                    .fetch_one(&self.pool)
                    .await
            }
            PersonDetails::Teacher { subject } => {
                let sql = format!(
                    r#"
                    INSERT INTO teachers (id, user_id, teacher_code, first_name, last_name, email,
                                          phone, subject)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                    RETURNING {TEACHER_COLUMNS}
                    "#
                );
                sqlx::query(&sql)
                    .bind(id.as_uuid())
                    .bind(person.user_id.as_uuid())
                    .bind(&person.code)
                    .bind(&person.first_name)
                    .bind(&person.last_name)
                    .bind(&person.email)
                    .bind(&person.phone)
                    .bind(subject)
                    .fetch_one(&self.pool)
                    .await
            }
        }
        .map_err(|e| classify(table, e))?;

        tracing::debug!(%id, table, "person record inserted");
        Self::row_to_person(kind, row)
    }

    async fn delete_person(&self, kind: PersonKind, id: RecordId) -> Result<u64> {
        let table = person_table(kind);
        let sql = format!("DELETE FROM {table} WHERE id = $1");
        let result = sqlx::query(&sql)
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| classify(table, e))?;

        Ok(result.rows_affected())
    }

    async fn insert_profile(&self, profile: NewProfile) -> Result<Profile> {
        let row = sqlx::query(
            r#"
            INSERT INTO profiles (id, user_id, role, person_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, role, person_id, created_at
            "#,
        )
        .bind(RecordId::new().as_uuid())
        .bind(profile.user_id.as_uuid())
        .bind(profile.role.as_str())
        .bind(profile.person_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify("profiles", e))?;

        Self::row_to_profile(row)
    }

    async fn profiles_for_person(&self, person_id: RecordId) -> Result<Vec<Profile>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, role, person_id, created_at
            FROM profiles
            WHERE person_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(person_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_profile).collect()
    }

    async fn delete_profile(&self, id: RecordId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_profiles_for_person(&self, person_id: RecordId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM profiles WHERE person_id = $1")
            .bind(person_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn insert_enrollment(&self, enrollment: NewEnrollment) -> Result<Enrollment> {
        let row = sqlx::query(
            r#"
            INSERT INTO enrollments (id, student_id, class_id)
            VALUES ($1, $2, $3)
            RETURNING id, student_id, class_id, created_at
            "#,
        )
        .bind(RecordId::new().as_uuid())
        .bind(enrollment.student_id.as_uuid())
        .bind(enrollment.class_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| classify("enrollments", e))?;

        Self::row_to_enrollment(row)
    }

    async fn enrollments_for_student(&self, student_id: RecordId) -> Result<Vec<Enrollment>> {
        let rows = sqlx::query(
            r#"
            SELECT id, student_id, class_id, created_at
            FROM enrollments
            WHERE student_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(student_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_enrollment).collect()
    }

    async fn delete_enrollment(&self, id: RecordId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM enrollments WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn delete_enrollments_for_student(&self, student_id: RecordId) -> Result<u64> {
        let result = sqlx::query("DELETE FROM enrollments WHERE student_id = $1")
            .bind(student_id.as_uuid())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
