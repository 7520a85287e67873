//! Provisioning workflow for creating and removing portal users.

use std::time::Instant;

use common::{IdentityId, RecordId};
use domain::{
    CreateStudent, CreateTeacher, DomainError, Email, NewEnrollment, NewPerson, NewProfile,
    Password, PersonCode, PersonKind,
};
use record_store::RecordStore;

use crate::compensation::{Compensation, CompensationLog};
use crate::error::{IdentityError, ProvisionError, ProvisionFailure};
use crate::report::{DeprovisionReport, ProvisionOutcome};
use crate::services::identity::{Identity, IdentityService};
use crate::state::ProvisionState;

/// Domain used for login emails derived from a person code.
pub const DEFAULT_DERIVED_EMAIL_DOMAIN: &str = "school.local";

/// A validated request the workflow knows how to provision.
pub trait ProvisionCommand: Send + Sync {
    fn kind(&self) -> PersonKind;

    fn code(&self) -> &PersonCode;

    fn password(&self) -> &Password;

    fn login_email(&self, derived_domain: &str) -> Result<Email, DomainError>;

    fn to_new_person(&self, user_id: IdentityId, email: &Email) -> NewPerson;

    /// Class to enroll the new person in, if any.
    fn class_id(&self) -> Option<RecordId> {
        None
    }

    /// Whether an existing identity with the same email may be adopted.
    fn reuses_existing_identity(&self) -> bool {
        false
    }
}

impl ProvisionCommand for CreateStudent {
    fn kind(&self) -> PersonKind {
        PersonKind::Student
    }

    fn code(&self) -> &PersonCode {
        &self.reg_no
    }

    fn password(&self) -> &Password {
        &self.password
    }

    fn login_email(&self, derived_domain: &str) -> Result<Email, DomainError> {
        CreateStudent::login_email(self, derived_domain)
    }

    fn to_new_person(&self, user_id: IdentityId, email: &Email) -> NewPerson {
        CreateStudent::to_new_person(self, user_id, email)
    }

    fn class_id(&self) -> Option<RecordId> {
        self.class_id
    }
}

impl ProvisionCommand for CreateTeacher {
    fn kind(&self) -> PersonKind {
        PersonKind::Teacher
    }

    fn code(&self) -> &PersonCode {
        &self.teacher_code
    }

    fn password(&self) -> &Password {
        &self.password
    }

    fn login_email(&self, derived_domain: &str) -> Result<Email, DomainError> {
        CreateTeacher::login_email(self, derived_domain)
    }

    fn to_new_person(&self, user_id: IdentityId, email: &Email) -> NewPerson {
        CreateTeacher::to_new_person(self, user_id, email)
    }

    // Staff accounts are often pre-created in the auth provider.
    fn reuses_existing_identity(&self) -> bool {
        true
    }
}

/// Progress of one provisioning request.
struct ProvisionRun {
    kind: PersonKind,
    state: ProvisionState,
    log: CompensationLog,
}

impl ProvisionRun {
    fn new(kind: PersonKind) -> Self {
        Self {
            kind,
            state: ProvisionState::Pending,
            log: CompensationLog::new(),
        }
    }

    fn advance(&mut self, next: ProvisionState) -> Result<(), ProvisionError> {
        if !self.state.can_transition_to(next) {
            return Err(ProvisionError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!(kind = %self.kind, from = %self.state, to = %next, "provisioning transition");
        self.state = next;
        Ok(())
    }
}

/// Provisions and deprovisions users across the identity service and the
/// record store.
///
/// The two stores share no transaction. Every step waits for the previous
/// one, and a failure deletes whatever this request created, newest first.
pub struct ProvisioningWorkflow<R, I>
where
    R: RecordStore,
    I: IdentityService,
{
    records: R,
    identities: I,
    derived_email_domain: String,
}

impl<R, I> ProvisioningWorkflow<R, I>
where
    R: RecordStore,
    I: IdentityService,
{
    /// Creates a new workflow over the given stores.
    pub fn new(records: R, identities: I) -> Self {
        Self {
            records,
            identities,
            derived_email_domain: DEFAULT_DERIVED_EMAIL_DOMAIN.to_string(),
        }
    }

    /// Sets the domain used when a request carries no email.
    pub fn with_derived_email_domain(mut self, domain: impl Into<String>) -> Self {
        self.derived_email_domain = domain.into();
        self
    }

    pub fn records(&self) -> &R {
        &self.records
    }

    pub fn identities(&self) -> &I {
        &self.identities
    }

    /// Provisions a student: identity, student record, profile and optional enrollment.
    #[tracing::instrument(skip(self, cmd), fields(reg_no = %cmd.reg_no))]
    pub async fn create_student(
        &self,
        cmd: CreateStudent,
    ) -> Result<ProvisionOutcome, ProvisionFailure> {
        self.provision(&cmd).await
    }

    /// Provisions a teacher, adopting an existing identity for the same email.
    #[tracing::instrument(skip(self, cmd), fields(teacher_code = %cmd.teacher_code))]
    pub async fn create_teacher(
        &self,
        cmd: CreateTeacher,
    ) -> Result<ProvisionOutcome, ProvisionFailure> {
        self.provision(&cmd).await
    }

    /// Runs the provisioning saga for any supported command.
    pub async fn provision<C: ProvisionCommand>(
        &self,
        cmd: &C,
    ) -> Result<ProvisionOutcome, ProvisionFailure> {
        let kind = cmd.kind();
        metrics::counter!("provisioning_requests_total", "kind" => kind.as_str()).increment(1);
        let started = Instant::now();

        let mut run = ProvisionRun::new(kind);
        let result = self.run_steps(cmd, &mut run).await;
        record_duration(started);

        match result {
            Ok(outcome) => {
                metrics::counter!("provisioning_committed_total", "kind" => kind.as_str())
                    .increment(1);
                tracing::info!(
                    %kind,
                    person_id = %outcome.person_id,
                    identity_id = %outcome.identity_id,
                    reused_identity = outcome.reused_identity,
                    "user provisioned"
                );
                Ok(outcome)
            }
            Err(error) => {
                let failed_in = run.state;
                let warnings = self.compensate(&mut run).await;
                metrics::counter!("provisioning_failed_total", "kind" => kind.as_str())
                    .increment(1);
                if error.is_client_error() {
                    tracing::info!(%kind, state = %failed_in, %error, "provisioning rejected");
                } else {
                    tracing::warn!(%kind, state = %failed_in, %error, "provisioning failed");
                }
                Err(ProvisionFailure { error, warnings })
            }
        }
    }

    async fn run_steps<C: ProvisionCommand>(
        &self,
        cmd: &C,
        run: &mut ProvisionRun,
    ) -> Result<ProvisionOutcome, ProvisionError> {
        let kind = cmd.kind();

        // 1. Derive login email and pre-check the code
        run.advance(ProvisionState::Validating)?;
        let email = cmd.login_email(&self.derived_email_domain)?;
        if self
            .records
            .find_person_by_code(kind, cmd.code().as_str())
            .await?
            .is_some()
        {
            return Err(ProvisionError::duplicate_code(kind));
        }

        // 2. Identity
        run.advance(ProvisionState::CreatingIdentity)?;
        let (identity, reused_identity) = self.obtain_identity(cmd, &email).await?;
        if !reused_identity {
            run.log.push(Compensation::DeleteIdentity(identity.id));
        }

        // 3. Person record; the store's unique constraint is the real guard
        run.advance(ProvisionState::CreatingPerson)?;
        let person = self
            .records
            .insert_person(cmd.to_new_person(identity.id, &email))
            .await
            .map_err(|e| {
                if e.is_unique_violation() {
                    ProvisionError::duplicate_code(kind)
                } else {
                    ProvisionError::Store(e)
                }
            })?;
        run.log.push(Compensation::DeletePerson(kind, person.id));

        // 4. Profile
        run.advance(ProvisionState::CreatingProfile)?;
        let profile = self
            .records
            .insert_profile(NewProfile {
                role: kind.role(),
                person_id: person.id,
                user_id: identity.id,
            })
            .await?;
        run.log.push(Compensation::DeleteProfile(profile.id));

        // 5. Enrollment
        let enrollment_id = match cmd.class_id() {
            Some(class_id) => {
                run.advance(ProvisionState::CreatingEnrollment)?;
                let enrollment = self
                    .records
                    .insert_enrollment(NewEnrollment {
                        student_id: person.id,
                        class_id,
                    })
                    .await?;
                run.log.push(Compensation::DeleteEnrollment(enrollment.id));
                Some(enrollment.id)
            }
            None => None,
        };

        run.advance(ProvisionState::Committed)?;

        Ok(ProvisionOutcome {
            kind,
            identity_id: identity.id,
            person_id: person.id,
            profile_id: profile.id,
            enrollment_id,
            email: email.to_string(),
            reused_identity,
        })
    }

    /// Creates the identity, or adopts an existing one where the command allows it.
    ///
    /// Returns the identity and whether it was adopted.
    async fn obtain_identity<C: ProvisionCommand>(
        &self,
        cmd: &C,
        email: &Email,
    ) -> Result<(Identity, bool), ProvisionError> {
        match self.identities.create_user(email, cmd.password()).await {
            Ok(identity) => Ok((identity, false)),
            Err(IdentityError::EmailTaken(_)) if cmd.reuses_existing_identity() => {
                let existing = self
                    .identities
                    .find_user_by_email(email)
                    .await?
                    .ok_or_else(|| {
                        IdentityError::Unavailable(format!(
                            "{email} is registered but could not be looked up"
                        ))
                    })?;
                tracing::info!(identity_id = %existing.id, "reusing existing identity");
                Ok((existing, true))
            }
            Err(IdentityError::EmailTaken(_)) => Err(ProvisionError::email_taken()),
            Err(e) => Err(e.into()),
        }
    }

    /// Undoes the run's records newest first.
    ///
    /// Failures here are collected as warnings; the caller still receives the
    /// error that triggered compensation.
    async fn compensate(&self, run: &mut ProvisionRun) -> Vec<String> {
        let mut warnings = Vec::new();

        if run.log.is_empty() {
            if let Err(e) = run.advance(ProvisionState::Failed) {
                warnings.push(e.to_string());
            }
            return warnings;
        }

        if let Err(e) = run.advance(ProvisionState::Compensating) {
            warnings.push(e.to_string());
        }
        metrics::counter!("provisioning_compensations_total").increment(1);

        for step in run.log.drain_reverse() {
            match self.undo(step).await {
                Ok(()) => tracing::debug!(%step, "compensation step completed"),
                Err(reason) => {
                    metrics::counter!(
                        "provisioning_compensation_failures_total",
                        "step" => step.label()
                    )
                    .increment(1);
                    tracing::warn!(%step, %reason, "compensation step failed");
                    warnings.push(format!("Failed to {step}: {reason}"));
                }
            }
        }

        if let Err(e) = run.advance(ProvisionState::Failed) {
            warnings.push(e.to_string());
        }
        warnings
    }

    async fn undo(&self, step: Compensation) -> Result<(), String> {
        match step {
            Compensation::DeleteIdentity(id) => self
                .identities
                .delete_user(id)
                .await
                .map_err(|e| e.to_string()),
            Compensation::DeletePerson(kind, id) => self
                .records
                .delete_person(kind, id)
                .await
                .map(drop)
                .map_err(|e| e.to_string()),
            Compensation::DeleteProfile(id) => self
                .records
                .delete_profile(id)
                .await
                .map(drop)
                .map_err(|e| e.to_string()),
            Compensation::DeleteEnrollment(id) => self
                .records
                .delete_enrollment(id)
                .await
                .map(drop)
                .map_err(|e| e.to_string()),
        }
    }

    /// Removes a user: enrollments (students only), profiles, the person
    /// record, then the identity if one was given.
    ///
    /// Failing to delete a dependent row is downgraded to a warning. Failing
    /// to delete the person record aborts before the identity is touched.
    #[tracing::instrument(skip(self))]
    pub async fn deprovision(
        &self,
        kind: PersonKind,
        person_id: RecordId,
        identity_id: Option<IdentityId>,
    ) -> Result<DeprovisionReport, ProvisionError> {
        metrics::counter!("deprovisioning_total", "kind" => kind.as_str()).increment(1);
        let mut report = DeprovisionReport::new(kind);

        if kind == PersonKind::Student {
            match self.records.delete_enrollments_for_student(person_id).await {
                Ok(count) => report.deleted_enrollments = count,
                Err(e) => {
                    tracing::warn!(%person_id, error = %e, "failed to delete enrollments");
                    report.warn(format!("Failed to delete enrollments: {e}"));
                }
            }
        }

        match self.records.delete_profiles_for_person(person_id).await {
            Ok(count) => report.deleted_profiles = count,
            Err(e) => {
                tracing::warn!(%person_id, error = %e, "failed to delete profiles");
                report.warn(format!("Failed to delete profiles: {e}"));
            }
        }

        report.deleted_persons = self
            .records
            .delete_person(kind, person_id)
            .await
            .map_err(|e| {
                tracing::error!(%person_id, error = %e, "failed to delete person record");
                ProvisionError::Store(e)
            })?;

        if let Some(identity_id) = identity_id {
            match self.identities.delete_user(identity_id).await {
                Ok(()) => report.identity_deleted = true,
                Err(e) => {
                    tracing::warn!(%identity_id, error = %e, "failed to delete identity");
                    report.warn(format!("Failed to delete auth user: {e}"));
                }
            }
        }

        tracing::info!(
            %kind,
            %person_id,
            deleted_enrollments = report.deleted_enrollments,
            deleted_profiles = report.deleted_profiles,
            deleted_persons = report.deleted_persons,
            identity_deleted = report.identity_deleted,
            "user deprovisioned"
        );
        Ok(report)
    }
}

fn record_duration(started: Instant) {
    metrics::histogram!("provisioning_duration_seconds").record(started.elapsed().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::identity::InMemoryIdentityService;
    use domain::{StudentForm, TeacherForm};
    use record_store::{InMemoryRecordStore, StoreOperation};

    fn workflow() -> (
        ProvisioningWorkflow<InMemoryRecordStore, InMemoryIdentityService>,
        InMemoryRecordStore,
        InMemoryIdentityService,
    ) {
        let records = InMemoryRecordStore::new();
        let identities = InMemoryIdentityService::new();
        let workflow = ProvisioningWorkflow::new(records.clone(), identities.clone());
        (workflow, records, identities)
    }

    fn student(reg_no: &str) -> CreateStudent {
        StudentForm {
            password: Some("p1".to_string()),
            reg_no: Some(reg_no.to_string()),
            first_name: Some("A".to_string()),
            last_name: Some("B".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap()
    }

    #[test]
    fn test_run_rejects_skipped_step() {
        let mut run = ProvisionRun::new(PersonKind::Student);
        run.advance(ProvisionState::Validating).unwrap();

        let err = run.advance(ProvisionState::CreatingPerson).unwrap_err();
        assert!(matches!(
            err,
            ProvisionError::InvalidTransition {
                from: ProvisionState::Validating,
                to: ProvisionState::CreatingPerson,
            }
        ));
        assert_eq!(run.state, ProvisionState::Validating);
    }

    #[test]
    fn test_commands_report_kind_and_identity_reuse() {
        let teacher = TeacherForm {
            password: Some("chalk".to_string()),
            teacher_code: Some("T-7".to_string()),
            first_name: Some("Ada".to_string()),
            last_name: Some("Lovelace".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap();

        assert_eq!(ProvisionCommand::kind(&teacher), PersonKind::Teacher);
        assert!(teacher.reuses_existing_identity());
        assert_eq!(ProvisionCommand::kind(&student("S1")), PersonKind::Student);
        assert!(!student("S1").reuses_existing_identity());
    }

    #[tokio::test]
    async fn test_derived_email_uses_configured_domain() {
        let (workflow, _, _) = workflow();
        let workflow = workflow.with_derived_email_domain("academy.test");

        let outcome = workflow.create_student(student("S/100")).await.unwrap();
        assert_eq!(outcome.email, "s-100@academy.test");
        assert!(!outcome.reused_identity);
    }

    #[tokio::test]
    async fn test_failure_before_any_write_has_no_warnings() {
        let (workflow, records, identities) = workflow();
        records.set_fail_on(StoreOperation::FindPerson, true).await;

        let failure = workflow.create_student(student("S1")).await.unwrap_err();
        assert!(matches!(failure.error, ProvisionError::Store(_)));
        assert!(failure.warnings.is_empty());
        assert_eq!(identities.user_count().await, 0);
    }

    #[tokio::test]
    async fn test_undo_failure_becomes_warning() {
        let (workflow, records, identities) = workflow();
        records.set_fail_on(StoreOperation::InsertProfile, true).await;
        records.set_fail_on(StoreOperation::DeletePerson, true).await;

        let failure = workflow.create_student(student("S1")).await.unwrap_err();
        assert!(matches!(failure.error, ProvisionError::Store(_)));
        assert_eq!(failure.warnings.len(), 1);
        assert!(failure.warnings[0].starts_with("Failed to delete student"));

        // The identity is still removed after the failed person delete.
        assert_eq!(identities.user_count().await, 0);
        assert_eq!(records.person_count(PersonKind::Student).await, 1);
    }
}
