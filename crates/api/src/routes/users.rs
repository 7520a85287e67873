//! Student provisioning endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use common::{IdentityId, RecordId};
use domain::{PersonKind, StudentForm};
use serde::{Deserialize, Serialize};

use super::{AppState, DeleteResponse, UserSummary, optional_id, required_id};
use crate::error::ApiError;

// -- Request types --

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeleteStudentRequest {
    pub student_id: Option<String>,
    pub user_id: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentCreatedResponse {
    pub ok: bool,
    pub student_id: String,
    pub user_id: String,
    pub user: UserSummary,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentDeletion {
    pub deleted_students: u64,
    pub deleted_profiles: u64,
    pub deleted_enrollments: u64,
    pub auth_deleted: bool,
    pub warnings: Vec<String>,
}

// -- Handlers --

/// POST /create-user: provision a student login with its records.
#[tracing::instrument(skip(state, payload))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<StudentForm>, JsonRejection>,
) -> Result<Json<StudentCreatedResponse>, ApiError> {
    let Json(form) = payload?;
    let cmd = form.validate()?;

    let outcome = state.workflow.create_student(cmd).await?;

    Ok(Json(StudentCreatedResponse {
        ok: true,
        student_id: outcome.person_id.to_string(),
        user_id: outcome.identity_id.to_string(),
        user: UserSummary {
            id: outcome.identity_id.to_string(),
            email: outcome.email,
        },
    }))
}

/// POST /delete-user: remove a student, their dependents and optionally their login.
#[tracing::instrument(skip(state, payload))]
pub async fn delete(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DeleteStudentRequest>, JsonRejection>,
) -> Result<Json<DeleteResponse<StudentDeletion>>, ApiError> {
    let Json(req) =
        payload.map_err(|rejection| ApiError::Deprovision(rejection.body_text()))?;
    let student_id: RecordId = required_id("studentId", req.student_id)
        .map_err(|e| ApiError::Deprovision(e.to_string()))?;
    let user_id: Option<IdentityId> = optional_id("userId", req.user_id)
        .map_err(|e| ApiError::Deprovision(e.to_string()))?;

    let report = state
        .workflow
        .deprovision(PersonKind::Student, student_id, user_id)
        .await
        .map_err(|e| ApiError::Deprovision(e.to_string()))?;

    Ok(Json(DeleteResponse {
        success: true,
        result: StudentDeletion {
            deleted_students: report.deleted_persons,
            deleted_profiles: report.deleted_profiles,
            deleted_enrollments: report.deleted_enrollments,
            auth_deleted: report.identity_deleted,
            warnings: report.warnings,
        },
    }))
}
