//! Teacher provisioning endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use common::{IdentityId, RecordId};
use domain::{PersonKind, TeacherForm};
use serde::{Deserialize, Serialize};

use super::{AppState, DeleteResponse, UserSummary, optional_id, required_id};
use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeleteTeacherRequest {
    pub teacher_id: Option<String>,
    pub user_id: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherCreatedResponse {
    pub ok: bool,
    pub teacher_id: String,
    pub user_id: String,
    pub user: UserSummary,
    /// True when the login already existed and was linked instead of created.
    pub reused_identity: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeacherDeletion {
    pub deleted_teachers: u64,
    pub deleted_profiles: u64,
    pub auth_deleted: bool,
    pub warnings: Vec<String>,
}

/// POST /create-teacher
#[tracing::instrument(skip(state, payload))]
pub async fn create(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TeacherForm>, JsonRejection>,
) -> Result<Json<TeacherCreatedResponse>, ApiError> {
    let Json(form) = payload?;
    let cmd = form.validate()?;

    let outcome = state.workflow.create_teacher(cmd).await?;

    Ok(Json(TeacherCreatedResponse {
        ok: true,
        teacher_id: outcome.person_id.to_string(),
        user_id: outcome.identity_id.to_string(),
        user: UserSummary {
            id: outcome.identity_id.to_string(),
            email: outcome.email,
        },
        reused_identity: outcome.reused_identity,
    }))
}

/// POST /delete-teacher
#[tracing::instrument(skip(state, payload))]
pub async fn delete(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<DeleteTeacherRequest>, JsonRejection>,
) -> Result<Json<DeleteResponse<TeacherDeletion>>, ApiError> {
    let Json(req) =
        payload.map_err(|rejection| ApiError::Deprovision(rejection.body_text()))?;
    let teacher_id: RecordId = required_id("teacherId", req.teacher_id)
        .map_err(|e| ApiError::Deprovision(e.to_string()))?;
    let user_id: Option<IdentityId> = optional_id("userId", req.user_id)
        .map_err(|e| ApiError::Deprovision(e.to_string()))?;

    let report = state
        .workflow
        .deprovision(PersonKind::Teacher, teacher_id, user_id)
        .await
        .map_err(|e| ApiError::Deprovision(e.to_string()))?;

    Ok(Json(DeleteResponse {
        success: true,
        result: TeacherDeletion {
            deleted_teachers: report.deleted_persons,
            deleted_profiles: report.deleted_profiles,
            auth_deleted: report.identity_deleted,
            warnings: report.warnings,
        },
    }))
}
