//! API error types with HTTP response mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::DomainError;
use provisioning::{ProvisionError, ProvisionFailure};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Unreadable request body.
    BadRequest(String),
    /// A create request failed, possibly after compensation.
    Provision(ProvisionFailure),
    /// A delete request failed. Always a 400 with `success: false`.
    Deprovision(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) | ApiError::Deprovision(_) => StatusCode::BAD_REQUEST,
            ApiError::Provision(failure) => provision_status(&failure.error),
        }
    }
}

fn provision_status(err: &ProvisionError) -> StatusCode {
    match err {
        ProvisionError::Validation(_) => StatusCode::BAD_REQUEST,
        ProvisionError::Conflict(_) => StatusCode::CONFLICT,
        ProvisionError::Store(_)
        | ProvisionError::Identity(_)
        | ProvisionError::InvalidTransition { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            ApiError::BadRequest(msg) => serde_json::json!({ "error": msg }),
            ApiError::Provision(failure) => {
                let message = failure.error.to_string();
                if status.is_server_error() {
                    tracing::error!(error = %message, warnings = ?failure.warnings, "provisioning failed");
                }
                if failure.warnings.is_empty() {
                    serde_json::json!({ "error": message })
                } else {
                    serde_json::json!({ "error": message, "warnings": failure.warnings })
                }
            }
            ApiError::Deprovision(msg) => serde_json::json!({ "success": false, "error": msg }),
        };

        (status, axum::Json(body)).into_response()
    }
}

impl From<ProvisionFailure> for ApiError {
    fn from(failure: ProvisionFailure) -> Self {
        ApiError::Provision(failure)
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        ApiError::Provision(ProvisionError::Validation(err).into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(format!("Invalid JSON body: {}", rejection.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use record_store::StoreError;

    #[test]
    fn test_status_mapping() {
        let validation = ApiError::from(DomainError::MissingField("reg_no"));
        assert_eq!(validation.status(), StatusCode::BAD_REQUEST);

        let conflict = ApiError::from(ProvisionFailure::from(ProvisionError::email_taken()));
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let upstream = ApiError::from(ProvisionFailure::from(ProvisionError::Store(
            StoreError::Unavailable("down".to_string()),
        )));
        assert_eq!(upstream.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let delete = ApiError::Deprovision("boom".to_string());
        assert_eq!(delete.status(), StatusCode::BAD_REQUEST);
    }
}
