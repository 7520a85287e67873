//! HTTP handlers and the state they share.

pub mod health;
pub mod metrics;
pub mod teachers;
pub mod users;

use std::str::FromStr;
use std::sync::Arc;

use axum::http::StatusCode;
use domain::DomainError;
use provisioning::{IdentityService, ProvisioningWorkflow};
use record_store::RecordStore;
use serde::Serialize;

/// Record store handle chosen at startup.
pub type SharedRecordStore = Arc<dyn RecordStore>;

/// Identity service handle chosen at startup.
pub type SharedIdentityService = Arc<dyn IdentityService>;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub workflow: ProvisioningWorkflow<SharedRecordStore, SharedIdentityService>,
}

/// OPTIONS on any endpoint: bare 200 for CORS preflight.
pub async fn preflight() -> StatusCode {
    StatusCode::OK
}

/// Login account summary echoed after a create.
#[derive(Serialize)]
pub struct UserSummary {
    pub id: String,
    pub email: String,
}

#[derive(Serialize)]
pub struct DeleteResponse<T> {
    pub success: bool,
    pub result: T,
}

/// Parses a required id field from a request body.
pub(crate) fn required_id<T>(field: &'static str, raw: Option<String>) -> Result<T, DomainError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    optional_id(field, raw)?.ok_or(DomainError::MissingField(field))
}

/// Parses an optional id field; blank counts as absent.
pub(crate) fn optional_id<T>(field: &'static str, raw: Option<String>) -> Result<Option<T>, DomainError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(|v| {
            v.parse::<T>().map_err(|e| DomainError::InvalidField {
                field,
                reason: e.to_string(),
            })
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::RecordId;

    #[test]
    fn test_id_parsing() {
        let id = RecordId::new();
        let parsed: RecordId = required_id("studentId", Some(format!(" {id} "))).unwrap();
        assert_eq!(parsed, id);

        assert_eq!(
            required_id::<RecordId>("studentId", Some(String::new())).unwrap_err(),
            DomainError::MissingField("studentId")
        );
        assert!(matches!(
            required_id::<RecordId>("studentId", Some("42".to_string())),
            Err(DomainError::InvalidField { field: "studentId", .. })
        ));
        assert_eq!(optional_id::<RecordId>("userId", None).unwrap(), None);
    }
}
