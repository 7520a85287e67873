//! Shared types for the school portal provisioning service.

pub mod types;

pub use types::{IdentityId, RecordId};
