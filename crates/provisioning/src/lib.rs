//! User provisioning across independent stores.
//!
//! A portal user is an identity in the authentication service plus a person
//! record, a profile and (for students) an optional class enrollment in the
//! record store. The stores share no transaction, so provisioning runs as a
//! short saga:
//! 1. Create the identity
//! 2. Insert the person record
//! 3. Insert the profile
//! 4. Insert the enrollment, if a class was given
//!
//! If any step fails, the records created so far are deleted in reverse order.
//! Deprovisioning removes children before parents and the identity last.

pub mod compensation;
pub mod error;
pub mod report;
pub mod services;
pub mod state;
pub mod workflow;

pub use compensation::{Compensation, CompensationLog};
pub use error::{IdentityError, ProvisionError, ProvisionFailure};
pub use report::{DeprovisionReport, ProvisionOutcome};
pub use services::{
    HostedIdentityConfig, HostedIdentityService, Identity, IdentityService,
    InMemoryIdentityService,
};
pub use state::ProvisionState;
pub use workflow::{DEFAULT_DERIVED_EMAIL_DOMAIN, ProvisionCommand, ProvisioningWorkflow};
