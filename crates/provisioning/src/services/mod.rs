//! Identity service trait and its adapters.

pub mod hosted;
pub mod identity;

pub use hosted::{HostedIdentityConfig, HostedIdentityService};
pub use identity::{Identity, IdentityService, InMemoryIdentityService};
