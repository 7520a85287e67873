//! Record store for the school portal: person, profile and enrollment rows.
//!
//! The store is an external collaborator with its own transaction scope, so
//! every operation is a single round trip and deletes report affected row
//! counts.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::{InMemoryRecordStore, StoreOperation};
pub use postgres::PostgresRecordStore;
pub use store::RecordStore;
