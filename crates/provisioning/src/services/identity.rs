//! Identity service trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::IdentityId;
use domain::{Email, Password};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::error::IdentityError;

/// A user record held by the authentication service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: IdentityId,
    pub email: String,
}

/// Trait for the authentication service's user administration.
#[async_trait]
pub trait IdentityService: Send + Sync {
    /// Creates a confirmed user with the given credentials.
    ///
    /// Fails with `EmailTaken` if a user with this email already exists.
    async fn create_user(&self, email: &Email, password: &Password)
    -> Result<Identity, IdentityError>;

    /// Looks up a user by email.
    async fn find_user_by_email(&self, email: &Email) -> Result<Option<Identity>, IdentityError>;

    /// Deletes a user. Fails with `NotFound` if no such user exists.
    async fn delete_user(&self, id: IdentityId) -> Result<(), IdentityError>;
}

#[async_trait]
impl<T: IdentityService + ?Sized> IdentityService for Arc<T> {
    async fn create_user(
        &self,
        email: &Email,
        password: &Password,
    ) -> Result<Identity, IdentityError> {
        (**self).create_user(email, password).await
    }

    async fn find_user_by_email(&self, email: &Email) -> Result<Option<Identity>, IdentityError> {
        (**self).find_user_by_email(email).await
    }

    async fn delete_user(&self, id: IdentityId) -> Result<(), IdentityError> {
        (**self).delete_user(id).await
    }
}

#[derive(Debug, Default)]
struct InMemoryIdentityState {
    users: HashMap<IdentityId, (Identity, Password)>,
    fail_on_create: bool,
    fail_on_lookup: bool,
    fail_on_delete: bool,
}

/// In-memory identity service for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryIdentityService {
    state: Arc<RwLock<InMemoryIdentityState>>,
}

impl InMemoryIdentityService {
    /// Creates a new in-memory identity service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to fail every create call.
    pub async fn set_fail_on_create(&self, fail: bool) {
        self.state.write().await.fail_on_create = fail;
    }

    pub async fn set_fail_on_lookup(&self, fail: bool) {
        self.state.write().await.fail_on_lookup = fail;
    }

    pub async fn set_fail_on_delete(&self, fail: bool) {
        self.state.write().await.fail_on_delete = fail;
    }

    /// Returns the number of registered users.
    pub async fn user_count(&self) -> usize {
        self.state.read().await.users.len()
    }

    /// Returns true if a user exists with the given ID.
    pub async fn has_user(&self, id: IdentityId) -> bool {
        self.state.read().await.users.contains_key(&id)
    }

    /// Returns true if the stored credential for `id` matches.
    pub async fn password_matches(&self, id: IdentityId, password: &str) -> bool {
        self.state
            .read()
            .await
            .users
            .get(&id)
            .is_some_and(|(_, stored)| stored.expose() == password)
    }
}

#[async_trait]
impl IdentityService for InMemoryIdentityService {
    async fn create_user(
        &self,
        email: &Email,
        password: &Password,
    ) -> Result<Identity, IdentityError> {
        let mut state = self.state.write().await;

        if state.fail_on_create {
            return Err(IdentityError::Unavailable(
                "identity service is not accepting new users".to_string(),
            ));
        }
        if state
            .users
            .values()
            .any(|(identity, _)| identity.email == email.as_str())
        {
            return Err(IdentityError::EmailTaken(email.to_string()));
        }

        let identity = Identity {
            id: IdentityId::new(),
            email: email.to_string(),
        };
        state
            .users
            .insert(identity.id, (identity.clone(), password.clone()));
        Ok(identity)
    }

    async fn find_user_by_email(&self, email: &Email) -> Result<Option<Identity>, IdentityError> {
        let state = self.state.read().await;

        if state.fail_on_lookup {
            return Err(IdentityError::Unavailable("user lookup failed".to_string()));
        }
        Ok(state
            .users
            .values()
            .find(|(identity, _)| identity.email == email.as_str())
            .map(|(identity, _)| identity.clone()))
    }

    async fn delete_user(&self, id: IdentityId) -> Result<(), IdentityError> {
        let mut state = self.state.write().await;

        if state.fail_on_delete {
            return Err(IdentityError::Unavailable("user deletion failed".to_string()));
        }
        state
            .users
            .remove(&id)
            .map(|_| ())
            .ok_or(IdentityError::NotFound(id))
    }
}
