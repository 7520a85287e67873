//! Identity service backed by a hosted auth provider's admin API.

use std::time::Duration;

use async_trait::async_trait;
use common::IdentityId;
use domain::{Email, Password};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;
use uuid::Uuid;

use crate::error::IdentityError;
use crate::services::identity::{Identity, IdentityService};

const USERS_PATH: &str = "auth/v1/admin/users";
const PAGE_SIZE: u32 = 1000;
const MAX_PAGES: u32 = 50;

/// Connection settings for the hosted auth admin API.
#[derive(Clone)]
pub struct HostedIdentityConfig {
    pub base_url: Url,
    /// Service-role key; grants full user administration.
    pub service_key: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for HostedIdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostedIdentityConfig")
            .field("base_url", &self.base_url.as_str())
            .field("service_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Deserialize)]
struct UserPayload {
    id: Uuid,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Deserialize)]
struct UserPage {
    #[serde(default)]
    users: Vec<UserPayload>,
}

/// The provider is inconsistent about which key carries the message.
#[derive(Deserialize, Default)]
struct ErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
    error_code: Option<String>,
    code: Option<serde_json::Value>,
}

impl ErrorBody {
    fn text(&self) -> Option<&str> {
        self.msg
            .as_deref()
            .or(self.message.as_deref())
            .or(self.error_description.as_deref())
            .or(self.error.as_deref())
    }

    fn is_email_taken(&self) -> bool {
        let code_says = self.error_code.as_deref() == Some("email_exists")
            || self.code.as_ref().and_then(|c| c.as_str()) == Some("email_exists");
        let text_says = self
            .text()
            .is_some_and(|t| t.to_lowercase().contains("already"));
        code_says || text_says
    }
}

/// Identity service that talks to a hosted auth provider over HTTP.
pub struct HostedIdentityService {
    base_url: Url,
    service_key: String,
    http: reqwest::Client,
}

impl HostedIdentityService {
    pub fn new(config: HostedIdentityConfig) -> Result<Self, IdentityError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(config, http))
    }

    /// Uses a caller-supplied HTTP client (shared pools, custom TLS).
    pub fn with_client(config: HostedIdentityConfig, http: reqwest::Client) -> Self {
        let mut base_url = config.base_url;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Self {
            base_url,
            service_key: config.service_key,
            http,
        }
    }

    fn apply_auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }

    fn users_url(&self) -> Result<Url, IdentityError> {
        self.base_url
            .join(USERS_PATH)
            .map_err(|e| IdentityError::InvalidUrl(e.to_string()))
    }

    fn user_url(&self, id: IdentityId) -> Result<Url, IdentityError> {
        self.base_url
            .join(&format!("{USERS_PATH}/{id}"))
            .map_err(|e| IdentityError::InvalidUrl(e.to_string()))
    }

    async fn rejection(response: reqwest::Response) -> (StatusCode, ErrorBody, String) {
        let status = response.status();
        let raw = response.text().await.unwrap_or_default();
        let body: ErrorBody = serde_json::from_str(&raw).unwrap_or_default();
        let message = body
            .text()
            .map(str::to_string)
            .unwrap_or_else(|| if raw.is_empty() { status.to_string() } else { raw });
        (status, body, message)
    }

    fn to_identity(payload: UserPayload, fallback_email: &str) -> Identity {
        Identity {
            id: IdentityId::from_uuid(payload.id),
            email: payload
                .email
                .unwrap_or_else(|| fallback_email.to_string()),
        }
    }
}

#[async_trait]
impl IdentityService for HostedIdentityService {
    async fn create_user(
        &self,
        email: &Email,
        password: &Password,
    ) -> Result<Identity, IdentityError> {
        let url = self.users_url()?;
        debug!(%email, "creating identity");

        let body = serde_json::json!({
            "email": email.as_str(),
            "password": password.expose(),
            "email_confirm": true,
        });
        let response = self
            .apply_auth(self.http.post(url))
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() {
            return match response.json::<UserPayload>().await {
                Ok(payload) => Ok(Self::to_identity(payload, email.as_str())),
                // The user exists upstream; recover its id so it can be compensated.
                Err(e) => {
                    warn!(%email, error = %e, "unreadable create response, looking user up");
                    self.find_user_by_email(email)
                        .await
                        .ok()
                        .flatten()
                        .ok_or_else(|| IdentityError::Malformed(e.to_string()))
                }
            };
        }

        let (status, body, message) = Self::rejection(response).await;
        let email_taken = match status {
            StatusCode::CONFLICT => true,
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => body.is_email_taken(),
            _ => false,
        };
        if email_taken {
            return Err(IdentityError::EmailTaken(email.to_string()));
        }

        warn!(%status, %message, "identity service rejected create");
        Err(IdentityError::Rejected {
            status: status.as_u16(),
            message,
        })
    }

    async fn find_user_by_email(&self, email: &Email) -> Result<Option<Identity>, IdentityError> {
        let url = self.users_url()?;

        // The admin API has no email filter, so walk the pages.
        for page in 1..=MAX_PAGES {
            let response = self
                .apply_auth(self.http.get(url.clone()))
                .query(&[("page", page), ("per_page", PAGE_SIZE)])
                .send()
                .await?;

            if !response.status().is_success() {
                let (status, _, message) = Self::rejection(response).await;
                return Err(IdentityError::Rejected {
                    status: status.as_u16(),
                    message,
                });
            }

            let listing: UserPage = response
                .json()
                .await
                .map_err(|e| IdentityError::Malformed(e.to_string()))?;
            let fetched = listing.users.len();

            if let Some(user) = listing.users.into_iter().find(|u| {
                u.email
                    .as_deref()
                    .is_some_and(|e| e.eq_ignore_ascii_case(email.as_str()))
            }) {
                return Ok(Some(Self::to_identity(user, email.as_str())));
            }

            if fetched < PAGE_SIZE as usize {
                return Ok(None);
            }
        }

        warn!(%email, pages = MAX_PAGES, "user listing truncated during lookup");
        Ok(None)
    }

    async fn delete_user(&self, id: IdentityId) -> Result<(), IdentityError> {
        let url = self.user_url(id)?;
        debug!(%id, "deleting identity");

        let response = self.apply_auth(self.http.delete(url)).send().await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => Err(IdentityError::NotFound(id)),
            _ => {
                let (status, _, message) = Self::rejection(response).await;
                Err(IdentityError::Rejected {
                    status: status.as_u16(),
                    message,
                })
            }
        }
    }
}
