//! Value objects for the school domain.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

const MAX_CODE_LEN: usize = 64;

/// Role bound to a user by their profile row; drives authorization routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Teacher,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "student" => Ok(Role::Student),
            "teacher" => Ok(Role::Teacher),
            "admin" => Ok(Role::Admin),
            other => Err(DomainError::invalid("role", format!("unknown role '{other}'"))),
        }
    }
}

/// Kind of person record. Each kind lives in its own table and has its own
/// unique external code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersonKind {
    Student,
    Teacher,
}

impl PersonKind {
    /// The profile role granted to this kind of person.
    pub fn role(&self) -> Role {
        match self {
            PersonKind::Student => Role::Student,
            PersonKind::Teacher => Role::Teacher,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PersonKind::Student => "student",
            PersonKind::Teacher => "teacher",
        }
    }

    /// Human-readable name of the unique code, as used in conflict messages.
    pub fn code_label(&self) -> &'static str {
        match self {
            PersonKind::Student => "registration number",
            PersonKind::Teacher => "teacher code",
        }
    }

    /// Capitalized noun for user-facing messages.
    pub fn title(&self) -> &'static str {
        match self {
            PersonKind::Student => "Student",
            PersonKind::Teacher => "Teacher",
        }
    }
}

impl std::fmt::Display for PersonKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A syntactically valid, lowercased email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Parses and normalizes an email address.
    ///
    /// Accepts `local@domain` where both parts are non-empty and contain no
    /// whitespace. The result is lowercased.
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::MissingField("email"));
        }
        let (local, domain) = trimmed
            .split_once('@')
            .ok_or_else(|| DomainError::invalid("email", "must contain '@'"))?;
        if local.is_empty() || domain.is_empty() {
            return Err(DomainError::invalid("email", "must be of the form local@domain"));
        }
        if domain.contains('@') || trimmed.chars().any(char::is_whitespace) {
            return Err(DomainError::invalid("email", "contains illegal characters"));
        }
        if domain.starts_with('.') || domain.ends_with('.') {
            return Err(DomainError::invalid("email", "domain is malformed"));
        }
        Ok(Self(trimmed.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Unique external code of a person record (student registration number or
/// teacher code).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PersonCode(String);

impl PersonCode {
    pub fn parse(field: &'static str, raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::MissingField(field));
        }
        if trimmed.len() > MAX_CODE_LEN {
            return Err(DomainError::invalid(
                field,
                format!("must be at most {MAX_CODE_LEN} characters"),
            ));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(DomainError::invalid(field, "must not contain whitespace"));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Builds the login email used when none was supplied, e.g. `S-100` at
    /// `school.local` becomes `s-100@school.local`.
    pub fn derived_email(&self, domain: &str) -> Result<Email, DomainError> {
        let local: String = self
            .0
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                    c.to_ascii_lowercase()
                } else {
                    '-'
                }
            })
            .collect();
        Email::parse(&format!("{local}@{domain}"))
    }
}

impl std::fmt::Display for PersonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Credential handed to the identity service. Never logged.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        if raw.is_empty() {
            return Err(DomainError::MissingField("password"));
        }
        Ok(Self(raw.to_string()))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Password {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Password(****)")
    }
}
