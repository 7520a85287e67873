//! Provisioning commands and the request forms they are validated from.
//!
//! Forms accept every field as optional so that a missing field becomes a
//! [`DomainError::MissingField`] naming it, instead of an opaque
//! deserialization failure.

use chrono::NaiveDate;
use common::{IdentityId, RecordId};
use serde::Deserialize;

use super::records::{NewPerson, PersonDetails};
use super::value_objects::{Email, Password, PersonCode};
use crate::error::DomainError;

const MAX_NAME_LEN: usize = 100;

/// Untrusted body of a student provisioning request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StudentForm {
    pub email: Option<String>,
    pub password: Option<String>,
    pub reg_no: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,
    pub class_id: Option<String>,
}

/// Untrusted body of a teacher provisioning request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TeacherForm {
    pub email: Option<String>,
    pub password: Option<String>,
    pub teacher_code: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone: Option<String>,
    pub subject: Option<String>,
}

/// Validated request to provision a student.
#[derive(Debug, Clone)]
pub struct CreateStudent {
    pub email: Option<Email>,
    pub password: Password,
    pub reg_no: PersonCode,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub guardian_name: Option<String>,
    pub guardian_phone: Option<String>,
    pub class_id: Option<RecordId>,
}

/// Validated request to provision a teacher.
#[derive(Debug, Clone)]
pub struct CreateTeacher {
    pub email: Option<Email>,
    pub password: Password,
    pub teacher_code: PersonCode,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub subject: Option<String>,
}

impl StudentForm {
    pub fn validate(self) -> Result<CreateStudent, DomainError> {
        let reg_no = PersonCode::parse("reg_no", &required("reg_no", self.reg_no)?)?;
        let password = Password::parse(&required("password", self.password)?)?;
        let first_name = name("first_name", self.first_name)?;
        let last_name = name("last_name", self.last_name)?;
        let email = optional(self.email).map(|e| Email::parse(&e)).transpose()?;

        let date_of_birth = optional(self.date_of_birth)
            .map(|d| {
                NaiveDate::parse_from_str(&d, "%Y-%m-%d")
                    .map_err(|_| DomainError::invalid("date_of_birth", "expected YYYY-MM-DD"))
            })
            .transpose()?;

        let class_id = optional(self.class_id)
            .map(|c| {
                c.parse::<RecordId>()
                    .map_err(|e| DomainError::invalid("class_id", e.to_string()))
            })
            .transpose()?;

        Ok(CreateStudent {
            email,
            password,
            reg_no,
            first_name,
            last_name,
            date_of_birth,
            gender: optional(self.gender),
            phone: optional(self.phone),
            guardian_name: optional(self.guardian_name),
            guardian_phone: optional(self.guardian_phone),
            class_id,
        })
    }
}

impl TeacherForm {
    pub fn validate(self) -> Result<CreateTeacher, DomainError> {
        let teacher_code =
            PersonCode::parse("teacher_code", &required("teacher_code", self.teacher_code)?)?;
        let password = Password::parse(&required("password", self.password)?)?;
        let first_name = name("first_name", self.first_name)?;
        let last_name = name("last_name", self.last_name)?;
        let email = optional(self.email).map(|e| Email::parse(&e)).transpose()?;

        Ok(CreateTeacher {
            email,
            password,
            teacher_code,
            first_name,
            last_name,
            phone: optional(self.phone),
            subject: optional(self.subject),
        })
    }
}

impl CreateStudent {
    /// The supplied email, or one derived from the registration number.
    pub fn login_email(&self, derived_domain: &str) -> Result<Email, DomainError> {
        match &self.email {
            Some(email) => Ok(email.clone()),
            None => self.reg_no.derived_email(derived_domain),
        }
    }

    pub fn to_new_person(&self, user_id: IdentityId, email: &Email) -> NewPerson {
        NewPerson {
            user_id,
            code: self.reg_no.as_str().to_string(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: email.as_str().to_string(),
            phone: self.phone.clone(),
            details: PersonDetails::Student {
                date_of_birth: self.date_of_birth,
                gender: self.gender.clone(),
                guardian_name: self.guardian_name.clone(),
                guardian_phone: self.guardian_phone.clone(),
            },
        }
    }
}

impl CreateTeacher {
    pub fn login_email(&self, derived_domain: &str) -> Result<Email, DomainError> {
        match &self.email {
            Some(email) => Ok(email.clone()),
            None => self.teacher_code.derived_email(derived_domain),
        }
    }

    pub fn to_new_person(&self, user_id: IdentityId, email: &Email) -> NewPerson {
        NewPerson {
            user_id,
            code: self.teacher_code.as_str().to_string(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: email.as_str().to_string(),
            phone: self.phone.clone(),
            details: PersonDetails::Teacher {
                subject: self.subject.clone(),
            },
        }
    }
}

/// Trims a value, treating blank strings as absent.
fn optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required(field: &'static str, value: Option<String>) -> Result<String, DomainError> {
    optional(value).ok_or(DomainError::MissingField(field))
}

fn name(field: &'static str, value: Option<String>) -> Result<String, DomainError> {
    let value = required(field, value)?;
    if value.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::invalid(
            field,
            format!("must be at most {MAX_NAME_LEN} characters"),
        ));
    }
    Ok(value)
}
