//! Domain layer for the school portal provisioning service.
//!
//! This crate provides:
//! - The record model: person records (students, teachers), profiles and enrollments
//! - Value objects with boundary validation (email, person code, password)
//! - Provisioning commands built from untrusted request forms

pub mod error;
pub mod school;

pub use error::DomainError;
pub use school::{
    CreateStudent, CreateTeacher, Email, Enrollment, NewEnrollment, NewPerson, NewProfile,
    Password, Person, PersonCode, PersonDetails, PersonKind, Profile, Role, StudentForm,
    TeacherForm,
};
