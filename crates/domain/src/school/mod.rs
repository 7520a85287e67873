//! School portal model: who can be provisioned and what gets stored for them.

pub mod commands;
pub mod records;
pub mod value_objects;

pub use commands::{CreateStudent, CreateTeacher, StudentForm, TeacherForm};
pub use records::{
    Enrollment, NewEnrollment, NewPerson, NewProfile, Person, PersonDetails, Profile,
};
pub use value_objects::{Email, Password, PersonCode, PersonKind, Role};
