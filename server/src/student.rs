use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::normalization;
use crate::times::Times;

/// A student's public identity. The stored password hash never appears
/// here, so this type is safe to serialize into responses.
#[derive(Clone, Debug, Serialize)]
pub struct Student {
    /// The ID of the student.
    pub(crate) id: Uuid,

    /// The name provided at signup.
    pub(crate) name: String,

    /// The email address, normalized. Unique across all students.
    pub(crate) email: String,

    /// The mobile number, if provided. Unique when present.
    pub(crate) mobile: Option<String>,

    /// The times it was created and updated.
    #[serde(flatten)]
    pub(crate) times: Times,
}

/// A student row as read by the database layer, including the password
/// hash for credential checks. Deliberately not serializable.
#[derive(Clone, Debug)]
pub struct StudentRecord {
    pub(crate) student: Student,
    pub(crate) password_hash: String,
}

/// The signup request body.
#[derive(Clone, Debug, Deserialize)]
pub struct NewStudent {
    /// The name provided.
    pub(crate) name: String,

    /// The email address provided.
    #[serde(deserialize_with = "normalization::deserialize")]
    pub(crate) email: String,

    /// The raw password. Hashed before it reaches the database layer.
    pub(crate) password: String,

    /// The mobile number provided, if any.
    #[serde(default, alias = "phone")]
    pub(crate) mobile: Option<String>,
}

/// A student row ready for insertion, password already hashed.
#[derive(Clone, Debug)]
pub struct NewStudentRecord {
    pub(crate) name: String,
    pub(crate) email: String,
    pub(crate) mobile: Option<String>,
    pub(crate) password_hash: String,
}

/// The login request body.
#[derive(Clone, Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(deserialize_with = "normalization::deserialize")]
    pub(crate) email: String,
    pub(crate) password: String,
    pub(crate) role: Role,
}

/// The role a login attempt claims. Admins are a fixed configured
/// credential pair, not rows in the student collection.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Student,
}

/// The identity returned by a successful login.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum AuthenticatedUser {
    Admin {
        email: String,
        role: Role,
    },
    Student {
        id: Uuid,
        name: String,
        email: String,
        role: Role,
    },
}

impl AuthenticatedUser {
    pub fn admin(email: impl Into<String>) -> Self {
        AuthenticatedUser::Admin {
            email: email.into(),
            role: Role::Admin,
        }
    }

    pub fn student(student: Student) -> Self {
        AuthenticatedUser::Student {
            id: student.id,
            name: student.name,
            email: student.email,
            role: Role::Student,
        }
    }
}
