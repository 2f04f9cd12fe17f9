use thiserror::Error;

/// Enumerates high-level errors returned by this library.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Represents an SQL error.
    #[error("database error")]
    Sqlx { source: sqlx::Error },

    /// Represents a required field that was absent or blank.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Represents a multipart submission that could not be read.
    #[error("could not parse form submission")]
    MalformedFormSubmission,

    /// Represents a date field that was not in `YYYY-MM-DD` form.
    #[error("could not parse {0} as a date")]
    MalformedDate(String),

    /// Represents a path segment that was not a valid ID.
    #[error("invalid ID {0}")]
    InvalidId(String),

    #[error("student not found")]
    StudentNotFound,

    #[error("workshop not found")]
    WorkshopNotFound,

    /// Represents a workshop with no stored video payload.
    #[error("no video stored for this workshop")]
    NoVideo,

    #[error("a student with this email already exists")]
    EmailAlreadyExists,

    #[error("a student with this mobile number already exists")]
    MobileAlreadyExists,

    #[error("student already registered for this workshop")]
    AlreadyRegistered,

    /// Deliberately generic: the message must not reveal whether the
    /// identifier exists.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Represents a `Range` header that could not be parsed.
    #[error("invalid range header {0}")]
    InvalidRange(String),

    /// Represents a well-formed range that lies outside the payload.
    #[error("requested range starting at {start} exceeds the {total}-byte payload")]
    RangeNotSatisfiable { start: u64, total: u64 },

    /// Represents a failure in the password hashing subsystem.
    #[error("password hashing error")]
    PasswordHash { source: argon2::password_hash::Error },

    /// Represents a failure to assemble the video response.
    #[error("could not construct video response")]
    VideoResponse { source: warp::http::Error },
}
