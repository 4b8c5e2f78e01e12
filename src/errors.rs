use sqlx;
use thiserror::Error;

use crate::entity::Id;

/// Enumerates high-level errors returned by this library.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Represents an SQL error.
    #[error("SQLx error")]
    Sqlx { source: sqlx::Error },

    /// Represents a field value rejected by a validator.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Represents a request body that could not be parsed as JSON.
    #[error("Malformed request body")]
    MalformedBody(#[source] serde_json::Error),

    /// Represents a required field missing from the request body.
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    /// Represents a lookup for a camper that does not exist.
    #[error("Camper not found")]
    CamperNotFound(Id),

    /// Represents a lookup for an activity that does not exist.
    #[error("Activity not found")]
    ActivityNotFound(Id),

    /// Represents a lookup for a signup that does not exist.
    #[error("Signup not found")]
    SignupNotFound(Id),

    /// Represents a signup referring to a camper that does not exist.
    #[error("Camper {0} does not exist")]
    UnknownCamper(Id),

    /// Represents a signup referring to an activity that does not exist.
    #[error("Activity {0} does not exist")]
    UnknownActivity(Id),

    /// Represents a write rejected by a foreign key constraint.
    #[error("Referenced record does not exist")]
    ForeignKeyViolation,
}

/// Enumerates the field constraints enforced on assignment.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Camper must have a name")]
    CamperName,

    #[error("Camper age must be between 8 and 18 years old")]
    CamperAge,

    #[error("time must be between 0 and 23")]
    SignupTime,
}

/// Enumerates errors found while reading the startup configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be a port number, not {value:?}")]
    InvalidPort {
        name: &'static str,
        value: String,
        source: std::num::ParseIntError,
    },
}
