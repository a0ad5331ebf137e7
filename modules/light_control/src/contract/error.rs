use thiserror::Error;

/// Errors that are safe to expose to other modules
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LightControlError {
    #[error("Username '{username}' is already taken")]
    UsernameTaken { username: String },

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Intensity {value} outside {min}..={max}")]
    IntensityOutOfRange { value: i32, min: i32, max: i32 },

    #[error("Internal error")]
    Internal,
}

impl From<crate::domain::error::DomainError> for LightControlError {
    fn from(e: crate::domain::error::DomainError) -> Self {
        use crate::domain::error::DomainError::*;
        match e {
            UsernameTaken { username } => Self::UsernameTaken { username },
            Validation { field, message } => Self::Validation {
                message: format!("{field}: {message}"),
            },
            InvalidCredentials => Self::InvalidCredentials,
            InvalidToken => Self::InvalidToken,
            IntensityOutOfRange { value, min, max } => Self::IntensityOutOfRange { value, min, max },
            Database { .. } | Internal { .. } => Self::Internal,
        }
    }
}
