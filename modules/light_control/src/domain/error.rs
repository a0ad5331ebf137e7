use thiserror::Error;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Username '{username}' is already taken")]
    UsernameTaken { username: String },

    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    /// Unknown user or wrong password; deliberately indistinguishable.
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Intensity {value} outside accepted range {min}..={max}")]
    IntensityOutOfRange { value: i32, min: i32, max: i32 },

    #[error("Database error: {message}")]
    Database { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn username_taken(username: impl Into<String>) -> Self {
        Self::UsernameTaken {
            username: username.into(),
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
