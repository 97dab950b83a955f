use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("NOT_FOUND: {0}")]
    NotFound(String),
    #[error("UNAUTHORIZED: {0}")]
    Unauthorized(String),
    #[error("UNAUTHENTICATED: {0}")]
    Unauthenticated(String),
    #[error("CONFLICT: {0}")]
    Conflict(String),
    #[error("VALIDATION: {0}")]
    Validation(String),
    #[error("IDENTITY_PROVIDER: {0}")]
    Identity(String),
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl AppError {
    /// Message safe to show to the person who made the request.
    pub fn user_message(&self) -> &str {
        match self {
            Self::NotFound(message)
            | Self::Unauthorized(message)
            | Self::Unauthenticated(message)
            | Self::Validation(message) => message,
            Self::Conflict(_) | Self::Io(_) | Self::Internal(_) => "Something went wrong on our side.",
            Self::Identity(_) => "The identity provider could not complete the request.",
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(value: rusqlite::Error) -> Self {
        if let rusqlite::Error::SqliteFailure(code, message) = &value {
            if code.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE {
                return Self::Conflict(message.clone().unwrap_or_else(|| value.to_string()));
            }
        }
        Self::Internal(value.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(value: serde_json::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(value: reqwest::Error) -> Self {
        Self::Identity(value.without_url().to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        Self::Internal(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
