use axum::http::StatusCode;
use thiserror::Error;

/// Failures of the two file-backed stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {path}: {reason}")]
    Unavailable { path: String, reason: String },

    #[error("category not found: {0}")]
    CategoryNotFound(String),

    #[error("user already exists: {0}")]
    AlreadyExists(String),

    #[error("no matching account")]
    NotFound,
}

impl StoreError {
    pub fn unavailable(path: &std::path::Path, reason: impl ToString) -> Self {
        Self::Unavailable {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Outcomes of the account flow that are shown inline on the account page.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid Username or Password")]
    InvalidCredentials,

    #[error("User already exists!")]
    DuplicateUser,

    #[error("No account matches that username and recovery key")]
    RecoveryFailed,

    #[error("Please fill in both username and password")]
    MissingFields,

    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::AlreadyExists(_) => Self::DuplicateUser,
            StoreError::NotFound => Self::RecoveryFailed,
            other => Self::Store(other),
        }
    }
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidCredentials | Self::RecoveryFailed => StatusCode::UNAUTHORIZED,
            Self::DuplicateUser => StatusCode::CONFLICT,
            Self::MissingFields => StatusCode::BAD_REQUEST,
            Self::Store(err) => AppError::from_store(err).status,
        }
    }
}

#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
}

impl AppError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn unauthorized() -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: "login required".to_string(),
        }
    }

    pub fn internal(err: impl std::error::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }

    fn from_store(err: &StoreError) -> Self {
        let status = match err {
            StoreError::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            StoreError::CategoryNotFound(_) | StoreError::NotFound => StatusCode::NOT_FOUND,
            StoreError::AlreadyExists(_) => StatusCode::CONFLICT,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self::from_store(&err)
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err)
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        (self.status, self.message).into_response()
    }
}
