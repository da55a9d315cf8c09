use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("No refresh token available")]
    MissingRefreshToken,

    #[error("Failed to refresh token (status {0})")]
    RenewalFailed(StatusCode),

    #[error("Login failed (status {0})")]
    LoginFailed(StatusCode),

    #[error("Unauthorized - token may be expired")]
    Unauthorized,

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Server error (status {0}): {1}")]
    ServerError(StatusCode, String),

    #[error("API request failed with status {0}: {1}")]
    Status(StatusCode, String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid endpoint {0}")]
    InvalidEndpoint(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            403 => ApiError::AccessDenied(truncated),
            404 => ApiError::NotFound(truncated),
            500..=599 => ApiError::ServerError(status, truncated),
            _ => ApiError::Status(status, truncated),
        }
    }

    /// HTTP status carried by this error, if it came from a response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::RenewalFailed(status)
            | ApiError::LoginFailed(status)
            | ApiError::ServerError(status, _)
            | ApiError::Status(status, _) => Some(*status),
            ApiError::Unauthorized => Some(StatusCode::UNAUTHORIZED),
            ApiError::AccessDenied(_) => Some(StatusCode::FORBIDDEN),
            ApiError::NotFound(_) => Some(StatusCode::NOT_FOUND),
            ApiError::Network(e) => e.status(),
            ApiError::MissingRefreshToken
            | ApiError::InvalidResponse(_)
            | ApiError::InvalidEndpoint(_) => None,
        }
    }

    /// True when the stored session is gone and the user has to log in again.
    pub fn requires_login(&self) -> bool {
        matches!(
            self,
            ApiError::MissingRefreshToken | ApiError::RenewalFailed(_) | ApiError::Unauthorized
        )
    }
}

/// Check an `anyhow` error chain for an `ApiError` that requires a new login.
pub fn requires_login(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ApiError>()
        .map(ApiError::requires_login)
        .unwrap_or(false)
}
