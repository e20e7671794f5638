use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect, Response};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Not found")]
    NotFound,

    #[error("{0}")]
    Conflict(String),

    #[error("Only the author can modify this")]
    NotAuthor,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Session expired")]
    SessionExpired,

    #[error("You have already reacted to this")]
    AlreadyReacted,

    #[error("Exactly one of post or comment must be targeted")]
    InvalidTarget,

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Errors a handler re-renders as an inline form message instead of
    /// letting them bubble up as an HTTP error page.
    pub fn is_form_error(&self) -> bool {
        matches!(self, AppError::Validation(_) | AppError::Conflict(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            // This is an HTML app: unauthenticated users go to the login form.
            AppError::Unauthorized | AppError::SessionExpired => {
                Redirect::to("/login").into_response()
            }
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()).into_response(),
            AppError::InvalidTarget => {
                (StatusCode::BAD_REQUEST, self.to_string()).into_response()
            }
            AppError::NotFound => (StatusCode::NOT_FOUND, "Not found".to_string()).into_response(),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()).into_response(),
            AppError::AlreadyReacted => (StatusCode::CONFLICT, self.to_string()).into_response(),
            AppError::NotAuthor => (StatusCode::FORBIDDEN, "Forbidden".to_string()).into_response(),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
                    .into_response()
            }
            AppError::Pool(e) => {
                tracing::error!("Pool error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
                    .into_response()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
                    .into_response()
            }
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
