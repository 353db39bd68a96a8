use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use missive_types::api::ApiResponse;

/// Every way a handler can fail, one variant per failure class. The HTTP
/// status is a function of the class alone; the display string is the
/// client-facing error text.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Bad or missing input, rejected before any storage access.
    #[error("{0}")]
    Validation(String),

    /// Uniform for unknown username and wrong password alike.
    #[error("Invalid username or password")]
    InvalidCredentials,

    /// Uniform for every token failure mode: missing, malformed, expired.
    #[error("Authentication required")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Username already exists")]
    UsernameTaken,

    #[error("It is not your turn to send a letter")]
    NotYourTurn,

    /// Remaining time is exact seconds internally; the message rounds up to
    /// whole hours for humans.
    #[error("You must wait {} more hours before sending another letter", (.remaining_seconds + 3599) / 3600)]
    MustWait { remaining_seconds: i64 },

    #[error("{0}")]
    AlreadyPaired(String),

    #[error("You cannot invite yourself")]
    SelfInvite,

    #[error("Invalid invite code")]
    InvalidCode,

    /// Unexpected data-layer failure. Full detail goes to the server log,
    /// never to the caller.
    #[error("Internal server error")]
    Storage(anyhow::Error),
}

impl ApiError {
    pub(crate) fn not_paired() -> Self {
        ApiError::NotFound("You are not paired with anyone".into())
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidCredentials | ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::UsernameTaken
            | ApiError::NotYourTurn
            | ApiError::MustWait { .. }
            | ApiError::AlreadyPaired(_)
            | ApiError::SelfInvite
            | ApiError::InvalidCode => StatusCode::CONFLICT,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::Storage(err) => error!("Storage failure: {:#}", err),
            // Kept apart from NotFound in the log so a denied access is never
            // mistaken for a missing record.
            ApiError::Forbidden(msg) => warn!("Forbidden: {}", msg),
            _ => {}
        }

        let status = self.status();
        let body = ApiResponse::<()>::error(self.to_string());
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::Storage(err)
    }
}

pub(crate) fn join_error(err: tokio::task::JoinError) -> ApiError {
    error!("spawn_blocking join error: {}", err);
    ApiError::Storage(anyhow::anyhow!("blocking task failed: {err}"))
}
