use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use tracing::error;

use crate::views;

/// Failures a handler can end with.
///
/// `Unauthorized` renders as HTTP 200 with an "Access unauthorized." notice
/// rather than a 401, so browsers land on a normal page.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("not found")]
    NotFound,

    #[error("access unauthorized")]
    Unauthorized,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::NotFound => (StatusCode::NOT_FOUND, Html(views::not_found())).into_response(),
            AppError::Unauthorized => (StatusCode::OK, Html(views::unauthorized())).into_response(),
            AppError::Internal(e) => {
                error!("Internal error: {:#}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, Html(views::server_error())).into_response()
            }
        }
    }
}
