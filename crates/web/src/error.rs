//! Application error mapped to HTML responses.

use crate::page;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use estudo_core::LoadError;
use thiserror::Error;

/// Failures that prevent the form itself from being shown.
///
/// Generation failures are not `AppError`s: they re-render the form with
/// the message and the selection kept.
#[derive(Error, Debug)]
pub enum AppError {
    /// The lookup table is missing or malformed.
    #[error(transparent)]
    Load(#[from] LoadError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Load(e) => {
                log::error!("{}", e);
                (StatusCode::SERVICE_UNAVAILABLE, Html(page::render_load_error(e))).into_response()
            }
            AppError::Internal(message) => {
                log::error!("{}", message);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Html(page::render_internal_error(message)),
                )
                    .into_response()
            }
        }
    }
}
