//! HTTP-facing error type.
//!
//! # Invariants
//! - Not-found conditions render the not-found page with 404.
//! - Rejected input (validation, unsupported cover type) maps to 422.
//! - Storage and task failures render a generic 500 page; details go to the log only.

use crate::covers::CoverError;
use crate::views;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bookshelf_core::CatalogueError;
use log::error;
use std::error::Error;
use std::fmt::{Display, Formatter};
use tokio::task::JoinError;

#[derive(Debug)]
pub enum AppError {
    /// Catalogue operation failed.
    Catalogue(CatalogueError),
    /// Path segment is not a book id.
    InvalidId(String),
    /// Cover upload could not be stored.
    Cover(CoverError),
    /// Blocking catalogue task panicked or was cancelled.
    Task(JoinError),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Catalogue(err) => write!(f, "{err}"),
            Self::InvalidId(value) => write!(f, "invalid book id `{value}`"),
            Self::Cover(err) => write!(f, "{err}"),
            Self::Task(err) => write!(f, "catalogue task failed: {err}"),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Catalogue(err) => Some(err),
            Self::Cover(err) => Some(err),
            Self::Task(err) => Some(err),
            Self::InvalidId(_) => None,
        }
    }
}

impl From<CatalogueError> for AppError {
    fn from(value: CatalogueError) -> Self {
        Self::Catalogue(value)
    }
}

impl From<CoverError> for AppError {
    fn from(value: CoverError) -> Self {
        Self::Cover(value)
    }
}

impl From<JoinError> for AppError {
    fn from(value: JoinError) -> Self {
        Self::Task(value)
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Catalogue(CatalogueError::NotFound(_)) | Self::InvalidId(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Catalogue(CatalogueError::Validation(_))
            | Self::Cover(CoverError::UnsupportedType) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Catalogue(_) | Self::Cover(_) | Self::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match status {
            StatusCode::NOT_FOUND => (status, views::not_found()).into_response(),
            StatusCode::UNPROCESSABLE_ENTITY => (status, self.to_string()).into_response(),
            _ => {
                error!(
                    "event=request_failed module=server status=error http_status={} error={}",
                    status.as_u16(),
                    self
                );
                (status, views::server_error()).into_response()
            }
        }
    }
}
