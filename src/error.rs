//! Application error types and HTTP response mapping.
//!
//! Defines `AppError` enum for all error conditions and implements Axum's
//! `IntoResponse` to automatically convert errors to appropriate HTTP responses
//! with JSON error bodies.
//!
//! Error mappings:
//! - `RepoNotFound`, `PathNotFound`, `CommitNotFound`, `RevisionNotFound`, `NoBranches` → 404
//! - `InvalidPath`, `InvalidService`, `RootCommit` → 400
//! - `Git`, `RefEnumeration`, `BlobRead`, `Io`, `Internal` → 500
//! - `Subprocess` → 502

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Repository not found: {0}")]
    RepoNotFound(String),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Commit not found: {0}")]
    CommitNotFound(String),

    #[error("Revision not found: {0}")]
    RevisionNotFound(String),

    #[error("No branches found")]
    NoBranches,

    #[error("Failed to enumerate references: {0}")]
    RefEnumeration(String),

    #[error("Failed to read blob {0}")]
    BlobRead(String),

    #[error("Commit {0} has no parent")]
    RootCommit(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Unsupported service: {0}")]
    InvalidService(String),

    #[error("Git subprocess failed: {0}")]
    Subprocess(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::RepoNotFound(_)
            | AppError::PathNotFound(_)
            | AppError::CommitNotFound(_)
            | AppError::RevisionNotFound(_)
            | AppError::NoBranches => StatusCode::NOT_FOUND,
            AppError::InvalidPath(_) | AppError::InvalidService(_) | AppError::RootCommit(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Subprocess(_) => StatusCode::BAD_GATEWAY,
            AppError::Git(_)
            | AppError::Io(_)
            | AppError::RefEnumeration(_)
            | AppError::BlobRead(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!("{}", self);
        }

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
