// src/error.rs

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use log::error;
use thiserror::Error;

use crate::models::{ProjectId, UserId};
use crate::store::StoreError;

/// Every failure a request can end with. The handlers return these and
/// actix renders them through [`ResponseError`].
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    Validation(String),
    #[error("user {assignee} is not a contributor to project {project}")]
    InvalidAssignee { assignee: UserId, project: ProjectId },
    #[error("project_id {given} does not match project {expected} in the path")]
    InvalidReference { given: ProjectId, expected: ProjectId },
    #[error("{0}")]
    AlreadyExists(String),
    #[error("{0}")]
    MethodNotSupported(String),
    #[error("internal error")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(what: &str, id: i64) -> Self {
        ApiError::NotFound(format!("{} {} not found", what, id))
    }

    /// Translates a failed store write: a unique-key violation becomes
    /// `AlreadyExists` with the given message, anything else maps as usual.
    pub fn from_write(err: StoreError, conflict: &str) -> Self {
        match err {
            StoreError::UniqueViolation(_) => ApiError::AlreadyExists(conflict.to_string()),
            other => other.into(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::UniqueViolation(constraint) => {
                ApiError::AlreadyExists(format!("{} already exists", constraint))
            }
            StoreError::MissingParent(what, id) => ApiError::not_found(what, id),
            StoreError::Backend(msg) => {
                error!("Store error: {}", msg);
                ApiError::Internal(msg)
            }
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_)
            | ApiError::InvalidAssignee { .. }
            | ApiError::InvalidReference { .. } => StatusCode::BAD_REQUEST,
            ApiError::AlreadyExists(_) => StatusCode::CONFLICT,
            ApiError::MethodNotSupported(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(serde_json::json!({ "error": self.to_string() }))
    }
}
