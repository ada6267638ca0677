// src/models/mod.rs

mod comment;
mod contributor;
mod issue;
mod project;
mod user;

pub use comment::{Comment, CommentPayload, NewComment};
pub use contributor::{Contributor, ContributorPayload, ContributorPermission, ContributorRole, NewContributor};
pub use issue::{Issue, IssuePayload, IssuePriority, IssueStatus, NewIssue};
pub use project::{NewProject, Project, ProjectPayload, ProjectType};
pub use user::{NewUser, User, UserView};

use crate::error::ApiError;

pub type UserId = i64;
pub type ProjectId = i64;
pub type ContributorId = i64;
pub type IssueId = i64;
pub type CommentId = i64;

/// Checks a text field's length in characters, inclusive on both ends.
pub(crate) fn check_length(field: &str, value: &str, min: usize, max: usize) -> Result<(), ApiError> {
    let len = value.chars().count();
    if len < min {
        if min == 1 {
            return Err(ApiError::Validation(format!("{} may not be blank", field)));
        }
        return Err(ApiError::Validation(format!(
            "{} must be at least {} characters",
            field, min
        )));
    }
    if len > max {
        return Err(ApiError::Validation(format!(
            "{} must be at most {} characters",
            field, max
        )));
    }
    Ok(())
}

/// Unwraps a field a create payload must carry.
pub(crate) fn required<T>(field: &str, value: Option<T>) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::Validation(format!("{} is required", field)))
}
