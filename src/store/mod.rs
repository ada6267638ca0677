// src/store/mod.rs

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{
    Comment, CommentId, Contributor, Issue, IssueId, NewComment, NewContributor, NewIssue,
    NewProject, NewUser, Project, ProjectId, User, UserId,
};

#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write. Carries the constraint name.
    #[error("unique constraint violated: {0}")]
    UniqueViolation(&'static str),
    /// The parent row a child insert hangs off no longer exists.
    #[error("{0} {1} no longer exists")]
    MissingParent(&'static str, i64),
    #[error("store backend: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// The relational store behind the services. Ids are assigned by the store.
/// Every `list`-style method returns rows ordered by primary id ascending.
/// The two `delete_*` methods that own children remove them in the same
/// atomic unit.
#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_user(&self, new: NewUser) -> StoreResult<User>;
    async fn user_by_id(&self, user_id: UserId) -> StoreResult<Option<User>>;
    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn insert_project(&self, new: NewProject) -> StoreResult<Project>;
    async fn project_by_id(&self, project_id: ProjectId) -> StoreResult<Option<Project>>;
    /// Projects `user_id` owns or contributes to.
    async fn projects_visible_to(&self, user_id: UserId) -> StoreResult<Vec<Project>>;
    /// Returns false when the row no longer exists.
    async fn update_project(&self, project: &Project) -> StoreResult<bool>;
    /// Removes the project with its contributors, issues and their comments.
    async fn delete_project(&self, project_id: ProjectId) -> StoreResult<bool>;

    async fn insert_contributor(&self, new: NewContributor) -> StoreResult<Contributor>;
    async fn contributor(&self, project_id: ProjectId, user_id: UserId) -> StoreResult<Option<Contributor>>;
    async fn contributors_of(&self, project_id: ProjectId) -> StoreResult<Vec<Contributor>>;
    async fn delete_contributor(&self, project_id: ProjectId, user_id: UserId) -> StoreResult<bool>;

    async fn insert_issue(&self, new: NewIssue) -> StoreResult<Issue>;
    /// Looks the issue up inside its project only.
    async fn issue_by_id(&self, project_id: ProjectId, issue_id: IssueId) -> StoreResult<Option<Issue>>;
    async fn issues_of(&self, project_id: ProjectId) -> StoreResult<Vec<Issue>>;
    async fn update_issue(&self, issue: &Issue) -> StoreResult<bool>;
    /// Removes the issue with its comments.
    async fn delete_issue(&self, issue_id: IssueId) -> StoreResult<bool>;

    async fn insert_comment(&self, new: NewComment) -> StoreResult<Comment>;
    async fn comment_by_id(&self, issue_id: IssueId, comment_id: CommentId) -> StoreResult<Option<Comment>>;
    async fn comments_of(&self, issue_id: IssueId) -> StoreResult<Vec<Comment>>;
    async fn update_comment(&self, comment: &Comment) -> StoreResult<bool>;
    async fn delete_comment(&self, comment_id: CommentId) -> StoreResult<bool>;
}
