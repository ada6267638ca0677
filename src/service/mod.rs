// src/service/mod.rs
//
// Resource operations. Each one resolves what its path names (NotFound),
// then asks the policy table (Forbidden / Unauthenticated), and only then
// validates and touches the store.

pub mod comment;
pub mod contributor;
pub mod issue;
pub mod project;

use crate::error::ApiError;
use crate::models::{Issue, IssueId, Project, ProjectId, User, UserId};
use crate::permissions::{Action, PolicyTable, Resource, Subject, Target};
use crate::store::Store;

/// Per-request state handed to every operation.
pub struct RequestContext<'a> {
    pub store: &'a dyn Store,
    pub policies: &'a PolicyTable,
    pub actor: Option<User>,
}

impl<'a> RequestContext<'a> {
    pub fn new(store: &'a dyn Store, policies: &'a PolicyTable, actor: Option<User>) -> Self {
        RequestContext { store, policies, actor }
    }

    /// The actor that a passed authorization check guarantees.
    fn require_actor(&self) -> Result<&User, ApiError> {
        self.actor
            .as_ref()
            .ok_or_else(|| ApiError::Unauthenticated("authentication credentials were not provided".to_string()))
    }

    async fn project(&self, project_id: ProjectId) -> Result<Project, ApiError> {
        self.store
            .project_by_id(project_id)
            .await?
            .ok_or_else(|| ApiError::not_found("project", project_id))
    }

    async fn issue(&self, project_id: ProjectId, issue_id: IssueId) -> Result<Issue, ApiError> {
        self.store
            .issue_by_id(project_id, issue_id)
            .await?
            .ok_or_else(|| ApiError::not_found("issue", issue_id))
    }

    /// Builds the authorization subject for `project`, looking up whether
    /// the actor has a contributor row in it.
    async fn subject<'s>(&'s self, project: Option<&'s Project>) -> Result<Subject<'s>, ApiError> {
        let is_contributor = match (self.actor.as_ref(), project) {
            (Some(actor), Some(project)) => actor.is_contributor(self.store, project).await?,
            _ => false,
        };
        Ok(Subject {
            actor: self.actor.as_ref(),
            project,
            is_contributor,
        })
    }

    async fn authorize(
        &self,
        resource: Resource,
        action: Action,
        project: Option<&Project>,
        target: Option<Target<'_>>,
    ) -> Result<(), ApiError> {
        let subject = self.subject(project).await?;
        self.policies.check(resource, action, &subject, target)
    }

    /// An assignee must own the project or contribute to it.
    async fn check_assignee(&self, project: &Project, assignee: UserId) -> Result<(), ApiError> {
        if assignee == project.author_user_id {
            return Ok(());
        }
        match self.store.contributor(project.project_id, assignee).await? {
            Some(_) => Ok(()),
            None => Err(ApiError::InvalidAssignee {
                assignee,
                project: project.project_id,
            }),
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::models::{NewUser, ProjectPayload, ProjectType};
    use crate::store::MemoryStore;

    pub struct World {
        pub store: MemoryStore,
        pub policies: PolicyTable,
    }

    impl World {
        pub fn new() -> Self {
            World {
                store: MemoryStore::new(),
                policies: PolicyTable::standard(),
            }
        }

        pub async fn user(&self, name: &str) -> User {
            self.store
                .insert_user(NewUser {
                    first_name: name.to_string(),
                    last_name: "Test".to_string(),
                    email: format!("{}@example.com", name.to_lowercase()),
                    password_hash: "hash".to_string(),
                })
                .await
                .unwrap()
        }

        pub fn as_user(&self, user: &User) -> RequestContext<'_> {
            RequestContext::new(&self.store, &self.policies, Some(user.clone()))
        }

        pub fn anonymous(&self) -> RequestContext<'_> {
            RequestContext::new(&self.store, &self.policies, None)
        }

        pub async fn project(&self, owner: &User, title: &str) -> Project {
            project::create(
                &self.as_user(owner),
                ProjectPayload {
                    title: title.to_string(),
                    description: String::new(),
                    project_type: ProjectType::Product,
                },
            )
            .await
            .unwrap()
        }

        pub async fn add_contributor(&self, owner: &User, project: &Project, user: &User) {
            contributor::create(
                &self.as_user(owner),
                project.project_id,
                serde_json::from_value(serde_json::json!({ "user_id": user.user_id })).unwrap(),
            )
            .await
            .unwrap();
        }
    }
}
