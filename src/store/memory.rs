// src/store/memory.rs

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::{Store, StoreError, StoreResult};
use crate::models::{
    Comment, CommentId, Contributor, ContributorId, Issue, IssueId, NewComment, NewContributor,
    NewIssue, NewProject, NewUser, Project, ProjectId, User, UserId,
};

#[derive(Default)]
struct Tables {
    next_id: i64,
    users: BTreeMap<UserId, User>,
    projects: BTreeMap<ProjectId, Project>,
    contributors: BTreeMap<ContributorId, Contributor>,
    issues: BTreeMap<IssueId, Issue>,
    comments: BTreeMap<CommentId, Comment>,
}

impl Tables {
    fn allocate(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn issue_title_taken(&self, candidate: &Issue) -> bool {
        self.issues.values().any(|i| {
            i.issue_id != candidate.issue_id
                && i.project_id == candidate.project_id
                && i.author_user_id == candidate.author_user_id
                && i.title == candidate.title
        })
    }

    fn require_project(&self, project_id: ProjectId) -> StoreResult<()> {
        if self.projects.contains_key(&project_id) {
            Ok(())
        } else {
            Err(StoreError::MissingParent("project", project_id))
        }
    }

    fn drop_issue(&mut self, issue_id: IssueId) -> bool {
        self.comments.retain(|_, c| c.issue_id != issue_id);
        self.issues.remove(&issue_id).is_some()
    }
}

/// In-process store. A single lock guards all tables and each call holds it
/// once, so constraint checks and cascades are atomic to other callers.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flips a user's active flag. Accounts are deactivated, never deleted.
    #[cfg(test)]
    pub async fn set_user_active(&self, user_id: UserId, active: bool) -> bool {
        let mut tables = self.tables.write().await;
        match tables.users.get_mut(&user_id) {
            Some(user) => {
                user.is_active = active;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, new: NewUser) -> StoreResult<User> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == new.email) {
            return Err(StoreError::UniqueViolation("user email"));
        }
        let user = User {
            user_id: tables.allocate(),
            first_name: new.first_name,
            last_name: new.last_name,
            email: new.email,
            password: new.password_hash,
            is_active: true,
        };
        tables.users.insert(user.user_id, user.clone());
        Ok(user)
    }

    async fn user_by_id(&self, user_id: UserId) -> StoreResult<Option<User>> {
        Ok(self.tables.read().await.users.get(&user_id).cloned())
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn insert_project(&self, new: NewProject) -> StoreResult<Project> {
        let mut tables = self.tables.write().await;
        let project = Project {
            project_id: tables.allocate(),
            title: new.title,
            description: new.description,
            project_type: new.project_type,
            author_user_id: new.author_user_id,
        };
        tables.projects.insert(project.project_id, project.clone());
        Ok(project)
    }

    async fn project_by_id(&self, project_id: ProjectId) -> StoreResult<Option<Project>> {
        Ok(self.tables.read().await.projects.get(&project_id).cloned())
    }

    async fn projects_visible_to(&self, user_id: UserId) -> StoreResult<Vec<Project>> {
        let tables = self.tables.read().await;
        Ok(tables
            .projects
            .values()
            .filter(|p| {
                p.author_user_id == user_id
                    || tables
                        .contributors
                        .values()
                        .any(|c| c.project_id == p.project_id && c.user_id == user_id)
            })
            .cloned()
            .collect())
    }

    async fn update_project(&self, project: &Project) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.projects.get_mut(&project.project_id) {
            Some(row) => {
                *row = project.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_project(&self, project_id: ProjectId) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.projects.remove(&project_id).is_none() {
            return Ok(false);
        }
        tables.contributors.retain(|_, c| c.project_id != project_id);
        let issue_ids: Vec<IssueId> = tables
            .issues
            .values()
            .filter(|i| i.project_id == project_id)
            .map(|i| i.issue_id)
            .collect();
        for issue_id in issue_ids {
            tables.drop_issue(issue_id);
        }
        Ok(true)
    }

    async fn insert_contributor(&self, new: NewContributor) -> StoreResult<Contributor> {
        let mut tables = self.tables.write().await;
        tables.require_project(new.project_id)?;
        if tables
            .contributors
            .values()
            .any(|c| c.project_id == new.project_id && c.user_id == new.user_id)
        {
            return Err(StoreError::UniqueViolation("contributor"));
        }
        let contributor = Contributor {
            contributor_id: tables.allocate(),
            user_id: new.user_id,
            project_id: new.project_id,
            permission: new.permission,
            role: new.role,
        };
        tables
            .contributors
            .insert(contributor.contributor_id, contributor.clone());
        Ok(contributor)
    }

    async fn contributor(&self, project_id: ProjectId, user_id: UserId) -> StoreResult<Option<Contributor>> {
        let tables = self.tables.read().await;
        Ok(tables
            .contributors
            .values()
            .find(|c| c.project_id == project_id && c.user_id == user_id)
            .cloned())
    }

    async fn contributors_of(&self, project_id: ProjectId) -> StoreResult<Vec<Contributor>> {
        let tables = self.tables.read().await;
        Ok(tables
            .contributors
            .values()
            .filter(|c| c.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn delete_contributor(&self, project_id: ProjectId, user_id: UserId) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.contributors.len();
        tables
            .contributors
            .retain(|_, c| !(c.project_id == project_id && c.user_id == user_id));
        Ok(tables.contributors.len() != before)
    }

    async fn insert_issue(&self, new: NewIssue) -> StoreResult<Issue> {
        let mut tables = self.tables.write().await;
        tables.require_project(new.project_id)?;
        let mut issue = Issue {
            issue_id: 0,
            title: new.title,
            desc: new.desc,
            tag: new.tag,
            priority: new.priority,
            project_id: new.project_id,
            status: new.status,
            author_user_id: new.author_user_id,
            assignee_user_id: new.assignee_user_id,
            time_created: Utc::now(),
        };
        if tables.issue_title_taken(&issue) {
            return Err(StoreError::UniqueViolation("issue title"));
        }
        issue.issue_id = tables.allocate();
        tables.issues.insert(issue.issue_id, issue.clone());
        Ok(issue)
    }

    async fn issue_by_id(&self, project_id: ProjectId, issue_id: IssueId) -> StoreResult<Option<Issue>> {
        let tables = self.tables.read().await;
        Ok(tables
            .issues
            .get(&issue_id)
            .filter(|i| i.project_id == project_id)
            .cloned())
    }

    async fn issues_of(&self, project_id: ProjectId) -> StoreResult<Vec<Issue>> {
        let tables = self.tables.read().await;
        Ok(tables
            .issues
            .values()
            .filter(|i| i.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn update_issue(&self, issue: &Issue) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if !tables.issues.contains_key(&issue.issue_id) {
            return Ok(false);
        }
        if tables.issue_title_taken(issue) {
            return Err(StoreError::UniqueViolation("issue title"));
        }
        tables.issues.insert(issue.issue_id, issue.clone());
        Ok(true)
    }

    async fn delete_issue(&self, issue_id: IssueId) -> StoreResult<bool> {
        Ok(self.tables.write().await.drop_issue(issue_id))
    }

    async fn insert_comment(&self, new: NewComment) -> StoreResult<Comment> {
        let mut tables = self.tables.write().await;
        if !tables.issues.contains_key(&new.issue_id) {
            return Err(StoreError::MissingParent("issue", new.issue_id));
        }
        let comment = Comment {
            comment_id: tables.allocate(),
            description: new.description,
            author_user_id: new.author_user_id,
            issue_id: new.issue_id,
            time_created: Utc::now(),
        };
        tables.comments.insert(comment.comment_id, comment.clone());
        Ok(comment)
    }

    async fn comment_by_id(&self, issue_id: IssueId, comment_id: CommentId) -> StoreResult<Option<Comment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .comments
            .get(&comment_id)
            .filter(|c| c.issue_id == issue_id)
            .cloned())
    }

    async fn comments_of(&self, issue_id: IssueId) -> StoreResult<Vec<Comment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .comments
            .values()
            .filter(|c| c.issue_id == issue_id)
            .cloned()
            .collect())
    }

    async fn update_comment(&self, comment: &Comment) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        match tables.comments.get_mut(&comment.comment_id) {
            Some(row) => {
                *row = comment.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_comment(&self, comment_id: CommentId) -> StoreResult<bool> {
        Ok(self.tables.write().await.comments.remove(&comment_id).is_some())
    }
}
