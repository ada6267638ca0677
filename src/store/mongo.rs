// src/store/mongo.rs

use async_trait::async_trait;
use chrono::Utc;
use futures_util::TryStreamExt;
use log::{debug, error, info};
use mongodb::bson::{doc, Document};
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure, TRANSIENT_TRANSACTION_ERROR};
use mongodb::options::{ClientOptions, IndexOptions, ReturnDocument};
use mongodb::{Client, ClientSession, Collection, Database, IndexModel};

use super::{Store, StoreError, StoreResult};
use crate::models::{
    Comment, CommentId, Contributor, Issue, IssueId, NewComment, NewContributor, NewIssue,
    NewProject, NewUser, Project, ProjectId, User, UserId,
};

const DUPLICATE_KEY: i32 = 11000;
const MAX_TX_ATTEMPTS: u32 = 3;

impl From<MongoError> for StoreError {
    fn from(err: MongoError) -> Self {
        StoreError::Backend(err.to_string())
    }
}

fn is_duplicate_key(err: &MongoError) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(e)) => e.code == DUPLICATE_KEY,
        ErrorKind::Command(e) => e.code == DUPLICATE_KEY,
        _ => false,
    }
}

/// Maps a failed write, turning duplicate-key errors into a named violation.
fn write_error(err: MongoError, constraint: &'static str) -> StoreError {
    if is_duplicate_key(&err) {
        debug!("Duplicate key on {}: {}", constraint, err);
        StoreError::UniqueViolation(constraint)
    } else {
        err.into()
    }
}

/// MongoDB-backed store. Cascading deletes run in a transaction, so the
/// deployment must be a replica set.
pub struct MongoStore {
    client: Client,
    db: Database,
}

impl MongoStore {
    pub async fn init(uri: &str, db_name: &str) -> StoreResult<Self> {
        let client_options = ClientOptions::parse(uri).await?;
        let client = Client::with_options(client_options)?;
        let db = client.database(db_name);
        let store = MongoStore { client, db };
        store.ensure_indexes().await?;
        info!("Connected to MongoDB database {}", db_name);
        Ok(store)
    }

    fn users(&self) -> Collection<User> {
        self.db.collection("users")
    }

    fn projects(&self) -> Collection<Project> {
        self.db.collection("projects")
    }

    fn contributors(&self) -> Collection<Contributor> {
        self.db.collection("contributors")
    }

    fn issues(&self) -> Collection<Issue> {
        self.db.collection("issues")
    }

    fn comments(&self) -> Collection<Comment> {
        self.db.collection("comments")
    }

    async fn ensure_indexes(&self) -> StoreResult<()> {
        let unique = |keys: Document| {
            IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().unique(true).build())
                .build()
        };

        self.users().create_index(unique(doc! { "user_id": 1 })).await?;
        self.users().create_index(unique(doc! { "email": 1 })).await?;
        self.projects().create_index(unique(doc! { "project_id": 1 })).await?;
        self.contributors()
            .create_index(unique(doc! { "contributor_id": 1 }))
            .await?;
        self.contributors()
            .create_index(unique(doc! { "project_id": 1, "user_id": 1 }))
            .await?;
        self.issues().create_index(unique(doc! { "issue_id": 1 })).await?;
        self.issues()
            .create_index(unique(doc! { "title": 1, "project_id": 1, "author_user_id": 1 }))
            .await?;
        self.comments().create_index(unique(doc! { "comment_id": 1 })).await?;
        self.comments()
            .create_index(IndexModel::builder().keys(doc! { "issue_id": 1 }).build())
            .await?;
        Ok(())
    }

    /// Next value of the named sequence, shared across processes.
    async fn next_id(&self, sequence: &str) -> StoreResult<i64> {
        let counters = self.db.collection::<Document>("counters");
        let updated = counters
            .find_one_and_update(doc! { "_id": sequence }, doc! { "$inc": { "seq": 1_i64 } })
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await?;
        updated
            .and_then(|d| d.get_i64("seq").ok())
            .ok_or_else(|| StoreError::Backend(format!("sequence {} returned no value", sequence)))
    }

    /// Runs `step` in its own transaction, retrying when the server labels
    /// the failure transient (a write conflict with a concurrent cascade or
    /// sibling insert).
    async fn in_transaction(&self, step: TxStep<'_>) -> Result<bool, MongoError> {
        let mut attempt = 1;
        loop {
            let mut session = self.client.start_session().await?;
            session.start_transaction().await?;
            let outcome = match self.run_step(step, &mut session).await {
                Ok(done) => session.commit_transaction().await.map(|_| done),
                Err(e) => {
                    if let Err(abort) = session.abort_transaction().await {
                        error!("Error aborting transaction: {}", abort);
                    }
                    Err(e)
                }
            };
            match outcome {
                Err(e) if e.contains_label(TRANSIENT_TRANSACTION_ERROR) && attempt < MAX_TX_ATTEMPTS => {
                    debug!("Retrying {:?} after transient error: {}", step, e);
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    /// For deletes the result says whether the root row existed; for child
    /// inserts, whether the parent did.
    async fn run_step(&self, step: TxStep<'_>, session: &mut ClientSession) -> Result<bool, MongoError> {
        match step {
            TxStep::DeleteProject(project_id) => self.cascade_project(project_id, session).await,
            TxStep::DeleteIssue(issue_id) => self.cascade_issue(issue_id, session).await,
            TxStep::InsertContributor(row) => {
                if !self.touch_project(row.project_id, session).await? {
                    return Ok(false);
                }
                self.contributors().insert_one(row).session(&mut *session).await?;
                Ok(true)
            }
            TxStep::InsertIssue(row) => {
                if !self.touch_project(row.project_id, session).await? {
                    return Ok(false);
                }
                self.issues().insert_one(row).session(&mut *session).await?;
                Ok(true)
            }
            TxStep::InsertComment(row) => {
                let touched = self
                    .issues()
                    .update_one(doc! { "issue_id": row.issue_id }, doc! { "$inc": { "revision": 1_i64 } })
                    .session(&mut *session)
                    .await?;
                if touched.matched_count == 0 {
                    return Ok(false);
                }
                self.comments().insert_one(row).session(&mut *session).await?;
                Ok(true)
            }
        }
    }

    /// Bumps the project's revision so a concurrent cascade delete of it
    /// conflicts with this transaction.
    async fn touch_project(&self, project_id: ProjectId, session: &mut ClientSession) -> Result<bool, MongoError> {
        let res = self
            .projects()
            .update_one(doc! { "project_id": project_id }, doc! { "$inc": { "revision": 1_i64 } })
            .session(&mut *session)
            .await?;
        Ok(res.matched_count == 1)
    }

    async fn cascade_project(&self, project_id: ProjectId, session: &mut ClientSession) -> Result<bool, MongoError> {
        let filter = doc! { "project_id": project_id };
        let removed = self
            .projects()
            .delete_one(filter.clone())
            .session(&mut *session)
            .await?;
        if removed.deleted_count == 0 {
            return Ok(false);
        }
        let issue_ids = self
            .issues()
            .distinct("issue_id", filter.clone())
            .session(&mut *session)
            .await?;
        self.comments()
            .delete_many(doc! { "issue_id": { "$in": issue_ids } })
            .session(&mut *session)
            .await?;
        self.issues()
            .delete_many(filter.clone())
            .session(&mut *session)
            .await?;
        self.contributors()
            .delete_many(filter)
            .session(&mut *session)
            .await?;
        Ok(true)
    }

    async fn cascade_issue(&self, issue_id: IssueId, session: &mut ClientSession) -> Result<bool, MongoError> {
        let filter = doc! { "issue_id": issue_id };
        let removed = self
            .issues()
            .delete_one(filter.clone())
            .session(&mut *session)
            .await?;
        if removed.deleted_count == 0 {
            return Ok(false);
        }
        self.comments()
            .delete_many(filter)
            .session(&mut *session)
            .await?;
        Ok(true)
    }
}

/// Multi-document writes that must commit or vanish together.
#[derive(Debug, Clone, Copy)]
enum TxStep<'r> {
    DeleteProject(ProjectId),
    DeleteIssue(IssueId),
    InsertContributor(&'r Contributor),
    InsertIssue(&'r Issue),
    InsertComment(&'r Comment),
}

#[async_trait]
impl Store for MongoStore {
    async fn insert_user(&self, new: NewUser) -> StoreResult<User> {
        let user = User {
            user_id: self.next_id("users").await?,
            first_name: new.first_name,
            last_name: new.last_name,
            email: new.email,
            password: new.password_hash,
            is_active: true,
        };
        self.users()
            .insert_one(&user)
            .await
            .map_err(|e| write_error(e, "user email"))?;
        Ok(user)
    }

    async fn user_by_id(&self, user_id: UserId) -> StoreResult<Option<User>> {
        Ok(self.users().find_one(doc! { "user_id": user_id }).await?)
    }

    async fn user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.users().find_one(doc! { "email": email }).await?)
    }

    async fn insert_project(&self, new: NewProject) -> StoreResult<Project> {
        let project = Project {
            project_id: self.next_id("projects").await?,
            title: new.title,
            description: new.description,
            project_type: new.project_type,
            author_user_id: new.author_user_id,
        };
        self.projects()
            .insert_one(&project)
            .await
            .map_err(|e| write_error(e, "project"))?;
        Ok(project)
    }

    async fn project_by_id(&self, project_id: ProjectId) -> StoreResult<Option<Project>> {
        Ok(self.projects().find_one(doc! { "project_id": project_id }).await?)
    }

    async fn projects_visible_to(&self, user_id: UserId) -> StoreResult<Vec<Project>> {
        let member_of = self
            .contributors()
            .distinct("project_id", doc! { "user_id": user_id })
            .await?;
        let filter = doc! {
            "$or": [
                { "author_user_id": user_id },
                { "project_id": { "$in": member_of } },
            ]
        };
        let cursor = self
            .projects()
            .find(filter)
            .sort(doc! { "project_id": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn update_project(&self, project: &Project) -> StoreResult<bool> {
        let res = self
            .projects()
            .replace_one(doc! { "project_id": project.project_id }, project)
            .await?;
        Ok(res.matched_count == 1)
    }

    async fn delete_project(&self, project_id: ProjectId) -> StoreResult<bool> {
        Ok(self.in_transaction(TxStep::DeleteProject(project_id)).await?)
    }

    async fn insert_contributor(&self, new: NewContributor) -> StoreResult<Contributor> {
        let contributor = Contributor {
            contributor_id: self.next_id("contributors").await?,
            user_id: new.user_id,
            project_id: new.project_id,
            permission: new.permission,
            role: new.role,
        };
        let parent_exists = self
            .in_transaction(TxStep::InsertContributor(&contributor))
            .await
            .map_err(|e| write_error(e, "contributor"))?;
        if !parent_exists {
            return Err(StoreError::MissingParent("project", contributor.project_id));
        }
        Ok(contributor)
    }

    async fn contributor(&self, project_id: ProjectId, user_id: UserId) -> StoreResult<Option<Contributor>> {
        Ok(self
            .contributors()
            .find_one(doc! { "project_id": project_id, "user_id": user_id })
            .await?)
    }

    async fn contributors_of(&self, project_id: ProjectId) -> StoreResult<Vec<Contributor>> {
        let cursor = self
            .contributors()
            .find(doc! { "project_id": project_id })
            .sort(doc! { "contributor_id": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn delete_contributor(&self, project_id: ProjectId, user_id: UserId) -> StoreResult<bool> {
        let res = self
            .contributors()
            .delete_one(doc! { "project_id": project_id, "user_id": user_id })
            .await?;
        Ok(res.deleted_count == 1)
    }

    async fn insert_issue(&self, new: NewIssue) -> StoreResult<Issue> {
        let issue = Issue {
            issue_id: self.next_id("issues").await?,
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
        let parent_exists = self
            .in_transaction(TxStep::InsertIssue(&issue))
            .await
            .map_err(|e| write_error(e, "issue title"))?;
        if !parent_exists {
            return Err(StoreError::MissingParent("project", issue.project_id));
        }
        Ok(issue)
    }

    async fn issue_by_id(&self, project_id: ProjectId, issue_id: IssueId) -> StoreResult<Option<Issue>> {
        Ok(self
            .issues()
            .find_one(doc! { "project_id": project_id, "issue_id": issue_id })
            .await?)
    }

    async fn issues_of(&self, project_id: ProjectId) -> StoreResult<Vec<Issue>> {
        let cursor = self
            .issues()
            .find(doc! { "project_id": project_id })
            .sort(doc! { "issue_id": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn update_issue(&self, issue: &Issue) -> StoreResult<bool> {
        let res = self
            .issues()
            .replace_one(doc! { "issue_id": issue.issue_id }, issue)
            .await
            .map_err(|e| write_error(e, "issue title"))?;
        Ok(res.matched_count == 1)
    }

    async fn delete_issue(&self, issue_id: IssueId) -> StoreResult<bool> {
        Ok(self.in_transaction(TxStep::DeleteIssue(issue_id)).await?)
    }

    async fn insert_comment(&self, new: NewComment) -> StoreResult<Comment> {
        let comment = Comment {
            comment_id: self.next_id("comments").await?,
            description: new.description,
            author_user_id: new.author_user_id,
            issue_id: new.issue_id,
            time_created: Utc::now(),
        };
        let parent_exists = self
            .in_transaction(TxStep::InsertComment(&comment))
            .await
            .map_err(|e| write_error(e, "comment"))?;
        if !parent_exists {
            return Err(StoreError::MissingParent("issue", comment.issue_id));
        }
        Ok(comment)
    }

    async fn comment_by_id(&self, issue_id: IssueId, comment_id: CommentId) -> StoreResult<Option<Comment>> {
        Ok(self
            .comments()
            .find_one(doc! { "issue_id": issue_id, "comment_id": comment_id })
            .await?)
    }

    async fn comments_of(&self, issue_id: IssueId) -> StoreResult<Vec<Comment>> {
        let cursor = self
            .comments()
            .find(doc! { "issue_id": issue_id })
            .sort(doc! { "comment_id": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn update_comment(&self, comment: &Comment) -> StoreResult<bool> {
        let res = self
            .comments()
            .replace_one(doc! { "comment_id": comment.comment_id }, comment)
            .await?;
        Ok(res.matched_count == 1)
    }

    async fn delete_comment(&self, comment_id: CommentId) -> StoreResult<bool> {
        let res = self
            .comments()
            .delete_one(doc! { "comment_id": comment_id })
            .await?;
        Ok(res.deleted_count == 1)
    }
}
