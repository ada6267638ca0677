// src/service/issue.rs

use log::info;

use super::RequestContext;
use crate::error::ApiError;
use crate::models::{required, Issue, IssueId, IssuePayload, NewIssue, ProjectId};
use crate::permissions::{self, Action, Resource, Target};

const DUPLICATE_TITLE: &str = "an issue with this title already exists in the project";

pub async fn list(ctx: &RequestContext<'_>, project_id: ProjectId) -> Result<Vec<Issue>, ApiError> {
    let project = ctx.project(project_id).await?;
    ctx.authorize(Resource::Issue, Action::List, Some(&project), None).await?;
    Ok(ctx.store.issues_of(project_id).await?)
}

/// Files an issue in the path project. The actor is the author; title, tag
/// and assignee are required and the assignee must belong to the project.
pub async fn create(ctx: &RequestContext<'_>, project_id: ProjectId, payload: IssuePayload) -> Result<Issue, ApiError> {
    let project = ctx.project(project_id).await?;
    ctx.authorize(Resource::Issue, Action::Create, Some(&project), None).await?;
    let actor = ctx.require_actor()?;

    let title = required("title", payload.title)?;
    let tag = required("tag", payload.tag)?;
    let assignee = required("assignee_user_id", payload.assignee_user_id)?;
    let new = NewIssue {
        title,
        desc: payload.desc.unwrap_or_default(),
        tag,
        priority: payload.priority.unwrap_or_default(),
        project_id,
        status: payload.status.unwrap_or_default(),
        author_user_id: actor.user_id,
        assignee_user_id: assignee,
    };
    ctx.check_assignee(&project, assignee).await?;
    new.validate()?;

    let issue = ctx
        .store
        .insert_issue(new)
        .await
        .map_err(|e| ApiError::from_write(e, DUPLICATE_TITLE))?;
    info!("Issue {} created in project {}", issue.issue_id, project_id);
    Ok(issue)
}

pub async fn retrieve(ctx: &RequestContext<'_>, project_id: ProjectId, issue_id: IssueId) -> Result<Issue, ApiError> {
    let project = ctx.project(project_id).await?;
    let issue = ctx.issue(project_id, issue_id).await?;
    ctx.authorize(Resource::Issue, Action::Retrieve, Some(&project), Some(Target::Issue(&issue)))
        .await?;
    Ok(issue)
}

/// Applies supplied fields over the stored issue; an absent title keeps
/// the current one.
pub async fn update(
    ctx: &RequestContext<'_>,
    project_id: ProjectId,
    issue_id: IssueId,
    payload: IssuePayload,
) -> Result<Issue, ApiError> {
    let project = ctx.project(project_id).await?;
    let mut issue = ctx.issue(project_id, issue_id).await?;
    ctx.authorize(Resource::Issue, Action::Update, Some(&project), Some(Target::Issue(&issue)))
        .await?;

    if let Some(assignee) = payload.assignee_user_id {
        if assignee != issue.assignee_user_id {
            ctx.check_assignee(&project, assignee).await?;
        }
    }
    issue.apply(payload);
    issue.validate()?;

    let stored = ctx
        .store
        .update_issue(&issue)
        .await
        .map_err(|e| ApiError::from_write(e, DUPLICATE_TITLE))?;
    if !stored {
        return Err(ApiError::not_found("issue", issue_id));
    }
    info!("Issue {} updated", issue_id);
    Ok(issue)
}

pub async fn partial_update(ctx: &RequestContext<'_>, project_id: ProjectId, issue_id: IssueId) -> Result<Issue, ApiError> {
    let project = ctx.project(project_id).await?;
    let issue = ctx.issue(project_id, issue_id).await?;
    ctx.authorize(Resource::Issue, Action::PartialUpdate, Some(&project), Some(Target::Issue(&issue)))
        .await?;
    // The standard table disables this action; a table that allows it still
    // has no partial write to run.
    Err(permissions::unsupported(Resource::Issue, Action::PartialUpdate))
}

/// Removes the issue and its comments.
pub async fn delete(ctx: &RequestContext<'_>, project_id: ProjectId, issue_id: IssueId) -> Result<(), ApiError> {
    let project = ctx.project(project_id).await?;
    let issue = ctx.issue(project_id, issue_id).await?;
    ctx.authorize(Resource::Issue, Action::Destroy, Some(&project), Some(Target::Issue(&issue)))
        .await?;
    if !ctx.store.delete_issue(issue_id).await? {
        return Err(ApiError::not_found("issue", issue_id));
    }
    info!("Issue {} deleted", issue_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{IssuePriority, IssueStatus, UserId};
    use crate::service::{fixtures::World, project};
    use crate::store::Store;

    fn payload(title: &str, assignee: UserId) -> IssuePayload {
        IssuePayload {
            title: Some(title.to_string()),
            desc: Some("steps".to_string()),
            tag: Some("BUG".to_string()),
            priority: Some(IssuePriority::High),
            status: None,
            assignee_user_id: Some(assignee),
        }
    }

    #[actix_web::test]
    async fn assignee_must_belong_to_the_project() {
        let world = World::new();
        let (owner, member, stranger) = (world.user("Owner").await, world.user("Member").await, world.user("Stranger").await);
        let p = world.project(&owner, "X").await;
        world.add_contributor(&owner, &p, &member).await;

        let err = create(&world.as_user(&member), p.project_id, payload("A", stranger.user_id))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::InvalidAssignee { .. }));

        let to_owner = create(&world.as_user(&member), p.project_id, payload("B", owner.user_id))
            .await
            .unwrap();
        assert_eq!(to_owner.author_user_id, member.user_id);
        assert_eq!(to_owner.status, IssueStatus::New);

        create(&world.as_user(&member), p.project_id, payload("C", member.user_id))
            .await
            .unwrap();
    }

    #[actix_web::test]
    async fn outsiders_cannot_file_issues() {
        let world = World::new();
        let (owner, stranger) = (world.user("Owner").await, world.user("Stranger").await);
        let p = world.project(&owner, "X").await;
        let err = create(&world.as_user(&stranger), p.project_id, payload("A", owner.user_id))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[actix_web::test]
    async fn duplicate_title_by_same_author_already_exists() {
        let world = World::new();
        let owner = world.user("Owner").await;
        let p = world.project(&owner, "X").await;
        create(&world.as_user(&owner), p.project_id, payload("Crash", owner.user_id))
            .await
            .unwrap();
        let err = create(&world.as_user(&owner), p.project_id, payload("Crash", owner.user_id))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::AlreadyExists(_)));
    }

    #[actix_web::test]
    async fn missing_title_on_create_is_a_validation_error() {
        let world = World::new();
        let owner = world.user("Owner").await;
        let p = world.project(&owner, "X").await;
        let mut body = payload("ignored", owner.user_id);
        body.title = None;
        let err = create(&world.as_user(&owner), p.project_id, body).await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[actix_web::test]
    async fn update_without_title_keeps_it() {
        let world = World::new();
        let owner = world.user("Owner").await;
        let p = world.project(&owner, "X").await;
        let issue = create(&world.as_user(&owner), p.project_id, payload("Crash", owner.user_id))
            .await
            .unwrap();

        let updated = update(
            &world.as_user(&owner),
            p.project_id,
            issue.issue_id,
            IssuePayload {
                status: Some(IssueStatus::Completed),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.title, "Crash");
        assert_eq!(updated.status, IssueStatus::Completed);
        assert_eq!(updated.time_created, issue.time_created);
    }

    #[actix_web::test]
    async fn only_the_author_updates_or_deletes() {
        let world = World::new();
        let (owner, member) = (world.user("Owner").await, world.user("Member").await);
        let p = world.project(&owner, "X").await;
        world.add_contributor(&owner, &p, &member).await;
        let issue = create(&world.as_user(&member), p.project_id, payload("Crash", member.user_id))
            .await
            .unwrap();

        let err = update(&world.as_user(&owner), p.project_id, issue.issue_id, IssuePayload::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
        assert!(matches!(
            delete(&world.as_user(&owner), p.project_id, issue.issue_id).await,
            Err(ApiError::Forbidden(_))
        ));
        delete(&world.as_user(&member), p.project_id, issue.issue_id).await.unwrap();
    }

    #[actix_web::test]
    async fn reassigning_to_an_outsider_is_rejected() {
        let world = World::new();
        let (owner, stranger) = (world.user("Owner").await, world.user("Stranger").await);
        let p = world.project(&owner, "X").await;
        let issue = create(&world.as_user(&owner), p.project_id, payload("Crash", owner.user_id))
            .await
            .unwrap();
        let err = update(
            &world.as_user(&owner),
            p.project_id,
            issue.issue_id,
            IssuePayload {
                assignee_user_id: Some(stranger.user_id),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::InvalidAssignee { .. }));
    }

    #[actix_web::test]
    async fn issue_of_another_project_is_not_found() {
        let world = World::new();
        let owner = world.user("Owner").await;
        let p = world.project(&owner, "X").await;
        let q = world.project(&owner, "Y").await;
        let issue = create(&world.as_user(&owner), p.project_id, payload("Crash", owner.user_id))
            .await
            .unwrap();
        assert!(matches!(
            delete(&world.as_user(&owner), q.project_id, issue.issue_id).await,
            Err(ApiError::NotFound(_))
        ));
    }

    #[actix_web::test]
    async fn retrieve_is_not_offered() {
        let world = World::new();
        let owner = world.user("Owner").await;
        let p = world.project(&owner, "X").await;
        let issue = create(&world.as_user(&owner), p.project_id, payload("Crash", owner.user_id))
            .await
            .unwrap();
        assert!(matches!(
            retrieve(&world.as_user(&owner), p.project_id, issue.issue_id).await,
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(
            partial_update(&world.as_user(&owner), p.project_id, issue.issue_id).await,
            Err(ApiError::MethodNotSupported(_))
        ));
    }

    #[actix_web::test]
    async fn project_delete_removes_its_issues() {
        let world = World::new();
        let owner = world.user("Owner").await;
        let p = world.project(&owner, "X").await;
        let issue = create(&world.as_user(&owner), p.project_id, payload("Crash", owner.user_id))
            .await
            .unwrap();
        project::delete(&world.as_user(&owner), p.project_id).await.unwrap();
        assert!(matches!(
            delete(&world.as_user(&owner), p.project_id, issue.issue_id).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(world.store.issue_by_id(p.project_id, issue.issue_id).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn concurrent_duplicate_titles_yield_one_success() {
        let world = World::new();
        let owner = world.user("Owner").await;
        let p = world.project(&owner, "X").await;
        let (ctx_a, ctx_b) = (world.as_user(&owner), world.as_user(&owner));

        let (a, b) = tokio::join!(
            create(&ctx_a, p.project_id, payload("Crash", owner.user_id)),
            create(&ctx_b, p.project_id, payload("Crash", owner.user_id)),
        );
        let outcomes = [a, b];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            outcomes
                .iter()
                .filter(|r| matches!(r, Err(ApiError::AlreadyExists(_))))
                .count(),
            1
        );
        assert_eq!(list(&ctx_a, p.project_id).await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn create_racing_a_project_delete_leaves_no_orphan() {
        let world = World::new();
        let owner = world.user("Owner").await;
        let p = world.project(&owner, "X").await;
        let ctx = world.as_user(&owner);

        let (created, deleted) = tokio::join!(
            create(&ctx, p.project_id, payload("Crash", owner.user_id)),
            project::delete(&ctx, p.project_id),
        );
        deleted.unwrap();
        if let Err(err) = created {
            assert!(matches!(err, ApiError::NotFound(_)));
        }
        assert!(world.store.issues_of(p.project_id).await.unwrap().is_empty());
    }
}
