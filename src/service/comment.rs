// src/service/comment.rs

use log::info;

use super::RequestContext;
use crate::error::ApiError;
use crate::models::{check_length, required, Comment, CommentId, CommentPayload, Issue, IssueId, NewComment, Project, ProjectId};
use crate::permissions::{self, Action, Resource, Target};

async fn resolve_issue(
    ctx: &RequestContext<'_>,
    project_id: ProjectId,
    issue_id: IssueId,
) -> Result<(Project, Issue), ApiError> {
    let project = ctx.project(project_id).await?;
    let issue = ctx.issue(project_id, issue_id).await?;
    Ok((project, issue))
}

async fn resolve_comment(
    ctx: &RequestContext<'_>,
    project_id: ProjectId,
    issue_id: IssueId,
    comment_id: CommentId,
) -> Result<(Project, Issue, Comment), ApiError> {
    let (project, issue) = resolve_issue(ctx, project_id, issue_id).await?;
    let comment = ctx
        .store
        .comment_by_id(issue_id, comment_id)
        .await?
        .ok_or_else(|| ApiError::not_found("comment", comment_id))?;
    Ok((project, issue, comment))
}

pub async fn list(ctx: &RequestContext<'_>, project_id: ProjectId, issue_id: IssueId) -> Result<Vec<Comment>, ApiError> {
    let (project, _) = resolve_issue(ctx, project_id, issue_id).await?;
    ctx.authorize(Resource::Comment, Action::List, Some(&project), None).await?;
    Ok(ctx.store.comments_of(issue_id).await?)
}

pub async fn create(
    ctx: &RequestContext<'_>,
    project_id: ProjectId,
    issue_id: IssueId,
    payload: CommentPayload,
) -> Result<Comment, ApiError> {
    let (project, issue) = resolve_issue(ctx, project_id, issue_id).await?;
    ctx.authorize(Resource::Comment, Action::Create, Some(&project), None).await?;
    let actor = ctx.require_actor()?;

    let description = required("description", payload.description)?;
    check_length("description", &description, 0, 1024)?;
    let comment = ctx
        .store
        .insert_comment(NewComment {
            description,
            author_user_id: actor.user_id,
            issue_id: issue.issue_id,
        })
        .await
        .map_err(|e| ApiError::from_write(e, "comment already exists"))?;
    info!("Comment {} added to issue {}", comment.comment_id, issue_id);
    Ok(comment)
}

pub async fn retrieve(
    ctx: &RequestContext<'_>,
    project_id: ProjectId,
    issue_id: IssueId,
    comment_id: CommentId,
) -> Result<Comment, ApiError> {
    let (project, issue, comment) = resolve_comment(ctx, project_id, issue_id, comment_id).await?;
    ctx.authorize(
        Resource::Comment,
        Action::Retrieve,
        Some(&project),
        Some(Target::Comment(&comment, &issue)),
    )
    .await?;
    Ok(comment)
}

/// An absent description keeps the stored text.
pub async fn update(
    ctx: &RequestContext<'_>,
    project_id: ProjectId,
    issue_id: IssueId,
    comment_id: CommentId,
    payload: CommentPayload,
) -> Result<Comment, ApiError> {
    let (project, issue, mut comment) = resolve_comment(ctx, project_id, issue_id, comment_id).await?;
    ctx.authorize(
        Resource::Comment,
        Action::Update,
        Some(&project),
        Some(Target::Comment(&comment, &issue)),
    )
    .await?;

    if let Some(description) = payload.description {
        check_length("description", &description, 0, 1024)?;
        comment.description = description;
    }
    if !ctx.store.update_comment(&comment).await? {
        return Err(ApiError::not_found("comment", comment_id));
    }
    info!("Comment {} updated", comment_id);
    Ok(comment)
}

pub async fn partial_update(
    ctx: &RequestContext<'_>,
    project_id: ProjectId,
    issue_id: IssueId,
    comment_id: CommentId,
) -> Result<Comment, ApiError> {
    let (project, issue, comment) = resolve_comment(ctx, project_id, issue_id, comment_id).await?;
    ctx.authorize(
        Resource::Comment,
        Action::PartialUpdate,
        Some(&project),
        Some(Target::Comment(&comment, &issue)),
    )
    .await?;
    // The standard table disables this action; a table that allows it still
    // has no partial write to run.
    Err(permissions::unsupported(Resource::Comment, Action::PartialUpdate))
}

pub async fn delete(
    ctx: &RequestContext<'_>,
    project_id: ProjectId,
    issue_id: IssueId,
    comment_id: CommentId,
) -> Result<(), ApiError> {
    let (project, issue, comment) = resolve_comment(ctx, project_id, issue_id, comment_id).await?;
    ctx.authorize(
        Resource::Comment,
        Action::Destroy,
        Some(&project),
        Some(Target::Comment(&comment, &issue)),
    )
    .await?;
    if !ctx.store.delete_comment(comment_id).await? {
        return Err(ApiError::not_found("comment", comment_id));
    }
    info!("Comment {} deleted", comment_id);
    Ok(())
}
