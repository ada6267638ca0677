// src/service/project.rs

use log::info;

use super::RequestContext;
use crate::error::ApiError;
use crate::models::{NewProject, Project, ProjectId, ProjectPayload};
use crate::permissions::{self, Action, Resource, Target};

/// Projects the actor owns or contributes to, by ascending id.
pub async fn list(ctx: &RequestContext<'_>) -> Result<Vec<Project>, ApiError> {
    ctx.authorize(Resource::Project, Action::List, None, None).await?;
    let actor = ctx.require_actor()?;
    Ok(ctx.store.projects_visible_to(actor.user_id).await?)
}

/// The actor becomes the owner whatever the payload says.
pub async fn create(ctx: &RequestContext<'_>, payload: ProjectPayload) -> Result<Project, ApiError> {
    ctx.authorize(Resource::Project, Action::Create, None, None).await?;
    let actor = ctx.require_actor()?;
    payload.validate()?;

    let project = ctx
        .store
        .insert_project(NewProject {
            title: payload.title,
            description: payload.description,
            project_type: payload.project_type,
            author_user_id: actor.user_id,
        })
        .await
        .map_err(|e| ApiError::from_write(e, "project already exists"))?;
    info!("Project {} created by user {}", project.project_id, actor.user_id);
    Ok(project)
}

pub async fn retrieve(ctx: &RequestContext<'_>, project_id: ProjectId) -> Result<Project, ApiError> {
    let project = ctx.project(project_id).await?;
    ctx.authorize(Resource::Project, Action::Retrieve, Some(&project), Some(Target::Project(&project)))
        .await?;
    Ok(project)
}

/// Full replacement of title, description and type. The owner is kept.
pub async fn update(ctx: &RequestContext<'_>, project_id: ProjectId, payload: ProjectPayload) -> Result<Project, ApiError> {
    let mut project = ctx.project(project_id).await?;
    ctx.authorize(Resource::Project, Action::Update, Some(&project), Some(Target::Project(&project)))
        .await?;
    payload.validate()?;

    project.title = payload.title;
    project.description = payload.description;
    project.project_type = payload.project_type;
    if !ctx.store.update_project(&project).await? {
        return Err(ApiError::not_found("project", project_id));
    }
    info!("Project {} updated", project_id);
    Ok(project)
}

pub async fn partial_update(ctx: &RequestContext<'_>, project_id: ProjectId) -> Result<Project, ApiError> {
    let project = ctx.project(project_id).await?;
    ctx.authorize(Resource::Project, Action::PartialUpdate, Some(&project), Some(Target::Project(&project)))
        .await?;
    // The standard table disables this action; a table that allows it still
    // has no partial write to run.
    Err(permissions::unsupported(Resource::Project, Action::PartialUpdate))
}

/// Removes the project together with its contributors, issues and comments.
pub async fn delete(ctx: &RequestContext<'_>, project_id: ProjectId) -> Result<(), ApiError> {
    let project = ctx.project(project_id).await?;
    ctx.authorize(Resource::Project, Action::Destroy, Some(&project), Some(Target::Project(&project)))
        .await?;
    if !ctx.store.delete_project(project_id).await? {
        return Err(ApiError::not_found("project", project_id));
    }
    info!("Project {} deleted", project_id);
    Ok(())
}
