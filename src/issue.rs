// src/issue.rs

use actix_web::{web, HttpRequest, HttpResponse};
use log::debug;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::{IssueId, IssuePayload, ProjectId};
use crate::service::issue;

/// GET /projects/{project_id}/issues
pub async fn list_issues(
    req: HttpRequest,
    data: web::Data<AppState>,
    project_id: web::Path<ProjectId>,
) -> Result<HttpResponse, ApiError> {
    let ctx = data.context(&req).await?;
    let issues = issue::list(&ctx, project_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(issues))
}

/// POST /projects/{project_id}/issues
pub async fn create_issue(
    req: HttpRequest,
    data: web::Data<AppState>,
    project_id: web::Path<ProjectId>,
    payload: web::Json<IssuePayload>,
) -> Result<HttpResponse, ApiError> {
    debug!("Received create_issue request with payload: {:?}", payload);
    let ctx = data.context(&req).await?;
    let created = issue::create(&ctx, project_id.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(created))
}

/// GET /projects/{project_id}/issues/{issue_id}
pub async fn get_issue(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<(ProjectId, IssueId)>,
) -> Result<HttpResponse, ApiError> {
    let (project_id, issue_id) = path.into_inner();
    let ctx = data.context(&req).await?;
    let found = issue::retrieve(&ctx, project_id, issue_id).await?;
    Ok(HttpResponse::Ok().json(found))
}

/// PUT /projects/{project_id}/issues/{issue_id}
pub async fn update_issue(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<(ProjectId, IssueId)>,
    payload: web::Json<IssuePayload>,
) -> Result<HttpResponse, ApiError> {
    let (project_id, issue_id) = path.into_inner();
    let ctx = data.context(&req).await?;
    let updated = issue::update(&ctx, project_id, issue_id, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(updated))
}

/// PATCH /projects/{project_id}/issues/{issue_id}
pub async fn patch_issue(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<(ProjectId, IssueId)>,
) -> Result<HttpResponse, ApiError> {
    let (project_id, issue_id) = path.into_inner();
    let ctx = data.context(&req).await?;
    let updated = issue::partial_update(&ctx, project_id, issue_id).await?;
    Ok(HttpResponse::Ok().json(updated))
}

/// DELETE /projects/{project_id}/issues/{issue_id}
pub async fn delete_issue(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<(ProjectId, IssueId)>,
) -> Result<HttpResponse, ApiError> {
    let (project_id, issue_id) = path.into_inner();
    let ctx = data.context(&req).await?;
    issue::delete(&ctx, project_id, issue_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
