// src/comment.rs

use actix_web::{web, HttpRequest, HttpResponse};

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::{CommentId, CommentPayload, IssueId, ProjectId};
use crate::service::comment;

/// GET /projects/{project_id}/issues/{issue_id}/comments
pub async fn list_comments(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<(ProjectId, IssueId)>,
) -> Result<HttpResponse, ApiError> {
    let (project_id, issue_id) = path.into_inner();
    let ctx = data.context(&req).await?;
    let comments = comment::list(&ctx, project_id, issue_id).await?;
    Ok(HttpResponse::Ok().json(comments))
}

/// POST /projects/{project_id}/issues/{issue_id}/comments
pub async fn create_comment(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<(ProjectId, IssueId)>,
    payload: web::Json<CommentPayload>,
) -> Result<HttpResponse, ApiError> {
    let (project_id, issue_id) = path.into_inner();
    let ctx = data.context(&req).await?;
    let created = comment::create(&ctx, project_id, issue_id, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(created))
}

/// GET /projects/{project_id}/issues/{issue_id}/comments/{comment_id}
pub async fn get_comment(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<(ProjectId, IssueId, CommentId)>,
) -> Result<HttpResponse, ApiError> {
    let (project_id, issue_id, comment_id) = path.into_inner();
    let ctx = data.context(&req).await?;
    let found = comment::retrieve(&ctx, project_id, issue_id, comment_id).await?;
    Ok(HttpResponse::Ok().json(found))
}

/// PUT /projects/{project_id}/issues/{issue_id}/comments/{comment_id}
pub async fn update_comment(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<(ProjectId, IssueId, CommentId)>,
    payload: web::Json<CommentPayload>,
) -> Result<HttpResponse, ApiError> {
    let (project_id, issue_id, comment_id) = path.into_inner();
    let ctx = data.context(&req).await?;
    let updated = comment::update(&ctx, project_id, issue_id, comment_id, payload.into_inner()).await?;
    Ok(HttpResponse::Ok().json(updated))
}

/// PATCH /projects/{project_id}/issues/{issue_id}/comments/{comment_id}
pub async fn patch_comment(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<(ProjectId, IssueId, CommentId)>,
) -> Result<HttpResponse, ApiError> {
    let (project_id, issue_id, comment_id) = path.into_inner();
    let ctx = data.context(&req).await?;
    let updated = comment::partial_update(&ctx, project_id, issue_id, comment_id).await?;
    Ok(HttpResponse::Ok().json(updated))
}

/// DELETE /projects/{project_id}/issues/{issue_id}/comments/{comment_id}
pub async fn delete_comment(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<(ProjectId, IssueId, CommentId)>,
) -> Result<HttpResponse, ApiError> {
    let (project_id, issue_id, comment_id) = path.into_inner();
    let ctx = data.context(&req).await?;
    comment::delete(&ctx, project_id, issue_id, comment_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
