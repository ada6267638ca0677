// src/contributor.rs

use actix_web::{web, HttpRequest, HttpResponse};

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::{ContributorPayload, ProjectId, UserId};
use crate::service::contributor;

/// GET /projects/{project_id}/users
pub async fn list_contributors(
    req: HttpRequest,
    data: web::Data<AppState>,
    project_id: web::Path<ProjectId>,
) -> Result<HttpResponse, ApiError> {
    let ctx = data.context(&req).await?;
    let members = contributor::list(&ctx, project_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(members))
}

/// POST /projects/{project_id}/users
pub async fn add_contributor(
    req: HttpRequest,
    data: web::Data<AppState>,
    project_id: web::Path<ProjectId>,
    payload: web::Json<ContributorPayload>,
) -> Result<HttpResponse, ApiError> {
    let ctx = data.context(&req).await?;
    let added = contributor::create(&ctx, project_id.into_inner(), payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(added))
}

/// GET /projects/{project_id}/users/{user_id}
pub async fn get_contributor(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<(ProjectId, UserId)>,
) -> Result<HttpResponse, ApiError> {
    let (project_id, user_id) = path.into_inner();
    let ctx = data.context(&req).await?;
    let found = contributor::retrieve(&ctx, project_id, user_id).await?;
    Ok(HttpResponse::Ok().json(found))
}

/// DELETE /projects/{project_id}/users/{user_id}
pub async fn remove_contributor(
    req: HttpRequest,
    data: web::Data<AppState>,
    path: web::Path<(ProjectId, UserId)>,
) -> Result<HttpResponse, ApiError> {
    let (project_id, user_id) = path.into_inner();
    let ctx = data.context(&req).await?;
    contributor::delete(&ctx, project_id, user_id).await?;
    Ok(HttpResponse::NoContent().finish())
}
