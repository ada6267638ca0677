// src/project.rs

use actix_web::{web, HttpRequest, HttpResponse};
use log::debug;

use crate::app_state::AppState;
use crate::error::ApiError;
use crate::models::{ProjectId, ProjectPayload};
use crate::service::project;

/// GET /projects
pub async fn list_projects(req: HttpRequest, data: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let ctx = data.context(&req).await?;
    let projects = project::list(&ctx).await?;
    Ok(HttpResponse::Ok().json(projects))
}

/// POST /projects
pub async fn create_project(
    req: HttpRequest,
    data: web::Data<AppState>,
    project_info: web::Json<ProjectPayload>,
) -> Result<HttpResponse, ApiError> {
    debug!("Received create_project request with payload: {:?}", project_info);
    let ctx = data.context(&req).await?;
    let created = project::create(&ctx, project_info.into_inner()).await?;
    Ok(HttpResponse::Created().json(created))
}

/// GET /projects/{project_id}
pub async fn get_project(
    req: HttpRequest,
    data: web::Data<AppState>,
    project_id: web::Path<ProjectId>,
) -> Result<HttpResponse, ApiError> {
    let ctx = data.context(&req).await?;
    let found = project::retrieve(&ctx, project_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(found))
}

/// PUT /projects/{project_id}
pub async fn update_project(
    req: HttpRequest,
    data: web::Data<AppState>,
    project_id: web::Path<ProjectId>,
    update_info: web::Json<ProjectPayload>,
) -> Result<HttpResponse, ApiError> {
    let ctx = data.context(&req).await?;
    let updated = project::update(&ctx, project_id.into_inner(), update_info.into_inner()).await?;
    Ok(HttpResponse::Ok().json(updated))
}

/// PATCH /projects/{project_id}
pub async fn patch_project(
    req: HttpRequest,
    data: web::Data<AppState>,
    project_id: web::Path<ProjectId>,
) -> Result<HttpResponse, ApiError> {
    let ctx = data.context(&req).await?;
    let updated = project::partial_update(&ctx, project_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(updated))
}

/// DELETE /projects/{project_id}
pub async fn delete_project(
    req: HttpRequest,
    data: web::Data<AppState>,
    project_id: web::Path<ProjectId>,
) -> Result<HttpResponse, ApiError> {
    let ctx = data.context(&req).await?;
    project::delete(&ctx, project_id.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}
