// src/main.rs

mod app_state;
mod auth;
mod comment;
mod config;
mod contributor;
mod error;
mod issue;
mod models;
mod permissions;
mod project;
mod service;
mod store;


use std::future::Future;
use std::io;
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;
use std::task::{Context, Poll};

use actix_cors::Cors;
use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{Service, ServiceRequest, ServiceResponse, Transform},
    http,
    middleware::Logger,
    web, App, Error, HttpMessage, HttpResponse, HttpServer, ResponseError,
};
use env_logger::Env;
use futures::future::{ok, Ready};
use log::{debug, info, warn};

use crate::app_state::AppState;
use crate::auth::{login, signup, validate_jwt};
use crate::comment::{create_comment, delete_comment, get_comment, list_comments, patch_comment, update_comment};
use crate::contributor::{add_contributor, get_contributor, list_contributors, remove_contributor};
use crate::error::ApiError;
use crate::issue::{create_issue, delete_issue, get_issue, list_issues, patch_issue, update_issue};
use crate::permissions::PolicyTable;
use crate::project::{create_project, delete_project, get_project, list_projects, patch_project, update_project};
use crate::store::{MemoryStore, MongoStore, Store};

/// Verifies `Authorization: Bearer <token>` and stores the user id in the
/// request extensions. Requests without the header pass through anonymous.
#[derive(Debug, Clone)]
pub struct Authentication {
    secret: Rc<str>,
}

impl Authentication {
    pub fn new(secret: &str) -> Self {
        Self { secret: Rc::from(secret) }
    }
}

impl<S, B> Transform<S, ServiceRequest> for Authentication
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Transform = AuthMiddleware<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AuthMiddleware {
            service,
            secret: self.secret.clone(),
        })
    }
}

pub struct AuthMiddleware<S> {
    service: S,
    secret: Rc<str>,
}

impl<S, B> Service<ServiceRequest> for AuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let bearer = req
            .headers()
            .get(http::header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|token| token.trim().to_string());

        if let Some(token) = bearer {
            match validate_jwt(&token, &self.secret) {
                Ok(user_id) => {
                    req.extensions_mut().insert(user_id);
                }
                Err(e) => {
                    debug!("Rejected bearer token: {}", e);
                    let (req_parts, _payload) = req.into_parts();
                    let resp = ApiError::Unauthenticated("invalid or expired token".to_string())
                        .error_response()
                        .map_into_boxed_body();
                    let srv_resp = ServiceResponse::new(req_parts, resp);
                    return Box::pin(async move { Ok(srv_resp) });
                }
            }
        }

        let fut = self.service.call(req);
        Box::pin(async move {
            let res = fut.await?;
            Ok(res.map_into_boxed_body())
        })
    }
}

/// GET /
async fn api_root() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "signup": "/signup",
        "login": "/login",
        "projects": "/projects",
    }))
}

/// Route table shared by the server and the HTTP tests.
pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        ApiError::Validation(err.to_string()).into()
    }))
    .app_data(web::PathConfig::default().error_handler(|err, _req| {
        ApiError::NotFound(format!("no such resource: {}", err)).into()
    }))
    .route("/", web::get().to(api_root))
    .route("/signup", web::post().to(signup))
    .route("/login", web::post().to(login))
    .service(
        web::scope("/projects")
            .service(
                web::resource("")
                    .route(web::get().to(list_projects))
                    .route(web::post().to(create_project)),
            )
            .service(
                web::resource("/{project_id}")
                    .route(web::get().to(get_project))
                    .route(web::put().to(update_project))
                    .route(web::patch().to(patch_project))
                    .route(web::delete().to(delete_project)),
            )
            .service(
                web::resource("/{project_id}/users")
                    .route(web::get().to(list_contributors))
                    .route(web::post().to(add_contributor)),
            )
            .service(
                web::resource("/{project_id}/users/{user_id}")
                    .route(web::get().to(get_contributor))
                    .route(web::delete().to(remove_contributor)),
            )
            .service(
                web::resource("/{project_id}/issues")
                    .route(web::get().to(list_issues))
                    .route(web::post().to(create_issue)),
            )
            .service(
                web::resource("/{project_id}/issues/{issue_id}")
                    .route(web::get().to(get_issue))
                    .route(web::put().to(update_issue))
                    .route(web::patch().to(patch_issue))
                    .route(web::delete().to(delete_issue)),
            )
            .service(
                web::resource("/{project_id}/issues/{issue_id}/comments")
                    .route(web::get().to(list_comments))
                    .route(web::post().to(create_comment)),
            )
            .service(
                web::resource("/{project_id}/issues/{issue_id}/comments/{comment_id}")
                    .route(web::get().to(get_comment))
                    .route(web::put().to(update_comment))
                    .route(web::patch().to(patch_comment))
                    .route(web::delete().to(delete_comment)),
            ),
    );
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = config::Config::from_env().map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    let store: Arc<dyn Store> = match &config.mongo_uri {
        Some(uri) => Arc::new(
            MongoStore::init(uri, &config.database_name)
                .await
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?,
        ),
        None => {
            warn!("MONGO_URI is not set, keeping data in memory");
            Arc::new(MemoryStore::new())
        }
    };
    let policies = Arc::new(PolicyTable::standard());

    let bind_address = config.bind_address.clone();
    info!("Server running at http://{}", bind_address);
    info!("Allowed CORS Origin: {}", config.frontend_origin);

    HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&config.frontend_origin)
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![
                http::header::CONTENT_TYPE,
                http::header::ACCEPT,
                http::header::AUTHORIZATION,
            ])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .wrap(Authentication::new(&config.jwt_secret))
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(web::Data::new(AppState {
                store: store.clone(),
                policies: policies.clone(),
                config: config.clone(),
            }))
            .configure(routes)
    })
    .bind(bind_address)?
    .run()
    .await
}
