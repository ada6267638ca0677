use std::sync::Arc;

use actix_web::{HttpMessage, HttpRequest};
use log::warn;

use crate::auth::AuthenticatedUserId;
use crate::config::Config;
use crate::error::ApiError;
use crate::permissions::PolicyTable;
use crate::service::RequestContext;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub policies: Arc<PolicyTable>,
    pub config: Config,
}

impl AppState {
    /// Builds the request context, resolving the token's user id (set by the
    /// authentication middleware) to a stored user. An unknown id leaves the
    /// request anonymous.
    pub async fn context(&self, req: &HttpRequest) -> Result<RequestContext<'_>, ApiError> {
        let user_id = req.extensions().get::<AuthenticatedUserId>().map(|id| id.0);
        let actor = match user_id {
            Some(id) => {
                let user = self.store.user_by_id(id).await?;
                if user.is_none() {
                    warn!("Token names unknown user {}", id);
                }
                user
            }
            None => None,
        };
        Ok(RequestContext::new(self.store.as_ref(), &self.policies, actor))
    }
}
