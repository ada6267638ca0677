use serde::{Deserialize, Serialize};

use super::{Project, UserId};
use crate::store::{Store, StoreResult};

/// A registered account. `password` holds the bcrypt hash and never leaves
/// the server; responses go through [`UserView`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct User {
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }

    pub async fn is_contributor(&self, store: &dyn Store, project: &Project) -> StoreResult<bool> {
        Ok(store
            .contributor(project.project_id, self.user_id)
            .await?
            .is_some())
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password_hash: String,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct UserView {
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        UserView {
            user_id: user.user_id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
        }
    }
}
