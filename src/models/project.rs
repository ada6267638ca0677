use serde::{Deserialize, Serialize};

use super::{check_length, ProjectId, UserId};
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProjectType {
    #[default]
    #[serde(rename = "APPL")]
    Application,
    #[serde(rename = "PROD")]
    Product,
    #[serde(rename = "PROJ")]
    Project,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub project_id: ProjectId,
    pub title: String,
    pub description: String,
    #[serde(rename = "type")]
    pub project_type: ProjectType,
    /// Set from the creating user; never taken from a payload.
    pub author_user_id: UserId,
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub title: String,
    pub description: String,
    pub project_type: ProjectType,
    pub author_user_id: UserId,
}

/// Body of POST/PUT on `/projects`. Any owner field sent by the client is
/// ignored.
#[derive(Debug, Deserialize)]
pub struct ProjectPayload {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, rename = "type")]
    pub project_type: ProjectType,
}

impl ProjectPayload {
    pub fn validate(&self) -> Result<(), ApiError> {
        check_length("title", &self.title, 1, 128)?;
        check_length("description", &self.description, 0, 1024)
    }
}
