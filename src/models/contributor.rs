use serde::{Deserialize, Serialize};

use super::{ContributorId, ProjectId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContributorPermission {
    #[serde(rename = "C")]
    Create,
    #[default]
    #[serde(rename = "R")]
    Read,
    #[serde(rename = "U")]
    Update,
    #[serde(rename = "D")]
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContributorRole {
    #[serde(rename = "DEV")]
    Developer,
    #[serde(rename = "TES")]
    Tester,
    #[default]
    #[serde(rename = "CRE")]
    Creator,
    #[serde(rename = "ICO")]
    InChargeOf,
}

/// Membership of a user in a project. Unique per (project_id, user_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contributor {
    pub contributor_id: ContributorId,
    pub user_id: UserId,
    pub project_id: ProjectId,
    pub permission: ContributorPermission,
    pub role: ContributorRole,
}

#[derive(Debug, Clone)]
pub struct NewContributor {
    pub user_id: UserId,
    pub project_id: ProjectId,
    pub permission: ContributorPermission,
    pub role: ContributorRole,
}

#[derive(Debug, Deserialize)]
pub struct ContributorPayload {
    pub user_id: UserId,
    /// Optional echo of the path's project; must match it when present.
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    #[serde(default)]
    pub permission: ContributorPermission,
    #[serde(default)]
    pub role: ContributorRole,
}
