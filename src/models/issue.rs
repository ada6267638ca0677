use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{check_length, IssueId, ProjectId, UserId};
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IssuePriority {
    #[serde(rename = "L")]
    Low,
    #[default]
    #[serde(rename = "N")]
    Normal,
    #[serde(rename = "H")]
    High,
    #[serde(rename = "U")]
    Urgent,
    #[serde(rename = "I")]
    Immediate,
}

/// Any status may follow any other; there is no transition graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IssueStatus {
    #[default]
    #[serde(rename = "NEW")]
    New,
    #[serde(rename = "INP")]
    InProgress,
    #[serde(rename = "COM")]
    Completed,
    #[serde(rename = "REJ")]
    Rejected,
    #[serde(rename = "CLO")]
    Closed,
}

/// Unique per (title, project_id, author_user_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub issue_id: IssueId,
    pub title: String,
    pub desc: String,
    pub tag: String,
    pub priority: IssuePriority,
    pub project_id: ProjectId,
    pub status: IssueStatus,
    pub author_user_id: UserId,
    pub assignee_user_id: UserId,
    pub time_created: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewIssue {
    pub title: String,
    pub desc: String,
    pub tag: String,
    pub priority: IssuePriority,
    pub project_id: ProjectId,
    pub status: IssueStatus,
    pub author_user_id: UserId,
    pub assignee_user_id: UserId,
}

/// Body of POST/PUT on `/issues`. Everything is optional at the wire level;
/// create enforces what it needs and update keeps stored values for absent
/// fields.
#[derive(Debug, Default, Deserialize)]
pub struct IssuePayload {
    pub title: Option<String>,
    pub desc: Option<String>,
    pub tag: Option<String>,
    pub priority: Option<IssuePriority>,
    pub status: Option<IssueStatus>,
    pub assignee_user_id: Option<UserId>,
}

impl Issue {
    /// Overwrites every supplied field; absent ones keep their stored value.
    pub fn apply(&mut self, payload: IssuePayload) {
        if let Some(title) = payload.title {
            self.title = title;
        }
        if let Some(desc) = payload.desc {
            self.desc = desc;
        }
        if let Some(tag) = payload.tag {
            self.tag = tag;
        }
        if let Some(priority) = payload.priority {
            self.priority = priority;
        }
        if let Some(status) = payload.status {
            self.status = status;
        }
        if let Some(assignee) = payload.assignee_user_id {
            self.assignee_user_id = assignee;
        }
    }

    pub fn validate(&self) -> Result<(), ApiError> {
        check_fields(&self.title, &self.desc, &self.tag)
    }
}

impl NewIssue {
    pub fn validate(&self) -> Result<(), ApiError> {
        check_fields(&self.title, &self.desc, &self.tag)
    }
}

fn check_fields(title: &str, desc: &str, tag: &str) -> Result<(), ApiError> {
    check_length("title", title, 1, 128)?;
    check_length("desc", desc, 0, 2048)?;
    check_length("tag", tag, 1, 16)
}
