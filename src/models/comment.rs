use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{CommentId, IssueId, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub comment_id: CommentId,
    pub description: String,
    pub author_user_id: UserId,
    pub issue_id: IssueId,
    pub time_created: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub description: String,
    pub author_user_id: UserId,
    pub issue_id: IssueId,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentPayload {
    pub description: Option<String>,
}
