#![forbid(unsafe_code)]

use pb_core::ids::{IssueId, ProjectId};
use pb_core::model::{Issue, IssueDescription, Label, UserSummary, WorkspaceMember};
use serde::Serialize;

pub const ISSUES_CHANNEL: &str = "issues_changes";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

impl ChangeOp {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "insert" => Some(Self::Insert),
            "update" => Some(Self::Update),
            "delete" => Some(Self::Delete),
            _ => None,
        }
    }
}

/// One row of the issue change feed. `seq` orders events globally; `version`
/// counts writes per project and is the token boards compare.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChangeEvent {
    pub seq: i64,
    pub version: i64,
    pub channel: String,
    pub project_id: ProjectId,
    pub issue_id: Option<IssueId>,
    pub op: ChangeOp,
    pub ts_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MemberDetail {
    #[serde(flatten)]
    pub membership: WorkspaceMember,
    pub user: UserSummary,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IssueDetail {
    #[serde(flatten)]
    pub issue: Issue,
    pub assignee: Option<UserSummary>,
    pub description: Option<IssueDescription>,
    pub labels: Vec<Label>,
}

/// Result of a write that touched the issue feed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IssueWrite {
    pub issue: Issue,
    pub version: i64,
}
