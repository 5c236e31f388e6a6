#![forbid(unsafe_code)]

use pb_core::ids::{IssueId, LabelId, ProjectId, StateId, UserId, WorkspaceId};
use pb_core::model::{IssueDate, Priority, Role, StateGroup};
use pb_core::rich_text::RichDoc;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EnsureUserRequest {
    /// Id the identity provider vouches for. `None` matches an existing row by
    /// email, or derives a stable id from the email for a new one.
    pub id: Option<UserId>,
    pub email: String,
    pub display_name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateWorkspaceRequest {
    pub name: String,
    pub slug: String,
    pub logo: Option<String>,
    pub owner_id: UserId,
}

/// `None` leaves a field untouched; `Some(None)` clears a nullable one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateWorkspaceRequest {
    pub id: WorkspaceId,
    pub name: Option<String>,
    pub slug: Option<String>,
    pub logo: Option<Option<String>>,
}

impl UpdateWorkspaceRequest {
    pub fn new(id: WorkspaceId) -> Self {
        Self {
            id,
            name: None,
            slug: None,
            logo: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddMemberRequest {
    pub workspace_id: WorkspaceId,
    pub member_id: UserId,
    pub role: Role,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateProjectRequest {
    pub workspace_id: WorkspaceId,
    pub name: String,
    pub description: Option<String>,
    pub identifier: String,
    pub icon: Option<String>,
    pub cover_image: Option<String>,
    pub created_by: Option<UserId>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpdateProjectRequest {
    pub id: ProjectId,
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub identifier: Option<String>,
    pub icon: Option<String>,
    pub cover_image: Option<Option<String>>,
}

impl UpdateProjectRequest {
    pub fn new(id: ProjectId) -> Self {
        Self {
            id,
            name: None,
            description: None,
            identifier: None,
            icon: None,
            cover_image: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateStateRequest {
    pub project_id: ProjectId,
    pub name: String,
    pub color: Option<String>,
    pub group: StateGroup,
    /// Appended after the last column when absent.
    pub position: Option<i64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CreateIssueRequest {
    pub project_id: ProjectId,
    pub state_id: Option<StateId>,
    pub name: String,
    pub priority: Priority,
    pub estimate: Option<i64>,
    pub start_date: Option<IssueDate>,
    pub target_date: Option<IssueDate>,
    pub assignee_id: Option<UserId>,
    pub created_by: Option<UserId>,
    pub is_draft: bool,
    pub description: Option<RichDoc>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UpdateIssueRequest {
    pub id: IssueId,
    pub name: Option<String>,
    pub state_id: Option<Option<StateId>>,
    pub priority: Option<Priority>,
    pub estimate: Option<Option<i64>>,
    pub start_date: Option<Option<IssueDate>>,
    pub target_date: Option<Option<IssueDate>>,
    pub assignee_id: Option<Option<UserId>>,
    pub is_draft: Option<bool>,
    /// `Some(None)` removes the description row.
    pub description: Option<Option<RichDoc>>,
}

impl UpdateIssueRequest {
    pub fn new(id: IssueId) -> Self {
        Self {
            id,
            name: None,
            state_id: None,
            priority: None,
            estimate: None,
            start_date: None,
            target_date: None,
            assignee_id: None,
            is_draft: None,
            description: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MoveIssueRequest {
    pub issue_id: IssueId,
    pub state_id: StateId,
    /// Keeps the stored sort order when absent.
    pub sort_order: Option<f64>,
}

/// Rewrites the sort order of a whole column; every listed issue ends up in
/// `state_id`.
#[derive(Clone, Debug, PartialEq)]
pub struct ReorderIssuesRequest {
    pub project_id: ProjectId,
    pub state_id: StateId,
    pub orders: Vec<(IssueId, f64)>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateLabelRequest {
    pub project_id: ProjectId,
    pub name: String,
    pub color: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IssueLabelRequest {
    pub issue_id: IssueId,
    pub label_id: LabelId,
}
