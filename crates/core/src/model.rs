#![forbid(unsafe_code)]

use crate::ids::{
    DescriptionId, IssueId, LabelId, MembershipId, ProjectId, StateId, UserId, WorkspaceId,
};
use crate::rich_text::RichDoc;
use serde::{Serialize, Serializer};
use time::Date;
use time::macros::format_description;

pub const NAME_MAX_CHARS: usize = 255;
pub const ISSUE_NAME_MAX_CHARS: usize = 500;
pub const ICON_MAX_CHARS: usize = 2;
pub const DEFAULT_PROJECT_ICON: &str = "📋";
pub const DEFAULT_STATE_COLOR: &str = "#3f3f46";
pub const DEFAULT_LABEL_COLOR: &str = "#3f3f46";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Admin,
    Member,
    Guest,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
            Self::Guest => "guest",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "owner" => Some(Self::Owner),
            "admin" => Some(Self::Admin),
            "member" => Some(Self::Member),
            "guest" => Some(Self::Guest),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Urgent,
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Urgent => "urgent",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "urgent" => Some(Self::Urgent),
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// Semantic bucket of a workflow column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StateGroup {
    Backlog,
    Unstarted,
    Started,
    Completed,
    Cancelled,
}

impl StateGroup {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Backlog => "backlog",
            Self::Unstarted => "unstarted",
            Self::Started => "started",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "backlog" => Some(Self::Backlog),
            "unstarted" => Some(Self::Unstarted),
            "started" => Some(Self::Started),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_closed(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

pub struct DefaultState {
    pub name: &'static str,
    pub color: &'static str,
    pub group: StateGroup,
}

/// Columns every new project starts with, in board order.
pub const DEFAULT_STATES: [DefaultState; 4] = [
    DefaultState {
        name: "Backlog",
        color: "#94a3b8",
        group: StateGroup::Backlog,
    },
    DefaultState {
        name: "Todo",
        color: "#3b82f6",
        group: StateGroup::Unstarted,
    },
    DefaultState {
        name: "In Progress",
        color: "#f59e0b",
        group: StateGroup::Started,
    },
    DefaultState {
        name: "Done",
        color: "#10b981",
        group: StateGroup::Completed,
    },
];

/// Calendar day without a time component (`YYYY-MM-DD`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IssueDate(Date);

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("date must be YYYY-MM-DD (got {0:?})")]
pub struct IssueDateError(pub String);

impl IssueDate {
    pub fn new(date: Date) -> Self {
        Self(date)
    }

    pub fn date(self) -> Date {
        self.0
    }

    pub fn parse(value: &str) -> Result<Self, IssueDateError> {
        Date::parse(value.trim(), format_description!("[year]-[month]-[day]"))
            .map(Self)
            .map_err(|_| IssueDateError(value.to_string()))
    }

    pub fn to_iso(self) -> String {
        format!(
            "{:04}-{:02}-{:02}",
            self.0.year(),
            u8::from(self.0.month()),
            self.0.day()
        )
    }
}

impl Serialize for IssueDate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub role: Role,
    pub is_onboarded: bool,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            email: self.email.clone(),
            display_name: self.display_name.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

/// The slice of a user joined onto issue rows.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UserSummary {
    pub id: UserId,
    pub email: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Workspace {
    pub id: WorkspaceId,
    pub slug: String,
    pub name: String,
    pub logo: Option<String>,
    pub owner_id: Option<UserId>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WorkspaceMember {
    pub id: MembershipId,
    pub workspace_id: WorkspaceId,
    pub member_id: UserId,
    pub role: Role,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Project {
    pub id: ProjectId,
    pub workspace_id: WorkspaceId,
    pub name: String,
    pub description: Option<String>,
    pub identifier: String,
    pub icon: String,
    pub cover_image: Option<String>,
    pub created_by: Option<UserId>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IssueState {
    pub id: StateId,
    pub project_id: ProjectId,
    pub name: String,
    pub color: String,
    pub position: i64,
    pub group: StateGroup,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Issue {
    pub id: IssueId,
    pub project_id: ProjectId,
    pub state_id: Option<StateId>,
    pub sequence_id: i64,
    pub name: String,
    pub priority: Priority,
    pub estimate: Option<i64>,
    pub start_date: Option<IssueDate>,
    pub target_date: Option<IssueDate>,
    pub completed_at_ms: Option<i64>,
    pub assignee_id: Option<UserId>,
    pub created_by: Option<UserId>,
    pub sort_order: f64,
    pub is_draft: bool,
    pub archived_at_ms: Option<i64>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

impl Issue {
    /// Human-facing key such as `WEB-12`.
    pub fn key(&self, project_identifier: &str) -> String {
        format!("{project_identifier}-{}", self.sequence_id)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct IssueDescription {
    pub id: DescriptionId,
    pub issue_id: IssueId,
    pub content: RichDoc,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Label {
    pub id: LabelId,
    pub project_id: ProjectId,
    pub name: String,
    pub color: String,
    pub created_at_ms: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("color must look like #rrggbb (got {0:?})")]
pub struct ColorError(pub String);

pub fn normalize_color(value: &str) -> Result<String, ColorError> {
    let trimmed = value.trim();
    let Some(hex) = trimmed.strip_prefix('#') else {
        return Err(ColorError(value.to_string()));
    };
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(ColorError(value.to_string()));
    }
    Ok(trimmed.to_ascii_lowercase())
}
