#![forbid(unsafe_code)]

//! Tool handlers. Each handler validates its arguments, checks that the
//! signed-in user may touch the target, and returns an envelope built by
//! `ai_ok` / `ai_error`.

mod board;
mod definitions;
mod dispatch;
mod issues;
mod labels;
mod projects;
mod session;
mod states;
mod workspaces;

pub(crate) use definitions::handler_definitions;
pub(crate) use dispatch::dispatch_handler;

use crate::McpServer;
use crate::controllers::forms::FormError;
use crate::notify::{NotificationSink as _, Toast};
use pb_core::ids::{IssueId, ProjectId, UserId, WorkspaceId};
use pb_core::model::{Issue, Project, Workspace};
use pb_storage::{EnsureUserRequest, StoreError};
use serde::Serialize;
use serde_json::Value;

type ToolResult = Result<Value, Value>;

fn args_object(args: &Value) -> Result<&serde_json::Map<String, Value>, Value> {
    args.as_object()
        .ok_or_else(|| crate::ai_error("INVALID_INPUT", "arguments must be an object"))
}

fn form_error(err: &FormError) -> Value {
    let recovery = match err {
        FormError::Unauthenticated => Some(crate::AUTH_RECOVERY),
        FormError::NotMember => Some("Ask a workspace member to add you, then retry."),
        FormError::Store(store) => return crate::store_error(store),
        FormError::Validation { .. } => None,
    };
    crate::ai_error_with(err.code(), &err.to_string(), recovery)
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<Value, Value> {
    serde_json::to_value(value).map_err(|err| {
        tracing::error!(error = %err, "response serialization failed");
        crate::ai_error("INTERNAL_ERROR", "response could not be serialized")
    })
}

fn not_found() -> Value {
    crate::store_error(&StoreError::UnknownId)
}

impl McpServer {
    /// The signed-in user's stored id; the row is created on first use.
    fn signed_in(&mut self) -> Result<UserId, Value> {
        let Some(user) = self.identity.current_user() else {
            return Err(form_error(&FormError::Unauthenticated));
        };
        self.store
            .ensure_user(EnsureUserRequest {
                id: user.id,
                email: user.email,
                display_name: user.display_name,
            })
            .map(|stored| stored.id)
            .map_err(|err| crate::store_error(&err))
    }

    fn require_member(&mut self, workspace_id: &WorkspaceId) -> Result<UserId, Value> {
        let user_id = self.signed_in()?;
        match self.store.is_workspace_member(workspace_id, &user_id) {
            Ok(true) => Ok(user_id),
            Ok(false) => Err(form_error(&FormError::NotMember)),
            Err(err) => Err(crate::store_error(&err)),
        }
    }

    /// Resolves a workspace given by id or slug and checks membership.
    fn workspace_for_member(&mut self, raw: &str) -> Result<Workspace, Value> {
        let workspace = self.workspace_arg(raw)?;
        self.require_member(&workspace.id)?;
        Ok(workspace)
    }

    fn workspace_arg(&self, raw: &str) -> Result<Workspace, Value> {
        let raw = raw.trim();
        let found = match raw.parse::<WorkspaceId>() {
            Ok(id) => self.store.get_workspace(&id),
            Err(_) => self.store.get_workspace_by_slug(raw),
        };
        found
            .map_err(|err| crate::store_error(&err))?
            .ok_or_else(not_found)
    }

    fn project_for_member(&mut self, project_id: &ProjectId) -> Result<Project, Value> {
        let project = self
            .store
            .get_project(project_id)
            .map_err(|err| crate::store_error(&err))?
            .ok_or_else(not_found)?;
        self.require_member(&project.workspace_id)?;
        Ok(project)
    }

    fn issue_for_member(&mut self, issue_id: &IssueId) -> Result<(Issue, Project), Value> {
        let issue = self
            .store
            .get_issue(issue_id)
            .map_err(|err| crate::store_error(&err))?
            .ok_or_else(not_found)?;
        let project = self.project_for_member(&issue.project_id)?;
        Ok((issue, project))
    }

    /// Reports a direct store write: a toast either way, an error envelope on failure.
    fn report_write<T>(
        &mut self,
        result: Result<T, StoreError>,
        success: impl FnOnce(&T) -> Toast,
    ) -> Result<T, Value> {
        match result {
            Ok(value) => {
                self.toasts.notify(success(&value));
                Ok(value)
            }
            Err(err) => {
                tracing::warn!(code = err.code(), error = %err, "write failed");
                self.toasts.notify(Toast::error(err.to_string()));
                Err(crate::store_error(&err))
            }
        }
    }
}
