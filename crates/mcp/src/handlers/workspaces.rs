#![forbid(unsafe_code)]

use super::{ToolResult, args_object, form_error, to_json};
use crate::McpServer;
use crate::controllers::forms::{self, WorkspaceForm};
use crate::notify::Toast;
use pb_core::model::Role;
use pb_core::naming::workspace_slug;
use pb_storage::{AddMemberRequest, EnsureUserRequest, UpdateWorkspaceRequest};
use serde_json::{Value, json};

impl McpServer {
    pub(crate) fn tool_workspace_create(&mut self, args: Value) -> ToolResult {
        let args_obj = args_object(&args)?;
        let form = WorkspaceForm {
            name: crate::require_string(args_obj, "name")?,
            slug: crate::optional_string(args_obj, "slug")?,
            logo: crate::optional_string(args_obj, "logo")?,
        };
        let workspace = form
            .submit(&mut self.form_context())
            .map_err(|err| form_error(&err))?;
        Ok(crate::ai_ok(
            "workspace_create",
            json!({ "workspace": to_json(&workspace)? }),
        ))
    }

    pub(crate) fn tool_workspace_list(&mut self, args: Value) -> ToolResult {
        args_object(&args)?;
        let user_id = self.signed_in()?;
        let workspaces = self
            .store
            .list_workspaces_for_member(&user_id)
            .map_err(|err| crate::store_error(&err))?;
        Ok(crate::ai_ok(
            "workspace_list",
            json!({ "count": workspaces.len(), "workspaces": to_json(&workspaces)? }),
        ))
    }

    pub(crate) fn tool_workspace_get(&mut self, args: Value) -> ToolResult {
        let args_obj = args_object(&args)?;
        let raw = crate::require_string(args_obj, "workspace")?;
        let workspace = self.workspace_for_member(&raw)?;
        let projects = self
            .store
            .list_projects(&workspace.id)
            .map_err(|err| crate::store_error(&err))?;
        Ok(crate::ai_ok(
            "workspace_get",
            json!({
                "workspace": to_json(&workspace)?,
                "projects": to_json(&projects)?,
            }),
        ))
    }

    pub(crate) fn tool_workspace_update(&mut self, args: Value) -> ToolResult {
        let args_obj = args_object(&args)?;
        let raw = crate::require_string(args_obj, "workspace")?;
        let name = crate::optional_string(args_obj, "name")?;
        let slug = crate::optional_string(args_obj, "slug")?;
        let logo = crate::optional_nullable_string(args_obj, "logo")?;
        if name.is_none() && slug.is_none() && logo.is_none() {
            return Err(crate::ai_error(
                "INVALID_INPUT",
                "provide at least one of name, slug, logo",
            ));
        }
        let workspace = self.workspace_for_member(&raw)?;

        let mut request = UpdateWorkspaceRequest::new(workspace.id);
        request.name = name;
        request.slug = slug.as_deref().map(workspace_slug);
        request.logo = logo;
        let result = self.store.update_workspace(request);
        let updated = self.report_write(result, |_| {
            Toast::success("Workspace updated!", "Changes have been saved.")
        })?;
        Ok(crate::ai_ok(
            "workspace_update",
            json!({ "workspace": to_json(&updated)? }),
        ))
    }

    pub(crate) fn tool_workspace_delete(&mut self, args: Value) -> ToolResult {
        let args_obj = args_object(&args)?;
        let raw = crate::require_string(args_obj, "workspace")?;
        let workspace = self.workspace_arg(&raw)?;
        let projects = self
            .store
            .list_projects(&workspace.id)
            .map_err(|err| crate::store_error(&err))?;
        forms::delete_workspace(&mut self.form_context(), workspace.id)
            .map_err(|err| form_error(&err))?;
        for project in &projects {
            self.boards.remove(&project.id);
        }
        Ok(crate::ai_ok(
            "workspace_delete",
            json!({ "deleted": workspace.id, "projects_deleted": projects.len() }),
        ))
    }

    pub(crate) fn tool_workspace_members(&mut self, args: Value) -> ToolResult {
        let args_obj = args_object(&args)?;
        let raw = crate::require_string(args_obj, "workspace")?;
        let workspace = self.workspace_for_member(&raw)?;
        let members = self
            .store
            .list_workspace_members(&workspace.id)
            .map_err(|err| crate::store_error(&err))?;
        Ok(crate::ai_ok(
            "workspace_members",
            json!({ "workspace_id": workspace.id, "members": to_json(&members)? }),
        ))
    }

    /// Invites by email; the user row is created if it does not exist yet.
    pub(crate) fn tool_workspace_member_add(&mut self, args: Value) -> ToolResult {
        let args_obj = args_object(&args)?;
        let raw = crate::require_string(args_obj, "workspace")?;
        let email = crate::require_string(args_obj, "email")?;
        let email = email.trim().to_string();
        if !email.contains('@') {
            return Err(crate::ai_error("INVALID_INPUT", "email must look like name@host"));
        }
        let role = crate::optional_role(args_obj, "role")?.unwrap_or(Role::Member);
        if role == Role::Owner {
            return Err(crate::ai_error(
                "INVALID_INPUT",
                "a workspace has exactly one owner",
            ));
        }
        let display_name = crate::optional_string(args_obj, "display_name")?;
        let workspace = self.workspace_for_member(&raw)?;

        let user = self
            .store
            .ensure_user(EnsureUserRequest {
                id: None,
                email,
                display_name,
            })
            .map_err(|err| crate::store_error(&err))?;
        let result = self.store.add_workspace_member(AddMemberRequest {
            workspace_id: workspace.id,
            member_id: user.id,
            role,
        });
        let member = self.report_write(result, |_| {
            Toast::success("Member added", format!("{} joined {}.", user.email, workspace.name))
        })?;
        Ok(crate::ai_ok(
            "workspace_member_add",
            json!({ "member": to_json(&member)?, "user": to_json(&user.summary())? }),
        ))
    }
}
