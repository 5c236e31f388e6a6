#![forbid(unsafe_code)]

use super::{ToolResult, args_object, form_error, to_json};
use crate::McpServer;
use crate::controllers::forms::{self, ProjectForm};
use crate::notify::Toast;
use pb_core::ids::ProjectId;
use pb_core::naming::ProjectIdentifier;
use pb_storage::UpdateProjectRequest;
use serde_json::{Value, json};

impl McpServer {
    pub(crate) fn tool_project_create(&mut self, args: Value) -> ToolResult {
        let args_obj = args_object(&args)?;
        let raw = crate::require_string(args_obj, "workspace")?;
        let workspace = self.workspace_arg(&raw)?;
        let form = ProjectForm {
            workspace_id: workspace.id,
            name: crate::require_string(args_obj, "name")?,
            identifier: crate::require_string(args_obj, "identifier")?,
            description: crate::optional_string(args_obj, "description")?,
            icon: crate::optional_string(args_obj, "icon")?,
            cover_image: crate::optional_string(args_obj, "cover_image")?,
        };
        let (project, states) = form
            .submit(&mut self.form_context())
            .map_err(|err| form_error(&err))?;
        Ok(crate::ai_ok(
            "project_create",
            json!({ "project": to_json(&project)?, "states": to_json(&states)? }),
        ))
    }

    pub(crate) fn tool_project_list(&mut self, args: Value) -> ToolResult {
        let args_obj = args_object(&args)?;
        let raw = crate::require_string(args_obj, "workspace")?;
        let workspace = self.workspace_for_member(&raw)?;
        let projects = self
            .store
            .list_projects(&workspace.id)
            .map_err(|err| crate::store_error(&err))?;
        Ok(crate::ai_ok(
            "project_list",
            json!({
                "workspace_id": workspace.id,
                "count": projects.len(),
                "projects": to_json(&projects)?,
            }),
        ))
    }

    pub(crate) fn tool_project_get(&mut self, args: Value) -> ToolResult {
        let args_obj = args_object(&args)?;
        let project_id: ProjectId = crate::require_id(args_obj, "project")?;
        let project = self.project_for_member(&project_id)?;
        let states = self
            .store
            .list_states(&project_id)
            .map_err(|err| crate::store_error(&err))?;
        let labels = self
            .store
            .list_labels(&project_id)
            .map_err(|err| crate::store_error(&err))?;
        Ok(crate::ai_ok(
            "project_get",
            json!({
                "project": to_json(&project)?,
                "states": to_json(&states)?,
                "labels": to_json(&labels)?,
            }),
        ))
    }

    pub(crate) fn tool_project_update(&mut self, args: Value) -> ToolResult {
        let args_obj = args_object(&args)?;
        let project_id: ProjectId = crate::require_id(args_obj, "project")?;
        let mut request = UpdateProjectRequest::new(project_id);
        request.name = crate::optional_string(args_obj, "name")?;
        request.description = crate::optional_nullable_string(args_obj, "description")?;
        request.icon = crate::optional_string(args_obj, "icon")?;
        request.cover_image = crate::optional_nullable_string(args_obj, "cover_image")?;
        request.identifier = crate::optional_string(args_obj, "identifier")?
            .map(|raw| {
                ProjectIdentifier::parse(&raw)
                    .map(ProjectIdentifier::into_string)
                    .map_err(|err| crate::ai_error("VALIDATION", &format!("identifier: {err}")))
            })
            .transpose()?;
        if request.name.is_none()
            && request.description.is_none()
            && request.identifier.is_none()
            && request.icon.is_none()
            && request.cover_image.is_none()
        {
            return Err(crate::ai_error(
                "INVALID_INPUT",
                "provide at least one field to change",
            ));
        }
        self.project_for_member(&project_id)?;

        let result = self.store.update_project(request);
        let project = self.report_write(result, |_| {
            Toast::success("Project updated!", "Changes have been saved.")
        })?;
        Ok(crate::ai_ok(
            "project_update",
            json!({ "project": to_json(&project)? }),
        ))
    }

    pub(crate) fn tool_project_delete(&mut self, args: Value) -> ToolResult {
        let args_obj = args_object(&args)?;
        let project_id: ProjectId = crate::require_id(args_obj, "project")?;
        forms::delete_project(&mut self.form_context(), project_id)
            .map_err(|err| form_error(&err))?;
        self.boards.remove(&project_id);
        Ok(crate::ai_ok(
            "project_delete",
            json!({ "deleted": project_id }),
        ))
    }
}
