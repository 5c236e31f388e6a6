#![forbid(unsafe_code)]

use super::{ToolResult, args_object, not_found, to_json};
use crate::McpServer;
use crate::notify::Toast;
use pb_core::ids::{ProjectId, StateId};
use pb_core::model::normalize_color;
use pb_storage::CreateStateRequest;
use serde_json::{Value, json};

impl McpServer {
    pub(crate) fn tool_state_list(&mut self, args: Value) -> ToolResult {
        let args_obj = args_object(&args)?;
        let project_id: ProjectId = crate::require_id(args_obj, "project")?;
        self.project_for_member(&project_id)?;
        let states = self
            .store
            .list_states(&project_id)
            .map_err(|err| crate::store_error(&err))?;
        Ok(crate::ai_ok(
            "state_list",
            json!({ "project_id": project_id, "states": to_json(&states)? }),
        ))
    }

    pub(crate) fn tool_state_create(&mut self, args: Value) -> ToolResult {
        let args_obj = args_object(&args)?;
        let project_id: ProjectId = crate::require_id(args_obj, "project")?;
        let name = crate::require_string(args_obj, "name")?;
        let Some(group) = crate::optional_state_group(args_obj, "group")? else {
            return Err(crate::ai_error("INVALID_INPUT", "group is required"));
        };
        let color = crate::optional_string(args_obj, "color")?
            .map(|raw| {
                normalize_color(&raw)
                    .map_err(|err| crate::ai_error("VALIDATION", &format!("color: {err}")))
            })
            .transpose()?;
        let position = crate::optional_i64(args_obj, "position")?;
        self.project_for_member(&project_id)?;

        let result = self.store.create_state(CreateStateRequest {
            project_id,
            name,
            color,
            group,
            position,
        });
        let state = self.report_write(result, |state| {
            Toast::success("State created!", format!("{} has been added.", state.name))
        })?;
        self.sync_open_board(&project_id);
        Ok(crate::ai_ok(
            "state_create",
            json!({ "state": to_json(&state)? }),
        ))
    }

    /// Issues in the deleted state stay on the board as unassigned.
    pub(crate) fn tool_state_delete(&mut self, args: Value) -> ToolResult {
        let args_obj = args_object(&args)?;
        let state_id: StateId = crate::require_id(args_obj, "state")?;
        let state = self
            .store
            .get_state(&state_id)
            .map_err(|err| crate::store_error(&err))?
            .ok_or_else(not_found)?;
        self.project_for_member(&state.project_id)?;

        let result = self.store.delete_state(&state_id);
        self.report_write(result, |_| {
            Toast::success("State deleted", format!("{} has been removed.", state.name))
        })?;
        self.sync_open_board(&state.project_id);
        Ok(crate::ai_ok(
            "state_delete",
            json!({ "deleted": state_id, "project_id": state.project_id }),
        ))
    }
}
