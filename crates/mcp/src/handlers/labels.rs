#![forbid(unsafe_code)]

use super::{ToolResult, args_object, not_found, to_json};
use crate::McpServer;
use crate::notify::Toast;
use pb_core::ids::{IssueId, LabelId, ProjectId};
use pb_core::model::Label;
use pb_storage::{CreateLabelRequest, IssueLabelRequest};
use serde_json::{Value, json};

impl McpServer {
    pub(crate) fn tool_label_create(&mut self, args: Value) -> ToolResult {
        let args_obj = args_object(&args)?;
        let project_id: ProjectId = crate::require_id(args_obj, "project")?;
        let name = crate::require_string(args_obj, "name")?;
        let color = crate::optional_string(args_obj, "color")?;
        self.project_for_member(&project_id)?;

        let result = self.store.create_label(CreateLabelRequest {
            project_id,
            name,
            color,
        });
        let label = self.report_write(result, |label| {
            Toast::success("Label created!", format!("{} has been added.", label.name))
        })?;
        Ok(crate::ai_ok(
            "label_create",
            json!({ "label": to_json(&label)? }),
        ))
    }

    pub(crate) fn tool_label_list(&mut self, args: Value) -> ToolResult {
        let args_obj = args_object(&args)?;
        let project_id: ProjectId = crate::require_id(args_obj, "project")?;
        self.project_for_member(&project_id)?;
        let labels = self
            .store
            .list_labels(&project_id)
            .map_err(|err| crate::store_error(&err))?;
        Ok(crate::ai_ok(
            "label_list",
            json!({ "project_id": project_id, "labels": to_json(&labels)? }),
        ))
    }

    pub(crate) fn tool_label_delete(&mut self, args: Value) -> ToolResult {
        let args_obj = args_object(&args)?;
        let label_id: LabelId = crate::require_id(args_obj, "label")?;
        let label = self.label_for_member(&label_id)?;

        let result = self.store.delete_label(&label_id);
        self.report_write(result, |_| {
            Toast::success("Label deleted", format!("{} has been removed.", label.name))
        })?;
        Ok(crate::ai_ok("label_delete", json!({ "deleted": label_id })))
    }

    pub(crate) fn tool_issue_label_add(&mut self, args: Value) -> ToolResult {
        let request = self.issue_label_request(&args)?;
        let added = self
            .store
            .add_issue_label(request)
            .map_err(|err| crate::store_error(&err))?;
        self.issue_labels_result("issue_label_add", request, json!({ "added": added }))
    }

    pub(crate) fn tool_issue_label_remove(&mut self, args: Value) -> ToolResult {
        let request = self.issue_label_request(&args)?;
        let removed = self
            .store
            .remove_issue_label(request)
            .map_err(|err| crate::store_error(&err))?;
        self.issue_labels_result("issue_label_remove", request, json!({ "removed": removed }))
    }

    fn label_for_member(&mut self, label_id: &LabelId) -> Result<Label, Value> {
        let label = self
            .store
            .get_label(label_id)
            .map_err(|err| crate::store_error(&err))?
            .ok_or_else(not_found)?;
        self.project_for_member(&label.project_id)?;
        Ok(label)
    }

    /// Both ends must belong to the same project the caller can see.
    fn issue_label_request(&mut self, args: &Value) -> Result<IssueLabelRequest, Value> {
        let args_obj = args_object(args)?;
        let issue_id: IssueId = crate::require_id(args_obj, "issue")?;
        let label_id: LabelId = crate::require_id(args_obj, "label")?;
        let (issue, _) = self.issue_for_member(&issue_id)?;
        let label = self
            .store
            .get_label(&label_id)
            .map_err(|err| crate::store_error(&err))?
            .ok_or_else(not_found)?;
        if label.project_id != issue.project_id {
            return Err(crate::ai_error(
                "INVALID_INPUT",
                "label does not belong to the issue's project",
            ));
        }
        Ok(IssueLabelRequest { issue_id, label_id })
    }

    fn issue_labels_result(
        &self,
        intent: &str,
        request: IssueLabelRequest,
        mut result: Value,
    ) -> ToolResult {
        let labels = self
            .store
            .list_issue_labels(&request.issue_id)
            .map_err(|err| crate::store_error(&err))?;
        if let Some(obj) = result.as_object_mut() {
            obj.insert("issue_id".to_string(), json!(request.issue_id));
            obj.insert("labels".to_string(), to_json(&labels)?);
        }
        Ok(crate::ai_ok(intent, result))
    }
}
