#![forbid(unsafe_code)]

use super::{ToolResult, args_object, form_error, not_found, to_json};
use crate::McpServer;
use crate::controllers::forms::{self, IssueEditForm, IssueForm};
use pb_core::ids::{IssueId, ProjectId, StateId};
use pb_core::model::{Issue, Project};
use serde_json::{Value, json};

const LIST_LIMIT_MAX: usize = 500;

/// Issue JSON plus its human key (`WEB-12`) and readable timestamps.
fn issue_json(issue: &Issue, project: &Project) -> Result<Value, Value> {
    let mut value = to_json(issue)?;
    if let Some(obj) = value.as_object_mut() {
        obj.insert("key".to_string(), json!(issue.key(&project.identifier)));
        obj.insert(
            "created_at".to_string(),
            json!(crate::ts_ms_to_rfc3339(issue.created_at_ms)),
        );
        obj.insert(
            "updated_at".to_string(),
            json!(crate::ts_ms_to_rfc3339(issue.updated_at_ms)),
        );
    }
    Ok(value)
}

impl McpServer {
    pub(crate) fn tool_issue_create(&mut self, args: Value) -> ToolResult {
        let args_obj = args_object(&args)?;
        let project_id: ProjectId = crate::require_id(args_obj, "project")?;
        let mut form = IssueForm::new(project_id, crate::require_string(args_obj, "name")?);
        form.state_id = crate::optional_id(args_obj, "state")?;
        form.priority = crate::optional_priority(args_obj, "priority")?;
        form.estimate = crate::optional_i64(args_obj, "estimate")?;
        form.start_date = crate::optional_nullable_date(args_obj, "start_date")?.flatten();
        form.target_date = crate::optional_nullable_date(args_obj, "target_date")?.flatten();
        form.assignee_id = crate::optional_id(args_obj, "assignee")?;
        form.is_draft = crate::bool_or(args_obj, "is_draft", false)?;
        if let Some(description) = args_obj.get("description") {
            form.description = description.clone();
        }

        let written = form
            .submit(&mut self.form_context())
            .map_err(|err| form_error(&err))?;
        let project = self.project_for_member(&project_id)?;
        self.sync_open_board(&project_id);
        Ok(crate::ai_ok(
            "issue_create",
            json!({
                "issue": issue_json(&written.issue, &project)?,
                "version": written.version,
            }),
        ))
    }

    pub(crate) fn tool_issue_get(&mut self, args: Value) -> ToolResult {
        let args_obj = args_object(&args)?;
        let issue_id: IssueId = crate::require_id(args_obj, "issue")?;
        let (_, project) = self.issue_for_member(&issue_id)?;
        let detail = self
            .store
            .get_issue_detail(&issue_id)
            .map_err(|err| crate::store_error(&err))?
            .ok_or_else(not_found)?;

        let mut issue = issue_json(&detail.issue, &project)?;
        if let Some(obj) = issue.as_object_mut() {
            obj.insert("assignee".to_string(), to_json(&detail.assignee)?);
            obj.insert("labels".to_string(), to_json(&detail.labels)?);
            obj.insert(
                "description".to_string(),
                match &detail.description {
                    Some(description) => json!({
                        "content": to_json(&description.content)?,
                        "text": description.content.plain_text(),
                        "updated_at": crate::ts_ms_to_rfc3339(description.updated_at_ms),
                    }),
                    None => Value::Null,
                },
            );
        }
        Ok(crate::ai_ok("issue_get", json!({ "issue": issue })))
    }

    pub(crate) fn tool_issue_list(&mut self, args: Value) -> ToolResult {
        let args_obj = args_object(&args)?;
        let project_id: ProjectId = crate::require_id(args_obj, "project")?;
        let state_filter: Option<StateId> = crate::optional_id(args_obj, "state")?;
        let search = crate::optional_string(args_obj, "search")?.unwrap_or_default();
        let include_drafts = crate::bool_or(args_obj, "include_drafts", true)?;
        let limit = crate::optional_usize(args_obj, "limit")?
            .unwrap_or(LIST_LIMIT_MAX)
            .clamp(1, LIST_LIMIT_MAX);
        let project = self.project_for_member(&project_id)?;

        // The board snapshot carries description text for the search filter.
        let snapshot = self
            .store
            .load_board(&project_id)
            .map_err(|err| crate::store_error(&err))?;
        let matching = snapshot
            .issues
            .iter()
            .filter(|item| state_filter.is_none() || item.issue.state_id == state_filter)
            .filter(|item| include_drafts || !item.issue.is_draft)
            .filter(|item| item.matches_search(&search))
            .map(|item| &item.issue)
            .collect::<Vec<_>>();
        let total = matching.len();
        let rendered = matching
            .into_iter()
            .take(limit)
            .map(|issue| issue_json(issue, &project))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(crate::ai_ok(
            "issue_list",
            json!({
                "project_id": project_id,
                "total": total,
                "truncated": total > rendered.len(),
                "issues": rendered,
            }),
        ))
    }

    pub(crate) fn tool_issue_update(&mut self, args: Value) -> ToolResult {
        let args_obj = args_object(&args)?;
        let issue_id: IssueId = crate::require_id(args_obj, "issue")?;
        let mut form = IssueEditForm::new(issue_id);
        form.name = crate::optional_string(args_obj, "name")?;
        form.state_id = crate::optional_nullable_id(args_obj, "state")?;
        form.priority = crate::optional_priority(args_obj, "priority")?;
        form.estimate = crate::optional_nullable_i64(args_obj, "estimate")?;
        form.start_date = crate::optional_nullable_date(args_obj, "start_date")?;
        form.target_date = crate::optional_nullable_date(args_obj, "target_date")?;
        form.assignee_id = crate::optional_nullable_id(args_obj, "assignee")?;
        form.is_draft = crate::optional_bool(args_obj, "is_draft")?;
        form.description = args_obj.get("description").cloned();

        let written = form
            .submit(&mut self.form_context())
            .map_err(|err| form_error(&err))?;
        let project = self.project_for_member(&written.issue.project_id)?;
        self.sync_open_board(&project.id);
        Ok(crate::ai_ok(
            "issue_update",
            json!({
                "issue": issue_json(&written.issue, &project)?,
                "version": written.version,
            }),
        ))
    }

    pub(crate) fn tool_issue_delete(&mut self, args: Value) -> ToolResult {
        let args_obj = args_object(&args)?;
        let issue_id: IssueId = crate::require_id(args_obj, "issue")?;
        let project_id = self
            .store
            .get_issue(&issue_id)
            .map_err(|err| crate::store_error(&err))?
            .map(|issue| issue.project_id);
        forms::delete_issue(&mut self.form_context(), issue_id).map_err(|err| form_error(&err))?;
        if let Some(project_id) = project_id {
            self.sync_open_board(&project_id);
        }
        Ok(crate::ai_ok("issue_delete", json!({ "deleted": issue_id })))
    }

    /// Feed entries after `since`, oldest first.
    pub(crate) fn tool_issue_changes(&mut self, args: Value) -> ToolResult {
        let args_obj = args_object(&args)?;
        let project_id: ProjectId = crate::require_id(args_obj, "project")?;
        let since = crate::optional_i64(args_obj, "since")?.unwrap_or(0).max(0);
        let limit = crate::optional_usize(args_obj, "limit")?
            .unwrap_or(100)
            .clamp(1, LIST_LIMIT_MAX);
        self.project_for_member(&project_id)?;

        let version = self
            .store
            .issues_version(&project_id)
            .map_err(|err| crate::store_error(&err))?;
        let changes = self
            .store
            .list_changes(&project_id, since, limit)
            .map_err(|err| crate::store_error(&err))?;
        let next_since = changes.last().map_or(since, |change| change.version);
        let events = changes
            .iter()
            .map(|change| {
                let mut value = to_json(change)?;
                if let Some(obj) = value.as_object_mut() {
                    obj.insert("ts".to_string(), json!(crate::ts_ms_to_rfc3339(change.ts_ms)));
                }
                Ok(value)
            })
            .collect::<Result<Vec<_>, Value>>()?;
        Ok(crate::ai_ok(
            "issue_changes",
            json!({
                "project_id": project_id,
                "version": version,
                "next_since": next_since,
                "changes": events,
            }),
        ))
    }
}
