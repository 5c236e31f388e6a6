#![forbid(unsafe_code)]

use crate::McpServer;
use serde_json::Value;

pub(crate) const DISPATCHED_TOOLS: &[&str] = &[
    "board_close",
    "board_drag_cancel",
    "board_drag_end",
    "board_drag_start",
    "board_move",
    "board_open",
    "board_sync",
    "board_view",
    "issue_changes",
    "issue_create",
    "issue_delete",
    "issue_get",
    "issue_label_add",
    "issue_label_remove",
    "issue_list",
    "issue_update",
    "label_create",
    "label_delete",
    "label_list",
    "project_create",
    "project_delete",
    "project_get",
    "project_list",
    "project_update",
    "session_whoami",
    "state_create",
    "state_delete",
    "state_list",
    "workspace_create",
    "workspace_delete",
    "workspace_get",
    "workspace_list",
    "workspace_member_add",
    "workspace_members",
    "workspace_update",
];

pub(crate) fn dispatch_handler(server: &mut McpServer, name: &str, args: Value) -> Option<Value> {
    let resp = match name {
        "session_whoami" => server.tool_session_whoami(args),
        "workspace_create" => server.tool_workspace_create(args),
        "workspace_list" => server.tool_workspace_list(args),
        "workspace_get" => server.tool_workspace_get(args),
        "workspace_update" => server.tool_workspace_update(args),
        "workspace_delete" => server.tool_workspace_delete(args),
        "workspace_members" => server.tool_workspace_members(args),
        "workspace_member_add" => server.tool_workspace_member_add(args),
        "project_create" => server.tool_project_create(args),
        "project_list" => server.tool_project_list(args),
        "project_get" => server.tool_project_get(args),
        "project_update" => server.tool_project_update(args),
        "project_delete" => server.tool_project_delete(args),
        "state_list" => server.tool_state_list(args),
        "state_create" => server.tool_state_create(args),
        "state_delete" => server.tool_state_delete(args),
        "issue_create" => server.tool_issue_create(args),
        "issue_get" => server.tool_issue_get(args),
        "issue_list" => server.tool_issue_list(args),
        "issue_update" => server.tool_issue_update(args),
        "issue_delete" => server.tool_issue_delete(args),
        "issue_changes" => server.tool_issue_changes(args),
        "label_create" => server.tool_label_create(args),
        "label_list" => server.tool_label_list(args),
        "label_delete" => server.tool_label_delete(args),
        "issue_label_add" => server.tool_issue_label_add(args),
        "issue_label_remove" => server.tool_issue_label_remove(args),
        "board_open" => server.tool_board_open(args),
        "board_view" => server.tool_board_view(args),
        "board_drag_start" => server.tool_board_drag_start(args),
        "board_drag_end" => server.tool_board_drag_end(args),
        "board_drag_cancel" => server.tool_board_drag_cancel(args),
        "board_move" => server.tool_board_move(args),
        "board_sync" => server.tool_board_sync(args),
        "board_close" => server.tool_board_close(args),
        _ => return None,
    };
    Some(resp.unwrap_or_else(|err| err))
}
