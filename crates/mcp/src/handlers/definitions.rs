#![forbid(unsafe_code)]

use serde_json::{Value, json};

fn tool(name: &str, description: &str, properties: Value, required: &[&str]) -> Value {
    json!({
        "name": name,
        "description": description,
        "inputSchema": {
            "type": "object",
            "properties": properties,
            "required": required
        }
    })
}

fn id_prop(what: &str) -> Value {
    json!({ "type": "string", "description": format!("{what} id (uuid)") })
}

fn nullable(kind: &str) -> Value {
    json!({ "type": [kind, "null"] })
}

fn date_prop() -> Value {
    json!({ "type": ["string", "null"], "description": "YYYY-MM-DD; empty or null clears" })
}

fn priority_prop() -> Value {
    json!({ "type": "string", "enum": ["urgent", "high", "medium", "low"] })
}

fn drop_target_props(mut props: Value) -> Value {
    if let Some(obj) = props.as_object_mut() {
        obj.insert(
            "target_state".to_string(),
            json!({ "type": "string", "description": "Drop on a column (header or empty area)" }),
        );
        obj.insert(
            "target_issue".to_string(),
            json!({ "type": "string", "description": "Drop on a card; lands next to it" }),
        );
        obj.insert("search".to_string(), json!({ "type": "string" }));
    }
    props
}

fn workspace_definitions() -> Vec<Value> {
    let workspace = json!({ "type": "string", "description": "Workspace id or slug" });
    vec![
        tool(
            "workspace_create",
            "Create a workspace owned by the signed-in user. The slug defaults to the name.",
            json!({
                "name": { "type": "string" },
                "slug": { "type": "string" },
                "logo": { "type": "string" }
            }),
            &["name"],
        ),
        tool(
            "workspace_list",
            "List workspaces the signed-in user belongs to.",
            json!({}),
            &[],
        ),
        tool(
            "workspace_get",
            "Get a workspace and its projects.",
            json!({ "workspace": workspace }),
            &["workspace"],
        ),
        tool(
            "workspace_update",
            "Rename a workspace, change its slug or logo.",
            json!({
                "workspace": workspace,
                "name": { "type": "string" },
                "slug": { "type": "string" },
                "logo": nullable("string")
            }),
            &["workspace"],
        ),
        tool(
            "workspace_delete",
            "Delete a workspace with every project and issue in it.",
            json!({ "workspace": workspace }),
            &["workspace"],
        ),
        tool(
            "workspace_members",
            "List members of a workspace with their roles.",
            json!({ "workspace": workspace }),
            &["workspace"],
        ),
        tool(
            "workspace_member_add",
            "Add a user to a workspace by email.",
            json!({
                "workspace": workspace,
                "email": { "type": "string" },
                "display_name": { "type": "string" },
                "role": { "type": "string", "enum": ["admin", "member", "guest"] }
            }),
            &["workspace", "email"],
        ),
    ]
}

fn project_definitions() -> Vec<Value> {
    vec![
        tool(
            "project_create",
            "Create a project with the default Backlog, Todo, In Progress and Done states.",
            json!({
                "workspace": { "type": "string", "description": "Workspace id or slug" },
                "name": { "type": "string" },
                "identifier": { "type": "string", "description": "Short issue key prefix, e.g. WEB" },
                "description": { "type": "string" },
                "icon": { "type": "string", "description": "Up to two characters" },
                "cover_image": { "type": "string" }
            }),
            &["workspace", "name", "identifier"],
        ),
        tool(
            "project_list",
            "List projects of a workspace.",
            json!({ "workspace": { "type": "string", "description": "Workspace id or slug" } }),
            &["workspace"],
        ),
        tool(
            "project_get",
            "Get a project with its states and labels.",
            json!({ "project": id_prop("Project") }),
            &["project"],
        ),
        tool(
            "project_update",
            "Change project fields.",
            json!({
                "project": id_prop("Project"),
                "name": { "type": "string" },
                "identifier": { "type": "string" },
                "description": nullable("string"),
                "icon": { "type": "string" },
                "cover_image": nullable("string")
            }),
            &["project"],
        ),
        tool(
            "project_delete",
            "Delete a project with its states, issues and labels.",
            json!({ "project": id_prop("Project") }),
            &["project"],
        ),
        tool(
            "state_list",
            "List the board columns of a project in order.",
            json!({ "project": id_prop("Project") }),
            &["project"],
        ),
        tool(
            "state_create",
            "Add a board column.",
            json!({
                "project": id_prop("Project"),
                "name": { "type": "string" },
                "group": {
                    "type": "string",
                    "enum": ["backlog", "unstarted", "started", "completed", "cancelled"]
                },
                "color": { "type": "string", "description": "#rrggbb" },
                "position": { "type": "integer" }
            }),
            &["project", "name", "group"],
        ),
        tool(
            "state_delete",
            "Delete a column. Its issues stay on the board without a state.",
            json!({ "state": id_prop("State") }),
            &["state"],
        ),
    ]
}

fn issue_definitions() -> Vec<Value> {
    vec![
        tool(
            "issue_create",
            "Create an issue. The state defaults to the first column.",
            json!({
                "project": id_prop("Project"),
                "name": { "type": "string" },
                "state": id_prop("State"),
                "priority": priority_prop(),
                "estimate": { "type": "integer", "minimum": 0 },
                "start_date": date_prop(),
                "target_date": date_prop(),
                "assignee": id_prop("User"),
                "is_draft": { "type": "boolean" },
                "description": { "description": "Rich text document; {} or null for none" }
            }),
            &["project", "name"],
        ),
        tool(
            "issue_get",
            "Get an issue with assignee, labels and description.",
            json!({ "issue": id_prop("Issue") }),
            &["issue"],
        ),
        tool(
            "issue_list",
            "List issues of a project in board order.",
            json!({
                "project": id_prop("Project"),
                "state": id_prop("State"),
                "search": { "type": "string" },
                "include_drafts": { "type": "boolean" },
                "limit": { "type": "integer", "minimum": 1 }
            }),
            &["project"],
        ),
        tool(
            "issue_update",
            "Change issue fields; null clears a nullable field.",
            json!({
                "issue": id_prop("Issue"),
                "name": { "type": "string" },
                "state": nullable("string"),
                "priority": priority_prop(),
                "estimate": nullable("integer"),
                "start_date": date_prop(),
                "target_date": date_prop(),
                "assignee": nullable("string"),
                "is_draft": { "type": "boolean" },
                "description": { "description": "Rich text document; {} or null removes it" }
            }),
            &["issue"],
        ),
        tool(
            "issue_delete",
            "Delete an issue.",
            json!({ "issue": id_prop("Issue") }),
            &["issue"],
        ),
        tool(
            "issue_changes",
            "Read the project's issue change feed after a version.",
            json!({
                "project": id_prop("Project"),
                "since": { "type": "integer", "minimum": 0 },
                "limit": { "type": "integer", "minimum": 1 }
            }),
            &["project"],
        ),
        tool(
            "label_create",
            "Create a project label.",
            json!({
                "project": id_prop("Project"),
                "name": { "type": "string" },
                "color": { "type": "string", "description": "#rrggbb" }
            }),
            &["project", "name"],
        ),
        tool(
            "label_list",
            "List project labels.",
            json!({ "project": id_prop("Project") }),
            &["project"],
        ),
        tool(
            "label_delete",
            "Delete a label and detach it from every issue.",
            json!({ "label": id_prop("Label") }),
            &["label"],
        ),
        tool(
            "issue_label_add",
            "Attach a label to an issue.",
            json!({ "issue": id_prop("Issue"), "label": id_prop("Label") }),
            &["issue", "label"],
        ),
        tool(
            "issue_label_remove",
            "Detach a label from an issue.",
            json!({ "issue": id_prop("Issue"), "label": id_prop("Label") }),
            &["issue", "label"],
        ),
    ]
}

fn board_definitions() -> Vec<Value> {
    let project = || json!({ "project": id_prop("Project") });
    vec![
        tool(
            "board_open",
            "Open the kanban board of a project and render it.",
            json!({ "project": id_prop("Project"), "search": { "type": "string" } }),
            &["project"],
        ),
        tool(
            "board_view",
            "Render an open board, reloading first if the change feed moved.",
            json!({ "project": id_prop("Project"), "search": { "type": "string" } }),
            &["project"],
        ),
        tool(
            "board_drag_start",
            "Pick up a card.",
            json!({ "project": id_prop("Project"), "issue": id_prop("Issue") }),
            &["project", "issue"],
        ),
        tool(
            "board_drag_end",
            "Drop the picked-up card. Without a target the drop is ignored.",
            drop_target_props(project()),
            &["project"],
        ),
        tool(
            "board_drag_cancel",
            "Put the picked-up card back without moving it.",
            project(),
            &["project"],
        ),
        tool(
            "board_move",
            "Move a card in one call: pick it up and drop it on a target.",
            drop_target_props(json!({
                "project": id_prop("Project"),
                "issue": id_prop("Issue")
            })),
            &["project", "issue"],
        ),
        tool(
            "board_sync",
            "Poll the change feed and reload the board when it moved.",
            project(),
            &["project"],
        ),
        tool("board_close", "Close an open board.", project(), &["project"]),
    ]
}

pub(crate) fn handler_definitions() -> Vec<Value> {
    let mut handlers = vec![tool(
        "session_whoami",
        "Show the signed-in user and their workspaces.",
        json!({}),
        &[],
    )];
    handlers.extend(workspace_definitions());
    handlers.extend(project_definitions());
    handlers.extend(issue_definitions());
    handlers.extend(board_definitions());
    handlers.sort_by_key(|tool| {
        tool.get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string()
    });
    handlers
}
