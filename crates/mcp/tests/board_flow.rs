#![forbid(unsafe_code)]

mod support;
use support::*;

use serde_json::{Value, json};

struct Seeded {
    project: String,
    states: Vec<(String, String)>,
    bug: String,
    docs: String,
}

impl Seeded {
    fn state(&self, name: &str) -> &str {
        self.states
            .iter()
            .find(|(state_name, _)| state_name == name)
            .map(|(_, id)| id.as_str())
            .unwrap_or_else(|| panic!("no state named {name}"))
    }
}

fn seed(server: &mut Server) -> Seeded {
    let created = server.call_ok("workspace_create", json!({ "name": "Acme" }));
    assert_eq!(created["workspace"]["slug"], "acme");

    let project = server.call_ok(
        "project_create",
        json!({ "workspace": "acme", "name": "Website", "identifier": "web" }),
    );
    assert_eq!(project["project"]["identifier"], "WEB");
    let states = project["states"]
        .as_array()
        .expect("states")
        .iter()
        .map(|state| (str_at(state, "/name").to_string(), str_at(state, "/id").to_string()))
        .collect::<Vec<_>>();
    let names = states.iter().map(|(name, _)| name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["Backlog", "Todo", "In Progress", "Done"]);
    let project_id = str_at(&project, "/project/id").to_string();

    let bug = server.call_ok(
        "issue_create",
        json!({ "project": project_id, "name": "Fix login bug", "priority": "high" }),
    );
    assert_eq!(bug["issue"]["key"], "WEB-1");
    assert_eq!(bug["issue"]["state_id"], states[0].1.as_str());

    let docs = server.call_ok(
        "issue_create",
        json!({
            "project": project_id,
            "name": "Write docs",
            "state": states[1].1,
            "description": {
                "type": "doc",
                "content": [{ "type": "paragraph", "content": [{ "type": "text", "text": "API guide" }] }]
            }
        }),
    );
    assert_eq!(docs["issue"]["key"], "WEB-2");

    Seeded {
        project: project_id,
        bug: str_at(&bug, "/issue/id").to_string(),
        docs: str_at(&docs, "/issue/id").to_string(),
        states,
    }
}

fn column_issue_names(board: &Value, state_name: &str) -> Vec<String> {
    board["columns"]
        .as_array()
        .expect("columns")
        .iter()
        .find(|column| column["state"]["name"] == state_name)
        .unwrap_or_else(|| panic!("no column {state_name}"))["issues"]
        .as_array()
        .expect("issues")
        .iter()
        .map(|issue| str_at(issue, "/name").to_string())
        .collect()
}

#[test]
fn dragging_a_card_to_another_column_persists_the_move() {
    let mut server = Server::start_initialized();
    let seeded = seed(&mut server);

    let opened = server.call_ok("board_open", json!({ "project": seeded.project }));
    let board = &opened["board"];
    assert_eq!(board["columns"].as_array().unwrap().len(), 4);
    assert_eq!(column_issue_names(board, "Backlog"), vec!["Fix login bug"]);
    assert_eq!(board["stats"]["total"], 2);

    server.call_ok(
        "board_drag_start",
        json!({ "project": seeded.project, "issue": seeded.bug }),
    );
    let dropped = server.call_ok(
        "board_drag_end",
        json!({ "project": seeded.project, "target_state": seeded.state("In Progress") }),
    );
    assert_eq!(dropped["drop"]["outcome"], "applied");
    assert_eq!(dropped["drop"]["plan"]["kind"], "move");
    assert_eq!(column_issue_names(&dropped["board"], "In Progress"), vec!["Fix login bug"]);
    assert!(column_issue_names(&dropped["board"], "Backlog").is_empty());
    assert_eq!(dropped["board"]["active_issue"], Value::Null);

    let stored = server.call_ok("issue_get", json!({ "issue": seeded.bug }));
    assert_eq!(stored["issue"]["state_id"], seeded.state("In Progress"));
}

#[test]
fn dropping_in_place_or_nowhere_changes_nothing() {
    let mut server = Server::start_initialized();
    let seeded = seed(&mut server);
    let opened = server.call_ok("board_open", json!({ "project": seeded.project }));
    let version = opened["board"]["version"].as_i64().unwrap();

    let same = server.call_ok(
        "board_move",
        json!({ "project": seeded.project, "issue": seeded.bug, "target_state": seeded.state("Backlog") }),
    );
    assert_eq!(same["drop"]["outcome"], "noop");
    assert_eq!(same["drop"]["reason"], "same_state");

    server.call_ok(
        "board_drag_start",
        json!({ "project": seeded.project, "issue": seeded.bug }),
    );
    let nowhere = server.call_ok("board_drag_end", json!({ "project": seeded.project }));
    assert_eq!(nowhere["drop"]["reason"], "no_target");
    assert_eq!(nowhere["board"]["version"].as_i64(), Some(version));

    let no_drag = server.call("board_drag_end", json!({ "project": seeded.project }));
    assert_eq!(no_drag["error"]["code"], "INVALID_INPUT");
}

#[test]
fn board_search_filters_cards() {
    let mut server = Server::start_initialized();
    let seeded = seed(&mut server);
    server.call_ok("board_open", json!({ "project": seeded.project }));

    let view = server.call_ok(
        "board_view",
        json!({ "project": seeded.project, "search": "BUG" }),
    );
    let shown = view["board"]["columns"]
        .as_array()
        .unwrap()
        .iter()
        .map(|column| column["issues"].as_array().unwrap().len())
        .sum::<usize>();
    assert_eq!(shown, 1);
    assert_eq!(column_issue_names(&view["board"], "Backlog"), vec!["Fix login bug"]);

    let by_description = server.call_ok(
        "board_view",
        json!({ "project": seeded.project, "search": "api guide" }),
    );
    assert_eq!(column_issue_names(&by_description["board"], "Todo"), vec!["Write docs"]);
}

#[test]
fn issue_list_search_agrees_with_the_board() {
    let mut server = Server::start_initialized();
    let seeded = seed(&mut server);
    server.call_ok(
        "issue_create",
        json!({
            "project": seeded.project,
            "name": "Update docs",
            "description": {
                "type": "doc",
                "content": [{ "type": "paragraph", "content": [{ "type": "text", "text": "login bug repro" }] }]
            }
        }),
    );

    let listed = server.call_ok("issue_list", json!({ "project": seeded.project, "search": "BUG" }));
    assert_eq!(listed["total"], 2);
    let mut names = listed["issues"]
        .as_array()
        .expect("issues")
        .iter()
        .map(|issue| str_at(issue, "/name").to_string())
        .collect::<Vec<_>>();
    names.sort();
    assert_eq!(names, vec!["Fix login bug", "Update docs"]);

    let by_description = server.call_ok(
        "issue_list",
        json!({ "project": seeded.project, "search": "api guide" }),
    );
    assert_eq!(by_description["total"], 1);
    assert_eq!(by_description["issues"][0]["id"], seeded.docs.as_str());
}

#[test]
fn edits_made_outside_the_board_show_up_on_the_next_view() {
    let mut server = Server::start_initialized();
    let seeded = seed(&mut server);
    let opened = server.call_ok("board_open", json!({ "project": seeded.project }));
    let before = opened["board"]["version"].as_i64().unwrap();

    let updated = server.call_ok(
        "issue_update",
        json!({ "issue": seeded.docs, "state": seeded.state("Done") }),
    );
    assert_eq!(updated["version"].as_i64(), Some(before + 1));

    let view = server.call_ok("board_view", json!({ "project": seeded.project }));
    assert_eq!(column_issue_names(&view["board"], "Done"), vec!["Write docs"]);
    assert_eq!(view["board"]["version"].as_i64(), Some(before + 1));

    let feed = server.call_ok(
        "issue_changes",
        json!({ "project": seeded.project, "since": before }),
    );
    let changes = feed["changes"].as_array().unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0]["op"], "update");
    assert_eq!(changes[0]["issue_id"], seeded.docs.as_str());
    assert_eq!(feed["next_since"].as_i64(), Some(before + 1));
}

#[test]
fn closing_or_deleting_drops_the_board() {
    let mut server = Server::start_initialized();
    let seeded = seed(&mut server);
    server.call_ok("board_open", json!({ "project": seeded.project }));

    let closed = server.call_ok("board_close", json!({ "project": seeded.project }));
    assert_eq!(closed["closed"], true);
    let gone = server.call("board_view", json!({ "project": seeded.project }));
    assert_eq!(gone["error"]["code"], "BOARD_NOT_OPEN");

    server.call_ok("board_open", json!({ "project": seeded.project }));
    let deleted = server.call("project_delete", json!({ "project": seeded.project }));
    assert_eq!(deleted["success"], true);
    assert_eq!(deleted["notifications"][0]["title"], "Project deleted");
    let gone = server.call("board_view", json!({ "project": seeded.project }));
    assert_eq!(gone["error"]["code"], "BOARD_NOT_OPEN");
    let missing = server.call("issue_get", json!({ "issue": seeded.bug }));
    assert_eq!(missing["error"]["code"], "NOT_FOUND");
}

#[test]
fn labels_attach_to_issues_of_their_project() {
    let mut server = Server::start_initialized();
    let seeded = seed(&mut server);

    let label = server.call_ok(
        "label_create",
        json!({ "project": seeded.project, "name": "bug", "color": "#ef4444" }),
    );
    let label_id = str_at(&label, "/label/id").to_string();

    let added = server.call_ok(
        "issue_label_add",
        json!({ "issue": seeded.bug, "label": label_id }),
    );
    assert_eq!(added["added"], true);
    assert_eq!(added["labels"][0]["name"], "bug");

    let again = server.call_ok(
        "issue_label_add",
        json!({ "issue": seeded.bug, "label": label_id }),
    );
    assert_eq!(again["added"], false);

    let detail = server.call_ok("issue_get", json!({ "issue": seeded.bug }));
    assert_eq!(detail["issue"]["labels"].as_array().unwrap().len(), 1);

    let removed = server.call_ok(
        "issue_label_remove",
        json!({ "issue": seeded.bug, "label": label_id }),
    );
    assert_eq!(removed["removed"], true);
    assert!(removed["labels"].as_array().unwrap().is_empty());
}

#[test]
fn form_validation_errors_are_inline() {
    let mut server = Server::start_initialized();
    let seeded = seed(&mut server);

    let bad_dates = server.call(
        "issue_create",
        json!({
            "project": seeded.project,
            "name": "Ship",
            "start_date": "2026-05-10",
            "target_date": "2026-05-01"
        }),
    );
    assert_eq!(bad_dates["error"]["code"], "VALIDATION");
    assert_eq!(bad_dates["notifications"], json!([]));

    let blank = server.call("issue_create", json!({ "project": seeded.project, "name": "  " }));
    assert_eq!(blank["error"]["code"], "VALIDATION");

    let listed = server.call_ok("issue_list", json!({ "project": seeded.project }));
    assert_eq!(listed["total"], 2);
}
