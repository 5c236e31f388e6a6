#![forbid(unsafe_code)]

use crate::McpServer;
use crate::identity::{AuthUser, StaticIdentity};
use pb_storage::SqliteStore;
use serde_json::{Value, json};

struct Harness {
    _dir: tempfile::TempDir,
    server: McpServer,
}

fn harness(user: Option<&str>) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStore::open(dir.path()).unwrap();
    let identity = StaticIdentity::new(user.map(|email| AuthUser::new(email, None, None)));
    Harness {
        _dir: dir,
        server: McpServer::new(store, Box::new(identity)),
    }
}

fn request(value: Value) -> crate::JsonRpcRequest {
    serde_json::from_value(value).unwrap()
}

impl Harness {
    fn call(&mut self, name: &str, args: Value) -> Value {
        let resp = self
            .server
            .handle(request(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": "tools/call",
                "params": { "name": name, "arguments": args }
            })))
            .unwrap();
        let text = resp["result"]["content"][0]["text"].as_str().unwrap();
        serde_json::from_str(text).unwrap()
    }
}

#[test]
fn initialize_echoes_the_client_protocol_version() {
    let mut h = harness(None);
    let resp = h
        .server
        .handle(request(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "initialize",
            "params": { "protocolVersion": "2025-03-26" }
        })))
        .unwrap();
    assert_eq!(resp["result"]["protocolVersion"], "2025-03-26");
    assert_eq!(resp["result"]["serverInfo"]["name"], crate::SERVER_NAME);
    assert!(resp["result"]["capabilities"]["tools"].is_object());
}

#[test]
fn requests_before_initialization_are_refused_except_tools() {
    let mut h = harness(None);
    let resp = h
        .server
        .handle(request(json!({ "jsonrpc": "2.0", "id": 7, "method": "resources/list" })))
        .unwrap();
    assert_eq!(resp["error"]["code"], -32002);

    assert!(
        h.server
            .handle(request(json!({ "jsonrpc": "2.0", "method": "notifications/progress" })))
            .is_none()
    );

    let resp = h
        .server
        .handle(request(json!({ "jsonrpc": "2.0", "id": 8, "method": "tools/list" })))
        .unwrap();
    assert!(resp["result"]["tools"].as_array().unwrap().len() > 30);
    let resp = h
        .server
        .handle(request(json!({ "jsonrpc": "2.0", "id": 9, "method": "resources/list" })))
        .unwrap();
    assert_eq!(resp["error"]["code"], -32601);
}

#[test]
fn tool_call_params_must_be_an_object() {
    let mut h = harness(None);
    h.server.handle(request(json!({ "jsonrpc": "2.0", "method": "initialized" })));
    let resp = h
        .server
        .handle(request(json!({ "jsonrpc": "2.0", "id": 2, "method": "tools/call", "params": 3 })))
        .unwrap();
    assert_eq!(resp["error"]["code"], -32602);
}

#[test]
fn writes_without_a_session_ask_for_sign_in() {
    let mut h = harness(None);
    let resp = h.call("workspace_create", json!({ "name": "Acme" }));
    assert_eq!(resp["success"], false);
    assert_eq!(resp["error"]["code"], "AUTH_REQUIRED");
    assert_eq!(resp["error"]["recovery"], crate::AUTH_RECOVERY);
    assert_eq!(resp["notifications"][0]["variant"], "destructive");

    let whoami = h.call("session_whoami", json!({}));
    assert_eq!(whoami["result"]["authenticated"], false);
}

#[test]
fn successful_writes_carry_their_toast() {
    let mut h = harness(Some("ada@example.com"));
    let resp = h.call("workspace_create", json!({ "name": "Acme Corp" }));
    assert_eq!(resp["success"], true, "{resp}");
    assert_eq!(resp["result"]["workspace"]["slug"], "acme-corp");
    assert_eq!(resp["notifications"][0]["title"], "Workspace created!");
    assert_eq!(
        resp["notifications"][0]["description"],
        "Acme Corp is ready to use."
    );

    // Toasts are delivered once.
    let list = h.call("workspace_list", json!({}));
    assert_eq!(list["result"]["count"], 1);
    assert_eq!(list["notifications"], json!([]));
}

#[test]
fn unknown_and_namespaced_tools() {
    let mut h = harness(Some("ada@example.com"));
    let resp = h.call("nope", json!({}));
    assert_eq!(resp["error"]["code"], "UNKNOWN_TOOL");

    let resp = h.call("planeboard/session_whoami", json!({}));
    assert_eq!(resp["success"], true);
    assert_eq!(resp["result"]["user"]["email"], "ada@example.com");
}

#[test]
fn serve_speaks_newline_json() {
    let mut h = harness(None);
    let input = concat!(
        r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
        "\n",
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        "\n",
        r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
        "\n",
    );
    let mut reader = std::io::Cursor::new(input.as_bytes().to_vec());
    let mut out = Vec::new();
    crate::entry::serve(&mut h.server, &mut reader, &mut out).unwrap();

    let lines = String::from_utf8(out).unwrap();
    let responses = lines
        .lines()
        .map(|line| serde_json::from_str::<Value>(line).unwrap())
        .collect::<Vec<_>>();
    assert_eq!(responses.len(), 2);
    assert_eq!(responses[0]["result"]["protocolVersion"], crate::MCP_VERSION);
    assert_eq!(responses[1]["id"], 2);
    assert_eq!(responses[1]["result"], json!({}));
}

#[test]
fn inviting_a_known_email_reuses_the_stored_user() {
    let mut h = harness(Some("ada@example.com"));
    let bob_id = pb_core::ids::UserId::generate();
    let bob = h
        .server
        .store
        .ensure_user(pb_storage::EnsureUserRequest {
            id: Some(bob_id),
            email: "bob@example.com".to_string(),
            display_name: Some("Bob".to_string()),
        })
        .unwrap();
    assert_eq!(bob.role, pb_core::model::Role::Member);

    let created = h.call("workspace_create", json!({ "name": "Acme" }));
    assert_eq!(created["success"], true);

    let added = h.call(
        "workspace_member_add",
        json!({ "workspace": "acme", "email": "BOB@example.com" }),
    );
    assert_eq!(added["success"], true, "{added}");
    assert_eq!(added["result"]["user"]["id"], bob_id.to_string());
    assert_eq!(added["result"]["member"]["member_id"], bob_id.to_string());
    assert_eq!(added["result"]["member"]["role"], "member");
}
