#![forbid(unsafe_code)]

mod support;
use support::*;

use serde_json::json;

#[test]
fn initialize_then_list_tools() {
    let mut server = Server::start();

    let init = server.request(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": { "protocolVersion": "2024-11-05", "capabilities": {}, "clientInfo": { "name": "test", "version": "0" } }
    }));
    assert_eq!(init["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(init["result"]["serverInfo"]["name"], "planeboard-mcp");

    let tools_list = server.request(json!({
        "jsonrpc": "2.0",
        "id": 2,
        "method": "tools/list",
        "params": {}
    }));
    let tools = tools_list
        .get("result")
        .and_then(|v| v.get("tools"))
        .and_then(|v| v.as_array())
        .expect("result.tools");
    let names = tools
        .iter()
        .filter_map(|tool| tool.get("name").and_then(|v| v.as_str()))
        .collect::<Vec<_>>();

    let mut sorted = names.clone();
    sorted.sort();
    assert_eq!(names, sorted, "tools are listed by name");
    for expected in ["board_drag_end", "issue_create", "project_create", "workspace_create"] {
        assert!(names.contains(&expected), "missing {expected}");
    }
    assert!(tools.iter().all(|tool| tool["inputSchema"]["type"] == "object"));
}

#[test]
fn unknown_methods_and_uninitialized_requests() {
    let mut server = Server::start();

    let early = server.request(json!({ "jsonrpc": "2.0", "id": 3, "method": "prompts/list" }));
    assert_json_rpc_error(&early, -32002);

    server.initialize_default();
    let unknown = server.request(json!({ "jsonrpc": "2.0", "id": 4, "method": "prompts/list" }));
    assert_json_rpc_error(&unknown, -32601);

    let ping = server.request(json!({ "jsonrpc": "2.0", "id": 5, "method": "ping" }));
    assert_eq!(ping["result"], json!({}));
}

#[test]
fn malformed_messages_get_protocol_errors() {
    let mut server = Server::start_initialized();

    server.send_raw("{\"jsonrpc\":\"2.0\",\"id\":6,");
    assert_json_rpc_error(&server.recv(), -32700);

    let missing_method = server.request(json!({ "jsonrpc": "2.0", "id": 7 }));
    assert_json_rpc_error(&missing_method, -32600);

    // The server keeps serving after a bad message.
    let ping = server.request(json!({ "jsonrpc": "2.0", "id": 8, "method": "ping" }));
    assert_eq!(ping["id"], 8);
}

#[test]
fn tool_errors_are_flagged_in_the_envelope() {
    let mut server = Server::start_initialized();
    let resp = server.request(json!({
        "jsonrpc": "2.0",
        "id": 9,
        "method": "tools/call",
        "params": { "name": "issue_get", "arguments": { "issue": "not-a-uuid" } }
    }));
    assert_eq!(resp["result"]["isError"], true);
    let payload = extract_tool_text(&resp);
    assert_eq!(payload["success"], false);
    assert_eq!(payload["error"]["code"], "INVALID_INPUT");
}

#[test]
fn signed_out_sessions_cannot_write() {
    let mut server = Server::start_signed_out();
    server.initialize_default();

    let whoami = server.call_ok("session_whoami", json!({}));
    assert_eq!(whoami["authenticated"], false);

    let created = server.call("workspace_create", json!({ "name": "Acme" }));
    assert_eq!(created["success"], false);
    assert_eq!(created["error"]["code"], "AUTH_REQUIRED");
    assert!(created["error"]["recovery"].as_str().is_some());

    let listed = server.call("workspace_list", json!({}));
    assert_eq!(listed["error"]["code"], "AUTH_REQUIRED");
}

#[test]
fn content_length_framing_is_supported() {
    use std::io::{BufRead, BufReader, Read, Write};
    use std::process::{Command, Stdio};

    let storage = tempfile::tempdir().unwrap();
    let mut child = Command::new(env!("CARGO_BIN_EXE_pb_mcp"))
        .arg("--storage-dir")
        .arg(storage.path())
        .env("PLANEBOARD_LOG", "warn")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    let mut stdin = child.stdin.take().unwrap();
    let mut stdout = BufReader::new(child.stdout.take().unwrap());

    let body = json!({ "jsonrpc": "2.0", "id": 1, "method": "ping" }).to_string();
    write!(stdin, "Content-Length: {}\r\n\r\n{body}", body.len()).unwrap();
    stdin.flush().unwrap();

    let mut header = String::new();
    stdout.read_line(&mut header).unwrap();
    let len: usize = header
        .trim()
        .strip_prefix("Content-Length: ")
        .unwrap()
        .parse()
        .unwrap();
    let mut blank = String::new();
    stdout.read_line(&mut blank).unwrap();
    let mut buf = vec![0u8; len];
    stdout.read_exact(&mut buf).unwrap();
    let resp: serde_json::Value = serde_json::from_slice(&buf).unwrap();
    assert_eq!(resp["id"], 1);
    assert_eq!(resp["result"], json!({}));

    drop(stdin);
    let _ = child.wait();
}
