#![forbid(unsafe_code)]

use crate::McpServer;
use crate::notify::NotificationSink as _;
use serde_json::{Value, json};

impl McpServer {
    pub(crate) fn handle(&mut self, request: crate::JsonRpcRequest) -> Option<Value> {
        let method = request.method.as_str();
        let expects_response = !matches!(request.id.as_ref(), None | Some(Value::Null));
        tracing::debug!(method, "request");

        if method == "initialize" {
            // Echo the client's protocol version; fall back to our baseline.
            let protocol_version = request
                .params
                .as_ref()
                .and_then(|v| v.get("protocolVersion"))
                .and_then(|v| v.as_str())
                .unwrap_or(crate::MCP_VERSION);

            return Some(crate::json_rpc_response(
                request.id,
                json!({
                    "protocolVersion": protocol_version,
                    "serverInfo": {
                        "name": crate::SERVER_NAME,
                        "version": crate::SERVER_VERSION
                    },
                    "capabilities": { "tools": {} }
                }),
            ));
        }

        // Both spellings are seen in the wild; neither gets a response.
        if method == "notifications/initialized" || method == "initialized" {
            self.initialized = true;
            return None;
        }

        if !self.initialized {
            if matches!(method, "tools/call" | "tools/list" | "ping") {
                self.initialized = true;
            } else if expects_response {
                return Some(crate::json_rpc_error(
                    request.id,
                    -32002,
                    "Server not initialized",
                ));
            } else {
                return None;
            }
        }

        if method == "ping" {
            return Some(crate::json_rpc_response(request.id, json!({})));
        }

        if method == "tools/list" {
            let tools = crate::handlers::handler_definitions();
            return Some(crate::json_rpc_response(
                request.id,
                json!({ "tools": tools }),
            ));
        }

        if method == "tools/call" {
            let Some(params_obj) = request.params.as_ref().and_then(|v| v.as_object()) else {
                return Some(crate::json_rpc_error(
                    request.id,
                    -32602,
                    "params must be an object",
                ));
            };

            let tool_name = params_obj
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            // Missing or null arguments mean `{}`; other non-objects reach the
            // tool so it can report INVALID_INPUT.
            let args = match params_obj.get("arguments") {
                None | Some(Value::Null) => json!({}),
                Some(v) => v.clone(),
            };
            let response_body = self.call_tool(&tool_name, args);

            return Some(crate::json_rpc_response(
                request.id,
                json!({
                    "content": [crate::tool_text_content(&response_body)],
                    "isError": !response_body.get("success").and_then(|v| v.as_bool()).unwrap_or(false)
                }),
            ));
        }

        if !expects_response {
            return None;
        }

        Some(crate::json_rpc_error(
            request.id,
            -32601,
            &format!("Method not found: {method}"),
        ))
    }

    pub(crate) fn call_tool(&mut self, name: &str, args: Value) -> Value {
        let name = normalize_tool_name(name);
        // Toasts belong to the call that raised them.
        let stale = self.toasts.drain();
        if !stale.is_empty() {
            tracing::debug!(count = stale.len(), "dropping undelivered toasts");
        }

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            crate::handlers::dispatch_handler(self, name, args).unwrap_or_else(|| {
                crate::ai_error_with(
                    "UNKNOWN_TOOL",
                    &format!("Unknown tool: {name}"),
                    Some("Call tools/list to see the available tools."),
                )
            })
        }));

        let mut resp = match result {
            Ok(resp) => resp,
            Err(_) => {
                tracing::error!(tool = name, "tool handler panicked");
                self.toasts
                    .notify(crate::notify::Toast::error("Something went wrong."));
                crate::ai_error(
                    "INTERNAL_ERROR",
                    &format!("Internal panic while handling {name}"),
                )
            }
        };

        let notifications = self
            .toasts
            .drain()
            .into_iter()
            .filter_map(|toast| serde_json::to_value(toast).ok())
            .collect::<Vec<_>>();
        crate::attach_notifications(&mut resp, notifications);

        tracing::debug!(
            tool = name,
            success = resp.get("success").and_then(|v| v.as_bool()).unwrap_or(false),
            "tool call finished"
        );
        resp
    }
}

/// Accepts `planeboard/issue_list` and `planeboard.issue_list` for `issue_list`.
fn normalize_tool_name(name: &str) -> &str {
    let name = name.trim();
    if let Some((_, suffix)) = name.rsplit_once('/') {
        return suffix;
    }
    if let Some((prefix, suffix)) = name.split_once('.')
        && (prefix == "planeboard" || prefix == "pb")
    {
        return suffix;
    }
    name
}
