#![forbid(unsafe_code)]

use pb_storage::StoreError;
use serde_json::{Value, json};

pub(crate) const AUTH_RECOVERY: &str =
    "Restart the server with --user-email (or PLANEBOARD_USER_EMAIL) set.";

pub(crate) fn ai_ok(intent: &str, result: Value) -> Value {
    json!({
        "success": true,
        "intent": intent,
        "result": result,
        "notifications": [],
        "error": null
    })
}

pub(crate) fn ai_error(code: &str, message: &str) -> Value {
    ai_error_with(code, message, None)
}

pub(crate) fn ai_error_with(code: &str, message: &str, recovery: Option<&str>) -> Value {
    let mut error_obj = serde_json::Map::new();
    error_obj.insert("code".to_string(), Value::String(code.to_string()));
    error_obj.insert(
        "message".to_string(),
        Value::String(message.trim().to_string()),
    );
    if let Some(recovery) = recovery {
        error_obj.insert(
            "recovery".to_string(),
            Value::String(recovery.trim().to_string()),
        );
    }

    json!({
        "success": false,
        "intent": "error",
        "result": {},
        "notifications": [],
        "error": Value::Object(error_obj)
    })
}

pub(crate) fn store_error(err: &StoreError) -> Value {
    let code = err.code();
    let recovery = match code {
        "RESET_REQUIRED" => Some("Move the storage directory aside and restart the server."),
        "NOT_FOUND" => Some("List the parent collection to find a current id."),
        _ => None,
    };
    ai_error_with(code, &err.to_string(), recovery)
}

/// Replaces the `notifications` array of an envelope.
pub(crate) fn attach_notifications(resp: &mut Value, notifications: Vec<Value>) {
    if notifications.is_empty() {
        return;
    }
    if let Some(obj) = resp.as_object_mut() {
        obj.insert("notifications".to_string(), Value::Array(notifications));
    }
}
