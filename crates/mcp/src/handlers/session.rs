#![forbid(unsafe_code)]

use super::{ToolResult, args_object, to_json};
use crate::McpServer;
use serde_json::{Value, json};

impl McpServer {
    pub(crate) fn tool_session_whoami(&mut self, args: Value) -> ToolResult {
        args_object(&args)?;
        if self.identity.current_user().is_none() {
            return Ok(crate::ai_ok(
                "session_whoami",
                json!({ "authenticated": false, "user": null, "workspaces": [] }),
            ));
        }
        let user_id = self.signed_in()?;
        let user = self
            .store
            .get_user(&user_id)
            .map_err(|err| crate::store_error(&err))?;
        let workspaces = self
            .store
            .list_workspaces_for_member(&user_id)
            .map_err(|err| crate::store_error(&err))?;
        Ok(crate::ai_ok(
            "session_whoami",
            json!({
                "authenticated": true,
                "user": to_json(&user)?,
                "workspaces": to_json(&workspaces)?,
            }),
        ))
    }
}
