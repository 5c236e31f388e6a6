#![forbid(unsafe_code)]

use super::{ToolResult, args_object, to_json};
use crate::McpServer;
use crate::controllers::board::{BoardController, BoardError, DropOutcome, SyncOutcome};
use pb_core::board::DropTarget;
use pb_core::ids::{IssueId, ProjectId, StateId};
use serde_json::{Value, json};

const BOARD_RECOVERY: &str = "Call board_open for the project first.";

fn drop_target(args_obj: &serde_json::Map<String, Value>) -> Result<Option<DropTarget>, Value> {
    let state: Option<StateId> = crate::optional_id(args_obj, "target_state")?;
    let issue: Option<IssueId> = crate::optional_id(args_obj, "target_issue")?;
    match (state, issue) {
        (Some(_), Some(_)) => Err(crate::ai_error(
            "INVALID_INPUT",
            "give target_state or target_issue, not both",
        )),
        (Some(state), None) => Ok(Some(DropTarget::State(state))),
        (None, Some(issue)) => Ok(Some(DropTarget::Issue(issue))),
        (None, None) => Ok(None),
    }
}

fn board_error(err: &BoardError) -> Value {
    let recovery = match err {
        BoardError::UnknownIssue(_) => "Call board_view to see the issues on the board.",
        BoardError::NoActiveDrag => "Call board_drag_start first.",
    };
    crate::ai_error_with("INVALID_INPUT", &err.to_string(), Some(recovery))
}

fn board_not_open(project_id: &ProjectId) -> Value {
    crate::ai_error_with(
        "BOARD_NOT_OPEN",
        &format!("no board is open for project {project_id}"),
        Some(BOARD_RECOVERY),
    )
}

fn render(board: &BoardController, search: &str) -> Result<Value, Value> {
    to_json(&board.view(search, crate::today_utc()))
}

fn search_arg(args_obj: &serde_json::Map<String, Value>) -> Result<String, Value> {
    Ok(crate::optional_string(args_obj, "search")?.unwrap_or_default())
}

impl McpServer {
    /// Lets an open board catch up after a write made outside it.
    pub(crate) fn sync_open_board(&mut self, project_id: &ProjectId) {
        if let Some(board) = self.boards.get_mut(project_id) {
            board.sync(&mut self.store);
        }
    }

    fn open_board(&mut self, project_id: &ProjectId) -> Result<&mut BoardController, Value> {
        self.boards
            .get_mut(project_id)
            .ok_or_else(|| board_not_open(project_id))
    }

    pub(crate) fn tool_board_open(&mut self, args: Value) -> ToolResult {
        let args_obj = args_object(&args)?;
        let project_id: ProjectId = crate::require_id(args_obj, "project")?;
        let search = search_arg(args_obj)?;
        self.project_for_member(&project_id)?;

        let board = BoardController::open(project_id, &mut self.store);
        let view = render(&board, &search)?;
        self.boards.insert(project_id, board);
        Ok(crate::ai_ok("board_open", json!({ "board": view })))
    }

    /// Polls the feed, reloads when it moved, then renders.
    pub(crate) fn tool_board_view(&mut self, args: Value) -> ToolResult {
        let args_obj = args_object(&args)?;
        let project_id: ProjectId = crate::require_id(args_obj, "project")?;
        let search = search_arg(args_obj)?;
        let store = &mut self.store;
        let board = self
            .boards
            .get_mut(&project_id)
            .ok_or_else(|| board_not_open(&project_id))?;
        let sync = board.sync(store);
        Ok(crate::ai_ok(
            "board_view",
            json!({ "sync": to_json(&sync)?, "board": render(board, &search)? }),
        ))
    }

    pub(crate) fn tool_board_drag_start(&mut self, args: Value) -> ToolResult {
        let args_obj = args_object(&args)?;
        let project_id: ProjectId = crate::require_id(args_obj, "project")?;
        let issue_id: IssueId = crate::require_id(args_obj, "issue")?;
        let board = self.open_board(&project_id)?;
        board.drag_start(issue_id).map_err(|err| board_error(&err))?;
        Ok(crate::ai_ok(
            "board_drag_start",
            json!({ "project_id": project_id, "active_issue": issue_id }),
        ))
    }

    pub(crate) fn tool_board_drag_cancel(&mut self, args: Value) -> ToolResult {
        let args_obj = args_object(&args)?;
        let project_id: ProjectId = crate::require_id(args_obj, "project")?;
        let board = self.open_board(&project_id)?;
        let cancelled = board.active();
        board.drag_cancel();
        Ok(crate::ai_ok(
            "board_drag_cancel",
            json!({ "project_id": project_id, "cancelled": cancelled }),
        ))
    }

    pub(crate) fn tool_board_drag_end(&mut self, args: Value) -> ToolResult {
        let args_obj = args_object(&args)?;
        let project_id: ProjectId = crate::require_id(args_obj, "project")?;
        let target = drop_target(args_obj)?;
        let search = search_arg(args_obj)?;
        let board = self
            .boards
            .get_mut(&project_id)
            .ok_or_else(|| board_not_open(&project_id))?;
        let outcome = board
            .drag_end(&mut self.store, target, &mut self.toasts)
            .map_err(|err| board_error(&err))?;
        drop_result("board_drag_end", board, &outcome, &search)
    }

    /// Drag start and drop in one call.
    pub(crate) fn tool_board_move(&mut self, args: Value) -> ToolResult {
        let args_obj = args_object(&args)?;
        let project_id: ProjectId = crate::require_id(args_obj, "project")?;
        let issue_id: IssueId = crate::require_id(args_obj, "issue")?;
        let target = drop_target(args_obj)?;
        let search = search_arg(args_obj)?;
        let board = self
            .boards
            .get_mut(&project_id)
            .ok_or_else(|| board_not_open(&project_id))?;
        board.drag_start(issue_id).map_err(|err| board_error(&err))?;
        let outcome = board
            .drag_end(&mut self.store, target, &mut self.toasts)
            .map_err(|err| board_error(&err))?;
        drop_result("board_move", board, &outcome, &search)
    }

    pub(crate) fn tool_board_sync(&mut self, args: Value) -> ToolResult {
        let args_obj = args_object(&args)?;
        let project_id: ProjectId = crate::require_id(args_obj, "project")?;
        let store = &mut self.store;
        let board = self
            .boards
            .get_mut(&project_id)
            .ok_or_else(|| board_not_open(&project_id))?;
        let outcome = board.sync(store);
        if let SyncOutcome::Failed { error } = &outcome {
            return Err(crate::ai_error_with(
                "STORE_ERROR",
                error,
                Some("Retry board_sync, or board_open to start over."),
            ));
        }
        Ok(crate::ai_ok("board_sync", to_json(&outcome)?))
    }

    pub(crate) fn tool_board_close(&mut self, args: Value) -> ToolResult {
        let args_obj = args_object(&args)?;
        let project_id: ProjectId = crate::require_id(args_obj, "project")?;
        let closed = self.boards.remove(&project_id).is_some();
        Ok(crate::ai_ok(
            "board_close",
            json!({ "project_id": project_id, "closed": closed }),
        ))
    }
}

fn drop_result(
    intent: &str,
    board: &BoardController,
    outcome: &DropOutcome,
    search: &str,
) -> ToolResult {
    if let DropOutcome::Reverted { error } = outcome {
        return Err(crate::ai_error_with(
            "WRITE_FAILED",
            &format!("Failed to update issue: {error}"),
            Some("The board was reloaded from the store; retry the move."),
        ));
    }
    Ok(crate::ai_ok(
        intent,
        json!({ "drop": to_json(outcome)?, "board": render(board, search)? }),
    ))
}
