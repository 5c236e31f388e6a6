#![forbid(unsafe_code)]

//! Session state of one open kanban board.
//!
//! The controller owns the in-memory [`Board`], the issue being dragged and
//! the highest change-feed version it has seen. Persistence is passed in on
//! every call as a [`BoardBackend`], so the same controller runs against the
//! SQLite store or an in-memory fake.

use crate::notify::{NotificationSink, Toast};
use pb_core::board::{
    Board, BoardIssue, BoardSnapshot, BoardStats, Column, DropPlan, DropTarget, NoopReason,
};
use pb_core::ids::{IssueId, ProjectId};
use pb_storage::{MoveIssueRequest, ReorderIssuesRequest, SqliteStore, StoreError};
use serde::Serialize;
use time::Date;

pub(crate) trait BoardBackend {
    fn load_board(&mut self, project_id: &ProjectId) -> Result<BoardSnapshot, StoreError>;
    fn board_version(&mut self, project_id: &ProjectId) -> Result<i64, StoreError>;
    fn move_issue(&mut self, request: MoveIssueRequest) -> Result<i64, StoreError>;
    fn reorder_issues(&mut self, request: ReorderIssuesRequest) -> Result<i64, StoreError>;
}

impl BoardBackend for SqliteStore {
    fn load_board(&mut self, project_id: &ProjectId) -> Result<BoardSnapshot, StoreError> {
        SqliteStore::load_board(self, project_id)
    }

    fn board_version(&mut self, project_id: &ProjectId) -> Result<i64, StoreError> {
        self.issues_version(project_id)
    }

    fn move_issue(&mut self, request: MoveIssueRequest) -> Result<i64, StoreError> {
        SqliteStore::move_issue(self, request)
    }

    fn reorder_issues(&mut self, request: ReorderIssuesRequest) -> Result<i64, StoreError> {
        SqliteStore::reorder_issues(self, request)
    }
}

#[derive(Debug, thiserror::Error)]
pub(crate) enum BoardError {
    #[error("issue {0} is not on this board")]
    UnknownIssue(IssueId),
    #[error("no drag in progress")]
    NoActiveDrag,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub(crate) enum DropOutcome {
    Noop { reason: NoopReason },
    Applied { version: i64, plan: DropPlan },
    Reverted { error: String },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub(crate) enum SyncOutcome {
    UpToDate { version: i64 },
    Reloaded { version: i64 },
    Failed { error: String },
}

#[derive(Debug, Serialize)]
pub(crate) struct BoardView<'a> {
    pub(crate) project_id: ProjectId,
    pub(crate) version: i64,
    pub(crate) active_issue: Option<IssueId>,
    pub(crate) load_error: Option<&'a str>,
    pub(crate) stats: BoardStats,
    pub(crate) columns: Vec<Column<'a>>,
    pub(crate) unassigned: Vec<&'a BoardIssue>,
}

enum PendingWrite {
    Move(MoveIssueRequest),
    Reorder(ReorderIssuesRequest),
}

#[derive(Debug)]
pub(crate) struct BoardController {
    project_id: ProjectId,
    board: Board,
    known_version: i64,
    active: Option<IssueId>,
    load_error: Option<String>,
}

impl BoardController {
    pub(crate) fn open(project_id: ProjectId, backend: &mut impl BoardBackend) -> Self {
        let mut controller = Self {
            project_id,
            board: Board::default(),
            known_version: 0,
            active: None,
            load_error: None,
        };
        controller.reload(backend);
        controller
    }

    pub(crate) fn board(&self) -> &Board {
        &self.board
    }

    pub(crate) fn known_version(&self) -> i64 {
        self.known_version
    }

    pub(crate) fn active(&self) -> Option<IssueId> {
        self.active
    }

    pub(crate) fn load_error(&self) -> Option<&str> {
        self.load_error.as_deref()
    }

    pub(crate) fn view(&self, search: &str, today: Date) -> BoardView<'_> {
        BoardView {
            project_id: self.project_id,
            version: self.known_version,
            active_issue: self.active,
            load_error: self.load_error(),
            stats: self.board.stats(today),
            columns: self.board.columns(search),
            unassigned: self.board.unassigned(search),
        }
    }

    /// Replaces the board with a fresh snapshot. Returns `false` when the read
    /// failed or the snapshot was older than what this board already shows.
    pub(crate) fn reload(&mut self, backend: &mut impl BoardBackend) -> bool {
        match backend.load_board(&self.project_id) {
            Ok(snapshot) => self.accept(snapshot),
            Err(err) => {
                tracing::error!(project_id = %self.project_id, error = %err, "board load failed");
                self.board = Board::default();
                self.active = None;
                self.load_error = Some(err.to_string());
                false
            }
        }
    }

    fn accept(&mut self, snapshot: BoardSnapshot) -> bool {
        if snapshot.version < self.known_version {
            tracing::debug!(
                project_id = %self.project_id,
                snapshot = snapshot.version,
                known = self.known_version,
                "stale board snapshot discarded"
            );
            return false;
        }
        self.known_version = snapshot.version;
        self.board = Board::from_snapshot(snapshot);
        self.load_error = None;
        if let Some(active) = self.active
            && self.board.issue(active).is_none()
        {
            self.active = None;
        }
        true
    }

    pub(crate) fn drag_start(&mut self, issue_id: IssueId) -> Result<(), BoardError> {
        if self.board.issue(issue_id).is_none() {
            return Err(BoardError::UnknownIssue(issue_id));
        }
        self.active = Some(issue_id);
        Ok(())
    }

    pub(crate) fn drag_cancel(&mut self) {
        self.active = None;
    }

    /// Ends the current drag. The active issue is cleared whatever happens.
    pub(crate) fn drag_end(
        &mut self,
        backend: &mut impl BoardBackend,
        target: Option<DropTarget>,
        sink: &mut impl NotificationSink,
    ) -> Result<DropOutcome, BoardError> {
        let active = self.active.take().ok_or(BoardError::NoActiveDrag)?;
        Ok(self.drop_issue(backend, active, target, sink))
    }

    /// Plans the drop, applies it optimistically and persists it with a
    /// single write. A failed write is undone by a full reload.
    pub(crate) fn drop_issue(
        &mut self,
        backend: &mut impl BoardBackend,
        issue_id: IssueId,
        target: Option<DropTarget>,
        sink: &mut impl NotificationSink,
    ) -> DropOutcome {
        let plan = self.board.plan_drop(issue_id, target);
        let pending = match &plan {
            DropPlan::Noop { reason } => {
                tracing::debug!(project_id = %self.project_id, %issue_id, ?reason, "drop ignored");
                return DropOutcome::Noop { reason: *reason };
            }
            DropPlan::Move {
                issue_id,
                to_state,
                sort_order,
                ..
            } => PendingWrite::Move(MoveIssueRequest {
                issue_id: *issue_id,
                state_id: *to_state,
                sort_order: *sort_order,
            }),
            DropPlan::Renumber {
                to_state, orders, ..
            } => PendingWrite::Reorder(ReorderIssuesRequest {
                project_id: self.project_id,
                state_id: *to_state,
                orders: orders.clone(),
            }),
        };

        self.board.apply(&plan);
        let written = match pending {
            PendingWrite::Move(request) => backend.move_issue(request),
            PendingWrite::Reorder(request) => backend.reorder_issues(request),
        };

        match written {
            Ok(version) => {
                if version == self.known_version + 1 {
                    self.known_version = version;
                } else {
                    // Someone else wrote since our snapshot.
                    tracing::debug!(
                        project_id = %self.project_id,
                        version,
                        known = self.known_version,
                        "board changed elsewhere, reloading"
                    );
                    self.reload(backend);
                }
                DropOutcome::Applied { version, plan }
            }
            Err(err) => {
                tracing::warn!(
                    project_id = %self.project_id,
                    %issue_id,
                    error = %err,
                    "board write failed, reverting"
                );
                sink.notify(Toast::error(format!("Failed to update issue: {err}")));
                self.reload(backend);
                DropOutcome::Reverted {
                    error: err.to_string(),
                }
            }
        }
    }

    /// Reloads only when the feed reports a version newer than the board.
    pub(crate) fn sync(&mut self, backend: &mut impl BoardBackend) -> SyncOutcome {
        match backend.board_version(&self.project_id) {
            Ok(remote) if remote > self.known_version => {
                if self.reload(backend) {
                    SyncOutcome::Reloaded {
                        version: self.known_version,
                    }
                } else {
                    SyncOutcome::Failed {
                        error: self
                            .load_error
                            .clone()
                            .unwrap_or_else(|| "stale snapshot".to_string()),
                    }
                }
            }
            Ok(_) => SyncOutcome::UpToDate {
                version: self.known_version,
            },
            Err(err) => {
                tracing::warn!(
                    project_id = %self.project_id,
                    error = %err,
                    "board version poll failed"
                );
                SyncOutcome::Failed {
                    error: err.to_string(),
                }
            }
        }
    }
}
