#![forbid(unsafe_code)]

use super::descriptions::{delete_description_tx, description_on, upsert_description_tx};
use super::labels::issue_labels_on;
use super::rows::{enum_at, id_at, opt_date_at, opt_id_at};
use super::states::state_tx;
use super::{
    ChangeOp, CreateIssueRequest, IssueDetail, IssueWrite, MoveIssueRequest,
    ReorderIssuesRequest, SqliteStore, StoreError, UpdateIssueRequest,
};
use pb_core::ids::{IssueId, ProjectId, StateId, UserId};
use pb_core::model::{ISSUE_NAME_MAX_CHARS, Issue, IssueState, Priority, StateGroup, UserSummary};
use pb_core::ordering;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};

pub(super) const ISSUE_COLUMNS: &str = "i.id, i.project_id, i.state_id, i.sequence_id, i.name, i.priority, i.estimate, i.start_date, i.target_date, i.completed_at_ms, i.assignee_id, i.created_by, i.sort_order, i.is_draft, i.archived_at_ms, i.created_at_ms, i.updated_at_ms";

/// Number of columns in [`ISSUE_COLUMNS`]; joined columns start here.
pub(super) const ISSUE_COLUMN_COUNT: usize = 17;

const ISSUE_SEQ_COUNTER: &str = "issue_seq";

pub(super) fn issue_from_row(row: &Row<'_>) -> rusqlite::Result<Issue> {
    Ok(Issue {
        id: id_at(row, 0)?,
        project_id: id_at(row, 1)?,
        state_id: opt_id_at(row, 2)?,
        sequence_id: row.get(3)?,
        name: row.get(4)?,
        priority: enum_at(row, 5, Priority::parse)?,
        estimate: row.get(6)?,
        start_date: opt_date_at(row, 7)?,
        target_date: opt_date_at(row, 8)?,
        completed_at_ms: row.get(9)?,
        assignee_id: opt_id_at(row, 10)?,
        created_by: opt_id_at(row, 11)?,
        sort_order: row.get(12)?,
        is_draft: row.get(13)?,
        archived_at_ms: row.get(14)?,
        created_at_ms: row.get(15)?,
        updated_at_ms: row.get(16)?,
    })
}

pub(super) fn issue_on(conn: &Connection, id: &IssueId) -> Result<Option<Issue>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {ISSUE_COLUMNS} FROM issues i WHERE i.id = ?1"),
            params![id.to_string()],
            issue_from_row,
        )
        .optional()?)
}

/// Looks up a target state and checks it belongs to `project_id`.
fn project_state_tx(
    tx: &Transaction<'_>,
    project_id: &ProjectId,
    state_id: &StateId,
) -> Result<IssueState, StoreError> {
    let state = state_tx(tx, state_id)?.ok_or(StoreError::InvalidReference)?;
    if state.project_id != *project_id {
        return Err(StoreError::InvalidInput("state belongs to another project"));
    }
    Ok(state)
}

fn state_group_tx(
    tx: &Transaction<'_>,
    state_id: Option<&StateId>,
) -> Result<Option<StateGroup>, StoreError> {
    match state_id {
        Some(id) => Ok(state_tx(tx, id)?.map(|state| state.group)),
        None => Ok(None),
    }
}

/// Entering the completed group stamps the time; leaving it clears it.
fn completed_stamp(
    from: Option<StateGroup>,
    to: Option<StateGroup>,
    current: Option<i64>,
    now_ms: i64,
) -> Option<i64> {
    match (from, to) {
        (Some(StateGroup::Completed), Some(StateGroup::Completed)) => current.or(Some(now_ms)),
        (_, Some(StateGroup::Completed)) => Some(now_ms),
        _ => None,
    }
}

fn issue_name(value: &str) -> Result<String, StoreError> {
    let name = super::required_text(value, "issue name is required")?;
    if name.chars().count() > ISSUE_NAME_MAX_CHARS {
        return Err(StoreError::InvalidInput("issue name is too long"));
    }
    Ok(name)
}

fn check_estimate(estimate: Option<i64>) -> Result<(), StoreError> {
    if estimate.is_some_and(|value| value < 0) {
        return Err(StoreError::InvalidInput("estimate must not be negative"));
    }
    Ok(())
}

fn check_sort_order(value: f64) -> Result<(), StoreError> {
    if !value.is_finite() {
        return Err(StoreError::InvalidInput("sort order must be finite"));
    }
    Ok(())
}

fn id_text<T: ToString>(value: Option<T>) -> Option<String> {
    value.map(|id| id.to_string())
}

impl SqliteStore {
    /// Allocates the next sequence number, appends the issue to the bottom of
    /// the board and stores the optional description, all in one transaction.
    pub fn create_issue(&mut self, request: CreateIssueRequest) -> Result<IssueWrite, StoreError> {
        let name = issue_name(&request.name)?;
        check_estimate(request.estimate)?;
        let project_id = request.project_id.to_string();
        let now_ms = super::now_ms();

        let tx = self.conn.transaction()?;
        let group = match request.state_id.as_ref() {
            Some(state_id) => Some(project_state_tx(&tx, &request.project_id, state_id)?.group),
            None => None,
        };
        let sequence_id = super::next_counter_tx(&tx, &project_id, ISSUE_SEQ_COUNTER)?;
        let last: Option<f64> = tx.query_row(
            "SELECT MAX(sort_order) FROM issues WHERE project_id = ?1",
            params![project_id],
            |row| row.get(0),
        )?;

        let issue = Issue {
            id: IssueId::generate(),
            project_id: request.project_id,
            state_id: request.state_id,
            sequence_id,
            name,
            priority: request.priority,
            estimate: request.estimate,
            start_date: request.start_date,
            target_date: request.target_date,
            completed_at_ms: completed_stamp(None, group, None, now_ms),
            assignee_id: request.assignee_id,
            created_by: request.created_by,
            sort_order: ordering::after_last(last),
            is_draft: request.is_draft,
            archived_at_ms: None,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        };
        let issue_id = issue.id.to_string();

        tx.execute(
            r#"
            INSERT INTO issues(
              id, project_id, state_id, sequence_id, name, priority, estimate, start_date,
              target_date, completed_at_ms, assignee_id, created_by, sort_order, is_draft,
              archived_at_ms, created_at_ms, updated_at_ms
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, NULL, ?15, ?15)
            "#,
            params![
                issue_id,
                project_id,
                id_text(issue.state_id),
                issue.sequence_id,
                issue.name,
                issue.priority.as_str(),
                issue.estimate,
                issue.start_date.map(|date| date.to_iso()),
                issue.target_date.map(|date| date.to_iso()),
                issue.completed_at_ms,
                id_text(issue.assignee_id),
                id_text(issue.created_by),
                issue.sort_order,
                issue.is_draft,
                now_ms,
            ],
        )
        .map_err(|err| super::map_write_error(err, "issue sequence already allocated"))?;

        if let Some(doc) = request.description.as_ref() {
            upsert_description_tx(&tx, &issue_id, doc, now_ms)?;
        }
        let version =
            super::record_change_tx(&tx, &project_id, Some(&issue_id), ChangeOp::Insert, now_ms)?;
        tx.commit()?;

        tracing::info!(
            issue_id = %issue.id,
            project_id = %issue.project_id,
            sequence_id = issue.sequence_id,
            "issue created"
        );
        Ok(IssueWrite { issue, version })
    }

    pub fn get_issue(&self, id: &IssueId) -> Result<Option<Issue>, StoreError> {
        issue_on(&self.conn, id)
    }

    /// Issue with its assignee, description and labels, read consistently.
    pub fn get_issue_detail(&self, id: &IssueId) -> Result<Option<IssueDetail>, StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let Some(issue) = issue_on(&tx, id)? else {
            return Ok(None);
        };
        let assignee = match issue.assignee_id.as_ref() {
            Some(user_id) => user_summary_on(&tx, user_id)?,
            None => None,
        };
        let description = description_on(&tx, id)?;
        let labels = issue_labels_on(&tx, id)?;
        tx.commit()?;
        Ok(Some(IssueDetail {
            issue,
            assignee,
            description,
            labels,
        }))
    }

    pub fn list_issues(&self, project_id: &ProjectId) -> Result<Vec<Issue>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {ISSUE_COLUMNS} FROM issues i WHERE i.project_id = ?1 ORDER BY i.sort_order ASC, i.sequence_id ASC"
        ))?;
        let rows = stmt.query_map(params![project_id.to_string()], issue_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn update_issue(&mut self, request: UpdateIssueRequest) -> Result<IssueWrite, StoreError> {
        let now_ms = super::now_ms();
        let tx = self.conn.transaction()?;
        let mut issue = issue_on(&tx, &request.id)?.ok_or(StoreError::UnknownId)?;

        if let Some(name) = request.name.as_deref() {
            issue.name = issue_name(name)?;
        }
        if let Some(priority) = request.priority {
            issue.priority = priority;
        }
        if let Some(estimate) = request.estimate {
            check_estimate(estimate)?;
            issue.estimate = estimate;
        }
        if let Some(start_date) = request.start_date {
            issue.start_date = start_date;
        }
        if let Some(target_date) = request.target_date {
            issue.target_date = target_date;
        }
        if let Some(assignee_id) = request.assignee_id {
            issue.assignee_id = assignee_id;
        }
        if let Some(is_draft) = request.is_draft {
            issue.is_draft = is_draft;
        }
        if let Some(state_id) = request.state_id {
            let from = state_group_tx(&tx, issue.state_id.as_ref())?;
            let to = match state_id.as_ref() {
                Some(id) => Some(project_state_tx(&tx, &issue.project_id, id)?.group),
                None => None,
            };
            issue.completed_at_ms = completed_stamp(from, to, issue.completed_at_ms, now_ms);
            issue.state_id = state_id;
        }
        issue.updated_at_ms = now_ms;

        let issue_id = issue.id.to_string();
        tx.execute(
            r#"
            UPDATE issues
            SET name = ?2, state_id = ?3, priority = ?4, estimate = ?5, start_date = ?6,
                target_date = ?7, completed_at_ms = ?8, assignee_id = ?9, is_draft = ?10,
                updated_at_ms = ?11
            WHERE id = ?1
            "#,
            params![
                issue_id,
                issue.name,
                id_text(issue.state_id),
                issue.priority.as_str(),
                issue.estimate,
                issue.start_date.map(|date| date.to_iso()),
                issue.target_date.map(|date| date.to_iso()),
                issue.completed_at_ms,
                id_text(issue.assignee_id),
                issue.is_draft,
                issue.updated_at_ms,
            ],
        )
        .map_err(|err| super::map_write_error(err, "issue update conflict"))?;

        match request.description {
            Some(Some(doc)) => {
                upsert_description_tx(&tx, &issue_id, &doc, now_ms)?;
            }
            Some(None) => {
                delete_description_tx(&tx, &issue_id)?;
            }
            None => {}
        }

        let version = super::record_change_tx(
            &tx,
            &issue.project_id.to_string(),
            Some(&issue_id),
            ChangeOp::Update,
            now_ms,
        )?;
        tx.commit()?;
        Ok(IssueWrite { issue, version })
    }

    /// Moves an issue to another column (and optionally a new position in
    /// it). Returns the feed version of the write.
    pub fn move_issue(&mut self, request: MoveIssueRequest) -> Result<i64, StoreError> {
        if let Some(order) = request.sort_order {
            check_sort_order(order)?;
        }
        let now_ms = super::now_ms();
        let tx = self.conn.transaction()?;
        let issue = issue_on(&tx, &request.issue_id)?.ok_or(StoreError::UnknownId)?;
        let to = project_state_tx(&tx, &issue.project_id, &request.state_id)?;
        let from = state_group_tx(&tx, issue.state_id.as_ref())?;
        let completed_at_ms = completed_stamp(from, Some(to.group), issue.completed_at_ms, now_ms);

        let issue_id = issue.id.to_string();
        tx.execute(
            r#"
            UPDATE issues
            SET state_id = ?2, sort_order = COALESCE(?3, sort_order), completed_at_ms = ?4, updated_at_ms = ?5
            WHERE id = ?1
            "#,
            params![
                issue_id,
                to.id.to_string(),
                request.sort_order,
                completed_at_ms,
                now_ms,
            ],
        )?;
        let version = super::record_change_tx(
            &tx,
            &issue.project_id.to_string(),
            Some(&issue_id),
            ChangeOp::Update,
            now_ms,
        )?;
        tx.commit()?;

        tracing::debug!(issue_id = %issue.id, state_id = %to.id, version, "issue moved");
        Ok(version)
    }

    /// Rewrites a column's sort orders in one transaction.
    pub fn reorder_issues(&mut self, request: ReorderIssuesRequest) -> Result<i64, StoreError> {
        for (_, order) in &request.orders {
            check_sort_order(*order)?;
        }
        let now_ms = super::now_ms();
        let tx = self.conn.transaction()?;
        let to = project_state_tx(&tx, &request.project_id, &request.state_id)?;
        let state_id = to.id.to_string();

        for (issue_id, order) in &request.orders {
            let issue = issue_on(&tx, issue_id)?
                .filter(|issue| issue.project_id == request.project_id)
                .ok_or(StoreError::UnknownId)?;
            let from = state_group_tx(&tx, issue.state_id.as_ref())?;
            let completed_at_ms =
                completed_stamp(from, Some(to.group), issue.completed_at_ms, now_ms);
            tx.execute(
                r#"
                UPDATE issues
                SET state_id = ?2, sort_order = ?3, completed_at_ms = ?4, updated_at_ms = ?5
                WHERE id = ?1
                "#,
                params![issue_id.to_string(), state_id, order, completed_at_ms, now_ms],
            )?;
        }
        let version = super::record_change_tx(
            &tx,
            &request.project_id.to_string(),
            None,
            ChangeOp::Update,
            now_ms,
        )?;
        tx.commit()?;

        tracing::debug!(
            project_id = %request.project_id,
            state_id = %to.id,
            count = request.orders.len(),
            version,
            "column renumbered"
        );
        Ok(version)
    }

    pub fn delete_issue(&mut self, id: &IssueId) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        let issue = issue_on(&tx, id)?.ok_or(StoreError::UnknownId)?;
        let issue_id = issue.id.to_string();
        tx.execute("DELETE FROM issues WHERE id = ?1", params![issue_id])?;
        super::record_change_tx(
            &tx,
            &issue.project_id.to_string(),
            Some(&issue_id),
            ChangeOp::Delete,
            super::now_ms(),
        )?;
        tx.commit()?;
        Ok(())
    }
}

pub(super) fn user_summary_on(
    conn: &Connection,
    id: &UserId,
) -> Result<Option<UserSummary>, StoreError> {
    Ok(conn
        .query_row(
            "SELECT id, email, display_name, avatar_url FROM users WHERE id = ?1",
            params![id.to_string()],
            |row| {
                Ok(UserSummary {
                    id: id_at(row, 0)?,
                    email: row.get(1)?,
                    display_name: row.get(2)?,
                    avatar_url: row.get(3)?,
                })
            },
        )
        .optional()?)
}
