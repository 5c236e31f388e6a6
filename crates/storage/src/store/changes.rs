#![forbid(unsafe_code)]

//! The per-project issue change feed and the board read model built on it.

use super::issues::{ISSUE_COLUMN_COUNT, ISSUE_COLUMNS, issue_from_row};
use super::rows::{enum_at, id_at, opt_id_at};
use super::states::{STATE_COLUMNS, state_from_row};
use super::{ChangeEvent, ChangeOp, SqliteStore, StoreError};
use pb_core::board::{BoardIssue, BoardSnapshot};
use pb_core::ids::ProjectId;
use pb_core::model::UserSummary;
use pb_core::rich_text::RichDoc;
use rusqlite::{Connection, OptionalExtension, params};

fn version_on(conn: &Connection, project_id: &str) -> Result<i64, StoreError> {
    Ok(conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM change_events WHERE project_id = ?1",
        params![project_id],
        |row| row.get(0),
    )?)
}

fn description_text(issue: &pb_core::model::Issue, raw: Option<String>) -> Option<String> {
    let raw = raw?;
    match RichDoc::from_json_str(&raw) {
        Ok(doc) => Some(doc.plain_text()),
        Err(err) => {
            tracing::warn!(issue_id = %issue.id, error = %err, "unreadable description skipped");
            None
        }
    }
}

impl SqliteStore {
    /// Current version of the project's issues; `0` before the first write.
    pub fn issues_version(&self, project_id: &ProjectId) -> Result<i64, StoreError> {
        version_on(&self.conn, &project_id.to_string())
    }

    pub fn list_changes(
        &self,
        project_id: &ProjectId,
        since_version: i64,
        limit: usize,
    ) -> Result<Vec<ChangeEvent>, StoreError> {
        let limit = super::to_sqlite_i64(limit)?;
        let mut stmt = self.conn.prepare(
            r#"
            SELECT seq, version, channel, project_id, issue_id, op, ts_ms
            FROM change_events
            WHERE project_id = ?1 AND version > ?2
            ORDER BY version ASC
            LIMIT ?3
            "#,
        )?;
        let rows = stmt.query_map(params![project_id.to_string(), since_version, limit], |row| {
            Ok(ChangeEvent {
                seq: row.get(0)?,
                version: row.get(1)?,
                channel: row.get(2)?,
                project_id: id_at(row, 3)?,
                issue_id: opt_id_at(row, 4)?,
                op: enum_at(row, 5, ChangeOp::parse)?,
                ts_ms: row.get(6)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Reads states, issues and the version token in one transaction so the
    /// token describes exactly the returned data.
    pub fn load_board(&self, project_id: &ProjectId) -> Result<BoardSnapshot, StoreError> {
        let project = project_id.to_string();
        let tx = self.conn.unchecked_transaction()?;

        let exists = tx
            .query_row(
                "SELECT 1 FROM projects WHERE id = ?1",
                params![project],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(StoreError::UnknownId);
        }

        let version = version_on(&tx, &project)?;

        let states = {
            let mut stmt = tx.prepare(&format!(
                "SELECT {STATE_COLUMNS} FROM issue_states s WHERE s.project_id = ?1 ORDER BY s.position ASC, s.name ASC"
            ))?;
            let rows = stmt.query_map(params![project], state_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        let issues = {
            let mut stmt = tx.prepare(&format!(
                r#"
                SELECT {ISSUE_COLUMNS}, u.email, u.display_name, u.avatar_url, d.content_json
                FROM issues i
                LEFT JOIN users u ON u.id = i.assignee_id
                LEFT JOIN issue_descriptions d ON d.issue_id = i.id
                WHERE i.project_id = ?1 AND i.archived_at_ms IS NULL
                ORDER BY i.sort_order ASC, i.sequence_id ASC
                "#
            ))?;
            let mut rows = stmt.query(params![project])?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                let issue = issue_from_row(row)?;
                let email: Option<String> = row.get(ISSUE_COLUMN_COUNT)?;
                let assignee = match (issue.assignee_id, email) {
                    (Some(id), Some(email)) => Some(UserSummary {
                        id,
                        email,
                        display_name: row.get(ISSUE_COLUMN_COUNT + 1)?,
                        avatar_url: row.get(ISSUE_COLUMN_COUNT + 2)?,
                    }),
                    _ => None,
                };
                let raw: Option<String> = row.get(ISSUE_COLUMN_COUNT + 3)?;
                let description_text = description_text(&issue, raw);
                out.push(BoardIssue {
                    issue,
                    assignee,
                    description_text,
                });
            }
            out
        };
        tx.commit()?;

        Ok(BoardSnapshot {
            version,
            states,
            issues,
        })
    }
}
