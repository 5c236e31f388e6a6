#![forbid(unsafe_code)]

use super::issues::issue_on;
use super::rows::id_at;
use super::{CreateLabelRequest, IssueLabelRequest, SqliteStore, StoreError};
use pb_core::ids::{IssueId, LabelId, ProjectId};
use pb_core::model::{DEFAULT_LABEL_COLOR, Label, NAME_MAX_CHARS, normalize_color};
use rusqlite::{Connection, OptionalExtension, Row, params};

const LABEL_COLUMNS: &str = "l.id, l.project_id, l.name, l.color, l.created_at_ms";

fn label_from_row(row: &Row<'_>) -> rusqlite::Result<Label> {
    Ok(Label {
        id: id_at(row, 0)?,
        project_id: id_at(row, 1)?,
        name: row.get(2)?,
        color: row.get(3)?,
        created_at_ms: row.get(4)?,
    })
}

fn label_on(conn: &Connection, id: &LabelId) -> Result<Option<Label>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {LABEL_COLUMNS} FROM labels l WHERE l.id = ?1"),
            params![id.to_string()],
            label_from_row,
        )
        .optional()?)
}

pub(super) fn issue_labels_on(
    conn: &Connection,
    issue_id: &IssueId,
) -> Result<Vec<Label>, StoreError> {
    let mut stmt = conn.prepare(&format!(
        r#"
        SELECT {LABEL_COLUMNS}
        FROM labels l
        JOIN issue_labels il ON il.label_id = l.id
        WHERE il.issue_id = ?1
        ORDER BY l.name ASC
        "#
    ))?;
    let rows = stmt.query_map(params![issue_id.to_string()], label_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

impl SqliteStore {
    pub fn create_label(&mut self, request: CreateLabelRequest) -> Result<Label, StoreError> {
        let name = super::required_text(&request.name, "label name is required")?;
        if name.chars().count() > NAME_MAX_CHARS {
            return Err(StoreError::InvalidInput("label name is too long"));
        }
        let color = normalize_color(request.color.as_deref().unwrap_or(DEFAULT_LABEL_COLOR))
            .map_err(|_| StoreError::InvalidInput("label color must look like #rrggbb"))?;
        let label = Label {
            id: LabelId::generate(),
            project_id: request.project_id,
            name,
            color,
            created_at_ms: super::now_ms(),
        };
        self.conn
            .execute(
                "INSERT INTO labels(id, project_id, name, color, created_at_ms) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    label.id.to_string(),
                    label.project_id.to_string(),
                    label.name,
                    label.color,
                    label.created_at_ms,
                ],
            )
            .map_err(|err| super::map_write_error(err, "label name already exists in project"))?;
        Ok(label)
    }

    pub fn list_labels(&self, project_id: &ProjectId) -> Result<Vec<Label>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {LABEL_COLUMNS} FROM labels l WHERE l.project_id = ?1 ORDER BY l.name ASC"
        ))?;
        let rows = stmt.query_map(params![project_id.to_string()], label_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn get_label(&self, id: &LabelId) -> Result<Option<Label>, StoreError> {
        label_on(&self.conn, id)
    }

    pub fn delete_label(&mut self, id: &LabelId) -> Result<(), StoreError> {
        let deleted = self
            .conn
            .execute("DELETE FROM labels WHERE id = ?1", params![id.to_string()])?;
        if deleted == 0 {
            return Err(StoreError::UnknownId);
        }
        Ok(())
    }

    /// Attaches a label of the issue's own project. Returns `false` when it
    /// was already attached.
    pub fn add_issue_label(&mut self, request: IssueLabelRequest) -> Result<bool, StoreError> {
        let tx = self.conn.transaction()?;
        let issue = issue_on(&tx, &request.issue_id)?.ok_or(StoreError::UnknownId)?;
        let label = label_on(&tx, &request.label_id)?.ok_or(StoreError::InvalidReference)?;
        if label.project_id != issue.project_id {
            return Err(StoreError::InvalidInput("label belongs to another project"));
        }
        let inserted = tx.execute(
            "INSERT OR IGNORE INTO issue_labels(issue_id, label_id) VALUES (?1, ?2)",
            params![issue.id.to_string(), label.id.to_string()],
        )?;
        tx.commit()?;
        Ok(inserted > 0)
    }

    pub fn remove_issue_label(&mut self, request: IssueLabelRequest) -> Result<bool, StoreError> {
        let deleted = self.conn.execute(
            "DELETE FROM issue_labels WHERE issue_id = ?1 AND label_id = ?2",
            params![request.issue_id.to_string(), request.label_id.to_string()],
        )?;
        Ok(deleted > 0)
    }

    pub fn list_issue_labels(&self, issue_id: &IssueId) -> Result<Vec<Label>, StoreError> {
        issue_labels_on(&self.conn, issue_id)
    }
}
