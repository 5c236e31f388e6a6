#![forbid(unsafe_code)]

use super::issues::issue_on;
use super::rows::{doc_at, id_at};
use super::{ChangeOp, SqliteStore, StoreError};
use pb_core::ids::{DescriptionId, IssueId};
use pb_core::model::IssueDescription;
use pb_core::rich_text::RichDoc;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};

const DESCRIPTION_COLUMNS: &str = "id, issue_id, content_json, created_at_ms, updated_at_ms";

fn description_from_row(row: &Row<'_>) -> rusqlite::Result<IssueDescription> {
    Ok(IssueDescription {
        id: id_at(row, 0)?,
        issue_id: id_at(row, 1)?,
        content: doc_at(row, 2)?,
        created_at_ms: row.get(3)?,
        updated_at_ms: row.get(4)?,
    })
}

pub(super) fn description_on(
    conn: &Connection,
    issue_id: &IssueId,
) -> Result<Option<IssueDescription>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {DESCRIPTION_COLUMNS} FROM issue_descriptions WHERE issue_id = ?1"),
            params![issue_id.to_string()],
            description_from_row,
        )
        .optional()?)
}

/// One description per issue: a second write replaces the content and keeps
/// the row id.
pub(super) fn upsert_description_tx(
    tx: &Transaction<'_>,
    issue_id: &str,
    doc: &RichDoc,
    now_ms: i64,
) -> Result<(), StoreError> {
    let content_json = doc
        .to_json_string()
        .map_err(|_| StoreError::InvalidInput("description is not serializable"))?;
    tx.execute(
        r#"
        INSERT INTO issue_descriptions(id, issue_id, content_json, created_at_ms, updated_at_ms)
        VALUES (?1, ?2, ?3, ?4, ?4)
        ON CONFLICT(issue_id) DO UPDATE SET
          content_json = excluded.content_json,
          updated_at_ms = excluded.updated_at_ms
        "#,
        params![
            DescriptionId::generate().to_string(),
            issue_id,
            content_json,
            now_ms
        ],
    )
    .map_err(|err| super::map_write_error(err, "description conflict"))?;
    Ok(())
}

pub(super) fn delete_description_tx(
    tx: &Transaction<'_>,
    issue_id: &str,
) -> Result<bool, StoreError> {
    let deleted = tx.execute(
        "DELETE FROM issue_descriptions WHERE issue_id = ?1",
        params![issue_id],
    )?;
    Ok(deleted > 0)
}

impl SqliteStore {
    pub fn upsert_description(
        &mut self,
        issue_id: &IssueId,
        doc: &RichDoc,
    ) -> Result<IssueDescription, StoreError> {
        let now_ms = super::now_ms();
        let tx = self.conn.transaction()?;
        let issue = issue_on(&tx, issue_id)?.ok_or(StoreError::UnknownId)?;
        let id = issue.id.to_string();
        upsert_description_tx(&tx, &id, doc, now_ms)?;
        super::record_change_tx(
            &tx,
            &issue.project_id.to_string(),
            Some(&id),
            ChangeOp::Update,
            now_ms,
        )?;
        let description = description_on(&tx, issue_id)?.ok_or(StoreError::UnknownId)?;
        tx.commit()?;
        Ok(description)
    }

    pub fn get_description(
        &self,
        issue_id: &IssueId,
    ) -> Result<Option<IssueDescription>, StoreError> {
        description_on(&self.conn, issue_id)
    }

    pub fn delete_description(&mut self, issue_id: &IssueId) -> Result<bool, StoreError> {
        let tx = self.conn.transaction()?;
        let Some(issue) = issue_on(&tx, issue_id)? else {
            return Err(StoreError::UnknownId);
        };
        let id = issue.id.to_string();
        let deleted = delete_description_tx(&tx, &id)?;
        if deleted {
            super::record_change_tx(
                &tx,
                &issue.project_id.to_string(),
                Some(&id),
                ChangeOp::Update,
                super::now_ms(),
            )?;
        }
        tx.commit()?;
        Ok(deleted)
    }
}
