#![forbid(unsafe_code)]

use super::rows::{enum_at, id_at};
use super::{ChangeOp, CreateStateRequest, SqliteStore, StoreError};
use pb_core::ids::{ProjectId, StateId};
use pb_core::model::{DEFAULT_STATE_COLOR, IssueState, NAME_MAX_CHARS, StateGroup, normalize_color};
use rusqlite::{OptionalExtension, Row, Transaction, params};

pub(super) const STATE_COLUMNS: &str =
    "s.id, s.project_id, s.name, s.color, s.position, s.state_group, s.created_at_ms";

const NAME_CONFLICT: &str = "state name already exists in project";

pub(super) fn state_from_row(row: &Row<'_>) -> rusqlite::Result<IssueState> {
    Ok(IssueState {
        id: id_at(row, 0)?,
        project_id: id_at(row, 1)?,
        name: row.get(2)?,
        color: row.get(3)?,
        position: row.get(4)?,
        group: enum_at(row, 5, StateGroup::parse)?,
        created_at_ms: row.get(6)?,
    })
}

pub(super) fn insert_state_tx(
    tx: &Transaction<'_>,
    project_id: ProjectId,
    name: &str,
    color: &str,
    group: StateGroup,
    position: i64,
    now_ms: i64,
) -> Result<IssueState, StoreError> {
    let state = IssueState {
        id: StateId::generate(),
        project_id,
        name: name.to_string(),
        color: color.to_string(),
        position,
        group,
        created_at_ms: now_ms,
    };
    tx.execute(
        r#"
        INSERT INTO issue_states(id, project_id, name, color, position, state_group, created_at_ms)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            state.id.to_string(),
            state.project_id.to_string(),
            state.name,
            state.color,
            state.position,
            state.group.as_str(),
            state.created_at_ms,
        ],
    )
    .map_err(|err| super::map_write_error(err, NAME_CONFLICT))?;
    Ok(state)
}

pub(super) fn state_tx(
    tx: &Transaction<'_>,
    id: &StateId,
) -> Result<Option<IssueState>, StoreError> {
    Ok(tx
        .query_row(
            &format!("SELECT {STATE_COLUMNS} FROM issue_states s WHERE s.id = ?1"),
            params![id.to_string()],
            state_from_row,
        )
        .optional()?)
}

impl SqliteStore {
    pub fn list_states(&self, project_id: &ProjectId) -> Result<Vec<IssueState>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {STATE_COLUMNS} FROM issue_states s WHERE s.project_id = ?1 ORDER BY s.position ASC, s.name ASC"
        ))?;
        let rows = stmt.query_map(params![project_id.to_string()], state_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn create_state(&mut self, request: CreateStateRequest) -> Result<IssueState, StoreError> {
        let name = super::required_text(&request.name, "state name is required")?;
        if name.chars().count() > NAME_MAX_CHARS {
            return Err(StoreError::InvalidInput("state name is too long"));
        }
        let color = normalize_color(request.color.as_deref().unwrap_or(DEFAULT_STATE_COLOR))
            .map_err(|_| StoreError::InvalidInput("state color must look like #rrggbb"))?;
        let project_id = request.project_id.to_string();

        let tx = self.conn.transaction()?;
        let position = match request.position {
            Some(position) => position,
            None => tx.query_row(
                "SELECT COALESCE(MAX(position) + 1, 0) FROM issue_states WHERE project_id = ?1",
                params![project_id],
                |row| row.get::<_, i64>(0),
            )?,
        };
        let state = insert_state_tx(
            &tx,
            request.project_id,
            &name,
            &color,
            request.group,
            position,
            super::now_ms(),
        )?;
        super::record_change_tx(&tx, &project_id, None, ChangeOp::Update, state.created_at_ms)?;
        tx.commit()?;
        Ok(state)
    }

    pub fn get_state(&self, id: &StateId) -> Result<Option<IssueState>, StoreError> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {STATE_COLUMNS} FROM issue_states s WHERE s.id = ?1"),
                params![id.to_string()],
                state_from_row,
            )
            .optional()?)
    }

    /// Issues in the state stay in the project with no state.
    pub fn delete_state(&mut self, id: &StateId) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        let state = state_tx(&tx, id)?.ok_or(StoreError::UnknownId)?;
        tx.execute(
            "DELETE FROM issue_states WHERE id = ?1",
            params![state.id.to_string()],
        )?;
        super::record_change_tx(
            &tx,
            &state.project_id.to_string(),
            None,
            ChangeOp::Update,
            super::now_ms(),
        )?;
        tx.commit()?;
        Ok(())
    }
}
