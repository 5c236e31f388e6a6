#![forbid(unsafe_code)]

use super::rows::{enum_at, id_at};
use super::{ChangeOp, EnsureUserRequest, SqliteStore, StoreError};
use pb_core::ids::UserId;
use pb_core::model::{Role, User};
use rusqlite::{Connection, OptionalExtension, Row, params};

pub(super) const USER_COLUMNS: &str =
    "u.id, u.email, u.display_name, u.avatar_url, u.role, u.is_onboarded, u.created_at_ms, u.updated_at_ms";

pub(super) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: id_at(row, 0)?,
        email: row.get(1)?,
        display_name: row.get(2)?,
        avatar_url: row.get(3)?,
        role: enum_at(row, 4, Role::parse)?,
        is_onboarded: row.get(5)?,
        created_at_ms: row.get(6)?,
        updated_at_ms: row.get(7)?,
    })
}

fn user_where(
    conn: &Connection,
    predicate: &str,
    value: &str,
) -> Result<Option<User>, StoreError> {
    Ok(conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users u WHERE {predicate}"),
            params![value],
            user_from_row,
        )
        .optional()?)
}

impl SqliteStore {
    /// Returns the stored row for the user, inserting it on first sight.
    /// Existing rows are left as they are. An explicit id that disagrees with
    /// the row already holding the email is a conflict.
    pub fn ensure_user(&mut self, request: EnsureUserRequest) -> Result<User, StoreError> {
        let email = super::required_text(&request.email, "email is required")?;
        if !email.contains('@') {
            return Err(StoreError::InvalidInput("email must contain '@'"));
        }
        let display_name = super::optional_text(request.display_name.as_deref())
            .or_else(|| email.split('@').next().map(str::to_string));
        let now_ms = super::now_ms();

        let tx = self.conn.transaction()?;
        if let Some(id) = request.id
            && let Some(user) = user_where(&tx, "u.id = ?1", &id.to_string())?
        {
            tx.commit()?;
            return Ok(user);
        }
        if let Some(user) = user_where(&tx, "u.email = ?1", &email)? {
            if request.id.is_some_and(|id| id != user.id) {
                return Err(StoreError::Conflict("email registered under another user id"));
            }
            tx.commit()?;
            return Ok(user);
        }

        let id = request.id.unwrap_or_else(|| UserId::from_email(&email));
        tx.execute(
            r#"
            INSERT INTO users(id, email, display_name, avatar_url, role, is_onboarded, created_at_ms, updated_at_ms)
            VALUES (?1, ?2, ?3, NULL, ?4, 1, ?5, ?5)
            "#,
            params![id.to_string(), email, display_name, Role::Member.as_str(), now_ms],
        )
        .map_err(|err| super::map_write_error(err, "user id already registered"))?;
        tracing::info!(user_id = %id, "user registered");
        let user = user_where(&tx, "u.id = ?1", &id.to_string())?.ok_or(StoreError::UnknownId)?;
        tx.commit()?;
        Ok(user)
    }

    pub fn get_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        user_where(&self.conn, "u.id = ?1", &id.to_string())
    }

    /// Removes the user. Owned workspaces, authored projects and assigned
    /// issues keep existing with the reference cleared.
    pub fn delete_user(&mut self, id: &UserId) -> Result<(), StoreError> {
        let id = id.to_string();
        let now_ms = super::now_ms();
        let tx = self.conn.transaction()?;

        let projects = {
            let mut stmt = tx.prepare(
                "SELECT DISTINCT project_id FROM issues WHERE assignee_id = ?1 OR created_by = ?1",
            )?;
            let rows = stmt.query_map(params![id], |row| row.get::<_, String>(0))?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        let deleted = tx.execute("DELETE FROM users WHERE id = ?1", params![id])?;
        if deleted == 0 {
            return Err(StoreError::UnknownId);
        }
        for project_id in &projects {
            super::record_change_tx(&tx, project_id, None, ChangeOp::Update, now_ms)?;
        }
        tx.commit()?;
        Ok(())
    }
}
