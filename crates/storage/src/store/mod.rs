#![forbid(unsafe_code)]

mod changes;
mod descriptions;
mod error;
mod issues;
mod labels;
mod projects;
mod requests;
mod rows;
mod schema;
mod states;
mod types;
mod users;
mod workspaces;

pub use error::StoreError;
pub use requests::*;
pub use types::*;

use rusqlite::{Connection, OptionalExtension, Transaction, ffi, params};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DB_FILE_NAME: &str = "planeboard.db";

const ISSUES_VERSION_COUNTER: &str = "issues_version";

#[derive(Debug)]
pub struct SqliteStore {
    conn: Connection,
    storage_dir: PathBuf,
}

impl SqliteStore {
    pub fn open(storage_dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let storage_dir = storage_dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&storage_dir)?;

        let db_path = storage_dir.join(DB_FILE_NAME);
        let conn = Connection::open(&db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        schema::preflight_gate(&conn)?;
        schema::install_schema(&conn)?;
        tracing::debug!(path = %db_path.display(), "store opened");

        Ok(Self { conn, storage_dir })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }
}

/// Appends to the issue feed and returns the project's new version. Versions
/// are contiguous per project, so a gap tells a writer someone else wrote.
fn record_change_tx(
    tx: &Transaction<'_>,
    project_id: &str,
    issue_id: Option<&str>,
    op: ChangeOp,
    ts_ms: i64,
) -> Result<i64, StoreError> {
    let version = next_counter_tx(tx, project_id, ISSUES_VERSION_COUNTER)?;
    tx.execute(
        r#"
        INSERT INTO change_events(channel, project_id, issue_id, op, version, ts_ms)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
        params![ISSUES_CHANNEL, project_id, issue_id, op.as_str(), version, ts_ms],
    )?;
    Ok(version)
}

fn next_counter_tx(tx: &Transaction<'_>, project_id: &str, name: &str) -> Result<i64, StoreError> {
    let current: i64 = tx
        .query_row(
            "SELECT value FROM counters WHERE project_id = ?1 AND name = ?2",
            params![project_id, name],
            |row| row.get(0),
        )
        .optional()?
        .unwrap_or(0);
    let next = current + 1;
    tx.execute(
        r#"
        INSERT INTO counters(project_id, name, value) VALUES (?1, ?2, ?3)
        ON CONFLICT(project_id, name) DO UPDATE SET value = excluded.value
        "#,
        params![project_id, name, next],
    )
    .map_err(|err| map_write_error(err, "counter conflict"))?;
    Ok(next)
}

fn map_write_error(err: rusqlite::Error, conflict: &'static str) -> StoreError {
    if let rusqlite::Error::SqliteFailure(failure, _) = &err {
        match failure.extended_code {
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                return StoreError::Conflict(conflict);
            }
            ffi::SQLITE_CONSTRAINT_FOREIGNKEY => return StoreError::InvalidReference,
            ffi::SQLITE_CONSTRAINT_CHECK | ffi::SQLITE_CONSTRAINT_NOTNULL => {
                return StoreError::InvalidInput("value violates a column constraint");
            }
            _ => {}
        }
    }
    StoreError::Sql(err)
}

fn required_text(value: &str, message: &'static str) -> Result<String, StoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidInput(message));
    }
    Ok(trimmed.to_string())
}

fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

fn to_sqlite_i64(value: usize) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::InvalidInput("numeric overflow"))
}

fn now_ms() -> i64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    let now = match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(duration) => duration,
        Err(_) => return 0,
    };

    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}
