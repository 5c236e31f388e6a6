#![forbid(unsafe_code)]

use super::StoreError;
use rusqlite::Connection;
use std::collections::BTreeSet;

pub(super) const SCHEMA_VERSION: i64 = 1;

const TABLES: [&str; 11] = [
    "users",
    "workspaces",
    "workspace_members",
    "projects",
    "issue_states",
    "issues",
    "issue_descriptions",
    "labels",
    "issue_labels",
    "counters",
    "change_events",
];

/// Refuses to touch a database written by something else.
pub(super) fn preflight_gate(conn: &Connection) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'",
    )?;
    let mut rows = stmt.query([])?;
    let mut tables = BTreeSet::new();
    while let Some(row) = rows.next()? {
        tables.insert(row.get::<_, String>(0)?);
    }

    if tables.is_empty() {
        return Ok(());
    }

    if tables.iter().any(|table| !TABLES.contains(&table.as_str())) {
        return Err(StoreError::InvalidInput(
            "RESET_REQUIRED: unsupported tables detected",
        ));
    }

    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version != SCHEMA_VERSION {
        return Err(StoreError::InvalidInput(
            "RESET_REQUIRED: schema version mismatch",
        ));
    }
    Ok(())
}

pub(super) fn install_schema(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS users (
          id TEXT PRIMARY KEY,
          email TEXT NOT NULL COLLATE NOCASE UNIQUE,
          display_name TEXT,
          avatar_url TEXT,
          role TEXT NOT NULL DEFAULT 'member'
            CHECK(role IN ('owner', 'admin', 'member', 'guest')),
          is_onboarded INTEGER NOT NULL DEFAULT 0,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS workspaces (
          id TEXT PRIMARY KEY,
          slug TEXT NOT NULL UNIQUE,
          name TEXT NOT NULL,
          logo TEXT,
          owner_id TEXT REFERENCES users(id) ON DELETE SET NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS workspace_members (
          id TEXT PRIMARY KEY,
          workspace_id TEXT NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
          member_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
          role TEXT NOT NULL DEFAULT 'member'
            CHECK(role IN ('owner', 'admin', 'member', 'guest')),
          created_at_ms INTEGER NOT NULL,
          UNIQUE(workspace_id, member_id)
        );

        CREATE INDEX IF NOT EXISTS idx_workspace_members_member
          ON workspace_members(member_id);

        CREATE TABLE IF NOT EXISTS projects (
          id TEXT PRIMARY KEY,
          workspace_id TEXT NOT NULL REFERENCES workspaces(id) ON DELETE CASCADE,
          name TEXT NOT NULL,
          description TEXT,
          identifier TEXT NOT NULL CHECK(length(identifier) BETWEEN 1 AND 12),
          icon TEXT NOT NULL DEFAULT '📋',
          cover_image TEXT,
          created_by TEXT REFERENCES users(id) ON DELETE SET NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL,
          UNIQUE(workspace_id, identifier)
        );

        CREATE TABLE IF NOT EXISTS issue_states (
          id TEXT PRIMARY KEY,
          project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
          name TEXT NOT NULL,
          color TEXT NOT NULL,
          position INTEGER NOT NULL DEFAULT 0,
          state_group TEXT NOT NULL
            CHECK(state_group IN ('backlog', 'unstarted', 'started', 'completed', 'cancelled')),
          created_at_ms INTEGER NOT NULL,
          UNIQUE(project_id, name)
        );

        CREATE TABLE IF NOT EXISTS issues (
          id TEXT PRIMARY KEY,
          project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
          state_id TEXT REFERENCES issue_states(id) ON DELETE SET NULL,
          sequence_id INTEGER NOT NULL,
          name TEXT NOT NULL,
          priority TEXT NOT NULL DEFAULT 'medium'
            CHECK(priority IN ('urgent', 'high', 'medium', 'low')),
          estimate INTEGER CHECK(estimate IS NULL OR estimate >= 0),
          start_date TEXT,
          target_date TEXT,
          completed_at_ms INTEGER,
          assignee_id TEXT REFERENCES users(id) ON DELETE SET NULL,
          created_by TEXT REFERENCES users(id) ON DELETE SET NULL,
          sort_order REAL NOT NULL DEFAULT 65535,
          is_draft INTEGER NOT NULL DEFAULT 0,
          archived_at_ms INTEGER,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL,
          UNIQUE(project_id, sequence_id)
        );

        CREATE INDEX IF NOT EXISTS idx_issues_project_state_order
          ON issues(project_id, state_id, sort_order);
        CREATE INDEX IF NOT EXISTS idx_issues_assignee ON issues(assignee_id);

        CREATE TABLE IF NOT EXISTS issue_descriptions (
          id TEXT PRIMARY KEY,
          issue_id TEXT NOT NULL UNIQUE REFERENCES issues(id) ON DELETE CASCADE,
          content_json TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          updated_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS labels (
          id TEXT PRIMARY KEY,
          project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
          name TEXT NOT NULL,
          color TEXT NOT NULL,
          created_at_ms INTEGER NOT NULL,
          UNIQUE(project_id, name)
        );

        CREATE TABLE IF NOT EXISTS issue_labels (
          issue_id TEXT NOT NULL REFERENCES issues(id) ON DELETE CASCADE,
          label_id TEXT NOT NULL REFERENCES labels(id) ON DELETE CASCADE,
          PRIMARY KEY(issue_id, label_id)
        );

        CREATE TABLE IF NOT EXISTS counters (
          project_id TEXT NOT NULL REFERENCES projects(id) ON DELETE CASCADE,
          name TEXT NOT NULL,
          value INTEGER NOT NULL,
          PRIMARY KEY(project_id, name)
        );

        CREATE TABLE IF NOT EXISTS change_events (
          seq INTEGER PRIMARY KEY AUTOINCREMENT,
          channel TEXT NOT NULL,
          project_id TEXT NOT NULL,
          issue_id TEXT,
          op TEXT NOT NULL CHECK(op IN ('insert', 'update', 'delete')),
          version INTEGER NOT NULL,
          ts_ms INTEGER NOT NULL,
          UNIQUE(project_id, version)
        );
        "#,
    )?;
    conn.execute_batch(&format!("PRAGMA user_version = {SCHEMA_VERSION};"))?;
    Ok(())
}
