#![forbid(unsafe_code)]

use super::rows::{enum_at, id_at, opt_id_at};
use super::{
    AddMemberRequest, ChangeOp, CreateWorkspaceRequest, MemberDetail, SqliteStore, StoreError,
    UpdateWorkspaceRequest,
};
use pb_core::ids::{MembershipId, UserId, WorkspaceId};
use pb_core::model::{NAME_MAX_CHARS, Role, UserSummary, Workspace, WorkspaceMember};
use rusqlite::{OptionalExtension, Row, Transaction, params};

const WORKSPACE_COLUMNS: &str =
    "w.id, w.slug, w.name, w.logo, w.owner_id, w.created_at_ms, w.updated_at_ms";
const MEMBER_COLUMNS: &str = "m.id, m.workspace_id, m.member_id, m.role, m.created_at_ms";

const SLUG_CONFLICT: &str = "workspace slug already exists";
const MEMBER_CONFLICT: &str = "user is already a member of this workspace";

fn workspace_from_row(row: &Row<'_>) -> rusqlite::Result<Workspace> {
    Ok(Workspace {
        id: id_at(row, 0)?,
        slug: row.get(1)?,
        name: row.get(2)?,
        logo: row.get(3)?,
        owner_id: opt_id_at(row, 4)?,
        created_at_ms: row.get(5)?,
        updated_at_ms: row.get(6)?,
    })
}

fn member_from_row(row: &Row<'_>) -> rusqlite::Result<WorkspaceMember> {
    Ok(WorkspaceMember {
        id: id_at(row, 0)?,
        workspace_id: id_at(row, 1)?,
        member_id: id_at(row, 2)?,
        role: enum_at(row, 3, Role::parse)?,
        created_at_ms: row.get(4)?,
    })
}

fn workspace_name(value: &str) -> Result<String, StoreError> {
    let name = super::required_text(value, "workspace name is required")?;
    if name.chars().count() > NAME_MAX_CHARS {
        return Err(StoreError::InvalidInput("workspace name is too long"));
    }
    Ok(name)
}

fn insert_member_tx(
    tx: &Transaction<'_>,
    workspace_id: WorkspaceId,
    member_id: UserId,
    role: Role,
    now_ms: i64,
) -> Result<WorkspaceMember, StoreError> {
    let member = WorkspaceMember {
        id: MembershipId::generate(),
        workspace_id,
        member_id,
        role,
        created_at_ms: now_ms,
    };
    tx.execute(
        "INSERT INTO workspace_members(id, workspace_id, member_id, role, created_at_ms) VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            member.id.to_string(),
            member.workspace_id.to_string(),
            member.member_id.to_string(),
            member.role.as_str(),
            member.created_at_ms,
        ],
    )
    .map_err(|err| super::map_write_error(err, MEMBER_CONFLICT))?;
    Ok(member)
}

fn workspace_project_ids_tx(
    tx: &Transaction<'_>,
    workspace_id: &str,
) -> Result<Vec<String>, StoreError> {
    let mut stmt = tx.prepare("SELECT id FROM projects WHERE workspace_id = ?1")?;
    let rows = stmt.query_map(params![workspace_id], |row| row.get::<_, String>(0))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

impl SqliteStore {
    /// Creates the workspace together with the owner's membership. Either
    /// both rows exist afterwards or neither does.
    pub fn create_workspace(
        &mut self,
        request: CreateWorkspaceRequest,
    ) -> Result<(Workspace, WorkspaceMember), StoreError> {
        let name = workspace_name(&request.name)?;
        let slug = super::required_text(&request.slug, "workspace slug is required")?;
        let now_ms = super::now_ms();
        let workspace = Workspace {
            id: WorkspaceId::generate(),
            slug,
            name,
            logo: super::optional_text(request.logo.as_deref()),
            owner_id: Some(request.owner_id),
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        };

        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO workspaces(id, slug, name, logo, owner_id, created_at_ms, updated_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
            "#,
            params![
                workspace.id.to_string(),
                workspace.slug,
                workspace.name,
                workspace.logo,
                request.owner_id.to_string(),
                now_ms,
            ],
        )
        .map_err(|err| super::map_write_error(err, SLUG_CONFLICT))?;
        let member = insert_member_tx(&tx, workspace.id, request.owner_id, Role::Owner, now_ms)?;
        tx.commit()?;

        tracing::info!(workspace_id = %workspace.id, slug = %workspace.slug, "workspace created");
        Ok((workspace, member))
    }

    pub fn get_workspace(&self, id: &WorkspaceId) -> Result<Option<Workspace>, StoreError> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {WORKSPACE_COLUMNS} FROM workspaces w WHERE w.id = ?1"),
                params![id.to_string()],
                workspace_from_row,
            )
            .optional()?)
    }

    pub fn get_workspace_by_slug(&self, slug: &str) -> Result<Option<Workspace>, StoreError> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {WORKSPACE_COLUMNS} FROM workspaces w WHERE w.slug = ?1"),
                params![slug.trim()],
                workspace_from_row,
            )
            .optional()?)
    }

    pub fn list_workspaces_for_member(
        &self,
        member_id: &UserId,
    ) -> Result<Vec<Workspace>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {WORKSPACE_COLUMNS}
            FROM workspaces w
            JOIN workspace_members m ON m.workspace_id = w.id
            WHERE m.member_id = ?1
            ORDER BY w.created_at_ms ASC, w.name ASC
            "#
        ))?;
        let rows = stmt.query_map(params![member_id.to_string()], workspace_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn update_workspace(
        &mut self,
        request: UpdateWorkspaceRequest,
    ) -> Result<Workspace, StoreError> {
        let mut workspace = self.get_workspace(&request.id)?.ok_or(StoreError::UnknownId)?;
        if let Some(name) = request.name.as_deref() {
            workspace.name = workspace_name(name)?;
        }
        if let Some(slug) = request.slug.as_deref() {
            workspace.slug = super::required_text(slug, "workspace slug is required")?;
        }
        if let Some(logo) = request.logo {
            workspace.logo = super::optional_text(logo.as_deref());
        }
        workspace.updated_at_ms = super::now_ms();

        self.conn
            .execute(
                "UPDATE workspaces SET slug = ?2, name = ?3, logo = ?4, updated_at_ms = ?5 WHERE id = ?1",
                params![
                    workspace.id.to_string(),
                    workspace.slug,
                    workspace.name,
                    workspace.logo,
                    workspace.updated_at_ms,
                ],
            )
            .map_err(|err| super::map_write_error(err, SLUG_CONFLICT))?;
        Ok(workspace)
    }

    /// Deletes the workspace and, through cascades, everything inside it.
    pub fn delete_workspace(&mut self, id: &WorkspaceId) -> Result<(), StoreError> {
        let id = id.to_string();
        let now_ms = super::now_ms();
        let tx = self.conn.transaction()?;
        let exists = tx
            .query_row("SELECT 1 FROM workspaces WHERE id = ?1", params![id], |row| {
                row.get::<_, i64>(0)
            })
            .optional()?;
        if exists.is_none() {
            return Err(StoreError::UnknownId);
        }
        let projects = workspace_project_ids_tx(&tx, &id)?;
        for project_id in &projects {
            super::record_change_tx(&tx, project_id, None, ChangeOp::Delete, now_ms)?;
        }
        tx.execute("DELETE FROM workspaces WHERE id = ?1", params![id])?;
        tx.commit()?;
        tracing::info!(workspace_id = %id, projects = projects.len(), "workspace deleted");
        Ok(())
    }

    pub fn add_workspace_member(
        &mut self,
        request: AddMemberRequest,
    ) -> Result<WorkspaceMember, StoreError> {
        let tx = self.conn.transaction()?;
        let member = insert_member_tx(
            &tx,
            request.workspace_id,
            request.member_id,
            request.role,
            super::now_ms(),
        )?;
        tx.commit()?;
        Ok(member)
    }

    pub fn list_workspace_members(
        &self,
        workspace_id: &WorkspaceId,
    ) -> Result<Vec<MemberDetail>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {MEMBER_COLUMNS}, u.email, u.display_name, u.avatar_url
            FROM workspace_members m
            JOIN users u ON u.id = m.member_id
            WHERE m.workspace_id = ?1
            ORDER BY m.created_at_ms ASC, u.email ASC
            "#
        ))?;
        let rows = stmt.query_map(params![workspace_id.to_string()], |row| {
            let membership = member_from_row(row)?;
            Ok(MemberDetail {
                user: UserSummary {
                    id: membership.member_id,
                    email: row.get(5)?,
                    display_name: row.get(6)?,
                    avatar_url: row.get(7)?,
                },
                membership,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn is_workspace_member(
        &self,
        workspace_id: &WorkspaceId,
        member_id: &UserId,
    ) -> Result<bool, StoreError> {
        let found = self
            .conn
            .query_row(
                "SELECT 1 FROM workspace_members WHERE workspace_id = ?1 AND member_id = ?2",
                params![workspace_id.to_string(), member_id.to_string()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}
