#![forbid(unsafe_code)]

use super::rows::{id_at, opt_id_at};
use super::states::insert_state_tx;
use super::{ChangeOp, CreateProjectRequest, SqliteStore, StoreError, UpdateProjectRequest};
use pb_core::ids::{ProjectId, WorkspaceId};
use pb_core::model::{
    DEFAULT_PROJECT_ICON, DEFAULT_STATES, ICON_MAX_CHARS, IssueState, NAME_MAX_CHARS, Project,
};
use rusqlite::{OptionalExtension, Row, params};

const PROJECT_COLUMNS: &str = "p.id, p.workspace_id, p.name, p.description, p.identifier, p.icon, p.cover_image, p.created_by, p.created_at_ms, p.updated_at_ms";

const IDENTIFIER_CONFLICT: &str = "project identifier already exists in workspace";

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: id_at(row, 0)?,
        workspace_id: id_at(row, 1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        identifier: row.get(4)?,
        icon: row.get(5)?,
        cover_image: row.get(6)?,
        created_by: opt_id_at(row, 7)?,
        created_at_ms: row.get(8)?,
        updated_at_ms: row.get(9)?,
    })
}

fn project_name(value: &str) -> Result<String, StoreError> {
    let name = super::required_text(value, "project name is required")?;
    if name.chars().count() > NAME_MAX_CHARS {
        return Err(StoreError::InvalidInput("project name is too long"));
    }
    Ok(name)
}

/// Identifiers are compared upper-cased, so normalize before every write.
fn project_identifier(value: &str) -> Result<String, StoreError> {
    Ok(super::required_text(value, "project identifier is required")?.to_uppercase())
}

fn project_icon(value: Option<&str>) -> Result<String, StoreError> {
    let icon = super::optional_text(value).unwrap_or_else(|| DEFAULT_PROJECT_ICON.to_string());
    if icon.chars().count() > ICON_MAX_CHARS {
        return Err(StoreError::InvalidInput("project icon is too long"));
    }
    Ok(icon)
}

impl SqliteStore {
    /// Creates the project and its default workflow states in one
    /// transaction.
    pub fn create_project(
        &mut self,
        request: CreateProjectRequest,
    ) -> Result<(Project, Vec<IssueState>), StoreError> {
        let now_ms = super::now_ms();
        let project = Project {
            id: ProjectId::generate(),
            workspace_id: request.workspace_id,
            name: project_name(&request.name)?,
            description: super::optional_text(request.description.as_deref()),
            identifier: project_identifier(&request.identifier)?,
            icon: project_icon(request.icon.as_deref())?,
            cover_image: super::optional_text(request.cover_image.as_deref()),
            created_by: request.created_by,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        };

        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO projects(id, workspace_id, name, description, identifier, icon, cover_image, created_by, created_at_ms, updated_at_ms)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            "#,
            params![
                project.id.to_string(),
                project.workspace_id.to_string(),
                project.name,
                project.description,
                project.identifier,
                project.icon,
                project.cover_image,
                project.created_by.map(|id| id.to_string()),
                now_ms,
            ],
        )
        .map_err(|err| super::map_write_error(err, IDENTIFIER_CONFLICT))?;

        let mut states = Vec::with_capacity(DEFAULT_STATES.len());
        for (position, default) in DEFAULT_STATES.iter().enumerate() {
            states.push(insert_state_tx(
                &tx,
                project.id,
                default.name,
                default.color,
                default.group,
                super::to_sqlite_i64(position)?,
                now_ms,
            )?);
        }
        tx.commit()?;

        tracing::info!(
            project_id = %project.id,
            identifier = %project.identifier,
            "project created"
        );
        Ok((project, states))
    }

    pub fn get_project(&self, id: &ProjectId) -> Result<Option<Project>, StoreError> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.id = ?1"),
                params![id.to_string()],
                project_from_row,
            )
            .optional()?)
    }

    pub fn list_projects(&self, workspace_id: &WorkspaceId) -> Result<Vec<Project>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.workspace_id = ?1 ORDER BY p.created_at_ms ASC, p.identifier ASC"
        ))?;
        let rows = stmt.query_map(params![workspace_id.to_string()], project_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn update_project(&mut self, request: UpdateProjectRequest) -> Result<Project, StoreError> {
        let mut project = self.get_project(&request.id)?.ok_or(StoreError::UnknownId)?;
        if let Some(name) = request.name.as_deref() {
            project.name = project_name(name)?;
        }
        if let Some(description) = request.description {
            project.description = super::optional_text(description.as_deref());
        }
        if let Some(identifier) = request.identifier.as_deref() {
            project.identifier = project_identifier(identifier)?;
        }
        if let Some(icon) = request.icon.as_deref() {
            project.icon = project_icon(Some(icon))?;
        }
        if let Some(cover_image) = request.cover_image {
            project.cover_image = super::optional_text(cover_image.as_deref());
        }
        project.updated_at_ms = super::now_ms();

        self.conn
            .execute(
                r#"
                UPDATE projects
                SET name = ?2, description = ?3, identifier = ?4, icon = ?5, cover_image = ?6, updated_at_ms = ?7
                WHERE id = ?1
                "#,
                params![
                    project.id.to_string(),
                    project.name,
                    project.description,
                    project.identifier,
                    project.icon,
                    project.cover_image,
                    project.updated_at_ms,
                ],
            )
            .map_err(|err| super::map_write_error(err, IDENTIFIER_CONFLICT))?;
        Ok(project)
    }

    /// Deletes the project with its states, issues, descriptions and labels.
    /// The feed records the deletion so open boards notice it.
    pub fn delete_project(&mut self, id: &ProjectId) -> Result<(), StoreError> {
        let id = id.to_string();
        let tx = self.conn.transaction()?;
        let exists = tx
            .query_row("SELECT 1 FROM projects WHERE id = ?1", params![id], |row| {
                row.get::<_, i64>(0)
            })
            .optional()?;
        if exists.is_none() {
            return Err(StoreError::UnknownId);
        }
        // Counters cascade with the project, so the event goes in first.
        super::record_change_tx(&tx, &id, None, ChangeOp::Delete, super::now_ms())?;
        tx.execute("DELETE FROM projects WHERE id = ?1", params![id])?;
        tx.commit()?;
        tracing::info!(project_id = %id, "project deleted");
        Ok(())
    }
}
