#![forbid(unsafe_code)]

//! Create/edit/delete flows behind the workspace, project and issue modals.
//!
//! A form checks its fields before touching the store, so a rejected form
//! leaves no rows behind. Store and authorization failures are reported to
//! the notification sink as destructive toasts; field errors are only
//! returned, the way an inline form message would show them.

use crate::identity::{AuthUser, Identity};
use crate::notify::{NotificationSink, Toast};
use pb_core::ids::{IssueId, ProjectId, StateId, UserId, WorkspaceId};
use pb_core::model::{
    ICON_MAX_CHARS, ISSUE_NAME_MAX_CHARS, IssueDate, IssueState, NAME_MAX_CHARS, Priority,
    Project, Workspace,
};
use pb_core::naming::{ProjectIdentifier, workspace_slug};
use pb_core::rich_text::RichDoc;
use pb_storage::{
    CreateIssueRequest, CreateProjectRequest, CreateWorkspaceRequest, EnsureUserRequest,
    IssueWrite, SqliteStore, StoreError, UpdateIssueRequest,
};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub(crate) enum FormError {
    #[error("{field}: {message}")]
    Validation {
        field: &'static str,
        message: String,
    },
    #[error("sign in to continue")]
    Unauthenticated,
    #[error("you are not a member of this workspace")]
    NotMember,
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl FormError {
    pub(crate) fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION",
            Self::Unauthenticated => "AUTH_REQUIRED",
            Self::NotMember => "FORBIDDEN",
            Self::Store(err) => err.code(),
        }
    }
}

fn invalid(field: &'static str, message: impl Into<String>) -> FormError {
    FormError::Validation {
        field,
        message: message.into(),
    }
}

fn required_name(field: &'static str, value: &str, max: usize) -> Result<String, FormError> {
    let name = value.trim();
    if name.is_empty() {
        return Err(invalid(field, "is required"));
    }
    if name.chars().count() > max {
        return Err(invalid(field, format!("must be at most {max} characters")));
    }
    Ok(name.to_string())
}

fn non_negative(estimate: Option<i64>) -> Result<Option<i64>, FormError> {
    match estimate {
        Some(value) if value < 0 => Err(invalid("estimate", "must not be negative")),
        other => Ok(other),
    }
}

fn check_dates(start: Option<IssueDate>, target: Option<IssueDate>) -> Result<(), FormError> {
    if let (Some(start), Some(target)) = (start, target)
        && target < start
    {
        return Err(invalid("target_date", "must not be before start_date"));
    }
    Ok(())
}

fn description_doc(payload: &Value) -> Result<Option<RichDoc>, FormError> {
    RichDoc::from_payload(payload).map_err(|err| invalid("description", err.to_string()))
}

/// Everything a form submission needs besides its own fields.
pub(crate) struct FormContext<'a> {
    pub(crate) store: &'a mut SqliteStore,
    pub(crate) identity: &'a dyn Identity,
    pub(crate) sink: &'a mut dyn NotificationSink,
}

impl FormContext<'_> {
    fn current_user(&self) -> Result<AuthUser, FormError> {
        self.identity.current_user().ok_or(FormError::Unauthenticated)
    }

    /// The signed-in user's stored id; the row is created on first use.
    fn ensure_user(&mut self) -> Result<UserId, FormError> {
        let user = self.current_user()?;
        let stored = self.store.ensure_user(EnsureUserRequest {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
        })?;
        Ok(stored.id)
    }

    fn require_member(
        &self,
        workspace_id: &WorkspaceId,
        user_id: &UserId,
    ) -> Result<(), FormError> {
        if self.store.is_workspace_member(workspace_id, user_id)? {
            Ok(())
        } else {
            Err(FormError::NotMember)
        }
    }

    fn project_for_member(
        &mut self,
        project_id: &ProjectId,
    ) -> Result<(Project, UserId), FormError> {
        let user_id = self.ensure_user()?;
        let project = self
            .store
            .get_project(project_id)?
            .ok_or(StoreError::UnknownId)?;
        self.require_member(&project.workspace_id, &user_id)?;
        Ok((project, user_id))
    }

    fn issue_project_for_member(&mut self, issue_id: &IssueId) -> Result<UserId, FormError> {
        let issue = self.store.get_issue(issue_id)?.ok_or(StoreError::UnknownId)?;
        let (_, user_id) = self.project_for_member(&issue.project_id)?;
        Ok(user_id)
    }

    fn finish<T>(
        &mut self,
        result: Result<T, FormError>,
        success: impl FnOnce(&T) -> Toast,
    ) -> Result<T, FormError> {
        match &result {
            Ok(value) => self.sink.notify(success(value)),
            Err(FormError::Validation { field, message }) => {
                tracing::debug!(field = *field, message = %message, "form rejected");
            }
            Err(err) => {
                tracing::warn!(code = err.code(), error = %err, "form submission failed");
                self.sink.notify(Toast::error(err.to_string()));
            }
        }
        result
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct WorkspaceForm {
    pub(crate) name: String,
    /// Derived from the name when absent; re-sanitized when given.
    pub(crate) slug: Option<String>,
    pub(crate) logo: Option<String>,
}

impl WorkspaceForm {
    pub(crate) fn submit(self, cx: &mut FormContext<'_>) -> Result<Workspace, FormError> {
        let result = self.create(cx);
        cx.finish(result, |workspace| {
            Toast::success(
                "Workspace created!",
                format!("{} is ready to use.", workspace.name),
            )
        })
    }

    fn create(self, cx: &mut FormContext<'_>) -> Result<Workspace, FormError> {
        cx.current_user()?;
        let name = required_name("name", &self.name, NAME_MAX_CHARS)?;
        let slug = match self.slug.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => workspace_slug(raw),
            _ => workspace_slug(&name),
        };
        let owner_id = cx.ensure_user()?;
        let (workspace, _) = cx.store.create_workspace(CreateWorkspaceRequest {
            name,
            slug,
            logo: self.logo,
            owner_id,
        })?;
        Ok(workspace)
    }
}

#[derive(Clone, Debug)]
pub(crate) struct ProjectForm {
    pub(crate) workspace_id: WorkspaceId,
    pub(crate) name: String,
    pub(crate) identifier: String,
    pub(crate) description: Option<String>,
    pub(crate) icon: Option<String>,
    pub(crate) cover_image: Option<String>,
}

impl ProjectForm {
    pub(crate) fn submit(
        self,
        cx: &mut FormContext<'_>,
    ) -> Result<(Project, Vec<IssueState>), FormError> {
        let result = self.create(cx);
        cx.finish(result, |(project, _)| {
            Toast::success(
                "Project created!",
                format!("{} has been created.", project.name),
            )
        })
    }

    fn create(self, cx: &mut FormContext<'_>) -> Result<(Project, Vec<IssueState>), FormError> {
        cx.current_user()?;
        let name = required_name("name", &self.name, NAME_MAX_CHARS)?;
        let identifier = ProjectIdentifier::parse(&self.identifier)
            .map_err(|err| invalid("identifier", err.to_string()))?;
        let icon = self
            .icon
            .map(|icon| icon.trim().to_string())
            .filter(|icon| !icon.is_empty());
        if icon
            .as_ref()
            .is_some_and(|icon| icon.chars().count() > ICON_MAX_CHARS)
        {
            return Err(invalid(
                "icon",
                format!("must be at most {ICON_MAX_CHARS} characters"),
            ));
        }

        let user_id = cx.ensure_user()?;
        cx.require_member(&self.workspace_id, &user_id)?;
        Ok(cx.store.create_project(CreateProjectRequest {
            workspace_id: self.workspace_id,
            name,
            description: self.description,
            identifier: identifier.into_string(),
            icon,
            cover_image: self.cover_image,
            created_by: Some(user_id),
        })?)
    }
}

#[derive(Clone, Debug)]
pub(crate) struct IssueForm {
    pub(crate) project_id: ProjectId,
    pub(crate) name: String,
    /// The first column by position when absent.
    pub(crate) state_id: Option<StateId>,
    pub(crate) priority: Option<Priority>,
    pub(crate) estimate: Option<i64>,
    pub(crate) start_date: Option<IssueDate>,
    pub(crate) target_date: Option<IssueDate>,
    pub(crate) assignee_id: Option<UserId>,
    pub(crate) is_draft: bool,
    /// Editor payload; `{}` or `null` means no description.
    pub(crate) description: Value,
}

impl IssueForm {
    pub(crate) fn new(project_id: ProjectId, name: impl Into<String>) -> Self {
        Self {
            project_id,
            name: name.into(),
            state_id: None,
            priority: None,
            estimate: None,
            start_date: None,
            target_date: None,
            assignee_id: None,
            is_draft: false,
            description: Value::Object(serde_json::Map::new()),
        }
    }

    pub(crate) fn submit(self, cx: &mut FormContext<'_>) -> Result<IssueWrite, FormError> {
        let result = self.create(cx);
        cx.finish(result, |written| {
            Toast::success(
                "Issue created!",
                format!("{} has been created.", written.issue.name),
            )
        })
    }

    fn create(self, cx: &mut FormContext<'_>) -> Result<IssueWrite, FormError> {
        cx.current_user()?;
        let name = required_name("name", &self.name, ISSUE_NAME_MAX_CHARS)?;
        let estimate = non_negative(self.estimate)?;
        check_dates(self.start_date, self.target_date)?;
        let description = description_doc(&self.description)?;

        let (_, user_id) = cx.project_for_member(&self.project_id)?;
        let state_id = match self.state_id {
            Some(state_id) => Some(state_id),
            None => cx
                .store
                .list_states(&self.project_id)?
                .first()
                .map(|state| state.id),
        };

        Ok(cx.store.create_issue(CreateIssueRequest {
            project_id: self.project_id,
            state_id,
            name,
            priority: self.priority.unwrap_or_default(),
            estimate,
            start_date: self.start_date,
            target_date: self.target_date,
            assignee_id: self.assignee_id,
            created_by: Some(user_id),
            is_draft: self.is_draft,
            description,
        })?)
    }
}

/// Edit modal; `None` leaves a field as it is.
#[derive(Clone, Debug)]
pub(crate) struct IssueEditForm {
    pub(crate) issue_id: IssueId,
    pub(crate) name: Option<String>,
    pub(crate) state_id: Option<Option<StateId>>,
    pub(crate) priority: Option<Priority>,
    pub(crate) estimate: Option<Option<i64>>,
    pub(crate) start_date: Option<Option<IssueDate>>,
    pub(crate) target_date: Option<Option<IssueDate>>,
    pub(crate) assignee_id: Option<Option<UserId>>,
    pub(crate) is_draft: Option<bool>,
    pub(crate) description: Option<Value>,
}

impl IssueEditForm {
    pub(crate) fn new(issue_id: IssueId) -> Self {
        Self {
            issue_id,
            name: None,
            state_id: None,
            priority: None,
            estimate: None,
            start_date: None,
            target_date: None,
            assignee_id: None,
            is_draft: None,
            description: None,
        }
    }

    pub(crate) fn submit(self, cx: &mut FormContext<'_>) -> Result<IssueWrite, FormError> {
        let result = self.save(cx);
        cx.finish(result, |_| {
            Toast::success("Issue updated!", "Changes have been saved.")
        })
    }

    fn save(self, cx: &mut FormContext<'_>) -> Result<IssueWrite, FormError> {
        cx.current_user()?;
        let name = self
            .name
            .as_deref()
            .map(|name| required_name("name", name, ISSUE_NAME_MAX_CHARS))
            .transpose()?;
        let estimate = self.estimate.map(non_negative).transpose()?;
        let description = self
            .description
            .as_ref()
            .map(description_doc)
            .transpose()?;

        cx.issue_project_for_member(&self.issue_id)?;
        let current = cx
            .store
            .get_issue(&self.issue_id)?
            .ok_or(StoreError::UnknownId)?;
        check_dates(
            self.start_date.unwrap_or(current.start_date),
            self.target_date.unwrap_or(current.target_date),
        )?;

        let mut request = UpdateIssueRequest::new(self.issue_id);
        request.name = name;
        request.state_id = self.state_id;
        request.priority = self.priority;
        request.estimate = estimate;
        request.start_date = self.start_date;
        request.target_date = self.target_date;
        request.assignee_id = self.assignee_id;
        request.is_draft = self.is_draft;
        request.description = description;
        Ok(cx.store.update_issue(request)?)
    }
}

pub(crate) fn delete_workspace(cx: &mut FormContext<'_>, id: WorkspaceId) -> Result<(), FormError> {
    let result = cx
        .ensure_user()
        .and_then(|user_id| cx.require_member(&id, &user_id))
        .and_then(|()| Ok(cx.store.delete_workspace(&id)?));
    cx.finish(result, |_| {
        Toast::success("Workspace deleted", "The workspace has been removed.")
    })
}

pub(crate) fn delete_project(cx: &mut FormContext<'_>, id: ProjectId) -> Result<(), FormError> {
    let result = cx
        .project_for_member(&id)
        .and_then(|_| Ok(cx.store.delete_project(&id)?));
    cx.finish(result, |_| {
        Toast::success("Project deleted", "The project has been removed.")
    })
}

pub(crate) fn delete_issue(cx: &mut FormContext<'_>, id: IssueId) -> Result<(), FormError> {
    let result = cx
        .issue_project_for_member(&id)
        .and_then(|_| Ok(cx.store.delete_issue(&id)?));
    cx.finish(result, |_| {
        Toast::success("Issue deleted", "The issue has been removed.")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::StaticIdentity;
    use crate::notify::{ToastBuffer, ToastVariant};
    use pb_core::model::StateGroup;
    use serde_json::json;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        store: SqliteStore,
        identity: StaticIdentity,
        sink: ToastBuffer,
    }

    impl Fixture {
        fn signed_in(email: &str) -> Self {
            let dir = tempfile::tempdir().expect("temp dir");
            let store = SqliteStore::open(dir.path()).expect("open store");
            Self {
                _dir: dir,
                store,
                identity: StaticIdentity::new(Some(AuthUser::new(email, None, None))),
                sink: ToastBuffer::default(),
            }
        }

        fn signed_out() -> Self {
            let mut fx = Self::signed_in("nobody@example.com");
            fx.identity = StaticIdentity::new(None);
            fx
        }

        fn cx(&mut self) -> FormContext<'_> {
            FormContext {
                store: &mut self.store,
                identity: &self.identity,
                sink: &mut self.sink,
            }
        }

        fn workspace(&mut self, name: &str) -> Workspace {
            WorkspaceForm {
                name: name.to_string(),
                ..WorkspaceForm::default()
            }
            .submit(&mut self.cx())
            .expect("workspace")
        }

        fn project(
            &mut self,
            workspace: WorkspaceId,
            identifier: &str,
        ) -> (Project, Vec<IssueState>) {
            ProjectForm {
                workspace_id: workspace,
                name: "Website".to_string(),
                identifier: identifier.to_string(),
                description: None,
                icon: None,
                cover_image: None,
            }
            .submit(&mut self.cx())
            .expect("project")
        }

        fn last_toast(&self) -> &Toast {
            self.sink.toasts().last().expect("toast")
        }
    }

    #[test]
    fn workspace_form_derives_slug_and_makes_the_user_owner() {
        let mut fx = Fixture::signed_in("ada@example.com");
        let workspace = fx.workspace("Café München!");

        assert_eq!(workspace.slug, "cafe-munchen");
        let user_id = UserId::from_email("ada@example.com");
        assert_eq!(workspace.owner_id, Some(user_id));
        assert!(fx.store.is_workspace_member(&workspace.id, &user_id).unwrap());
        assert_eq!(fx.last_toast().title, "Workspace created!");
        assert_eq!(
            fx.last_toast().description.as_deref(),
            Some("Café München! is ready to use.")
        );
    }

    #[test]
    fn signed_out_submissions_write_nothing() {
        let mut fx = Fixture::signed_out();
        let err = WorkspaceForm {
            name: "Acme".to_string(),
            ..WorkspaceForm::default()
        }
        .submit(&mut fx.cx())
        .unwrap_err();

        assert!(matches!(err, FormError::Unauthenticated));
        assert_eq!(err.code(), "AUTH_REQUIRED");
        assert_eq!(fx.store.get_workspace_by_slug("acme").unwrap(), None);
        assert_eq!(fx.last_toast().variant, ToastVariant::Destructive);
    }

    #[test]
    fn blank_names_are_rejected_inline() {
        let mut fx = Fixture::signed_in("ada@example.com");
        let err = WorkspaceForm {
            name: "   ".to_string(),
            ..WorkspaceForm::default()
        }
        .submit(&mut fx.cx())
        .unwrap_err();

        assert!(matches!(err, FormError::Validation { field: "name", .. }));
        assert!(fx.sink.toasts().is_empty());
    }

    #[test]
    fn duplicate_slug_is_reported_as_a_destructive_toast() {
        let mut fx = Fixture::signed_in("ada@example.com");
        fx.workspace("Acme");
        let err = WorkspaceForm {
            name: "Other".to_string(),
            slug: Some("ACME".to_string()),
            logo: None,
        }
        .submit(&mut fx.cx())
        .unwrap_err();

        assert_eq!(err.code(), "CONFLICT");
        assert_eq!(fx.last_toast().title, "Error");
        assert_eq!(fx.last_toast().variant, ToastVariant::Destructive);
    }

    #[test]
    fn project_form_normalizes_identifier_and_seeds_states() {
        let mut fx = Fixture::signed_in("ada@example.com");
        let workspace = fx.workspace("Acme");
        let (project, states) = fx.project(workspace.id, "web");

        assert_eq!(project.identifier, "WEB");
        assert_eq!(project.icon, "📋");
        let groups = states.iter().map(|s| s.group).collect::<Vec<_>>();
        assert_eq!(
            groups,
            vec![
                StateGroup::Backlog,
                StateGroup::Unstarted,
                StateGroup::Started,
                StateGroup::Completed
            ]
        );
        assert_eq!(fx.last_toast().title, "Project created!");

        let err = ProjectForm {
            workspace_id: workspace.id,
            name: "Again".to_string(),
            identifier: "WEB".to_string(),
            description: None,
            icon: None,
            cover_image: None,
        }
        .submit(&mut fx.cx())
        .unwrap_err();
        assert_eq!(err.code(), "CONFLICT");
    }

    #[test]
    fn project_form_checks_identifier_and_icon_length() {
        let mut fx = Fixture::signed_in("ada@example.com");
        let workspace = fx.workspace("Acme");
        let mut form = ProjectForm {
            workspace_id: workspace.id,
            name: "Website".to_string(),
            identifier: "TOOLONG".to_string(),
            description: None,
            icon: None,
            cover_image: None,
        };
        let err = form.clone().submit(&mut fx.cx()).unwrap_err();
        assert!(matches!(err, FormError::Validation { field: "identifier", .. }));

        form.identifier = "WEB".to_string();
        form.icon = Some("abc".to_string());
        let err = form.submit(&mut fx.cx()).unwrap_err();
        assert!(matches!(err, FormError::Validation { field: "icon", .. }));
        assert!(fx.store.list_projects(&workspace.id).unwrap().is_empty());
    }

    #[test]
    fn projects_require_membership() {
        let mut fx = Fixture::signed_in("ada@example.com");
        let workspace = fx.workspace("Acme");
        fx.identity = StaticIdentity::new(Some(AuthUser::new("eve@example.com", None, None)));

        let err = ProjectForm {
            workspace_id: workspace.id,
            name: "Website".to_string(),
            identifier: "WEB".to_string(),
            description: None,
            icon: None,
            cover_image: None,
        }
        .submit(&mut fx.cx())
        .unwrap_err();
        assert!(matches!(err, FormError::NotMember));
    }

    #[test]
    fn issue_form_defaults_to_first_state_and_medium_priority() {
        let mut fx = Fixture::signed_in("ada@example.com");
        let workspace = fx.workspace("Acme");
        let (project, states) = fx.project(workspace.id, "WEB");

        let written = IssueForm::new(project.id, "Fix login bug")
            .submit(&mut fx.cx())
            .unwrap();
        assert_eq!(written.issue.state_id, Some(states[0].id));
        assert_eq!(written.issue.priority, Priority::Medium);
        assert_eq!(written.issue.sequence_id, 1);
        assert_eq!(fx.store.get_description(&written.issue.id).unwrap(), None);
        assert_eq!(
            fx.last_toast().description.as_deref(),
            Some("Fix login bug has been created.")
        );
    }

    #[test]
    fn issue_form_validates_before_writing() {
        let mut fx = Fixture::signed_in("ada@example.com");
        let workspace = fx.workspace("Acme");
        let (project, _) = fx.project(workspace.id, "WEB");

        let mut form = IssueForm::new(project.id, "Estimate");
        form.estimate = Some(-1);
        let err = form.submit(&mut fx.cx()).unwrap_err();
        assert!(matches!(err, FormError::Validation { field: "estimate", .. }));

        let mut form = IssueForm::new(project.id, "Bad doc");
        form.description = json!({ "type": "paragraph" });
        let err = form.submit(&mut fx.cx()).unwrap_err();
        assert!(matches!(err, FormError::Validation { field: "description", .. }));

        let mut form = IssueForm::new(project.id, "Dates");
        form.start_date = Some(IssueDate::parse("2026-03-10").unwrap());
        form.target_date = Some(IssueDate::parse("2026-03-01").unwrap());
        let err = form.submit(&mut fx.cx()).unwrap_err();
        assert!(matches!(err, FormError::Validation { field: "target_date", .. }));

        assert!(fx.store.list_issues(&project.id).unwrap().is_empty());
    }

    #[test]
    fn issue_edit_saves_description_and_fields() {
        let mut fx = Fixture::signed_in("ada@example.com");
        let workspace = fx.workspace("Acme");
        let (project, _) = fx.project(workspace.id, "WEB");
        let created = IssueForm::new(project.id, "Draft")
            .submit(&mut fx.cx())
            .unwrap();

        let mut edit = IssueEditForm::new(created.issue.id);
        edit.name = Some("Fix login bug".to_string());
        edit.priority = Some(Priority::Urgent);
        edit.estimate = Some(Some(3));
        edit.description = Some(json!({
            "type": "doc",
            "content": [{ "type": "paragraph", "content": [{ "type": "text", "text": "Steps" }] }]
        }));
        let updated = edit.submit(&mut fx.cx()).unwrap();

        assert_eq!(updated.issue.name, "Fix login bug");
        assert_eq!(updated.issue.priority, Priority::Urgent);
        assert_eq!(updated.issue.estimate, Some(3));
        assert!(updated.version > created.version);
        let description = fx.store.get_description(&created.issue.id).unwrap().unwrap();
        assert_eq!(description.content.plain_text(), "Steps");
        assert_eq!(fx.last_toast().title, "Issue updated!");
    }

    #[test]
    fn delete_flows_remove_rows_and_confirm() {
        let mut fx = Fixture::signed_in("ada@example.com");
        let workspace = fx.workspace("Acme");
        let (project, _) = fx.project(workspace.id, "WEB");
        let issue = IssueForm::new(project.id, "Gone soon")
            .submit(&mut fx.cx())
            .unwrap()
            .issue;

        delete_issue(&mut fx.cx(), issue.id).unwrap();
        assert_eq!(fx.store.get_issue(&issue.id).unwrap(), None);
        assert_eq!(fx.last_toast().title, "Issue deleted");

        delete_project(&mut fx.cx(), project.id).unwrap();
        assert_eq!(fx.store.get_project(&project.id).unwrap(), None);

        delete_workspace(&mut fx.cx(), workspace.id).unwrap();
        assert_eq!(fx.store.get_workspace(&workspace.id).unwrap(), None);
        assert_eq!(fx.last_toast().title, "Workspace deleted");

        let err = delete_issue(&mut fx.cx(), issue.id).unwrap_err();
        assert_eq!(err.code(), "NOT_FOUND");
    }
}
