use tracing::{debug, info, instrument};

use crate::error::{FormError, ValidationError};
use crate::list::TaskListController;
use crate::task::{Task, TaskId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    Closed,
    Creating,
    /// Remembers the completion flag seen when the form opened, used only
    /// if the task has since left the collection.
    Editing { id: TaskId, completed: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftField {
    Title,
    Description,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub title: String,
    pub description: String,
}

impl Draft {
    pub fn validated(&self) -> Result<ValidDraft, ValidationError> {
        ValidDraft::new(&self.title, &self.description)
    }
}

/// A draft whose title is known to be non-blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidDraft {
    title: String,
    description: String,
}

impl ValidDraft {
    pub fn new(title: &str, description: &str) -> Result<Self, ValidationError> {
        if title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        Ok(Self {
            title: title.to_string(),
            description: description.to_string(),
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

/// The add/edit modal. Owns the draft and mode, never the collection.
#[derive(Debug, Clone)]
pub struct TaskFormController {
    mode: FormMode,
    draft: Draft,
    error: Option<String>,
}

impl Default for TaskFormController {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskFormController {
    pub fn new() -> Self {
        Self {
            mode: FormMode::Closed,
            draft: Draft::default(),
            error: None,
        }
    }

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn is_open(&self) -> bool {
        self.mode != FormMode::Closed
    }

    pub fn draft(&self) -> &Draft {
        &self.draft
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn heading(&self) -> &'static str {
        match self.mode {
            FormMode::Editing { .. } => "Edit Task",
            _ => "New Task",
        }
    }

    pub fn submit_label(&self) -> &'static str {
        match self.mode {
            FormMode::Editing { .. } => "Update Task",
            _ => "Add Task",
        }
    }

    /// Opens an empty create form. Only valid from `Closed`; returns whether
    /// the form opened.
    pub fn open_for_create(&mut self) -> bool {
        if self.mode != FormMode::Closed {
            debug!(mode = ?self.mode, "open_for_create ignored while form is open");
            return false;
        }
        self.mode = FormMode::Creating;
        self.draft = Draft::default();
        self.error = None;
        true
    }

    /// Prefills title and description. The completion flag is not editable here.
    pub fn open_for_edit(&mut self, task: &Task) {
        debug!(id = %task.id, "opening form for edit");
        self.mode = FormMode::Editing {
            id: task.id,
            completed: task.completed,
        };
        self.draft = Draft {
            title: task.title.clone(),
            description: task.description.clone(),
        };
        self.error = None;
    }

    pub fn update_draft_field(&mut self, field: DraftField, value: &str) -> Result<(), FormError> {
        if self.mode == FormMode::Closed {
            return Err(FormError::Closed);
        }
        let slot = match field {
            DraftField::Title => &mut self.draft.title,
            DraftField::Description => &mut self.draft.description,
        };
        slot.clear();
        slot.push_str(value);
        self.error = None;
        Ok(())
    }

    pub fn cancel(&mut self) {
        self.close();
    }

    /// Validates, then creates or updates through the list controller.
    ///
    /// A blank title leaves the form untouched apart from the inline error
    /// and makes no remote call. A gateway failure keeps the form open with
    /// its draft; the list controller has already posted the error notice.
    #[instrument(skip(self, list), fields(mode = ?self.mode))]
    pub async fn submit(&mut self, list: &TaskListController) -> Result<Task, FormError> {
        let mode = self.mode;
        if mode == FormMode::Closed {
            return Err(FormError::Closed);
        }

        let valid = match self.draft.validated() {
            Ok(valid) => valid,
            Err(err) => {
                debug!(error = %err, "submit rejected by validation");
                self.error = Some(err.to_string());
                return Err(err.into());
            }
        };

        let saved = match mode {
            FormMode::Creating => list.create(valid).await?,
            FormMode::Editing { id, completed } => {
                let completed = list.get(id).map(|t| t.completed).unwrap_or(completed);
                list.update(id, valid, completed).await?
            }
            FormMode::Closed => return Err(FormError::Closed),
        };

        info!(id = %saved.id, "form submitted");
        self.close();
        Ok(saved)
    }

    fn close(&mut self) {
        self.mode = FormMode::Closed;
        self.draft = Draft::default();
        self.error = None;
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn sample(completed: bool) -> Task {
        Task {
            id: TaskId(7),
            title: "Water plants".to_string(),
            description: "balcony".to_string(),
            completed,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn edit_prefills_from_task() {
        let mut form = TaskFormController::new();
        form.open_for_edit(&sample(true));

        assert_eq!(
            form.mode(),
            FormMode::Editing {
                id: TaskId(7),
                completed: true
            }
        );
        assert_eq!(form.draft().title, "Water plants");
        assert_eq!(form.draft().description, "balcony");
        assert_eq!(form.heading(), "Edit Task");
        assert_eq!(form.submit_label(), "Update Task");
    }

    #[test]
    fn create_only_opens_from_closed() {
        let mut form = TaskFormController::new();
        assert!(form.open_for_create());
        form.update_draft_field(DraftField::Title, "draft")
            .expect("edit title");
        assert!(!form.open_for_create());
        assert_eq!(form.draft().title, "draft");

        form.cancel();
        assert_eq!(form.mode(), FormMode::Closed);
        assert_eq!(form.draft(), &Draft::default());
    }

    #[test]
    fn edit_from_any_state_replaces_draft() {
        let mut form = TaskFormController::new();
        form.open_for_create();
        form.update_draft_field(DraftField::Title, "unsaved")
            .expect("edit title");
        form.open_for_edit(&sample(false));
        assert_eq!(form.draft().title, "Water plants");
    }

    #[test]
    fn closed_form_rejects_field_edits() {
        let mut form = TaskFormController::new();
        assert_eq!(
            form.update_draft_field(DraftField::Description, "x"),
            Err(FormError::Closed)
        );
    }

    #[test]
    fn whitespace_title_is_invalid() {
        assert_eq!(
            ValidDraft::new("   ", "desc"),
            Err(ValidationError::EmptyTitle)
        );
        let valid = ValidDraft::new(" Buy milk ", "").expect("valid title");
        assert_eq!(valid.title(), " Buy milk ");
    }
}
