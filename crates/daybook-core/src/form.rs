use chrono::{DateTime, Utc};
use tracing::debug;

use crate::store::TaskStore;
use crate::task::{Priority, TaskDraft, TaskError, TaskId};

/// Inline "Add Task" form state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTaskForm {
    open: bool,
    title: String,
    priority: Priority,
}

impl NewTaskForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn toggle_open(&mut self) -> bool {
        self.open = !self.open;
        self.open
    }

    /// Closes without clearing what was typed.
    pub fn cancel(&mut self) {
        self.open = false;
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }

    pub fn draft(&self) -> TaskDraft {
        TaskDraft::new(self.title.clone()).with_priority(self.priority)
    }

    pub fn submit(&mut self, store: &mut TaskStore, now: DateTime<Utc>) -> Result<TaskId, TaskError> {
        let draft = self.draft();
        self.submit_draft(store, draft, now)
    }

    /// On success the title clears and the form closes; on failure the form
    /// stays open with its input intact.
    pub fn submit_draft(
        &mut self,
        store: &mut TaskStore,
        draft: TaskDraft,
        now: DateTime<Utc>,
    ) -> Result<TaskId, TaskError> {
        match store.create(draft, now) {
            Ok(task) => {
                let id = task.id.clone();
                self.title.clear();
                self.open = false;
                Ok(id)
            }
            Err(err) => {
                debug!(error = %err, "task form submission rejected");
                self.open = true;
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::NewTaskForm;
    use crate::store::TaskStore;
    use crate::task::{Priority, TaskError};

    #[test]
    fn blank_title_keeps_form_open_and_store_empty() {
        let mut store = TaskStore::new();
        let mut form = NewTaskForm::new();
        form.open();
        form.set_title("   ");

        assert_eq!(form.submit(&mut store, Utc::now()), Err(TaskError::EmptyTitle));
        assert!(form.is_open());
        assert_eq!(form.title(), "   ");
        assert!(store.is_empty());
    }

    #[test]
    fn successful_submit_resets_title_and_closes() {
        let mut store = TaskStore::new();
        let mut form = NewTaskForm::new();
        assert!(form.toggle_open());
        form.set_title("  Call the bank ");
        form.set_priority(Priority::High);

        let id = form.submit(&mut store, Utc::now()).expect("submit");
        let task = store.get(&id).expect("created task");
        assert_eq!(task.title, "Call the bank");
        assert_eq!(task.priority, Priority::High);
        assert!(task.tags.is_empty());
        assert!(!form.is_open());
        assert_eq!(form.title(), "");
        assert_eq!(form.priority(), Priority::High);
    }

    #[test]
    fn cancel_keeps_typed_title() {
        let mut form = NewTaskForm::new();
        form.open();
        form.set_title("draft");
        form.cancel();
        assert!(!form.is_open());
        assert_eq!(form.title(), "draft");
    }
}
