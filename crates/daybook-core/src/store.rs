use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::task::{Task, TaskDraft, TaskError, TaskId};

const TASK_ID_LEN: usize = 8;

/// In-memory task collection. Insertion order is authoritative; display order
/// is derived by [`crate::filter::display_order`].
#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks<I>(tasks: I) -> Result<Self, TaskError>
    where
        I: IntoIterator<Item = Task>,
    {
        let mut store = Self::new();
        for task in tasks {
            store.insert_existing(task)?;
        }
        Ok(store)
    }

    /// Appends an already-built task, keeping ids unique and
    /// `created_at <= updated_at`.
    pub fn insert_existing(&mut self, mut task: Task) -> Result<(), TaskError> {
        if self.contains(&task.id) {
            return Err(TaskError::DuplicateId(task.id));
        }
        if task.updated_at < task.created_at {
            debug!(id = %task.id, "clamping updated_at to created_at");
            task.updated_at = task.created_at;
        }
        self.tasks.push(task);
        Ok(())
    }

    #[instrument(skip(self, draft, now))]
    pub fn create(&mut self, draft: TaskDraft, now: DateTime<Utc>) -> Result<&Task, TaskError> {
        let draft = draft.validated()?;
        let id = self.fresh_id();
        let task = Task::from_draft(id, draft, now);

        info!(id = %task.id, title = %task.title, priority = task.priority.as_key(), "created task");
        self.tasks.insert(0, task);
        Ok(&self.tasks[0])
    }

    /// Flips completion. `updated_at` always moves forward, even when `now`
    /// has not. Returns false when no task has `id`.
    #[instrument(skip(self, now))]
    pub fn toggle(&mut self, id: &str, now: DateTime<Utc>) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == id) else {
            debug!("toggle ignored; no such task");
            return false;
        };

        task.completed = !task.completed;
        task.updated_at = advance(task.updated_at, now);
        info!(completed = task.completed, "toggled task");
        true
    }

    #[instrument(skip(self))]
    pub fn delete(&mut self, id: &str) -> Option<Task> {
        let idx = self.tasks.iter().position(|task| task.id == id)?;
        let removed = self.tasks.remove(idx);
        info!(title = %removed.title, "deleted task");
        Some(removed)
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn completed_count(&self) -> usize {
        self.tasks.iter().filter(|task| task.completed).count()
    }

    pub fn open_count(&self) -> usize {
        self.len() - self.completed_count()
    }

    fn fresh_id(&self) -> TaskId {
        loop {
            let candidate: String = Uuid::new_v4()
                .simple()
                .to_string()
                .chars()
                .take(TASK_ID_LEN)
                .collect();
            if !self.contains(&candidate) {
                return candidate;
            }
            debug!(id = %candidate, "generated id collided; retrying");
        }
    }
}

fn advance(previous: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
    let floor = previous + Duration::milliseconds(1);
    if now >= floor { now } else { floor }
}
