use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub type TaskId = String;

#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub fn all() -> [Self; 3] {
        [Self::Low, Self::Medium, Self::High]
    }

    pub fn as_key(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim().to_ascii_lowercase().as_str() {
            "low" | "l" => Some(Self::Low),
            "medium" | "med" | "m" => Some(Self::Medium),
            "high" | "h" => Some(Self::High),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TaskError {
    #[error("task title cannot be empty")]
    EmptyTitle,
    #[error("task id already exists: {0}")]
    DuplicateId(TaskId),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub completed: bool,

    pub priority: Priority,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub tags: Vec<String>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Builds a fresh, incomplete task. The draft is expected to have been
    /// through [`TaskDraft::validated`].
    pub fn from_draft(id: TaskId, draft: TaskDraft, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: draft.title,
            description: draft.description,
            completed: false,
            priority: draft.priority,
            due_date: draft.due_date,
            tags: draft.tags,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.completed && self.due_date.map(|due| due < now).unwrap_or(false)
    }
}

/// The caller-supplied part of a task; id and timestamps are assigned by the
/// store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_due(mut self, due: Option<DateTime<Utc>>) -> Self {
        self.due_date = due;
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Trims text fields and rejects a blank title.
    pub fn validated(self) -> Result<Self, TaskError> {
        let title = self.title.trim().to_string();
        if title.is_empty() {
            return Err(TaskError::EmptyTitle);
        }

        let description = self
            .description
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty());

        let mut tags: Vec<String> = Vec::with_capacity(self.tags.len());
        for tag in self.tags {
            let tag = tag.trim().trim_start_matches('#').to_string();
            if !tag.is_empty() && !tags.contains(&tag) {
                tags.push(tag);
            }
        }

        Ok(Self {
            title,
            description,
            priority: self.priority,
            due_date: self.due_date,
            tags,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{Priority, Task, TaskDraft, TaskError};

    #[test]
    fn priority_orders_low_to_high() {
        assert!(Priority::Low < Priority::Medium);
        assert!(Priority::Medium < Priority::High);
        assert_eq!(Priority::default(), Priority::Medium);
        assert_eq!(Priority::from_key(" HIGH "), Some(Priority::High));
        assert_eq!(Priority::from_key("urgent"), None);
    }

    #[test]
    fn blank_title_is_rejected() {
        assert_eq!(
            TaskDraft::new("   \t").validated(),
            Err(TaskError::EmptyTitle)
        );
    }

    #[test]
    fn validation_trims_and_dedups() {
        let draft = TaskDraft::new("  Write notes ")
            .with_description("  ")
            .with_tags(["work", "#work", " ", "review"])
            .validated()
            .expect("valid draft");
        assert_eq!(draft.title, "Write notes");
        assert_eq!(draft.description, None);
        assert_eq!(draft.tags, vec!["work".to_string(), "review".to_string()]);
    }

    #[test]
    fn overdue_only_when_incomplete() {
        let now = Utc
            .with_ymd_and_hms(2026, 10, 16, 9, 0, 0)
            .single()
            .expect("valid now");
        let draft = TaskDraft::new("File report").with_due(Some(now - Duration::hours(1)));
        let mut task = Task::from_draft("t1".to_string(), draft, now - Duration::days(1));
        assert!(task.is_overdue(now));
        task.completed = true;
        assert!(!task.is_overdue(now));
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let now = Utc
            .with_ymd_and_hms(2026, 10, 16, 9, 0, 0)
            .single()
            .expect("valid now");
        let task = Task::from_draft("t1".to_string(), TaskDraft::new("Ship"), now);
        let value = serde_json::to_value(&task).expect("serialize task");
        assert_eq!(value["priority"], "medium");
        assert!(value.get("createdAt").is_some());
        assert!(value.get("dueDate").is_none());
    }
}
