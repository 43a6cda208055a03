use std::cmp::Ordering;

use anyhow::anyhow;
use tracing::trace;

use crate::task::{
  Priority,
  Task
};

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
)]
pub enum PriorityFilter {
  #[default]
  All,
  Only(Priority)
}

impl PriorityFilter {
  pub fn parse(
    raw: &str
  ) -> anyhow::Result<Self> {
    let trimmed = raw.trim();
    if trimmed
      .eq_ignore_ascii_case("all")
    {
      return Ok(Self::All);
    }

    Priority::from_key(trimmed)
      .map(Self::Only)
      .ok_or_else(|| {
        anyhow!(
          "invalid priority filter: \
           {trimmed} (expected all, \
           low, medium or high)"
        )
      })
  }

  pub fn as_key(self) -> &'static str {
    match self {
      | Self::All => "all",
      | Self::Only(priority) => {
        priority.as_key()
      }
    }
  }

  fn admits(
    self,
    priority: Priority
  ) -> bool {
    match self {
      | Self::All => true,
      | Self::Only(wanted) => {
        wanted == priority
      }
    }
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub struct TaskFilter {
  pub show_completed: bool,
  pub priority:       PriorityFilter
}

impl Default for TaskFilter {
  fn default() -> Self {
    Self {
      show_completed: true,
      priority:       PriorityFilter::All
    }
  }
}

impl TaskFilter {
  pub fn matches(
    &self,
    task: &Task
  ) -> bool {
    if !self.show_completed
      && task.completed
    {
      return false;
    }
    self.priority.admits(task.priority)
  }
}

/// Incomplete first, then high to low
/// priority, then soonest due (undated
/// last), then newest.
pub fn compare_for_display(
  a: &Task,
  b: &Task
) -> Ordering {
  a.completed
    .cmp(&b.completed)
    .then_with(|| {
      b.priority.cmp(&a.priority)
    })
    .then_with(|| {
      match (a.due_date, b.due_date) {
        | (Some(x), Some(y)) => x.cmp(&y),
        | (Some(_), None) => {
          Ordering::Less
        }
        | (None, Some(_)) => {
          Ordering::Greater
        }
        | (None, None) => {
          Ordering::Equal
        }
      }
    })
    .then_with(|| {
      b.created_at.cmp(&a.created_at)
    })
}

/// Filters, then stable-sorts. Recomputed
/// on every render; the store order is
/// never touched.
#[tracing::instrument(skip(
  tasks, filter
))]
pub fn display_order<'a>(
  tasks: &'a [Task],
  filter: &TaskFilter
) -> Vec<&'a Task> {
  let mut visible: Vec<&Task> = tasks
    .iter()
    .filter(|task| filter.matches(task))
    .collect();
  visible.sort_by(|a, b| {
    compare_for_display(a, b)
  });

  trace!(
    total = tasks.len(),
    visible = visible.len(),
    show_completed = filter.show_completed,
    priority = filter.priority.as_key(),
    "computed display order"
  );
  visible
}

#[cfg(test)]
mod tests {
  use chrono::{
    DateTime,
    Duration,
    TimeZone,
    Utc
  };

  use super::{
    PriorityFilter,
    TaskFilter,
    display_order
  };
  use crate::task::{
    Priority,
    Task,
    TaskDraft
  };

  fn base() -> DateTime<Utc> {
    Utc
      .with_ymd_and_hms(
        2026, 10, 16, 9, 0, 0
      )
      .single()
      .expect("valid now")
  }

  fn task(
    id: &str,
    completed: bool,
    priority: Priority
  ) -> Task {
    let mut task = Task::from_draft(
      id.to_string(),
      TaskDraft::new(id)
        .with_priority(priority),
      base()
    );
    task.completed = completed;
    task
  }

  fn ids(tasks: &[&Task]) -> Vec<String> {
    tasks
      .iter()
      .map(|t| t.id.clone())
      .collect()
  }

  #[test]
  fn completion_then_priority() {
    let tasks = vec![
      task("A", true, Priority::High),
      task("B", false, Priority::Low),
      task("C", false, Priority::High),
    ];
    let ordered = display_order(
      &tasks,
      &TaskFilter::default()
    );
    assert_eq!(
      ids(&ordered),
      vec!["C", "B", "A"]
    );
  }

  #[test]
  fn dated_before_undated_then_newest()
  {
    let mut undated_old =
      task("old", false, Priority::Medium);
    undated_old.created_at =
      base() - Duration::days(3);
    let undated_new =
      task("new", false, Priority::Medium);
    let mut due_late =
      task("late", false, Priority::Medium);
    due_late.due_date =
      Some(base() + Duration::days(5));
    let mut due_soon =
      task("soon", false, Priority::Medium);
    due_soon.due_date =
      Some(base() + Duration::hours(1));

    let tasks = vec![
      undated_old,
      due_late,
      undated_new,
      due_soon,
    ];
    let ordered = display_order(
      &tasks,
      &TaskFilter::default()
    );
    assert_eq!(
      ids(&ordered),
      vec!["soon", "late", "new", "old"]
    );
  }

  #[test]
  fn full_ties_keep_store_order() {
    let tasks = vec![
      task("x", false, Priority::Low),
      task("y", false, Priority::Low),
      task("z", false, Priority::Low),
    ];
    let ordered = display_order(
      &tasks,
      &TaskFilter::default()
    );
    assert_eq!(
      ids(&ordered),
      vec!["x", "y", "z"]
    );
  }

  #[test]
  fn filters_apply_before_sorting() {
    let tasks = vec![
      task("A", true, Priority::High),
      task("B", false, Priority::Low),
      task("C", false, Priority::High),
    ];

    let hide_done = TaskFilter {
      show_completed: false,
      ..TaskFilter::default()
    };
    assert_eq!(
      ids(&display_order(
        &tasks, &hide_done
      )),
      vec!["C", "B"]
    );

    let only_high = TaskFilter {
      priority: PriorityFilter::Only(
        Priority::High
      ),
      ..TaskFilter::default()
    };
    assert_eq!(
      ids(&display_order(
        &tasks, &only_high
      )),
      vec!["C", "A"]
    );
  }

  #[test]
  fn parses_priority_filter() {
    assert_eq!(
      PriorityFilter::parse("ALL")
        .expect("all"),
      PriorityFilter::All
    );
    assert_eq!(
      PriorityFilter::parse("low")
        .expect("low"),
      PriorityFilter::Only(
        Priority::Low
      )
    );
    assert!(
      PriorityFilter::parse("urgent")
        .is_err()
    );
  }
}
