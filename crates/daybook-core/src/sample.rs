use anyhow::Context;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};

use crate::datetime::{days_in_month, local_to_utc_after_gap};
use crate::event::CalendarEvent;
use crate::store::TaskStore;
use crate::task::{Priority, Task};

/// Demonstration tasks, timed relative to `now`.
pub fn sample_tasks(now: DateTime<Utc>) -> Vec<Task> {
    let day = Duration::days(1);
    vec![
        Task {
            id: "1".to_string(),
            title: "Review project proposals".to_string(),
            description: Some("Go through the Q4 project proposals and provide feedback".to_string()),
            completed: false,
            priority: Priority::High,
            due_date: Some(now + day * 2),
            tags: vec!["work".to_string(), "review".to_string()],
            created_at: now - day,
            updated_at: now - day,
        },
        Task {
            id: "2".to_string(),
            title: "Book dentist appointment".to_string(),
            description: None,
            completed: false,
            priority: Priority::Medium,
            due_date: None,
            tags: vec!["personal".to_string(), "health".to_string()],
            created_at: now - day * 3,
            updated_at: now - day * 3,
        },
        Task {
            id: "3".to_string(),
            title: "Update portfolio website".to_string(),
            description: Some("Add the latest projects and update the design".to_string()),
            completed: true,
            priority: Priority::Low,
            due_date: None,
            tags: vec!["personal".to_string(), "development".to_string()],
            created_at: now - day * 7,
            updated_at: now - day,
        },
        Task {
            id: "4".to_string(),
            title: "Team standup meeting".to_string(),
            description: None,
            completed: false,
            priority: Priority::High,
            due_date: Some(now + Duration::hours(1)),
            tags: vec!["work".to_string(), "meeting".to_string()],
            created_at: now - day,
            updated_at: now - day,
        },
    ]
}

pub fn sample_task_store(now: DateTime<Utc>) -> anyhow::Result<TaskStore> {
    TaskStore::with_tasks(sample_tasks(now)).context("sample tasks must have unique ids")
}

struct EventSeed {
    id: &'static str,
    title: &'static str,
    day: u32,
    start: (u32, u32),
    minutes: i64,
    color: &'static str,
    description: Option<&'static str>,
}

const EVENT_SEEDS: [EventSeed; 7] = [
    EventSeed {
        id: "1",
        title: "Team Meeting",
        day: 15,
        start: (10, 0),
        minutes: 60,
        color: "#6366f1",
        description: Some("Weekly team sync meeting"),
    },
    EventSeed {
        id: "2",
        title: "Project Review",
        day: 16,
        start: (14, 0),
        minutes: 90,
        color: "#10b981",
        description: None,
    },
    EventSeed {
        id: "3",
        title: "Lunch with Client",
        day: 18,
        start: (12, 0),
        minutes: 90,
        color: "#f59e0b",
        description: None,
    },
    EventSeed {
        id: "4",
        title: "Conference Call",
        day: 20,
        start: (16, 0),
        minutes: 60,
        color: "#8b5cf6",
        description: None,
    },
    EventSeed {
        id: "5",
        title: "Design Critique",
        day: 15,
        start: (13, 0),
        minutes: 45,
        color: "#ec4899",
        description: None,
    },
    EventSeed {
        id: "6",
        title: "1:1 with Manager",
        day: 15,
        start: (15, 30),
        minutes: 30,
        color: "#6366f1",
        description: None,
    },
    EventSeed {
        id: "7",
        title: "Quarterly Planning",
        day: 15,
        start: (17, 0),
        minutes: 60,
        color: "#10b981",
        description: Some("Roadmap for next quarter"),
    },
];

/// Demonstration events in the month containing `today`. Days past the end
/// of a short month are clamped to its last day.
pub fn sample_events(today: NaiveDate) -> anyhow::Result<Vec<CalendarEvent>> {
    let last_day = days_in_month(today.year(), today.month());
    let mut events = Vec::with_capacity(EVENT_SEEDS.len() + 1);

    for seed in &EVENT_SEEDS {
        let date = NaiveDate::from_ymd_opt(today.year(), today.month(), seed.day.min(last_day))
            .context("sample event date out of range")?;
        let start_local = date
            .and_hms_opt(seed.start.0, seed.start.1, 0)
            .context("sample event time out of range")?;
        let start = local_to_utc_after_gap(start_local, seed.title)?;
        events.push(CalendarEvent {
            id: seed.id.to_string(),
            title: seed.title.to_string(),
            start,
            end: start + Duration::minutes(seed.minutes),
            color: Some(seed.color.to_string()),
            description: seed.description.map(str::to_string),
            all_day: false,
        });
    }

    let offsite_day = NaiveDate::from_ymd_opt(today.year(), today.month(), 22.min(last_day))
        .context("sample event date out of range")?;
    let offsite_start = local_to_utc_after_gap(
        offsite_day
            .and_hms_opt(0, 0, 0)
            .context("sample event time out of range")?,
        "Team Offsite",
    )?;
    events.push(CalendarEvent {
        id: "8".to_string(),
        title: "Team Offsite".to_string(),
        start: offsite_start,
        end: offsite_start + Duration::days(3),
        color: Some("#ef4444".to_string()),
        description: Some("Three days away; shown on the first day only".to_string()),
        all_day: true,
    });

    Ok(events)
}
