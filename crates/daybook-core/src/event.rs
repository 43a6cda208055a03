use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::datetime::to_local_date;

pub const DEFAULT_EVENT_COLOR: &str = "#6366f1";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub all_day: bool,
}

impl CalendarEvent {
    pub fn color(&self) -> &str {
        self.color.as_deref().unwrap_or(DEFAULT_EVENT_COLOR)
    }

    /// Placement is by start date only; multi-day events are not spanned.
    pub fn starts_on(&self, day: NaiveDate) -> bool {
        to_local_date(self.start) == day
    }
}

/// Read-only event collection.
#[derive(Debug, Clone, Default)]
pub struct EventStore {
    events: Vec<CalendarEvent>,
}

impl EventStore {
    pub fn new(events: Vec<CalendarEvent>) -> Self {
        Self { events }
    }

    pub fn all(&self) -> &[CalendarEvent] {
        &self.events
    }

    pub fn get(&self, id: &str) -> Option<&CalendarEvent> {
        self.events.iter().find(|event| event.id == id)
    }

    pub fn on_day(&self, day: NaiveDate) -> Vec<&CalendarEvent> {
        self.events
            .iter()
            .filter(|event| event.starts_on(day))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

    use super::{CalendarEvent, DEFAULT_EVENT_COLOR, EventStore};
    use crate::datetime::{add_days, to_local_date};

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0)
            .single()
            .expect("valid datetime")
    }

    fn event(id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> CalendarEvent {
        CalendarEvent {
            id: id.to_string(),
            title: format!("event {id}"),
            start,
            end,
            color: None,
            description: None,
            all_day: false,
        }
    }

    #[test]
    fn multi_day_event_only_lands_on_start_day() {
        let start = at(2026, 10, 15, 12);
        let store = EventStore::new(vec![event("trip", start, start + Duration::days(3))]);
        let day = to_local_date(start);

        assert_eq!(store.on_day(day).len(), 1);
        assert!(store.on_day(add_days(day, -1)).is_empty());
        assert!(store.on_day(add_days(day, 1)).is_empty());
        assert!(store.on_day(add_days(day, 3)).is_empty());
    }

    #[test]
    fn on_day_keeps_store_order() {
        let store = EventStore::new(vec![
            event("b", at(2026, 10, 15, 15), at(2026, 10, 15, 16)),
            event("a", at(2026, 10, 15, 9), at(2026, 10, 15, 10)),
        ]);
        let day = NaiveDate::from_ymd_opt(2026, 10, 15).expect("valid date");
        let ids: Vec<&str> = store.on_day(day).iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn color_falls_back_to_accent() {
        let mut ev = event("x", at(2026, 1, 1, 9), at(2026, 1, 1, 10));
        assert_eq!(ev.color(), DEFAULT_EVENT_COLOR);
        ev.color = Some("#10b981".to_string());
        assert_eq!(ev.color(), "#10b981");
    }
}
