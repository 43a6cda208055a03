use chrono::{
  Datelike,
  NaiveDate
};
use tracing::{
  debug,
  info
};

use crate::datetime::{
  grid_for,
  is_same_day,
  is_today,
  is_weekend,
  shift_months
};
use crate::event::{
  CalendarEvent,
  EventStore
};

pub const MAX_VISIBLE_EVENTS: usize = 3;

pub const WEEKDAY_LABELS: [&str; 7] = [
  "Sun", "Mon", "Tue", "Wed", "Thu",
  "Fri", "Sat"
];

#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
)]
pub enum CalendarViewMode {
  #[default]
  Month,
  Week,
  Day,
  Agenda
}

impl CalendarViewMode {
  pub fn all() -> [Self; 4] {
    [
      Self::Month,
      Self::Week,
      Self::Day,
      Self::Agenda
    ]
  }

  pub fn as_key(self) -> &'static str {
    match self {
      | Self::Month => "month",
      | Self::Week => "week",
      | Self::Day => "day",
      | Self::Agenda => "agenda"
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      | Self::Month => "Month",
      | Self::Week => "Week",
      | Self::Day => "Day",
      | Self::Agenda => "Agenda"
    }
  }

  pub fn from_key(
    key: &str
  ) -> Option<Self> {
    match key
      .trim()
      .to_ascii_lowercase()
      .as_str()
    {
      | "month" => Some(Self::Month),
      | "week" => Some(Self::Week),
      | "day" => Some(Self::Day),
      | "agenda" => Some(Self::Agenda),
      | _ => None
    }
  }

  pub fn is_implemented(self) -> bool {
    matches!(self, Self::Month)
  }
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq,
)]
pub enum NavDirection {
  Prev,
  Next
}

impl NavDirection {
  fn step(self) -> i32 {
    match self {
      | Self::Prev => -1,
      | Self::Next => 1
    }
  }
}

/// What the calendar shows for its
/// current mode.
#[derive(Debug, Clone, PartialEq)]
pub enum CalendarRender<'a> {
  Month(MonthView<'a>),
  NotImplemented {
    mode:  CalendarViewMode,
    title: String
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthView<'a> {
  pub title:    String,
  pub weekdays: Vec<&'static str>,
  pub days:     Vec<DayCell<'a>>
}

impl<'a> MonthView<'a> {
  pub fn columns(&self) -> usize {
    self.weekdays.len()
  }

  pub fn weeks(
    &self
  ) -> impl Iterator<Item = &[DayCell<'a>]>
  {
    self.days.chunks(self.columns().max(1))
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayCell<'a> {
  pub date:             NaiveDate,
  pub in_current_month: bool,
  pub is_today:         bool,
  pub is_selected:      bool,
  pub is_weekend:       bool,
  pub events:           Vec<&'a CalendarEvent>,
  pub overflow:         usize
}

/// Calendar navigation state. `focus`
/// picks the visible month; `selected`
/// is the highlighted day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarState {
  focus:         NaiveDate,
  selected:      NaiveDate,
  mode:          CalendarViewMode,
  show_weekends: bool
}

impl CalendarState {
  pub fn new(
    selected: NaiveDate
  ) -> Self {
    Self {
      focus: selected,
      selected,
      mode: CalendarViewMode::Month,
      show_weekends: true
    }
  }

  pub fn with_mode(
    mut self,
    mode: CalendarViewMode
  ) -> Self {
    self.mode = mode;
    self
  }

  pub fn with_weekends(
    mut self,
    show_weekends: bool
  ) -> Self {
    self.show_weekends = show_weekends;
    self
  }

  pub fn focus(&self) -> NaiveDate {
    self.focus
  }

  pub fn selected(&self) -> NaiveDate {
    self.selected
  }

  pub fn mode(
    &self
  ) -> CalendarViewMode {
    self.mode
  }

  pub fn show_weekends(&self) -> bool {
    self.show_weekends
  }

  /// Shifts the visible month, keeping
  /// the day where the target month has
  /// it.
  pub fn navigate(
    &mut self,
    direction: NavDirection
  ) -> NaiveDate {
    self.focus = shift_months(
      self.focus,
      direction.step()
    );
    debug!(
      ?direction,
      focus = %self.focus,
      "navigated calendar"
    );
    self.focus
  }

  pub fn select_date<F>(
    &mut self,
    date: NaiveDate,
    on_select: F
  ) where
    F: FnOnce(NaiveDate)
  {
    self.focus = date;
    self.selected = date;
    debug!(selected = %date, "selected date");
    on_select(date);
  }

  pub fn jump_to_today<F>(
    &mut self,
    today: NaiveDate,
    on_select: F
  ) where
    F: FnOnce(NaiveDate)
  {
    self.select_date(today, on_select);
  }

  /// Returns true when the mode changed.
  pub fn change_view_mode(
    &mut self,
    mode: CalendarViewMode
  ) -> bool {
    if self.mode == mode {
      return false;
    }
    if !mode.is_implemented() {
      info!(
        mode = mode.as_key(),
        "calendar view mode has no renderer yet"
      );
    }
    self.mode = mode;
    true
  }

  pub fn title(&self) -> String {
    match self.mode {
      | CalendarViewMode::Month => {
        self
          .focus
          .format("%B %Y")
          .to_string()
      }
      | _ => {
        self
          .focus
          .format("%A, %B %-d, %Y")
          .to_string()
      }
    }
  }

  pub fn render<'a>(
    &self,
    events: &'a EventStore,
    today: NaiveDate
  ) -> CalendarRender<'a> {
    match self.mode {
      | CalendarViewMode::Month => {
        CalendarRender::Month(
          self.month_view(events, today)
        )
      }
      | mode => {
        CalendarRender::NotImplemented {
          mode,
          title: self.title()
        }
      }
    }
  }

  fn month_view<'a>(
    &self,
    events: &'a EventStore,
    today: NaiveDate
  ) -> MonthView<'a> {
    let weekdays = WEEKDAY_LABELS
      .iter()
      .enumerate()
      .filter(|(idx, _)| {
        self.show_weekends
          || (*idx != 0 && *idx != 6)
      })
      .map(|(_, label)| *label)
      .collect();

    let days = grid_for(self.focus)
      .into_iter()
      .filter(|date| {
        self.show_weekends
          || !is_weekend(*date)
      })
      .map(|date| {
        let mut on_day =
          events.on_day(date);
        let overflow = on_day
          .len()
          .saturating_sub(
            MAX_VISIBLE_EVENTS
          );
        on_day
          .truncate(MAX_VISIBLE_EVENTS);
        DayCell {
          date,
          in_current_month: date.month()
            == self.focus.month()
            && date.year()
              == self.focus.year(),
          is_today: is_today(date, today),
          is_selected: is_same_day(
            date,
            self.selected
          ),
          is_weekend: is_weekend(date),
          events: on_day,
          overflow
        }
      })
      .collect();

    MonthView {
      title: self.title(),
      weekdays,
      days
    }
  }
}
