use anyhow::anyhow;
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, instrument};

use crate::calendar::{CalendarRender, CalendarState, CalendarViewMode, NavDirection};
use crate::config::Config;
use crate::datetime::today;
use crate::event::EventStore;
use crate::filter::{PriorityFilter, TaskFilter, display_order};
use crate::form::NewTaskForm;
use crate::sample::{sample_events, sample_task_store};
use crate::session::{
    AuthAction, AuthControl, AuthError, AuthOutcome, AuthTicket, IdentityProvider, Session,
    SessionGate,
};
use crate::sidebar::{AppView, MainContent, NavSection, SidebarState, default_sections};
use crate::store::TaskStore;
use crate::task::{Task, TaskDraft, TaskError, TaskId};

/// Top-level screen chosen by the session gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    SignIn,
    App(MainContent),
}

/// Snapshot of the transient view state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ViewState {
    pub active_view: AppView,
    pub selected_date: NaiveDate,
    pub calendar_view_mode: CalendarViewMode,
    pub sidebar_collapsed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkspaceSettings {
    pub active_view: AppView,
    pub calendar_mode: CalendarViewMode,
    pub show_weekends: bool,
    pub sidebar_collapsed: bool,
    pub filter: TaskFilter,
    pub sample_data: bool,
}

impl Default for WorkspaceSettings {
    fn default() -> Self {
        Self {
            active_view: AppView::Calendar,
            calendar_mode: CalendarViewMode::Month,
            show_weekends: true,
            sidebar_collapsed: false,
            filter: TaskFilter::default(),
            sample_data: true,
        }
    }
}

impl WorkspaceSettings {
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let defaults = Self::default();

        let active_view = match cfg.get("default.view") {
            Some(key) => AppView::from_key(&key)
                .ok_or_else(|| anyhow!("invalid default.view: {key}"))?,
            None => defaults.active_view,
        };
        let calendar_mode = match cfg.get("calendar.view") {
            Some(key) => CalendarViewMode::from_key(&key)
                .ok_or_else(|| anyhow!("invalid calendar.view: {key}"))?,
            None => defaults.calendar_mode,
        };
        let priority = match cfg.get("tasks.priority") {
            Some(raw) => PriorityFilter::parse(&raw)?,
            None => defaults.filter.priority,
        };

        Ok(Self {
            active_view,
            calendar_mode,
            show_weekends: cfg
                .get_bool("calendar.show_weekends")
                .unwrap_or(defaults.show_weekends),
            sidebar_collapsed: cfg
                .get_bool("sidebar.collapsed")
                .unwrap_or(defaults.sidebar_collapsed),
            filter: TaskFilter {
                show_completed: cfg
                    .get_bool("tasks.show_completed")
                    .unwrap_or(defaults.filter.show_completed),
                priority,
            },
            sample_data: cfg.get_bool("sample.data").unwrap_or(defaults.sample_data),
        })
    }
}

/// The page shell: owns the stores and all view state, and consults the
/// session gate before anything protected is shown.
#[derive(Debug, Clone)]
pub struct Workspace {
    gate: SessionGate,
    auth: AuthControl,
    sidebar: SidebarState,
    calendar: CalendarState,
    tasks: TaskStore,
    events: EventStore,
    filter: TaskFilter,
    form: NewTaskForm,
    selected_date: NaiveDate,
}

impl Workspace {
    pub fn new(
        settings: WorkspaceSettings,
        tasks: TaskStore,
        events: EventStore,
        today: NaiveDate,
    ) -> Self {
        Self {
            gate: SessionGate::new(),
            auth: AuthControl::new(),
            sidebar: SidebarState::new(settings.active_view, settings.sidebar_collapsed),
            calendar: CalendarState::new(today)
                .with_mode(settings.calendar_mode)
                .with_weekends(settings.show_weekends),
            tasks,
            events,
            filter: settings.filter,
            form: NewTaskForm::new(),
            selected_date: today,
        }
    }

    #[instrument(skip(settings, now))]
    pub fn with_sample_data(settings: WorkspaceSettings, now: DateTime<Utc>) -> anyhow::Result<Self> {
        let today = today(now);
        let (tasks, events) = if settings.sample_data {
            (
                sample_task_store(now)?,
                EventStore::new(sample_events(today)?),
            )
        } else {
            (TaskStore::new(), EventStore::default())
        };
        info!(
            tasks = tasks.len(),
            events = events.len(),
            "workspace ready"
        );
        Ok(Self::new(settings, tasks, events, today))
    }

    pub fn screen(&self) -> Screen {
        if self.gate.is_authenticated() {
            Screen::App(self.sidebar.active().content())
        } else {
            Screen::SignIn
        }
    }

    pub fn view_state(&self) -> ViewState {
        ViewState {
            active_view: self.sidebar.active(),
            selected_date: self.selected_date,
            calendar_view_mode: self.calendar.mode(),
            sidebar_collapsed: self.sidebar.is_collapsed(),
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.gate.session()
    }

    pub fn gate(&self) -> &SessionGate {
        &self.gate
    }

    pub fn auth(&self) -> &AuthControl {
        &self.auth
    }

    pub fn sidebar(&self) -> &SidebarState {
        &self.sidebar
    }

    pub fn sidebar_mut(&mut self) -> &mut SidebarState {
        &mut self.sidebar
    }

    pub fn calendar(&self) -> &CalendarState {
        &self.calendar
    }

    pub fn tasks(&self) -> &TaskStore {
        &self.tasks
    }

    pub fn events(&self) -> &EventStore {
        &self.events
    }

    pub fn filter(&self) -> &TaskFilter {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut TaskFilter {
        &mut self.filter
    }

    pub fn form(&self) -> &NewTaskForm {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut NewTaskForm {
        &mut self.form
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.selected_date
    }

    pub fn nav_sections(&self) -> Vec<NavSection> {
        default_sections(self.tasks.open_count())
    }

    pub fn visible_tasks(&self) -> Vec<&Task> {
        display_order(self.tasks.tasks(), &self.filter)
    }

    pub fn calendar_render(&self, today: NaiveDate) -> CalendarRender<'_> {
        self.calendar.render(&self.events, today)
    }

    pub fn navigate(&mut self, direction: NavDirection) -> NaiveDate {
        self.calendar.navigate(direction)
    }

    pub fn select_date(&mut self, date: NaiveDate) {
        let host = &mut self.selected_date;
        self.calendar.select_date(date, |picked| *host = picked);
    }

    pub fn jump_to_today(&mut self, today: NaiveDate) {
        let host = &mut self.selected_date;
        self.calendar.jump_to_today(today, |picked| *host = picked);
    }

    pub fn change_view_mode(&mut self, mode: CalendarViewMode) -> bool {
        self.calendar.change_view_mode(mode)
    }

    pub fn toggle_task(&mut self, id: &str, now: DateTime<Utc>) -> bool {
        self.tasks.toggle(id, now)
    }

    pub fn delete_task(&mut self, id: &str) -> Option<Task> {
        self.tasks.delete(id)
    }

    /// Submits the creation form against the task store.
    pub fn submit_form(&mut self, now: DateTime<Utc>) -> Result<TaskId, TaskError> {
        self.form.submit(&mut self.tasks, now)
    }

    /// Creates a task directly, leaving the form untouched.
    pub fn create_task(&mut self, draft: TaskDraft, now: DateTime<Utc>) -> Result<TaskId, TaskError> {
        self.tasks.create(draft, now).map(|task| task.id.clone())
    }

    /// Opens the gate if the provider already holds a session.
    pub fn refresh_session<P: IdentityProvider>(&mut self, provider: &P) -> bool {
        self.gate.refresh(provider)
    }

    /// Marks an auth action as outstanding so renders show the loading state.
    /// Returns None while another action is pending.
    pub fn begin_auth(&mut self, action: AuthAction) -> Option<AuthTicket> {
        self.auth.begin(action)
    }

    pub fn finish_sign_in(
        &mut self,
        ticket: AuthTicket,
        result: Result<Session, AuthError>,
    ) -> AuthOutcome {
        let outcome = self.auth.finish_sign_in(ticket, result, &mut self.gate);
        debug!(?outcome, "sign in finished");
        outcome
    }

    /// Closes the gate on success. Stores are kept for the lifetime of the process.
    pub fn finish_sign_out(&mut self, ticket: AuthTicket, result: Result<(), AuthError>) -> AuthOutcome {
        let outcome = self.auth.finish_sign_out(ticket, result, &mut self.gate);
        debug!(?outcome, "sign out finished");
        outcome
    }
}
