use std::io::{self, IsTerminal, Write};

use anyhow::anyhow;
use chrono::{DateTime, Datelike, Utc};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::calendar::{CalendarRender, CalendarViewMode, DayCell, MonthView};
use crate::config::Config;
use crate::datetime::{format_due, format_local_date, format_local_time, format_relative_time, today};
use crate::event::CalendarEvent;
use crate::filter::PriorityFilter;
use crate::session::{AuthAction, OAuthProviderConfig};
use crate::sidebar::{MainContent, PLACEHOLDER_MESSAGE, avatar_initial};
use crate::task::{Priority, Task};
use crate::workspace::{Screen, Workspace};

const CELL_WIDTH: usize = 14;
const PROGRESS_WIDTH: usize = 20;

#[derive(Debug, Clone)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    pub fn new(cfg: &Config) -> anyhow::Result<Self> {
        let color_cfg = cfg.get("color").unwrap_or_else(|| "on".to_string());
        let color = match color_cfg.to_ascii_lowercase().as_str() {
            "on" | "yes" | "true" | "1" => true,
            "off" | "no" | "false" | "0" => false,
            other => return Err(anyhow!("invalid color setting: {other}")),
        };

        Ok(Self {
            color: color && io::stdout().is_terminal(),
        })
    }

    /// No escape codes regardless of the terminal.
    pub fn plain() -> Self {
        Self { color: false }
    }

    /// Renders whatever the session gate currently allows.
    #[tracing::instrument(skip(self, out, ws, providers, now))]
    pub fn write_screen<W: Write>(
        &self,
        out: &mut W,
        ws: &Workspace,
        providers: &[OAuthProviderConfig],
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        match ws.screen() {
            Screen::SignIn => self.write_sign_in(out, ws, providers),
            Screen::App(content) => {
                self.write_sidebar(out, ws)?;
                writeln!(out)?;
                match content {
                    MainContent::Calendar => self.write_calendar(out, ws, now),
                    MainContent::Tasks => self.write_tasks(out, ws, now),
                    MainContent::Placeholder => {
                        writeln!(out, "{PLACEHOLDER_MESSAGE}")?;
                        Ok(())
                    }
                }
            }
        }
    }

    pub fn write_sign_in<W: Write>(
        &self,
        out: &mut W,
        ws: &Workspace,
        providers: &[OAuthProviderConfig],
    ) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint("Welcome to Your Calendar", "1"))?;
        writeln!(out, "Please sign in to continue")?;
        writeln!(out)?;

        if ws.auth().pending() == Some(AuthAction::SignIn) {
            writeln!(out, "  Signing in...")?;
            return Ok(());
        }

        if providers.is_empty() {
            writeln!(out, "  Sign in with Google  (signin google)")?;
        } else {
            for provider in providers {
                writeln!(
                    out,
                    "  Sign in with {}  (signin {})",
                    provider_label(&provider.id),
                    provider.id
                )?;
            }
        }
        Ok(())
    }

    pub fn write_whoami<W: Write>(&self, out: &mut W, ws: &Workspace) -> anyhow::Result<()> {
        match ws.session() {
            Some(session) => {
                writeln!(out, "{}", session.user.display_name())?;
                if let Some(email) = &session.user.email {
                    writeln!(out, "{email}")?;
                }
            }
            None => writeln!(out, "Not signed in")?,
        }
        Ok(())
    }

    pub fn write_sidebar<W: Write>(&self, out: &mut W, ws: &Workspace) -> anyhow::Result<()> {
        let user = ws.session().map(|session| &session.user);
        let avatar = format!("[{}]", avatar_initial(user));
        let collapsed = ws.sidebar().is_collapsed();
        let active = ws.sidebar().active();

        if collapsed {
            writeln!(out, "{avatar}")?;
        } else {
            let name = user.map(|u| u.display_name()).unwrap_or("Welcome");
            writeln!(out, "{avatar} {}", self.paint(name, "1"))?;
            if let Some(email) = user.and_then(|u| u.email.as_deref()) {
                writeln!(out, "    {email}")?;
            }
        }

        for section in ws.nav_sections() {
            if !collapsed {
                writeln!(out)?;
                if let Some(title) = section.title {
                    writeln!(out, "{}", self.paint(title, "90"))?;
                }
            }
            for item in &section.items {
                let marker = if item.view == active { '>' } else { ' ' };
                let label = if collapsed {
                    item.label().chars().next().map(String::from).unwrap_or_default()
                } else {
                    item.label().to_string()
                };
                let label = if item.view == active {
                    self.paint(&label, "1;36")
                } else {
                    label
                };
                match item.count {
                    Some(count) if collapsed => writeln!(out, "{marker} {label} {count}")?,
                    Some(count) => {
                        let padding = 12usize.saturating_sub(item.label().width());
                        writeln!(out, "{marker} {label}{} {count}", " ".repeat(padding))?
                    }
                    None => writeln!(out, "{marker} {label}")?,
                }
            }
        }

        if ws.auth().pending() == Some(AuthAction::SignOut) {
            writeln!(out, "Signing out...")?;
        }
        Ok(())
    }

    pub fn write_calendar<W: Write>(
        &self,
        out: &mut W,
        ws: &Workspace,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let active_mode = ws.calendar().mode();
        let tabs = CalendarViewMode::all()
            .into_iter()
            .map(|mode| {
                if mode == active_mode {
                    format!("[{}]", mode.label())
                } else {
                    mode.label().to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ");

        match ws.calendar_render(today(now)) {
            CalendarRender::Month(view) => {
                writeln!(out, "{}   {tabs}", self.paint(&view.title, "1"))?;
                writeln!(out)?;
                self.write_month(out, &view)
            }
            CalendarRender::NotImplemented { mode, title } => {
                writeln!(out, "{}   {tabs}", self.paint(&title, "1"))?;
                writeln!(out)?;
                writeln!(
                    out,
                    "{} view is coming soon! Switch to month view to see your calendar.",
                    mode.label()
                )?;
                Ok(())
            }
        }
    }

    pub fn write_month<W: Write>(&self, out: &mut W, view: &MonthView<'_>) -> anyhow::Result<()> {
        for label in &view.weekdays {
            write!(out, "{}", pad(label, CELL_WIDTH))?;
        }
        writeln!(out)?;
        writeln!(out, "{}", "-".repeat(CELL_WIDTH * view.columns()))?;

        for week in view.weeks() {
            for cell in week {
                write!(out, "{}", pad(&self.day_label(cell), CELL_WIDTH))?;
            }
            writeln!(out)?;

            let lines = week
                .iter()
                .map(|cell| cell.events.len() + usize::from(cell.overflow > 0))
                .max()
                .unwrap_or(0);
            for line in 0..lines {
                for cell in week {
                    let text = if let Some(event) = cell.events.get(line) {
                        self.event_chip(event)
                    } else if line == cell.events.len() && cell.overflow > 0 {
                        self.paint(&format!(" +{} more", cell.overflow), "90")
                    } else {
                        String::new()
                    };
                    write!(out, "{}", pad(&text, CELL_WIDTH))?;
                }
                writeln!(out)?;
            }
            writeln!(out)?;
        }
        Ok(())
    }

    pub fn write_event<W: Write>(&self, out: &mut W, event: &CalendarEvent) -> anyhow::Result<()> {
        writeln!(out, "{}", self.paint(&event.title, "1"))?;
        if event.all_day {
            writeln!(out, "  when   {} (all day)", format_local_date(event.start))?;
        } else {
            writeln!(
                out,
                "  when   {} {} - {}",
                format_local_date(event.start),
                format_local_time(event.start),
                format_local_time(event.end)
            )?;
        }
        writeln!(out, "  color  {}", event.color())?;
        if let Some(description) = &event.description {
            writeln!(out, "  notes  {description}")?;
        }
        Ok(())
    }

    pub fn write_tasks<W: Write>(
        &self,
        out: &mut W,
        ws: &Workspace,
        now: DateTime<Utc>,
    ) -> anyhow::Result<()> {
        let store = ws.tasks();
        let total = store.len();
        let done = store.completed_count();

        writeln!(out, "{}", self.paint("Tasks", "1"))?;
        writeln!(
            out,
            "{done} of {total} completed  {}",
            progress_bar(done, total)
        )?;

        let filter = ws.filter();
        let priority = match filter.priority {
            PriorityFilter::All => "all priorities".to_string(),
            PriorityFilter::Only(p) => format!("{} priority", p.label()),
        };
        let completed = if filter.show_completed { "shown" } else { "hidden" };
        writeln!(out, "Filter: {priority}, completed {completed}")?;

        let form = ws.form();
        if form.is_open() {
            writeln!(
                out,
                "New task: \"{}\" priority {}  (submit or cancel)",
                form.title(),
                form.priority().label()
            )?;
        } else {
            writeln!(out, "+ Add Task")?;
        }
        writeln!(out)?;

        let visible = ws.visible_tasks();
        if visible.is_empty() {
            writeln!(out, "All done!")?;
            if store.is_empty() {
                writeln!(out, "No tasks yet. Create your first task to get started.")?;
            } else {
                writeln!(out, "No tasks match your current filters.")?;
            }
            return Ok(());
        }

        let headers = ["ID", "Done", "Title", "Priority", "Due", "Tags", "Created"]
            .map(String::from)
            .to_vec();
        let rows = visible
            .iter()
            .map(|task| self.task_row(task, now))
            .collect();
        write_table(out, headers, rows)
    }

    fn task_row(&self, task: &Task, now: DateTime<Utc>) -> Vec<String> {
        let check = if task.completed { "[x]" } else { "[ ]" };
        let title = if task.completed {
            self.paint(&task.title, "9;90")
        } else {
            task.title.clone()
        };
        let priority = self.paint(task.priority.label(), priority_code(task.priority));
        let due = match task.due_date {
            Some(due) if task.is_overdue(now) => self.paint(&format_due(due, now), "31"),
            Some(due) => format_due(due, now),
            None => String::new(),
        };
        let tags = task
            .tags
            .iter()
            .map(|tag| format!("#{tag}"))
            .collect::<Vec<_>>()
            .join(" ");

        vec![
            self.paint(&task.id, "33"),
            check.to_string(),
            title,
            priority,
            due,
            tags,
            format_relative_time(task.created_at, now),
        ]
    }

    fn day_label(&self, cell: &DayCell<'_>) -> String {
        let marker = if cell.is_selected { '>' } else { ' ' };
        let day = cell.date.day();
        let mut label = if cell.in_current_month {
            format!("{marker}{day}")
        } else {
            format!("{marker}({day})")
        };
        if cell.is_today {
            label.push_str(" today");
            return self.paint(&label, "1;36");
        }
        if !cell.in_current_month {
            return self.paint(&label, "90");
        }
        label
    }

    fn event_chip(&self, event: &CalendarEvent) -> String {
        let text = truncate(&format!(" {}", event.title), CELL_WIDTH - 1);
        match hex_to_ansi(event.color()) {
            Some(code) => self.paint(&text, &code),
            None => text,
        }
    }

    fn paint(&self, text: &str, code: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        format!("\x1b[{code}m{text}\x1b[0m")
    }
}

fn provider_label(id: &str) -> String {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn priority_code(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "31",
        Priority::Medium => "33",
        Priority::Low => "32",
    }
}

/// `#rrggbb` to a truecolor foreground code.
fn hex_to_ansi(color: &str) -> Option<String> {
    let hex = color.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(hex.get(range)?, 16).ok();
    Some(format!(
        "38;2;{};{};{}",
        channel(0..2)?,
        channel(2..4)?,
        channel(4..6)?
    ))
}

fn progress_bar(done: usize, total: usize) -> String {
    let percent = if total == 0 { 0 } else { done * 100 / total };
    let filled = if total == 0 {
        0
    } else {
        done * PROGRESS_WIDTH / total
    };
    format!(
        "[{}{}] {percent}%",
        "#".repeat(filled),
        "-".repeat(PROGRESS_WIDTH - filled)
    )
}

fn truncate(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

fn pad(text: &str, width: usize) -> String {
    let visible = strip_ansi(text).width();
    format!("{text}{}", " ".repeat(width.saturating_sub(visible)))
}

fn write_table<W: Write>(
    mut writer: W,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
) -> anyhow::Result<()> {
    let column_count = headers.len();
    let mut widths = vec![0usize; column_count];

    for (idx, header) in headers.iter().enumerate() {
        widths[idx] = widths[idx].max(header.width());
    }

    for row in &rows {
        for (idx, cell) in row.iter().enumerate().take(column_count) {
            widths[idx] = widths[idx].max(strip_ansi(cell).width());
        }
    }

    for (header, width) in headers.iter().zip(&widths) {
        write!(writer, "{} ", pad(header, *width))?;
    }
    writeln!(writer)?;

    for width in &widths {
        write!(writer, "{:-<width$} ", "", width = *width)?;
    }
    writeln!(writer)?;

    for row in rows {
        for (cell, width) in row.iter().zip(&widths) {
            write!(writer, "{} ", pad(cell, *width))?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut escaped = false;

    for ch in s.chars() {
        if escaped {
            if ch == 'm' {
                escaped = false;
            }
            continue;
        }

        if ch == '\x1b' {
            escaped = true;
            continue;
        }

        out.push(ch);
    }

    out
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};

    use super::{Renderer, hex_to_ansi, progress_bar, strip_ansi, truncate};
    use crate::config::Config;
    use crate::event::EventStore;
    use crate::session::{AuthAction, AuthError};
    use crate::sidebar::AppView;
    use crate::store::TaskStore;
    use crate::workspace::{Workspace, WorkspaceSettings};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0)
            .single()
            .expect("valid now")
    }

    fn render<F>(ws: &Workspace, write: F) -> String
    where
        F: FnOnce(&Renderer, &mut Vec<u8>, &Workspace) -> anyhow::Result<()>,
    {
        let mut out = Vec::new();
        write(&Renderer::plain(), &mut out, ws).expect("render");
        String::from_utf8(out).expect("utf8")
    }

    #[test]
    fn unauthenticated_screen_is_the_sign_in_prompt() {
        let ws = Workspace::with_sample_data(WorkspaceSettings::default(), now()).expect("workspace");
        let text = render(&ws, |r, out, ws| r.write_screen(out, ws, &[], now()));
        assert!(text.contains("Welcome to Your Calendar"));
        assert!(text.contains("Please sign in to continue"));
        assert!(!text.contains("Team Meeting"));
    }

    #[test]
    fn pending_auth_actions_show_loading_text() {
        let mut ws = Workspace::with_sample_data(WorkspaceSettings::default(), now()).expect("workspace");
        let ticket = ws.begin_auth(AuthAction::SignIn).expect("ticket");

        let text = render(&ws, |r, out, ws| r.write_screen(out, ws, &[], now()));
        assert!(text.contains("Signing in..."));
        assert!(!text.contains("Sign in with Google"));

        ws.finish_sign_in(ticket, Err(AuthError::Rejected("closed".to_string())));
        let text = render(&ws, |r, out, ws| r.write_screen(out, ws, &[], now()));
        assert!(!text.contains("Signing in..."));
        assert!(text.contains("Sign in with Google"));

        let _ticket = ws.begin_auth(AuthAction::SignOut).expect("ticket");
        let text = render(&ws, |r, out, ws| r.write_sidebar(out, ws));
        assert!(text.contains("Signing out..."));
    }

    #[test]
    fn month_grid_shows_overflow_and_today() {
        let ws = Workspace::with_sample_data(WorkspaceSettings::default(), now()).expect("workspace");
        let text = render(&ws, |r, out, ws| r.write_calendar(out, ws, now()));
        assert!(text.starts_with("October 2026   [Month] Week Day Agenda"));
        assert!(text.contains(">16 today"));
        assert!(text.contains(" Team Meeting"));
        assert!(text.contains("+1 more"));
        assert!(text.contains(" (27)"));
    }

    #[test]
    fn empty_task_list_invites_creation() {
        let ws = Workspace::new(
            WorkspaceSettings {
                active_view: AppView::Tasks,
                ..WorkspaceSettings::default()
            },
            TaskStore::new(),
            EventStore::default(),
            NaiveDate::from_ymd_opt(2026, 10, 16).expect("valid date"),
        );
        let text = render(&ws, |r, out, ws| r.write_tasks(out, ws, now()));
        assert!(text.contains("0 of 0 completed"));
        assert!(text.contains("All done!"));
        assert!(text.contains("No tasks yet. Create your first task to get started."));
    }

    #[test]
    fn task_rows_carry_labels() {
        let ws = Workspace::with_sample_data(WorkspaceSettings::default(), now()).expect("workspace");
        let text = render(&ws, |r, out, ws| r.write_tasks(out, ws, now()));
        assert!(text.contains("1 of 4 completed"));
        assert!(text.contains("Due in 1h"));
        assert!(text.contains("#work #meeting"));
        assert!(text.contains("[x]"));
        assert!(text.contains("3d ago"));
    }

    #[test]
    fn invalid_color_setting_is_rejected() {
        let mut cfg = Config::defaults();
        cfg.set("color", "sometimes");
        assert!(Renderer::new(&cfg).is_err());
    }

    #[test]
    fn helpers() {
        assert_eq!(progress_bar(1, 4), format!("[{}{}] 25%", "#".repeat(5), "-".repeat(15)));
        assert_eq!(progress_bar(0, 0), format!("[{}] 0%", "-".repeat(20)));
        assert_eq!(truncate("Quarterly Planning", 8), "Quarter…");
        assert_eq!(truncate("short", 8), "short");
        assert_eq!(hex_to_ansi("#6366f1").as_deref(), Some("38;2;99;102;241"));
        assert_eq!(hex_to_ansi("blue"), None);
        assert_eq!(strip_ansi("\x1b[31mred\x1b[0m"), "red");
    }
}
