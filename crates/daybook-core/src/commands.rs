use std::io::{BufRead, Write};

use anyhow::{Context, anyhow};
use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, instrument, warn};

use crate::calendar::{CalendarViewMode, NavDirection};
use crate::config::parse_bool;
use crate::datetime::{parse_date_expr, to_local_date, today};
use crate::filter::PriorityFilter;
use crate::render::Renderer;
use crate::session::{
    AuthAction, AuthOutcome, DEFAULT_PROVIDER, IdentityProvider, OAuthProviderConfig,
};
use crate::task::{Priority, TaskDraft};
use crate::workspace::Workspace;

const HELP: &str = "\
commands:
  signin [provider]          sign in (default: google)
  signout                    sign out
  whoami                     show the signed-in user
  view <key>                 today, inbox, calendar, tasks, notes, contacts
  calendar | tasks           shortcuts for view calendar / view tasks
  sidebar                    show the sidebar
  collapse                   collapse or expand the sidebar
  prev | next | today        move the visible month
  select <date>              select a day (2026-10-15, tomorrow, +3d, ...)
  mode <mode>                month, week, day or agenda
  event <id>                 show one event
  new                        open or close the add-task form
  title <text>               set the form title
  priority <p>               set the form priority (low, medium, high)
  submit | cancel            submit or close the form
  add [priority:p] [due:d] [+tag].. <title>
  toggle <id>                mark a task done or not done
  delete <id>                delete a task
  filter priority <p|all>    restrict the task list to one priority
  filter completed <on|off>  show or hide completed tasks
  export                     print visible tasks as JSON
  help | quit";

pub fn known_command_names() -> Vec<&'static str> {
    vec![
        "signin", "signout", "whoami", "view", "calendar", "tasks", "sidebar", "collapse", "prev",
        "next", "today", "select", "mode", "event", "new", "title", "priority", "submit", "cancel",
        "add", "toggle", "delete", "filter", "export", "help", "quit",
    ]
}

pub fn expand_command_abbrev<'a>(token: &'a str, known: &[&'a str]) -> Option<&'a str> {
    if known.contains(&token) {
        return Some(token);
    }

    let mut matches = known.iter().copied().filter(|name| name.starts_with(token));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SignIn(Option<String>),
    SignOut,
    WhoAmI,
    View(String),
    Sidebar,
    Collapse,
    Navigate(NavDirection),
    Today,
    Select(NaiveDate),
    Mode(CalendarViewMode),
    Event(String),
    NewTask,
    Title(String),
    Priority(Priority),
    Submit,
    Cancel,
    Add(TaskDraft),
    Toggle(String),
    Delete(String),
    FilterPriority(PriorityFilter),
    FilterCompleted(bool),
    Export,
    Help,
    Quit,
}

impl Command {
    /// Parses one shell line. Blank lines and `#` comments yield `None`.
    #[instrument(skip(now))]
    pub fn parse(line: &str, now: DateTime<Utc>) -> anyhow::Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let mut tokens = line.split_whitespace();
        let Some(head) = tokens.next() else {
            return Ok(None);
        };
        let head = head.to_ascii_lowercase();
        let args: Vec<String> = tokens.map(str::to_string).collect();

        let known = known_command_names();
        let name = expand_command_abbrev(&head, &known)
            .ok_or_else(|| anyhow!("unknown or ambiguous command: {head}"))?;
        debug!(token = %head, command = name, ?args, "resolved command");

        let command = match name {
            "signin" => Self::SignIn(args.first().cloned()),
            "signout" => Self::SignOut,
            "whoami" => Self::WhoAmI,
            "view" => Self::View(required(name, &args)?.to_string()),
            "calendar" => Self::View("calendar".to_string()),
            "tasks" => Self::View("tasks".to_string()),
            "sidebar" => Self::Sidebar,
            "collapse" => Self::Collapse,
            "prev" => Self::Navigate(NavDirection::Prev),
            "next" => Self::Navigate(NavDirection::Next),
            "today" => Self::Today,
            "select" => {
                let expr = args.join(" ");
                if expr.is_empty() {
                    return Err(anyhow!("select: a date is required"));
                }
                let when = parse_date_expr(&expr, now)
                    .with_context(|| format!("select: cannot parse date '{expr}'"))?;
                Self::Select(to_local_date(when))
            }
            "mode" => {
                let key = required(name, &args)?;
                Self::Mode(
                    CalendarViewMode::from_key(key)
                        .ok_or_else(|| anyhow!("mode: unknown view mode '{key}'"))?,
                )
            }
            "event" => Self::Event(required(name, &args)?.to_string()),
            "new" => Self::NewTask,
            "title" => Self::Title(args.join(" ")),
            "priority" => Self::Priority(parse_priority(required(name, &args)?)?),
            "submit" => Self::Submit,
            "cancel" => Self::Cancel,
            "add" => Self::Add(parse_add_args(&args, now)?),
            "toggle" => Self::Toggle(required(name, &args)?.to_string()),
            "delete" => Self::Delete(required(name, &args)?.to_string()),
            "filter" => parse_filter(&args)?,
            "export" => Self::Export,
            "help" => Self::Help,
            "quit" => Self::Quit,
            other => return Err(anyhow!("unknown command: {other}")),
        };
        Ok(Some(command))
    }

    /// Commands that work without a session.
    pub fn is_public(&self) -> bool {
        matches!(self, Self::SignIn(_) | Self::WhoAmI | Self::Help | Self::Quit)
    }
}

fn required<'a>(command: &str, args: &'a [String]) -> anyhow::Result<&'a str> {
    args.first()
        .map(String::as_str)
        .ok_or_else(|| anyhow!("{command}: missing argument"))
}

fn parse_priority(raw: &str) -> anyhow::Result<Priority> {
    Priority::from_key(raw).ok_or_else(|| anyhow!("invalid priority: {raw} (expected low, medium or high)"))
}

fn parse_filter(args: &[String]) -> anyhow::Result<Command> {
    let (Some(kind), Some(value)) = (args.first(), args.get(1)) else {
        return Err(anyhow!("filter: expected 'priority <p>' or 'completed <on|off>'"));
    };
    match kind.to_ascii_lowercase().as_str() {
        "priority" | "pri" => Ok(Command::FilterPriority(PriorityFilter::parse(value)?)),
        "completed" | "done" => Ok(Command::FilterCompleted(parse_bool(value))),
        other => Err(anyhow!("filter: unknown filter '{other}'")),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mod {
    Priority(Priority),
    Due(DateTime<Utc>),
    Tag(String),
}

#[instrument(skip(args, now))]
fn parse_add_args(args: &[String], now: DateTime<Utc>) -> anyhow::Result<TaskDraft> {
    let mut title_parts = Vec::new();
    let mut mods = Vec::new();

    let mut literal = false;
    for arg in args {
        if arg == "--" {
            literal = true;
            continue;
        }

        if !literal && let Some(one_mod) = parse_one_mod(arg, now)? {
            mods.push(one_mod);
            continue;
        }

        title_parts.push(arg.clone());
    }

    if title_parts.is_empty() {
        return Err(anyhow!("add: title is required"));
    }

    let mut draft = TaskDraft::new(title_parts.join(" "));
    for one_mod in mods {
        match one_mod {
            Mod::Priority(priority) => draft.priority = priority,
            Mod::Due(due) => draft.due_date = Some(due),
            Mod::Tag(tag) => {
                if !draft.tags.contains(&tag) {
                    draft.tags.push(tag);
                }
            }
        }
    }
    Ok(draft)
}

fn parse_one_mod(tok: &str, now: DateTime<Utc>) -> anyhow::Result<Option<Mod>> {
    if let Some(tag) = tok.strip_prefix('+')
        && !tag.is_empty()
    {
        return Ok(Some(Mod::Tag(tag.to_string())));
    }

    let Some((key, value)) = tok.split_once(':') else {
        return Ok(None);
    };

    match key.to_ascii_lowercase().as_str() {
        "pri" | "priority" => Ok(Some(Mod::Priority(parse_priority(value)?))),
        "due" => Ok(Some(Mod::Due(parse_date_expr(value, now)?))),
        _ => Ok(None),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Interactive front end: owns the workspace and the identity provider and
/// renders after every command.
#[derive(Debug)]
pub struct Shell<P: IdentityProvider> {
    workspace: Workspace,
    identity: P,
    providers: Vec<OAuthProviderConfig>,
    renderer: Renderer,
}

impl<P: IdentityProvider> Shell<P> {
    /// Builds the shell and lets the gate pick up any session the provider
    /// already holds.
    pub fn new(mut workspace: Workspace, identity: P, renderer: Renderer) -> Self {
        if workspace.refresh_session(&identity) {
            info!("resumed existing session");
        }
        Self {
            workspace,
            identity,
            providers: Vec::new(),
            renderer,
        }
    }

    pub fn with_providers(mut self, providers: Vec<OAuthProviderConfig>) -> Self {
        self.providers = providers;
        self
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn identity(&self) -> &P {
        &self.identity
    }

    pub fn render<W: Write>(&self, out: &mut W, now: DateTime<Utc>) -> anyhow::Result<()> {
        self.renderer
            .write_screen(out, &self.workspace, &self.providers, now)
    }

    fn default_provider(&self) -> String {
        self.providers
            .first()
            .map(|provider| provider.id.clone())
            .unwrap_or_else(|| DEFAULT_PROVIDER.to_string())
    }

    /// Parses and runs one line.
    #[instrument(skip(self, out, now))]
    pub async fn execute<W: Write>(
        &mut self,
        line: &str,
        out: &mut W,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Flow> {
        let Some(command) = Command::parse(line, now)? else {
            return Ok(Flow::Continue);
        };
        self.apply(command, out, now).await
    }

    #[instrument(skip(self, out, now))]
    pub async fn apply<W: Write>(
        &mut self,
        command: Command,
        out: &mut W,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Flow> {
        if !command.is_public() && !self.workspace.gate().is_authenticated() {
            debug!(?command, "blocked by session gate");
            self.render(out, now)?;
            return Ok(Flow::Continue);
        }

        match command {
            Command::SignIn(provider) => {
                if self.workspace.gate().is_authenticated() {
                    writeln!(out, "Already signed in.")?;
                    self.renderer.write_whoami(out, &self.workspace)?;
                    return Ok(Flow::Continue);
                }
                let provider = provider.unwrap_or_else(|| self.default_provider());
                let Some(ticket) = self.workspace.begin_auth(AuthAction::SignIn) else {
                    writeln!(out, "Sign in already in progress.")?;
                    return Ok(Flow::Continue);
                };
                let shown = self
                    .render(out, now)
                    .and_then(|()| out.flush().map_err(anyhow::Error::from));

                let result = self.identity.sign_in(&provider).await;
                let outcome = self.workspace.finish_sign_in(ticket, result);
                shown?;
                match outcome {
                    AuthOutcome::Failed(err) => writeln!(out, "Sign in failed: {err}")?,
                    AuthOutcome::SignedIn(_) | AuthOutcome::SignedOut | AuthOutcome::Ignored => {}
                }
                self.render(out, now)?;
            }
            Command::SignOut => {
                let Some(ticket) = self.workspace.begin_auth(AuthAction::SignOut) else {
                    writeln!(out, "Sign out already in progress.")?;
                    return Ok(Flow::Continue);
                };
                let shown = self
                    .renderer
                    .write_sidebar(out, &self.workspace)
                    .and_then(|()| out.flush().map_err(anyhow::Error::from));

                let result = self.identity.sign_out().await;
                let outcome = self.workspace.finish_sign_out(ticket, result);
                shown?;
                match outcome {
                    AuthOutcome::SignedOut => writeln!(out, "Signed out.")?,
                    AuthOutcome::Failed(err) => writeln!(out, "Sign out failed: {err}")?,
                    AuthOutcome::SignedIn(_) | AuthOutcome::Ignored => {}
                }
                self.render(out, now)?;
            }
            Command::WhoAmI => self.renderer.write_whoami(out, &self.workspace)?,
            Command::View(key) => {
                self.workspace.sidebar_mut().select(&key);
                self.render(out, now)?;
            }
            Command::Sidebar => self.renderer.write_sidebar(out, &self.workspace)?,
            Command::Collapse => {
                self.workspace.sidebar_mut().toggle_collapse();
                self.renderer.write_sidebar(out, &self.workspace)?;
            }
            Command::Navigate(direction) => {
                self.workspace.navigate(direction);
                self.renderer.write_calendar(out, &self.workspace, now)?;
            }
            Command::Today => {
                self.workspace.jump_to_today(today(now));
                self.renderer.write_calendar(out, &self.workspace, now)?;
            }
            Command::Select(date) => {
                self.workspace.select_date(date);
                self.renderer.write_calendar(out, &self.workspace, now)?;
            }
            Command::Mode(mode) => {
                self.workspace.change_view_mode(mode);
                self.renderer.write_calendar(out, &self.workspace, now)?;
            }
            Command::Event(id) => {
                let event = self
                    .workspace
                    .events()
                    .get(&id)
                    .ok_or_else(|| anyhow!("no event with id {id}"))?;
                info!(event_id = %event.id, title = %event.title, "event clicked");
                self.renderer.write_event(out, event)?;
            }
            Command::NewTask => {
                self.workspace.form_mut().toggle_open();
                self.renderer.write_tasks(out, &self.workspace, now)?;
            }
            Command::Title(text) => {
                let form = self.workspace.form_mut();
                form.set_title(text);
                form.open();
                self.renderer.write_tasks(out, &self.workspace, now)?;
            }
            Command::Priority(priority) => {
                self.workspace.form_mut().set_priority(priority);
                self.renderer.write_tasks(out, &self.workspace, now)?;
            }
            Command::Submit => {
                match self.workspace.submit_form(now) {
                    Ok(id) => {
                        info!(task_id = %id, "task created from form");
                        writeln!(out, "Created task {id}.")?;
                    }
                    Err(err) => writeln!(out, "Cannot create task: {err}")?,
                }
                self.renderer.write_tasks(out, &self.workspace, now)?;
            }
            Command::Cancel => {
                self.workspace.form_mut().cancel();
                self.renderer.write_tasks(out, &self.workspace, now)?;
            }
            Command::Add(draft) => {
                let id = self
                    .workspace
                    .create_task(draft, now)
                    .context("add: task rejected")?;
                info!(task_id = %id, "task created");
                writeln!(out, "Created task {id}.")?;
                self.renderer.write_tasks(out, &self.workspace, now)?;
            }
            Command::Toggle(id) => {
                if !self.workspace.toggle_task(&id, now) {
                    writeln!(out, "No task with id {id}.")?;
                }
                self.renderer.write_tasks(out, &self.workspace, now)?;
            }
            Command::Delete(id) => {
                match self.workspace.delete_task(&id) {
                    Some(task) => {
                        info!(task_id = %task.id, "task deleted");
                        writeln!(out, "Deleted task {id}.")?;
                    }
                    None => writeln!(out, "No task with id {id}.")?,
                }
                self.renderer.write_tasks(out, &self.workspace, now)?;
            }
            Command::FilterPriority(priority) => {
                self.workspace.filter_mut().priority = priority;
                self.renderer.write_tasks(out, &self.workspace, now)?;
            }
            Command::FilterCompleted(show) => {
                self.workspace.filter_mut().show_completed = show;
                self.renderer.write_tasks(out, &self.workspace, now)?;
            }
            Command::Export => {
                let rows = self.workspace.visible_tasks();
                let json = serde_json::to_string_pretty(&rows)?;
                writeln!(out, "{json}")?;
            }
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Quit => return Ok(Flow::Quit),
        }

        Ok(Flow::Continue)
    }

    /// Reads commands until EOF or `quit`. Command errors are reported and
    /// the loop continues; I/O errors end it.
    #[instrument(skip(self, input, out))]
    pub async fn run_lines<R: BufRead, W: Write>(
        &mut self,
        input: R,
        out: &mut W,
        prompt: bool,
    ) -> anyhow::Result<()> {
        if prompt {
            write!(out, "daybook> ")?;
            out.flush()?;
        }
        for line in input.lines() {
            let line = line.context("failed to read command")?;
            match self.execute(&line, out, Utc::now()).await {
                Ok(Flow::Quit) => break,
                Ok(Flow::Continue) => {}
                Err(err) => {
                    warn!(error = %err, line = %line, "command failed");
                    writeln!(out, "error: {err:#}")?;
                }
            }
            if prompt {
                write!(out, "daybook> ")?;
                out.flush()?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

    use super::{Command, expand_command_abbrev, known_command_names};
    use crate::calendar::{CalendarViewMode, NavDirection};
    use crate::filter::PriorityFilter;
    use crate::task::Priority;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0)
            .single()
            .expect("valid now")
    }

    fn parse(line: &str) -> Command {
        Command::parse(line, now())
            .expect("parse")
            .expect("not blank")
    }

    #[test]
    fn abbreviations_resolve_when_unique() {
        let known = known_command_names();
        assert_eq!(expand_command_abbrev("tog", &known), Some("toggle"));
        assert_eq!(expand_command_abbrev("signi", &known), Some("signin"));
        assert_eq!(expand_command_abbrev("s", &known), None);
        assert_eq!(expand_command_abbrev("ne", &known), None);
        assert_eq!(expand_command_abbrev("next", &known), Some("next"));
    }

    #[test]
    fn parses_calendar_commands() {
        assert_eq!(parse("prev"), Command::Navigate(NavDirection::Prev));
        assert_eq!(parse("mode week"), Command::Mode(CalendarViewMode::Week));
        assert_eq!(
            parse("select 2026-11-02"),
            Command::Select(NaiveDate::from_ymd_opt(2026, 11, 2).expect("valid date"))
        );
        assert_eq!(
            parse("select tomorrow"),
            Command::Select(NaiveDate::from_ymd_opt(2026, 10, 17).expect("valid date"))
        );
        assert!(Command::parse("mode year", now()).is_err());
        assert!(Command::parse("select", now()).is_err());
    }

    #[test]
    fn add_collects_modifiers_and_title() {
        let Command::Add(draft) = parse("add priority:high due:+2d +work Ship the release") else {
            panic!("expected add");
        };
        assert_eq!(draft.title, "Ship the release");
        assert_eq!(draft.priority, Priority::High);
        assert_eq!(draft.due_date, Some(now() + Duration::days(2)));
        assert_eq!(draft.tags, vec!["work".to_string()]);

        let Command::Add(draft) = parse("add -- +1 for the idea") else {
            panic!("expected add");
        };
        assert_eq!(draft.title, "+1 for the idea");
        assert!(draft.tags.is_empty());

        assert!(Command::parse("add +only-tags", now()).is_err());
        assert!(Command::parse("add pri:urgent thing", now()).is_err());
    }

    #[test]
    fn huge_relative_dates_are_rejected_not_fatal() {
        let err = Command::parse("add due:+9999999999999d Plan", now()).expect_err("add");
        assert!(format!("{err:#}").contains("out of range"));

        let err = Command::parse("select +999999999d", now()).expect_err("select");
        assert!(format!("{err:#}").contains("out of range"));
    }

    #[test]
    fn parses_filters() {
        assert_eq!(
            parse("filter priority low"),
            Command::FilterPriority(PriorityFilter::Only(Priority::Low))
        );
        assert_eq!(parse("filter completed off"), Command::FilterCompleted(false));
        assert!(Command::parse("filter colour red", now()).is_err());
    }

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        assert_eq!(Command::parse("   ", now()).expect("blank"), None);
        assert_eq!(Command::parse("# note", now()).expect("comment"), None);
        assert!(Command::parse("frobnicate", now()).is_err());
    }

    #[test]
    fn only_sign_in_help_whoami_and_quit_are_public() {
        assert!(parse("signin").is_public());
        assert!(parse("help").is_public());
        assert!(parse("whoami").is_public());
        assert!(parse("quit").is_public());
        assert!(!parse("tasks").is_public());
        assert!(!parse("signout").is_public());
    }
}
