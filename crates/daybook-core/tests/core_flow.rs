use std::fs;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use daybook_core::commands::{Flow, Shell};
use daybook_core::config::Config;
use daybook_core::render::Renderer;
use daybook_core::session::{IdentityProvider, StaticIdentity};
use daybook_core::sidebar::MainContent;
use daybook_core::workspace::{Screen, Workspace, WorkspaceSettings};
use tempfile::tempdir;

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0)
        .single()
        .expect("valid now")
}

fn config() -> Config {
    let mut cfg = Config::defaults();
    cfg.set("auth.user.name", "Ada Lovelace");
    cfg.set("auth.user.email", "ada@example.com");
    cfg
}

fn shell(cfg: &Config) -> Shell<StaticIdentity> {
    let settings = WorkspaceSettings::from_config(cfg).expect("settings");
    let workspace = Workspace::with_sample_data(settings, now()).expect("workspace");
    let identity = StaticIdentity::from_config(cfg);
    let providers = identity.providers().to_vec();
    Shell::new(workspace, identity, Renderer::plain()).with_providers(providers)
}

async fn exec(shell: &mut Shell<StaticIdentity>, line: &str) -> String {
    let mut out = Vec::new();
    let flow = shell.execute(line, &mut out, now()).await.expect("command");
    assert_eq!(flow, Flow::Continue);
    String::from_utf8(out).expect("utf8")
}

#[tokio::test]
async fn workspace_stays_behind_the_session_gate() {
    let mut shell = shell(&config());

    let text = exec(&mut shell, "tasks").await;
    assert!(text.contains("Please sign in to continue"));
    assert!(text.contains("Sign in with Google"));
    assert_eq!(shell.workspace().screen(), Screen::SignIn);

    let text = exec(&mut shell, "whoami").await;
    assert!(text.contains("Not signed in"));

    let text = exec(&mut shell, "signin").await;
    assert!(text.contains("Signing in..."));
    assert!(text.contains("[A] Ada Lovelace"));
    assert!(text.contains("October 2026"));
    assert_eq!(
        shell.workspace().screen(),
        Screen::App(MainContent::Calendar)
    );

    let text = exec(&mut shell, "signout").await;
    assert!(text.contains("Signing out..."));
    assert!(text.contains("Signed out."));
    assert!(text.contains("Welcome to Your Calendar"));
    assert_eq!(shell.workspace().tasks().len(), 4);
}

#[tokio::test]
async fn existing_provider_session_opens_the_gate_at_startup() {
    let cfg = config();
    let mut identity = StaticIdentity::from_config(&cfg);
    identity.sign_in("google").await.expect("sign in");

    let settings = WorkspaceSettings::from_config(&cfg).expect("settings");
    let workspace = Workspace::with_sample_data(settings, now()).expect("workspace");
    let mut shell = Shell::new(workspace, identity, Renderer::plain());
    assert_eq!(
        shell.workspace().screen(),
        Screen::App(MainContent::Calendar)
    );

    let text = exec(&mut shell, "tasks").await;
    assert!(text.contains("1 of 4 completed"));
}

#[tokio::test]
async fn huge_due_offset_is_reported_and_store_survives() {
    let mut shell = shell(&config());
    let script = "signin\nadd due:+9999999999999d Plan\nselect +999999999d\n";

    let mut out = Vec::new();
    shell
        .run_lines(script.as_bytes(), &mut out, false)
        .await
        .expect("run script");
    let text = String::from_utf8(out).expect("utf8");

    assert_eq!(text.matches("out of range").count(), 2);
    assert_eq!(shell.workspace().tasks().len(), 4);
}

#[tokio::test]
async fn failed_sign_in_is_reported_and_gate_stays_closed() {
    let mut cfg = config();
    cfg.set("auth.fail", "on");
    let mut shell = shell(&cfg);

    let text = exec(&mut shell, "signin").await;
    assert!(text.contains("Sign in failed"));
    assert!(text.contains("Please sign in to continue"));
    assert!(shell.workspace().auth().is_enabled());
    assert_eq!(shell.workspace().screen(), Screen::SignIn);
}

#[tokio::test]
async fn task_form_rejects_blank_titles_and_keeps_state() {
    let mut shell = shell(&config());
    exec(&mut shell, "signin").await;

    exec(&mut shell, "new").await;
    exec(&mut shell, "title    ").await;
    let text = exec(&mut shell, "submit").await;
    assert!(text.contains("Cannot create task"));
    assert!(shell.workspace().form().is_open());
    assert_eq!(shell.workspace().tasks().len(), 4);

    exec(&mut shell, "title Call the bank").await;
    exec(&mut shell, "priority high").await;
    let text = exec(&mut shell, "submit").await;
    assert!(text.contains("Created task"));
    assert!(text.contains("1 of 5 completed"));
    assert!(!shell.workspace().form().is_open());
    assert_eq!(shell.workspace().form().title(), "");
}

#[tokio::test]
async fn add_toggle_delete_and_export() {
    let mut shell = shell(&config());
    exec(&mut shell, "signin").await;

    exec(&mut shell, "add priority:low +errand Buy milk").await;
    let id = shell
        .workspace()
        .tasks()
        .iter()
        .find(|task| task.title == "Buy milk")
        .map(|task| task.id.clone())
        .expect("created task");
    assert_eq!(shell.workspace().tasks().tasks()[0].id, id);

    let before = shell
        .workspace()
        .tasks()
        .get(&id)
        .map(|task| task.updated_at)
        .expect("task");
    exec(&mut shell, &format!("toggle {id}")).await;
    let task = shell.workspace().tasks().get(&id).expect("task");
    assert!(task.completed);
    assert!(task.updated_at > before);

    exec(&mut shell, "filter completed off").await;
    let text = exec(&mut shell, "export").await;
    let rows: serde_json::Value = serde_json::from_str(&text).expect("json");
    let titles: Vec<&str> = rows
        .as_array()
        .expect("array")
        .iter()
        .filter_map(|row| row["title"].as_str())
        .collect();
    assert_eq!(
        titles,
        vec![
            "Team standup meeting",
            "Review project proposals",
            "Book dentist appointment"
        ]
    );

    let text = exec(&mut shell, &format!("delete {id}")).await;
    assert!(text.contains(&format!("Deleted task {id}.")));
    let text = exec(&mut shell, "delete nope").await;
    assert!(text.contains("No task with id nope."));
    assert_eq!(shell.workspace().tasks().len(), 4);
}

#[tokio::test]
async fn calendar_selection_modes_and_events() {
    let mut shell = shell(&config());
    exec(&mut shell, "signin").await;

    let text = exec(&mut shell, "next").await;
    assert!(text.contains("November 2026"));
    assert_eq!(
        shell.workspace().selected_date(),
        NaiveDate::from_ymd_opt(2026, 10, 16).expect("valid date")
    );

    exec(&mut shell, "select 2026-11-02").await;
    assert_eq!(
        shell.workspace().view_state().selected_date,
        NaiveDate::from_ymd_opt(2026, 11, 2).expect("valid date")
    );

    let text = exec(&mut shell, "today").await;
    assert!(text.contains("+1 more"));

    let text = exec(&mut shell, "mode agenda").await;
    assert!(text.contains("Agenda view is coming soon!"));

    let text = exec(&mut shell, "event 1").await;
    assert!(text.contains("Team Meeting"));
    assert!(text.contains("Weekly team sync meeting"));

    let mut out = Vec::new();
    assert!(shell.execute("event 99", &mut out, now()).await.is_err());
}

#[tokio::test]
async fn script_lines_report_errors_and_stop_at_quit() {
    let mut shell = shell(&config());
    let script = "signin\nfrobnicate\nquit\ntasks\n";

    let mut out = Vec::new();
    shell
        .run_lines(script.as_bytes(), &mut out, false)
        .await
        .expect("run script");
    let text = String::from_utf8(out).expect("utf8");

    assert!(text.contains("error: unknown or ambiguous command: frobnicate"));
    assert!(!text.contains("of 4 completed"));
}

#[tokio::test]
async fn rc_file_drives_initial_view() {
    let dir = tempdir().expect("tempdir");
    let rc = dir.path().join("daybookrc");
    fs::write(
        &rc,
        "default.view = tasks\nsample.data = off\nauth.user.email = grace@example.com\n",
    )
    .expect("write rc");

    let cfg = Config::load(Some(rc.as_path())).expect("load rc");
    let mut shell = shell(&cfg);
    let text = exec(&mut shell, "signin").await;

    assert!(text.contains("[G]"));
    assert!(text.contains("No tasks yet. Create your first task to get started."));
    assert_eq!(shell.workspace().screen(), Screen::App(MainContent::Tasks));
}
