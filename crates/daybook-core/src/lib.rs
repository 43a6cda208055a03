pub mod calendar;
pub mod cli;
pub mod commands;
pub mod config;
pub mod datetime;
pub mod event;
pub mod filter;
pub mod form;
pub mod render;
pub mod sample;
pub mod session;
pub mod sidebar;
pub mod store;
pub mod task;
pub mod workspace;

use std::ffi::OsString;
use std::fs::File;
use std::io::{
  self,
  BufReader,
  IsTerminal,
  Write
};

use anyhow::Context;
use chrono::Utc;
use clap::Parser;
use tracing::{
  debug,
  info
};

use crate::commands::{
  Command,
  Shell
};
use crate::session::StaticIdentity;
use crate::workspace::{
  Workspace,
  WorkspaceSettings
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting daybook"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.daybookrc.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .iter()
        .map(|kv| {
          (kv.key.clone(), kv.value.clone())
        })
    )
  );

  let renderer =
    render::Renderer::new(&cfg)?;
  let settings =
    WorkspaceSettings::from_config(
      &cfg
    )
    .context(
      "invalid workspace settings"
    )?;
  let workspace =
    Workspace::with_sample_data(
      settings,
      Utc::now()
    )?;
  let identity =
    StaticIdentity::from_config(&cfg);
  let providers =
    identity.providers().to_vec();

  let mut shell =
    Shell::new(
      workspace, identity, renderer
    )
    .with_providers(providers);

  let runtime =
    tokio::runtime::Builder::new_current_thread()
      .enable_all()
      .build()
      .context(
        "failed to start async \
         runtime"
      )?;

  runtime.block_on(async {
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if cli.sign_in {
      shell
        .apply(
          Command::SignIn(None),
          &mut io::sink(),
          Utc::now()
        )
        .await?;
    }

    if let Some(line) =
      cli.command_line()
    {
      shell
        .execute(
          &line,
          &mut out,
          Utc::now()
        )
        .await?;
    } else if let Some(path) =
      cli.script.as_deref()
    {
      let file = File::open(path)
        .with_context(|| {
          format!(
            "failed to open script {}",
            path.display()
          )
        })?;
      shell
        .run_lines(
          BufReader::new(file),
          &mut out,
          false
        )
        .await?;
    } else {
      let stdin = io::stdin();
      let interactive =
        stdin.is_terminal();
      if interactive {
        shell
          .render(&mut out, Utc::now())?;
      }
      shell
        .run_lines(
          stdin.lock(),
          &mut out,
          interactive
        )
        .await?;
    }

    out.flush()?;
    anyhow::Ok(())
  })?;

  info!("done");
  Ok(())
}
