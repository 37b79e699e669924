mod aggregate;
mod args;
mod commands;
mod config;
mod context;
mod credentials;
mod identity;
mod logger;
mod setup;

use std::io::Write;
use std::process::ExitCode;

use anyhow::{Context, Result};
use serde_json::json;

use ksm_client::SupermemoryClient;

use args::{parse_args, Command, CommandRequest};
use commands::{App, CommandError};
use config::Settings;
use identity::GitIdentityTags;
use logger::Logger;
use setup::TerminalPrompt;

const HELP: &str = r#"
kimi-supermemory - Persistent memory for Kimi CLI

Commands:
  add <content>          Add a new memory
    --type <type>        Memory type: project-config, architecture, error-solution, preference, learned-pattern, conversation
    --scope <scope>      Scope: user (cross-project) or project (default)
    --directory <dir>    Project directory (default: cwd)

  search <query>         Search memories
    --scope <scope>      Search specific scope only
    --limit <n>          Max merged results when both scopes are searched (default: 10)
    --directory <dir>    Project directory (default: cwd)

  list                   List recent memories
    --scope <scope>      List specific scope only
    --limit <n>          Max memories to list (default: 20)
    --directory <dir>    Project directory (default: cwd)

  forget <memory-id>     Delete a memory

  context                Get formatted context for current session
    --directory <dir>    Project directory (default: cwd)
    --query <query>      Optional query for relevance

  init                   Initialize configuration

  init-codebase          Interactive codebase initialization guide

  config                 Show resolved configuration

  help                   Show this help message

Environment:
  KIMI_SUPERMEMORY_API_KEY    Your Supermemory API key
  KIMI_SUPERMEMORY_CONFIG     Path to the JSON config file
  RUST_LOG                    Diagnostic log level (default: warn)

Examples:
  kimi-supermemory add "Uses Bun runtime" --type project-config
  kimi-supermemory search "testing workflow"
  kimi-supermemory list --limit 10
  kimi-supermemory context
"#;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into()),
        )
        .init();

    let request = parse_args(std::env::args().skip(1));
    let settings = Settings::load();
    let logger = Logger::new(Logger::default_path());

    let directory = request
        .directory
        .clone()
        .or_else(|| std::env::current_dir().ok())
        .map(|d| d.display().to_string());
    logger.log(
        "CLI started",
        json!({ "command": request.command.to_string(), "directory": directory }),
    );

    match run(&request, &settings, &logger) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(request: &CommandRequest, settings: &Settings, logger: &Logger) -> Result<ExitCode> {
    match request.command {
        Command::Help => emit(HELP),
        Command::InitCodebase => emit(setup::cmd_init_codebase()),
        Command::Config => emit(&setup::cmd_config(settings)),
        Command::Init => {
            let path = credentials::credentials_path()
                .context("cannot determine home directory")?;
            let mut stdout = std::io::stdout();
            setup::cmd_init(settings, &mut TerminalPrompt, &mut stdout, &path)?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Add | Command::Search | Command::List | Command::Forget | Command::Context => {
            let client = SupermemoryClient::new(
                &settings.api_url,
                settings.api_key.as_deref().unwrap_or_default(),
                settings.search_options(),
            );
            let tags = GitIdentityTags::new(&settings.container_tag_prefix);
            let app = App {
                settings,
                client: &client,
                tags: &tags,
                logger,
            };
            dispatch(&app, request)
        }
    }
}

/// Run a memory verb and map its outcome to an exit code.
fn dispatch(app: &App, request: &CommandRequest) -> Result<ExitCode> {
    let handler: fn(&App, &CommandRequest) -> Result<String, CommandError> =
        match request.command {
            Command::Add => commands::cmd_add,
            Command::Search => commands::cmd_search,
            Command::List => commands::cmd_list,
            Command::Forget => commands::cmd_forget,
            _ => commands::cmd_context,
        };
    match handler(app, request) {
        Ok(output) => emit(&output),
        Err(e) => {
            report(&e);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn emit(text: &str) -> Result<ExitCode> {
    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(text.as_bytes())
        .and_then(|()| stdout.flush())
        .context("failed to write to stdout")?;
    Ok(ExitCode::SUCCESS)
}

fn report(e: &CommandError) {
    eprintln!("Error: {e}");
    if let Some(hint) = e.hint() {
        eprintln!("{hint}");
    }
}
