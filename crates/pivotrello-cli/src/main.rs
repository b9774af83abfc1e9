#![forbid(unsafe_code)]

mod api;
mod cmd;
mod output;
mod progress;
mod prompt;

use std::env;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};
use output::{CliError, OutputMode};
use pivotrello_core::config::{ConfigParseError, MissingCredential, load_config};
use pivotrello_core::error::SyncError;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "pivotrello: import a Pivotal Tracker backlog into a Trello board",
    long_about = None
)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: <config dir>/pivotrello/config.toml).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output format.
    #[arg(long, global = true, value_enum)]
    format: Option<OutputMode>,

    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Pivotal Tracker API token.
    #[arg(long, global = true, value_name = "TOKEN")]
    pivotal_token: Option<String>,

    /// Trello API key.
    #[arg(long, global = true, value_name = "KEY")]
    trello_key: Option<String>,

    /// Trello API token.
    #[arg(long, global = true, value_name = "TOKEN")]
    trello_token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    fn credentials(&self) -> cmd::CredentialFlags {
        cmd::CredentialFlags {
            pivotal_token: self.pivotal_token.clone(),
            trello_key: self.trello_key.clone(),
            trello_token: self.trello_token.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        about = "Import a Pivotal project into a Trello board",
        long_about = "Reconcile every story of a Pivotal project into cards on a Trello board, \
                      keeping backlog order. Safe to rerun: cards that already match are left alone.",
        after_help = "EXAMPLES:\n    # Pick project and board interactively\n    pivotrello import\n\n    # Preview the changes without touching the board\n    pivotrello import --project 123 --board 5f1c --dry-run\n\n    # Continue after a failure\n    pivotrello import --project 123 --board 5f1c --resume-after 4711"
    )]
    Import(cmd::import::ImportArgs),

    #[command(
        about = "Report cards that share a name and description",
        after_help = "EXAMPLES:\n    pivotrello duplicates --board 5f1c\n\n    # Emit machine-readable output\n    pivotrello duplicates --board 5f1c --json"
    )]
    Duplicates(cmd::duplicates::DuplicatesArgs),

    #[command(
        about = "Delete or archive every card on a board",
        after_help = "EXAMPLES:\n    # Delete every card after confirming\n    pivotrello wipe --board 5f1c\n\n    # Archive cards and close all lists without asking\n    pivotrello wipe --board 5f1c --archive --close-lists --yes"
    )]
    Wipe(cmd::wipe::WipeArgs),

    #[command(about = "List Trello boards the token can see")]
    Boards,

    #[command(about = "List Pivotal projects the token can see")]
    Projects,

    #[command(
        about = "Generate shell completions",
        after_help = "EXAMPLES:\n    pivotrello completions bash > ~/.local/share/bash-completion/completions/pivotrello"
    )]
    Completions(cmd::completions::CompletionsArgs),
}

fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_env("PIVOTRELLO_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if verbose || env::var("DEBUG").is_ok() {
            "pivotrello=debug,info"
        } else {
            "pivotrello=info,warn"
        })
    });

    let format = env::var("PIVOTRELLO_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

/// Code, message and suggestion for a failed command.
fn describe_error(err: &anyhow::Error) -> CliError {
    let code = err
        .downcast_ref::<SyncError>()
        .map(SyncError::code)
        .or_else(|| err.downcast_ref::<MissingCredential>().map(MissingCredential::code))
        .or_else(|| err.downcast_ref::<ConfigParseError>().map(ConfigParseError::code))
        .or_else(|| {
            err.downcast_ref::<cmd::duplicates::DuplicateCardsFound>()
                .map(cmd::duplicates::DuplicateCardsFound::code)
        });

    let mut error = CliError::new(format!("{err:#}"));
    if let Some(code) = code {
        error = error.with_code(code);
    }
    error
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    if let Commands::Completions(args) = &cli.command {
        let mut command = Cli::command();
        return cmd::completions::run_completions(args.shell, &mut command);
    }

    let config = load_config(cli.config.as_deref())?;
    let output = output::resolve_output_mode(cli.format, cli.json, config.output.as_deref());
    let ctx = cmd::Context {
        credentials: cli.credentials(),
        config,
        output,
    };

    match &cli.command {
        Commands::Import(args) => cmd::import::run_import(args, &ctx),
        Commands::Duplicates(args) => cmd::duplicates::run_duplicates(args, &ctx),
        Commands::Wipe(args) => cmd::wipe::run_wipe(args, &ctx),
        Commands::Boards => cmd::boards::run_boards(&ctx),
        Commands::Projects => cmd::boards::run_projects(&ctx),
        Commands::Completions(_) => Ok(()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    debug!(command = ?cli.command, "starting");

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // The config may be what failed, so only flags and env pick the format here.
            let mode = output::resolve_output_mode(cli.format, cli.json, None);
            if output::render_error(mode, &describe_error(&err)).is_err() {
                eprintln!("error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}
