pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "paintvox",
    about = "Paintvox operator CLI",
    long_about = "Inspect configuration, check readiness, apply migrations and replay voice transcripts against the estimate drafting engine.",
    after_help = "Examples:\n  paintvox doctor --json\n  paintvox config\n  paintvox replay call.txt\n  paintvox context <draft-id>"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, DB connectivity and schema readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Run a `user:` / `agent:` transcript through an in-memory voice session")]
    Replay {
        #[arg(help = "Path to the transcript file")]
        path: PathBuf,
    },
    #[command(about = "Print the resume context for a stored draft")]
    Context {
        #[arg(help = "Draft id")]
        draft_id: String,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Doctor { json } => commands::doctor::run(json),
        Command::Migrate => commands::migrate::run(),
        Command::Replay { path } => commands::replay::run(&path),
        Command::Context { draft_id } => commands::context::run(&draft_id),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
