mod config;
mod daic;
mod external;
mod git;
mod governance;
mod hooks;
mod installer;
mod logging;
mod records;
mod state;
mod types;

use anyhow::Result;
use clap::{Parser, Subcommand};
use hooks::{HookContext, HookName, HookOutcome};
use std::io::{self, Read};
use std::process;

use external::SystemRunner;
use state::get_project_root;

#[derive(Parser)]
#[command(name = "cc-sessions", version, about = "Session hooks and DAIC workflow for Claude Code projects")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one hook against the JSON event on stdin.
    Hook {
        #[arg(value_enum)]
        name: HookName,
    },
    /// Toggle between discussion and implementation mode.
    Daic {
        /// Print the current mode and task instead of toggling.
        #[arg(long)]
        status: bool,
    },
    /// Set up cc-sessions in the current project.
    Install,
}

fn read_stdin() -> Result<String> {
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    Ok(buffer)
}

fn run_hook(name: HookName) {
    let input = read_stdin().unwrap_or_else(|e| {
        tracing::warn!(hook = %name, error = %e, "could not read stdin");
        String::new()
    });
    let runner = SystemRunner;
    let ctx = HookContext::new(get_project_root(), &runner, chrono::Local::now());

    match hooks::dispatch(name, &input, &ctx) {
        HookOutcome::Proceed(Some(output)) => match serde_json::to_string(&output) {
            Ok(json) => println!("{json}"),
            Err(e) => tracing::error!("{name} hook error: serializing output: {e}"),
        },
        HookOutcome::Proceed(None) => {}
        HookOutcome::Advise(message) => {
            eprintln!("{message}");
            process::exit(2);
        }
    }
}

fn main() {
    logging::init();
    let cli = Cli::parse();

    match cli.command {
        Command::Hook { name } => run_hook(name),
        Command::Daic { status } => {
            if let Err(err) = daic::run(status, get_project_root()) {
                eprintln!("cc-sessions: {err:#}");
                process::exit(1);
            }
        }
        Command::Install => {
            if let Err(err) = installer::run() {
                eprintln!("Installation failed: {err:#}");
                process::exit(1);
            }
        }
    }
}
