//! Command-line entry point.
//!
//! # Responsibility
//! - Load configuration, start logging and build one `TaskService`.
//! - Run a single command against it and print the result.
//!
//! # Invariants
//! - Holds no state between runs; the task file is the only memory.
//! - Waits a bounded time for background remote writes before exiting.

use clap::{Parser, Subcommand};
use log::warn;
use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;
use tasksync_core::{
    core_version, init_logging_from_config, parse_due, CoreConfig, Task, TaskService,
};
use tokio::runtime::Handle;

const REMOTE_DRAIN_LIMIT: Duration = Duration::from_secs(10);

#[derive(Parser, Debug)]
#[command(name = "tasksync", about = "Local-first task list with remote mirroring")]
struct Cli {
    /// TOML configuration file; defaults apply when it does not exist.
    #[arg(long, env = "TASKSYNC_CONFIG", default_value = "tasksync.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print local tasks, newest first.
    List,
    /// Add a task.
    Add {
        title: String,
        /// Due date as YYYY-MM-DD.
        #[arg(long)]
        due: Option<String>,
    },
    /// Mark a task completed.
    Done { id: String },
    /// Mark a task not completed.
    Undo { id: String },
    /// Delete a task.
    Rm { id: String },
    /// Delete every completed task.
    Clear,
    /// Print whether mutations reach the remote store.
    Status,
    /// Print the remote copy of the task list without touching local state.
    Pull,
    /// Print the core version.
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config = CoreConfig::load_or_default(&cli.config)?;
    if let Err(err) = init_logging_from_config(&config) {
        eprintln!("logging disabled: {err}");
    }

    let service = TaskService::from_config(&config, Handle::current())?;
    let outcome = run(&service, cli.command).await;

    if !service.wait_for_remote(REMOTE_DRAIN_LIMIT).await {
        warn!("event=cli_exit module=cli status=error reason=remote_writes_pending");
    }
    service.close();
    outcome
}

async fn run(service: &TaskService, command: Command) -> Result<(), Box<dyn Error>> {
    match command {
        Command::List => {
            for task in service.list_tasks() {
                println!("{}", render(&task));
            }
        }
        Command::Add { title, due } => {
            let due = parse_due(due.as_deref())?;
            let task = service.add_task(&title, due)?;
            println!("added {}", task.id());
        }
        Command::Done { id } => {
            println!("{}", render(&service.set_completed(&id, true)?));
        }
        Command::Undo { id } => {
            println!("{}", render(&service.set_completed(&id, false)?));
        }
        Command::Rm { id } => {
            service.remove_task(&id)?;
            println!("removed {}", id.trim());
        }
        Command::Clear => {
            println!("cleared {}", service.clear_completed()?);
        }
        Command::Status => {
            println!("{}", service.sync_status());
        }
        Command::Pull => {
            for task in service.remote_tasks().await? {
                println!("{}", render(&task));
            }
        }
        Command::Version => {
            println!("tasksync_core version={}", core_version());
        }
    }
    Ok(())
}

fn render(task: &Task) -> String {
    let mark = if task.is_completed() { 'x' } else { ' ' };
    match task.due() {
        Some(due) => format!("[{mark}] {} {} (due {due})", task.id(), task.title()),
        None => format!("[{mark}] {} {}", task.id(), task.title()),
    }
}
