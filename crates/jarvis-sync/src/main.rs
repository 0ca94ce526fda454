//! jarvis-sync: Sync Jarvis notes and tasks with a GitHub repository.
//!
//! Local data lives as JSON files in a data directory; the GitHub target is
//! read from `GITHUB_*` environment variables.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use jarvis_sync::{App, NewTask};
use sync_core::{SyncConfig, SyncResult, TaskPriority, time};

#[derive(Parser, Debug)]
#[command(name = "jarvis-sync")]
#[command(about = "Sync Jarvis notes and tasks with a GitHub repository")]
struct Args {
    /// Directory holding local notes, tasks and sync settings
    #[arg(long, env = "JARVIS_DATA_DIR", default_value = "jarvis-data")]
    data_dir: PathBuf,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sync local notes and tasks with the repository
    Sync,
    /// Show sync configuration and state
    Status,
    /// Check the repository is reachable with the configured token
    Validate,
    /// Turn sync-on-change on or off
    AutoSync {
        #[arg(value_enum)]
        state: Toggle,
    },
    /// Add a note
    AddNote {
        title: String,
        #[arg(long, default_value = "")]
        content: String,
        #[arg(long = "tag")]
        tags: Vec<String>,
    },
    /// Add a task
    AddTask {
        title: String,
        #[arg(long)]
        description: Option<String>,
        #[arg(long, value_enum, default_value_t = Priority::Medium)]
        priority: Priority,
        #[arg(long)]
        category: Option<String>,
        /// Due date as an RFC 3339 timestamp
        #[arg(long)]
        due: Option<String>,
    },
    /// List local notes and tasks
    List {
        #[arg(value_enum)]
        kind: Option<ListKind>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Toggle {
    On,
    Off,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Priority {
    Low,
    Medium,
    High,
}

impl From<Priority> for TaskPriority {
    fn from(priority: Priority) -> Self {
        match priority {
            Priority::Low => TaskPriority::Low,
            Priority::Medium => TaskPriority::Medium,
            Priority::High => TaskPriority::High,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ListKind {
    Notes,
    Tasks,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging - respects RUST_LOG env var, defaults to info (or debug with --verbose)
    let default_filter = if args.verbose {
        "debug,jarvis_sync=debug"
    } else {
        "info,jarvis_sync=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = SyncConfig::from_env().context("Invalid sync configuration")?;
    info!("Data directory: {:?}", args.data_dir);
    let app = App::open(&args.data_dir, config)?;

    match args.command {
        Command::Sync => {
            let result = app.sync().await?;
            print_result(&result);
            if !result.success {
                bail!("sync failed");
            }
        }
        Command::Status => {
            let status = app.status();
            match &status.target {
                Some(target) => println!("Target:     {}", target),
                None => println!("Target:     not configured"),
            }
            println!("Enabled:    {}", status.enabled);
            println!("Auto-sync:  {}", status.auto_sync);
            match status.last_sync_at {
                Some(at) => println!("Last sync:  {}", time::format(&at)),
                None => println!("Last sync:  never"),
            }
        }
        Command::Validate => {
            if !app.validate().await {
                bail!("cannot access the configured repository");
            }
            println!("Repository is reachable");
        }
        Command::AutoSync { state } => {
            app.set_auto_sync(matches!(state, Toggle::On))?;
            println!("Auto-sync {}", if matches!(state, Toggle::On) { "on" } else { "off" });
        }
        Command::AddNote { title, content, tags } => {
            let note = app.add_note(&title, &content, &tags).await?;
            println!("Added note {}", note.id);
            if let Some(result) = app.after_mutation().await? {
                print_result(&result);
            }
        }
        Command::AddTask {
            title,
            description,
            priority,
            category,
            due,
        } => {
            let due_date = match due {
                Some(raw) => match time::parse(&raw) {
                    Some(at) => Some(at),
                    None => bail!("invalid due date: {}", raw),
                },
                None => None,
            };
            let task = app
                .add_task(NewTask {
                    title,
                    description,
                    priority: priority.into(),
                    category,
                    due_date,
                })
                .await?;
            println!("Added task {}", task.id);
            if let Some(result) = app.after_mutation().await? {
                print_result(&result);
            }
        }
        Command::List { kind } => {
            if kind != Some(ListKind::Tasks) {
                for note in app.notes().await? {
                    println!("note  {}  {}", note.id, note.title);
                }
            }
            if kind != Some(ListKind::Notes) {
                for task in app.tasks().await? {
                    println!("task  {}  [{:?}] {}", task.id, task.status, task.title);
                }
            }
        }
    }

    Ok(())
}

fn print_result(result: &SyncResult) {
    println!(
        "Notes: {} up, {} down, {} conflict(s)",
        result.notes.uploaded, result.notes.downloaded, result.notes.conflicts
    );
    println!(
        "Tasks: {} up, {} down, {} conflict(s)",
        result.tasks.uploaded, result.tasks.downloaded, result.tasks.conflicts
    );
    if let Some(error) = &result.error {
        println!("Error: {}", error);
    }
}
