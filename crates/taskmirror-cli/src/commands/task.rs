//! Task management commands.

use clap::Subcommand;
use taskmirror_core::{Config, Priority, Recurrence, Task, TaskStore};
use uuid::Uuid;

use crate::common;

#[derive(Subcommand)]
pub enum TaskAction {
    /// Add a new task
    Add {
        /// Task title
        title: String,
        /// Task description
        #[arg(long)]
        description: Option<String>,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
        /// Due time (HH:MM), requires --due
        #[arg(long)]
        time: Option<String>,
        /// Priority: high, normal or low
        #[arg(long, default_value = "normal")]
        priority: String,
        /// Category label
        #[arg(long)]
        category: Option<String>,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
        /// Estimated duration in minutes
        #[arg(long, default_value = "0")]
        estimate: u32,
        /// Recurrence: none, daily, weekly or monthly
        #[arg(long, default_value = "none")]
        recur: String,
        /// Do not mirror this task to the calendar
        #[arg(long)]
        no_sync: bool,
    },
    /// List tasks
    List {
        /// Filter by category
        #[arg(long)]
        category: Option<String>,
        /// Include completed tasks
        #[arg(long)]
        all: bool,
    },
    /// Show one task
    Show {
        /// Task ID
        id: String,
    },
    /// Mark a task done (recurring tasks advance to the next occurrence)
    Done {
        /// Task ID
        id: String,
    },
    /// Remove a task
    Rm {
        /// Task ID
        id: String,
    },
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = TaskStore::open()?;

    match action {
        TaskAction::Add {
            title,
            description,
            due,
            time,
            priority,
            category,
            tags,
            estimate,
            recur,
            no_sync,
        } => {
            let mut task = Task::new(Uuid::new_v4().to_string(), title);
            task.description = description.unwrap_or_default();
            task.due_date = due.map(|d| d.parse()).transpose()?;
            task.due_time = time
                .map(|t| chrono::NaiveTime::parse_from_str(&t, "%H:%M"))
                .transpose()?;
            if task.due_time.is_some() && task.due_date.is_none() {
                return Err("--time requires --due".into());
            }
            task.priority = Priority::parse(&priority);
            task.category = category;
            task.tags = tags
                .map(|t| t.split(',').map(|s| s.trim().to_string()).collect())
                .unwrap_or_default();
            task.estimate_minutes = estimate;
            task.recurrence = Recurrence::parse(&recur);
            task.synced = !no_sync;

            println!("Task created: {}", task.id);
            println!("{}", serde_json::to_string_pretty(&task)?);
            store.tasks.push(task);
            store.save()?;
            auto_sync_if_enabled(&mut store)?;
        }
        TaskAction::List { category, all } => {
            let filtered: Vec<_> = store
                .tasks
                .iter()
                .filter(|task| all || !task.completed)
                .filter(|task| match &category {
                    Some(c) => task.category.as_deref() == Some(c.as_str()),
                    None => true,
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&filtered)?);
        }
        TaskAction::Show { id } => match store.find(&id) {
            Some(task) => println!("{}", serde_json::to_string_pretty(task)?),
            None => return Err(format!("Task not found: {id}").into()),
        },
        TaskAction::Done { id } => {
            let task = store
                .find_mut(&id)
                .ok_or_else(|| format!("Task not found: {id}"))?;

            match task.next_occurrence() {
                Some(next) => {
                    // Recurring tasks roll over instead of completing.
                    task.due_date = Some(next);
                    task.touch();
                    println!("Task recurs: next occurrence {next}");
                }
                None => {
                    task.completed = true;
                    task.touch();
                    println!("Task completed: {id}");
                }
            }
            store.save()?;
            auto_sync_if_enabled(&mut store)?;
        }
        TaskAction::Rm { id } => {
            let task = store
                .remove(&id)
                .ok_or_else(|| format!("Task not found: {id}"))?;

            if let Some(event_id) = &task.remote_event_id {
                delete_remote_event(event_id);
            }
            store.save()?;
            println!("Task removed: {id}");
        }
    }
    Ok(())
}

/// Best-effort removal of the mirrored event. A failure leaves an orphan
/// on the calendar but never blocks the local removal.
fn delete_remote_event(event_id: &str) {
    use taskmirror_core::{CalendarClient, GoogleCalendarClient};

    let result = (|| -> Result<(), Box<dyn std::error::Error>> {
        let config = Config::load()?;
        let client = GoogleCalendarClient::new(
            std::sync::Arc::new(common::EnvTokenSource),
            config.sync.calendar_id.as_str(),
        );
        let runtime = common::runtime()?;
        runtime.block_on(client.delete_event(event_id))?;
        Ok(())
    })();

    if let Err(e) = result {
        eprintln!("warning: calendar event {event_id} not removed: {e}");
    }
}

fn auto_sync_if_enabled(store: &mut TaskStore) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    if !config.sync.auto_sync {
        return Ok(());
    }
    if let taskmirror_core::SyncOutcome::ConflictsPending(conflicts) =
        super::sync::run_pass(store, &config, None)?
    {
        println!(
            "Sync paused: {} conflict(s); run `taskmirror sync resolve --keep-local` or `--keep-remote`",
            conflicts.len()
        );
    }
    Ok(())
}
