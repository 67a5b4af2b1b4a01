//! Calendar synchronization commands.

use clap::Subcommand;
use taskmirror_core::{Config, Conflict, Resolution, SyncOutcome, TaskStore, TokenSource};

use crate::common;

#[derive(Subcommand)]
pub enum SyncAction {
    /// Run one synchronization pass
    Run,
    /// Show synchronization status
    Status,
    /// Run a pass, settling any conflicts with a uniform policy
    Resolve {
        /// Keep the local version of every conflicting task
        #[arg(long, conflicts_with = "keep_remote")]
        keep_local: bool,
        /// Keep the remote version of every conflicting task
        #[arg(long)]
        keep_remote: bool,
    },
}

pub fn run(action: SyncAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SyncAction::Run => sync_once(None),
        SyncAction::Resolve {
            keep_local,
            keep_remote,
        } => {
            if keep_local == keep_remote {
                return Err("pass exactly one of --keep-local or --keep-remote".into());
            }
            let choice = if keep_local {
                Resolution::KeepLocal
            } else {
                Resolution::KeepRemote
            };
            sync_once(Some(choice))
        }
        SyncAction::Status => status(),
    }
}

fn sync_once(policy: Option<Resolution>) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let mut store = TaskStore::open()?;

    match run_pass(&mut store, &config, policy)? {
        SyncOutcome::Applied(report) => {
            println!(
                "Sync complete: {} created, {} updated, {} deleted, {} imported, {} merged",
                report.created, report.updated, report.deleted, report.imported, report.merged
            );
            if report.deferred > 0 {
                println!(
                    "{} change(s) failed and will be retried next pass",
                    report.deferred
                );
            }
            Ok(())
        }
        SyncOutcome::ConflictsPending(conflicts) => {
            println!("Sync paused: {} conflict(s)", conflicts.len());
            for conflict in &conflicts {
                println!("  {} - {}", conflict.task_id(), describe(conflict));
            }
            Err("resolve with `taskmirror sync resolve --keep-local` or `--keep-remote`".into())
        }
    }
}

/// One full pass: synchronize, optionally settle conflicts by policy,
/// persist the store and the sync timestamp.
pub(crate) fn run_pass(
    store: &mut TaskStore,
    config: &Config,
    policy: Option<Resolution>,
) -> Result<SyncOutcome, Box<dyn std::error::Error>> {
    let session = common::session(config, store);
    let runtime = common::runtime()?;

    let outcome = runtime.block_on(async {
        let outcome = session.synchronize(&mut store.tasks).await?;
        match (outcome, policy) {
            (SyncOutcome::ConflictsPending(conflicts), Some(choice)) => {
                let resolutions = conflicts.into_iter().map(|c| (c, choice)).collect();
                session.resolve_conflicts(&mut store.tasks, resolutions).await
            }
            (outcome, _) => Ok(outcome),
        }
    })?;

    store.last_sync_at = session.last_sync_at();
    store.save()?;
    Ok(outcome)
}

fn status() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let store = TaskStore::open()?;

    let linked = store
        .tasks
        .iter()
        .filter(|t| t.remote_event_id.is_some())
        .count();
    let awaiting = store
        .tasks
        .iter()
        .filter(|t| t.synced && t.remote_event_id.is_none())
        .count();

    println!("Calendar: {}", config.sync.calendar_id);
    println!(
        "Authenticated: {}",
        common::EnvTokenSource.is_authenticated()
    );
    match store.last_sync_at {
        Some(at) => println!("Last sync: {at}"),
        None => println!("Last sync: never"),
    }
    println!("Tasks: {} total, {} linked, {} awaiting push", store.tasks.len(), linked, awaiting);
    Ok(())
}

fn describe(conflict: &Conflict) -> &'static str {
    match conflict {
        Conflict::BothModified { .. } => "edited on both sides",
        Conflict::DeletedRemotelyModifiedLocally { .. } => "deleted remotely, edited locally",
    }
}
