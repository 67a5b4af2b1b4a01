//! JSON file persistence for the task collection.
//!
//! The reconciliation engine itself never touches disk; the store is what
//! surrounds a sync pass. It also carries the last-successful-sync
//! timestamp, the one piece of sync metadata that must survive restarts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::{CoreError, StoreError};
use crate::task::Task;

/// On-disk shape of the store file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    tasks: Vec<Task>,
    #[serde(default)]
    last_sync_at: Option<DateTime<Utc>>,
}

/// File-backed task collection.
#[derive(Debug)]
pub struct TaskStore {
    path: PathBuf,
    pub tasks: Vec<Task>,
    pub last_sync_at: Option<DateTime<Utc>>,
}

impl TaskStore {
    /// Open the store at the default location, creating an empty one if
    /// no file exists yet.
    pub fn open() -> Result<Self, CoreError> {
        let path = data_dir()?.join("tasks.json");
        Self::open_at(path)
    }

    /// Open a store at a specific path (tests).
    pub fn open_at(path: PathBuf) -> Result<Self, CoreError> {
        if !path.exists() {
            return Ok(Self {
                path,
                tasks: Vec::new(),
                last_sync_at: None,
            });
        }

        let content = std::fs::read_to_string(&path).map_err(|source| StoreError::ReadFailed {
            path: path.clone(),
            source,
        })?;
        let file: StoreFile =
            serde_json::from_str(&content).map_err(|source| StoreError::Corrupt {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            tasks: file.tasks,
            last_sync_at: file.last_sync_at,
        })
    }

    /// Persist the collection and sync metadata.
    pub fn save(&self) -> Result<(), CoreError> {
        let file = StoreFile {
            tasks: self.tasks.clone(),
            last_sync_at: self.last_sync_at,
        };
        let content = serde_json::to_string_pretty(&file)?;
        std::fs::write(&self.path, content).map_err(|source| StoreError::WriteFailed {
            path: self.path.clone(),
            source,
        })?;
        Ok(())
    }

    pub fn find(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Remove a task, returning it if present.
    pub fn remove(&mut self, id: &str) -> Option<Task> {
        let index = self.tasks.iter().position(|t| t.id == id)?;
        Some(self.tasks.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn open_missing_file_yields_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::open_at(dir.path().join("tasks.json")).unwrap();
        assert!(store.tasks.is_empty());
        assert!(store.last_sync_at.is_none());
    }

    #[test]
    fn save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.json");

        let mut store = TaskStore::open_at(path.clone()).unwrap();
        store.tasks.push(Task::new("t-1", "Persisted"));
        store.last_sync_at = Some(Utc::now());
        store.save().unwrap();

        let reloaded = TaskStore::open_at(path).unwrap();
        assert_eq!(reloaded.tasks.len(), 1);
        assert_eq!(reloaded.tasks[0].id, "t-1");
        assert!(reloaded.last_sync_at.is_some());
    }

    #[test]
    fn corrupt_file_is_an_error_not_a_panic() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.json");
        std::fs::write(&path, "not json").unwrap();

        let err = TaskStore::open_at(path).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Store(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn remove_returns_task() {
        let dir = TempDir::new().unwrap();
        let mut store = TaskStore::open_at(dir.path().join("tasks.json")).unwrap();
        store.tasks.push(Task::new("t-1", "one"));
        store.tasks.push(Task::new("t-2", "two"));

        let removed = store.remove("t-1").unwrap();
        assert_eq!(removed.title, "one");
        assert!(store.find("t-1").is_none());
        assert!(store.find("t-2").is_some());
    }
}
