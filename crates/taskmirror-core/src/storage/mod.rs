mod config;
pub mod task_store;

pub use config::Config;
pub use task_store::TaskStore;

use std::path::PathBuf;

use crate::error::{ConfigError, CoreError};

/// Returns `~/.config/taskmirror/`, honoring `TASKMIRROR_DATA_DIR` as an
/// override (tests, scripting).
///
/// # Errors
/// Returns an error if the directory cannot be created.
pub fn data_dir() -> Result<PathBuf, CoreError> {
    let dir = match std::env::var_os("TASKMIRROR_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => dirs::home_dir()
            .ok_or(ConfigError::NoConfigDir)?
            .join(".config")
            .join("taskmirror"),
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
