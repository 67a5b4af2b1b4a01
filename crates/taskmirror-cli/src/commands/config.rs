//! Configuration commands.

use clap::Subcommand;
use taskmirror_core::Config;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the current configuration
    Show,
    /// Set the calendar tasks are mirrored into
    SetCalendar {
        /// Calendar id (e.g. "primary" or an address)
        id: String,
    },
    /// Enable or disable automatic sync after edits
    SetAutoSync {
        /// true or false
        enabled: bool,
    },
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        ConfigAction::Show => {
            let config = Config::load()?;
            print!("{}", toml::to_string_pretty(&config)?);
        }
        ConfigAction::SetCalendar { id } => {
            let mut config = Config::load()?;
            config.sync.calendar_id = id;
            config.save()?;
            println!("Calendar set to: {}", config.sync.calendar_id);
        }
        ConfigAction::SetAutoSync { enabled } => {
            let mut config = Config::load()?;
            config.sync.auto_sync = enabled;
            config.save()?;
            println!("Auto-sync: {enabled}");
        }
    }
    Ok(())
}
