mod config;
pub mod database;
pub mod migrations;

pub use config::{Config, PresentationConfig, SchedulingConfig};
pub use database::{
    Database, GoalRecord, GoalStatus, ProgressEntry, RecommendationRecord, RecommendationStatus,
};

use std::path::PathBuf;

/// Returns `~/.config/wellnudge[-dev]/` based on WELLNUDGE_ENV.
///
/// Set WELLNUDGE_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("WELLNUDGE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("wellnudge-dev")
    } else {
        base_dir.join("wellnudge")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
