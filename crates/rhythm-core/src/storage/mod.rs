pub(crate) mod config;
pub mod database;

pub use config::{
    is_placeholder_credential, Config, ProvidersConfig, TimerConfig, BREAK_MINUTES_RANGE,
    WORK_MINUTES_RANGE,
};
pub use database::{CycleStatistics, Database};

use std::path::PathBuf;

use crate::cycle::{Cycle, CycleType, Mood};
use crate::error::StorageError;

/// The persistence seam the session state machine writes through.
///
/// [`Database`] is the production implementation; tests substitute
/// in-memory or deliberately failing stores.
pub trait CycleStore: Send {
    /// Append one completed cycle, returning its id.
    fn add_cycle(
        &self,
        cycle_type: CycleType,
        duration_minutes: f64,
        mood: Option<Mood>,
    ) -> Result<i64, StorageError>;

    /// Every stored cycle, newest first.
    fn all_cycles(&self) -> Result<Vec<Cycle>, StorageError>;

    fn statistics(&self) -> Result<CycleStatistics, StorageError>;
}

/// Returns `~/.config/rhythm[-dev]/` based on RHYTHM_ENV.
///
/// Set RHYTHM_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("RHYTHM_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("rhythm-dev")
    } else {
        base_dir.join("rhythm")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
