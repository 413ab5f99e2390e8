//! # Rhythm Core Library
//!
//! Core logic for the Rhythm work/break timer. Every operation is reachable
//! from the `rhythm` CLI; any other front end is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Session machine**: a tick-driven countdown over work and break phases
//!   with a mood gate after each work interval. The caller drives `tick()`.
//! - **Driver**: a tokio runtime wrapper that owns the one-second clock,
//!   delayed auto-starts and background suggestion fetches
//! - **Storage**: SQLite cycle log and TOML configuration
//! - **Suggestions**: text (Gemini) and video (Arcade) providers behind a
//!   fallback chain that always yields something
//! - **Statistics**: counts and a daily summary derived from the cycle log
//!
//! ## Key Components
//!
//! - [`SessionMachine`]: session state machine
//! - [`SessionDriver`]: async handle that runs a machine in real time
//! - [`Database`]: cycle persistence
//! - [`Config`]: application configuration
//! - [`BreakSuggester`]: break suggestion chain

pub mod cycle;
pub mod error;
pub mod events;
pub mod stats;
pub mod storage;
pub mod suggest;
pub mod timer;

pub use cycle::{Cycle, CycleType, Mood};
pub use error::{ConfigurationError, CoreError, ProviderError, StorageError, ValidationError};
pub use events::SessionEvent;
pub use stats::{DailySummary, SessionStatistics, StatisticsAggregator, StatisticsSnapshot};
pub use storage::{Config, CycleStore, Database};
pub use suggest::{BreakSuggester, Suggestion, SuggestionRequest};
pub use timer::{Phase, SessionDriver, SessionMachine, SessionState, SessionStatus};
