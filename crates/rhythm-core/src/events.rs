use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cycle::{CycleType, Mood};
use crate::stats::SessionStatistics;
use crate::suggest::{Suggestion, SuggestionRequest};
use crate::timer::Phase;

/// Every state change in a session produces an Event.
/// Renderers subscribe to them; the driver reacts to the scheduling ones.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Started {
        phase: Phase,
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    Paused {
        remaining_secs: u64,
        at: DateTime<Utc>,
    },
    Ticked {
        phase: Phase,
        remaining_secs: u64,
    },
    PhaseCompleted {
        phase: Phase,
        at: DateTime<Utc>,
    },
    /// Work countdown finished; the clock is held until a mood is chosen.
    MoodRequested {
        duration_minutes: f64,
        at: DateTime<Utc>,
    },
    CycleRecorded {
        id: i64,
        cycle_type: CycleType,
        duration_minutes: f64,
        mood: Option<Mood>,
    },
    /// A write or statistics query failed. The session carried on.
    StorageFailed {
        message: String,
    },
    StatisticsRefreshed {
        statistics: SessionStatistics,
    },
    /// The next phase starts by itself once `delay_ms` has passed,
    /// unless a user action claims the ticket first.
    AutoStartScheduled {
        ticket: u64,
        delay_ms: u64,
    },
    /// A break countdown was loaded; suggestions should be fetched for it.
    BreakStarted {
        request: SuggestionRequest,
        remaining_secs: u64,
    },
    WorkStarted {
        remaining_secs: u64,
    },
    PhaseToggled {
        phase: Phase,
        remaining_secs: u64,
    },
    SettingsSaved {
        work_minutes: f64,
        break_minutes: f64,
        remaining_secs: u64,
    },
    Reset {
        at: DateTime<Utc>,
    },
    SuggestionReady {
        suggestion: Suggestion,
    },
}
