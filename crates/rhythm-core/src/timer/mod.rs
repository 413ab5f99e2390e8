mod driver;
mod notifier;
mod session;

pub use driver::{SessionDriver, SuggestionSlot};
pub use notifier::{Notifier, SilentNotifier, ALERT_PATTERN_MS};
pub use session::{
    minutes_to_secs, parse_minutes, Phase, PendingMood, SessionMachine, SessionState,
    SessionStatus,
};
