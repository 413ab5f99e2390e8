//! Session state machine.
//!
//! A tick-driven countdown over two phases, with a mood gate after work.
//! Like the rest of the timer module it owns no thread: the caller invokes
//! [`SessionMachine::tick`] once per second while the clock runs.
//!
//! ## States
//!
//! ```text
//! Work.Paused --start--> Work.Running --0s--> Work.AwaitingMood
//!      ^                                          |
//!      |                      resolve_mood(keep_going) -> Work.Running
//!      |                      resolve_mood(other)      -> Break.Running
//!      |                                          |
//!      +---------------- Break.Running --0s-------+--> Work.Running
//! ```
//!
//! Transitions out of a completed phase load the next countdown at once and
//! schedule its start after a short delay. Any explicit user action in that
//! window cancels the automatic start.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::notifier::Notifier;
use crate::cycle::{CycleType, Mood};
use crate::error::ValidationError;
use crate::events::SessionEvent;
use crate::stats::{SessionStatistics, StatisticsAggregator};
use crate::storage::config::validate_durations;
use crate::storage::{CycleStore, TimerConfig};
use crate::suggest::SuggestionRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Work,
    Break,
}

impl Phase {
    pub fn other(self) -> Phase {
        match self {
            Phase::Work => Phase::Break,
            Phase::Break => Phase::Work,
        }
    }

    pub fn cycle_type(self) -> CycleType {
        match self {
            Phase::Work => CycleType::Work,
            Phase::Break => CycleType::Break,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Phase::Work => "Focus Time",
            Phase::Break => "Break Time",
        }
    }
}

/// Where the clock stands within the current phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Paused,
    AwaitingMood,
}

/// A finished work interval waiting for the user's mood.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PendingMood {
    pub cycle_type: CycleType,
    pub duration_minutes: f64,
}

/// The live timer state. Only [`SessionMachine`] mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub phase: Phase,
    pub is_running: bool,
    pub remaining_secs: u64,
    pub work_duration_minutes: f64,
    pub break_duration_minutes: f64,
    pub cycles_completed_this_session: u32,
    pub pending_mood_capture: Option<PendingMood>,
    /// The next phase is loaded and waiting for its delayed start.
    pub auto_start_pending: bool,
    pub last_mood: Option<Mood>,
    /// Work minutes recorded since the last break.
    pub work_streak_minutes: f64,
}

impl SessionState {
    pub fn status(&self) -> SessionStatus {
        if self.pending_mood_capture.is_some() {
            SessionStatus::AwaitingMood
        } else if self.is_running {
            SessionStatus::Running
        } else {
            SessionStatus::Paused
        }
    }

    pub fn phase_duration_minutes(&self, phase: Phase) -> f64 {
        match phase {
            Phase::Work => self.work_duration_minutes,
            Phase::Break => self.break_duration_minutes,
        }
    }

    pub fn phase_total_secs(&self) -> u64 {
        minutes_to_secs(self.phase_duration_minutes(self.phase))
    }
}

/// Convert configured minutes (possibly fractional) to whole seconds.
pub fn minutes_to_secs(minutes: f64) -> u64 {
    if minutes.is_finite() && minutes > 0.0 {
        (minutes * 60.0).round() as u64
    } else {
        0
    }
}

/// Parse a settings field the way the settings form does.
pub fn parse_minutes(field: &str, input: &str) -> Result<u32, ValidationError> {
    input
        .trim()
        .parse::<u32>()
        .map_err(|_| ValidationError::NotANumber {
            field: field.to_string(),
            input: input.to_string(),
        })
}

/// The session state machine.
///
/// Writes go through the injected [`CycleStore`]; the completion alert goes
/// through the injected [`Notifier`]. Neither can halt the machine: failures
/// are logged and reported as [`SessionEvent::StorageFailed`].
pub struct SessionMachine {
    state: SessionState,
    auto_start_delay_ms: u64,
    alert: bool,
    store: Box<dyn CycleStore>,
    notifier: Box<dyn Notifier>,
    statistics: SessionStatistics,
    /// Incremented whenever a scheduled auto-start is issued or cancelled.
    ticket: u64,
}

impl SessionMachine {
    /// Create a machine in `Work.Paused` with a full work countdown.
    pub fn new(
        timer: &TimerConfig,
        store: Box<dyn CycleStore>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        let state = SessionState {
            phase: Phase::Work,
            is_running: false,
            remaining_secs: minutes_to_secs(timer.work_minutes),
            work_duration_minutes: timer.work_minutes,
            break_duration_minutes: timer.break_minutes,
            cycles_completed_this_session: 0,
            pending_mood_capture: None,
            auto_start_pending: false,
            last_mood: None,
            work_streak_minutes: 0.0,
        };
        let statistics = match StatisticsAggregator::refresh(store.as_ref()) {
            Ok(stats) => stats,
            Err(e) => {
                error!(error = %e, "could not load initial statistics");
                SessionStatistics::default()
            }
        };
        Self {
            state,
            auto_start_delay_ms: timer.auto_start_delay_ms,
            alert: timer.alert,
            store,
            notifier,
            statistics,
            ticket: 0,
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn status(&self) -> SessionStatus {
        self.state.status()
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running
    }

    pub fn remaining_secs(&self) -> u64 {
        self.state.remaining_secs
    }

    pub fn statistics(&self) -> &SessionStatistics {
        &self.statistics
    }

    /// 0.0 .. 1.0 through the current phase. A zero-length phase counts as done.
    pub fn progress_fraction(&self) -> f64 {
        let total = self.state.phase_total_secs();
        if total == 0 {
            return 1.0;
        }
        let elapsed = total.saturating_sub(self.state.remaining_secs);
        elapsed as f64 / total as f64
    }

    /// Remaining time as `MM:SS`.
    pub fn remaining_display(&self) -> String {
        let secs = self.state.remaining_secs;
        format!("{:02}:{:02}", secs / 60, secs % 60)
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub fn start(&mut self) -> Result<Vec<SessionEvent>, ValidationError> {
        if self.state.pending_mood_capture.is_some() {
            return Err(ValidationError::AwaitingMood);
        }
        self.cancel_auto_start();
        if self.state.is_running {
            return Ok(Vec::new());
        }
        self.state.is_running = true;
        Ok(vec![self.started_event()])
    }

    /// Stop the clock, keeping the remaining time. Also cancels a pending
    /// automatic start.
    pub fn pause(&mut self) -> Vec<SessionEvent> {
        let was_scheduled = self.state.auto_start_pending;
        self.cancel_auto_start();
        if !self.state.is_running && !was_scheduled {
            return Vec::new();
        }
        self.state.is_running = false;
        vec![SessionEvent::Paused {
            remaining_secs: self.state.remaining_secs,
            at: Utc::now(),
        }]
    }

    /// Advance the clock by one second. The tick that reaches zero completes
    /// the phase.
    pub fn tick(&mut self) -> Vec<SessionEvent> {
        if !self.state.is_running {
            return Vec::new();
        }
        if self.state.remaining_secs <= 1 {
            self.state.remaining_secs = 0;
            return self.complete_phase();
        }
        self.state.remaining_secs -= 1;
        vec![SessionEvent::Ticked {
            phase: self.state.phase,
            remaining_secs: self.state.remaining_secs,
        }]
    }

    /// Back to `Work.Paused` with a fresh work countdown. Discards any break
    /// in progress and any pending mood capture.
    pub fn reset(&mut self) -> Vec<SessionEvent> {
        self.cancel_auto_start();
        if let Some(pending) = self.state.pending_mood_capture.take() {
            debug!(duration_minutes = pending.duration_minutes, "discarding pending mood capture");
        }
        self.state.is_running = false;
        self.state.phase = Phase::Work;
        self.state.remaining_secs = minutes_to_secs(self.state.work_duration_minutes);
        self.state.work_streak_minutes = 0.0;
        vec![SessionEvent::Reset { at: Utc::now() }]
    }

    /// Record the finished work cycle with `mood` and move on.
    pub fn resolve_mood(&mut self, mood: Mood) -> Result<Vec<SessionEvent>, ValidationError> {
        let pending = self
            .state
            .pending_mood_capture
            .take()
            .ok_or(ValidationError::NoPendingMood)?;

        let mut events = self.record(pending.cycle_type, pending.duration_minutes, Some(mood));
        self.state.cycles_completed_this_session += 1;
        self.state.last_mood = Some(mood);
        self.state.work_streak_minutes += pending.duration_minutes;

        let next = if mood == Mood::KeepGoing {
            Phase::Work
        } else {
            Phase::Break
        };
        events.extend(self.load_phase(next));
        events.push(self.schedule_auto_start());
        Ok(events)
    }

    /// Swap phase by hand. Nothing is recorded.
    pub fn toggle_cycle(&mut self) -> Result<Vec<SessionEvent>, ValidationError> {
        if self.state.pending_mood_capture.is_some() {
            return Err(ValidationError::AwaitingMood);
        }
        if self.state.is_running {
            return Err(ValidationError::WhileRunning);
        }
        self.cancel_auto_start();
        let next = self.state.phase.other();
        let mut events = vec![SessionEvent::PhaseToggled {
            phase: next,
            remaining_secs: minutes_to_secs(self.state.phase_duration_minutes(next)),
        }];
        events.extend(self.load_phase(next));
        Ok(events)
    }

    /// Apply new durations. Out-of-range input changes nothing, and neither
    /// does a save while a finished work cycle still waits for its mood.
    pub fn save_settings(
        &mut self,
        work_minutes: u32,
        break_minutes: u32,
    ) -> Result<Vec<SessionEvent>, ValidationError> {
        if self.state.pending_mood_capture.is_some() {
            return Err(ValidationError::AwaitingMood);
        }
        let (work, brk) = (f64::from(work_minutes), f64::from(break_minutes));
        validate_durations(work, brk)?;
        self.cancel_auto_start();
        self.state.work_duration_minutes = work;
        self.state.break_duration_minutes = brk;
        self.state.is_running = false;
        self.state.remaining_secs = self.state.phase_total_secs();
        info!(work_minutes, break_minutes, "settings saved");
        Ok(vec![SessionEvent::SettingsSaved {
            work_minutes: work,
            break_minutes: brk,
            remaining_secs: self.state.remaining_secs,
        }])
    }

    /// What to ask the suggester for, while a break is loaded.
    pub fn suggestion_request(&self) -> Option<SuggestionRequest> {
        (self.state.phase == Phase::Break).then(|| SuggestionRequest {
            worked_for_minutes: self.state.work_streak_minutes,
            break_minutes: self.state.break_duration_minutes,
            mood: self.state.last_mood,
        })
    }

    /// Start the clock for a scheduled auto-start, unless the ticket went
    /// stale because the user acted in the meantime.
    pub fn fire_auto_start(&mut self, ticket: u64) -> Vec<SessionEvent> {
        if !self.state.auto_start_pending || ticket != self.ticket {
            debug!(ticket, current = self.ticket, "ignoring stale auto-start");
            return Vec::new();
        }
        self.state.auto_start_pending = false;
        self.state.is_running = true;
        vec![self.started_event()]
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn complete_phase(&mut self) -> Vec<SessionEvent> {
        let phase = self.state.phase;
        self.state.is_running = false;
        if self.alert {
            self.notifier.phase_completed(phase);
        }
        info!(phase = ?phase, "phase completed");
        let mut events = vec![SessionEvent::PhaseCompleted {
            phase,
            at: Utc::now(),
        }];

        match phase {
            Phase::Work => {
                let duration_minutes = self.state.work_duration_minutes;
                self.state.pending_mood_capture = Some(PendingMood {
                    cycle_type: CycleType::Work,
                    duration_minutes,
                });
                events.push(SessionEvent::MoodRequested {
                    duration_minutes,
                    at: Utc::now(),
                });
            }
            Phase::Break => {
                let duration = self.state.break_duration_minutes;
                events.extend(self.record(CycleType::Break, duration, None));
                self.state.work_streak_minutes = 0.0;
                events.extend(self.load_phase(Phase::Work));
                events.push(self.schedule_auto_start());
            }
        }
        events
    }

    /// Load a full countdown for `phase` without starting it.
    fn load_phase(&mut self, phase: Phase) -> Vec<SessionEvent> {
        self.state.phase = phase;
        self.state.is_running = false;
        self.state.remaining_secs = self.state.phase_total_secs();
        let remaining_secs = self.state.remaining_secs;
        match self.suggestion_request() {
            None => vec![SessionEvent::WorkStarted { remaining_secs }],
            Some(request) => vec![SessionEvent::BreakStarted {
                request,
                remaining_secs,
            }],
        }
    }

    fn record(
        &mut self,
        cycle_type: CycleType,
        duration_minutes: f64,
        mood: Option<Mood>,
    ) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        match self.store.add_cycle(cycle_type, duration_minutes, mood) {
            Ok(id) => events.push(SessionEvent::CycleRecorded {
                id,
                cycle_type,
                duration_minutes,
                mood,
            }),
            Err(e) => {
                error!(error = %e, cycle_type = %cycle_type, "failed to save cycle");
                events.push(SessionEvent::StorageFailed {
                    message: e.to_string(),
                });
            }
        }
        match StatisticsAggregator::refresh(self.store.as_ref()) {
            Ok(stats) => {
                self.statistics = stats.clone();
                events.push(SessionEvent::StatisticsRefreshed { statistics: stats });
            }
            Err(e) => {
                error!(error = %e, "failed to refresh statistics");
                events.push(SessionEvent::StorageFailed {
                    message: e.to_string(),
                });
            }
        }
        events
    }

    fn schedule_auto_start(&mut self) -> SessionEvent {
        self.ticket += 1;
        self.state.auto_start_pending = true;
        SessionEvent::AutoStartScheduled {
            ticket: self.ticket,
            delay_ms: self.auto_start_delay_ms,
        }
    }

    fn cancel_auto_start(&mut self) {
        if self.state.auto_start_pending {
            debug!(ticket = self.ticket, "auto-start cancelled by user action");
        }
        self.state.auto_start_pending = false;
        self.ticket += 1;
    }

    fn started_event(&self) -> SessionEvent {
        SessionEvent::Started {
            phase: self.state.phase,
            remaining_secs: self.state.remaining_secs,
            at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use crate::timer::SilentNotifier;

    fn machine(work: f64, brk: f64) -> SessionMachine {
        let timer = TimerConfig {
            work_minutes: work,
            break_minutes: brk,
            ..TimerConfig::default()
        };
        SessionMachine::new(
            &timer,
            Box::new(Database::open_memory().unwrap()),
            Box::new(SilentNotifier),
        )
    }

    fn run_ticks(m: &mut SessionMachine, n: usize) -> Vec<SessionEvent> {
        (0..n).flat_map(|_| m.tick()).collect()
    }

    #[test]
    fn starts_paused_in_work() {
        let m = machine(25.0, 5.0);
        assert_eq!(m.phase(), Phase::Work);
        assert_eq!(m.status(), SessionStatus::Paused);
        assert_eq!(m.remaining_secs(), 25 * 60);
        assert_eq!(m.remaining_display(), "25:00");
    }

    #[test]
    fn tick_ignored_while_paused() {
        let mut m = machine(1.0, 1.0);
        assert!(m.tick().is_empty());
        assert_eq!(m.remaining_secs(), 60);
    }

    #[test]
    fn pause_preserves_remaining() {
        let mut m = machine(1.0, 1.0);
        m.start().unwrap();
        run_ticks(&mut m, 10);
        let events = m.pause();
        assert!(matches!(events[0], SessionEvent::Paused { remaining_secs: 50, .. }));
        assert!(!m.is_running());
        assert!(m.pause().is_empty());
    }

    #[test]
    fn fractional_minutes_round_to_seconds() {
        let m = machine(0.1, 0.1);
        assert_eq!(m.remaining_secs(), 6);
    }

    #[test]
    fn start_rejected_while_awaiting_mood() {
        let mut m = machine(1.0, 1.0);
        m.start().unwrap();
        run_ticks(&mut m, 60);
        assert_eq!(m.start().unwrap_err(), ValidationError::AwaitingMood);
        assert_eq!(m.toggle_cycle().unwrap_err(), ValidationError::AwaitingMood);
    }

    #[test]
    fn resolve_mood_without_pending_is_rejected() {
        let mut m = machine(1.0, 1.0);
        assert_eq!(
            m.resolve_mood(Mood::Good).unwrap_err(),
            ValidationError::NoPendingMood
        );
    }

    #[test]
    fn toggle_swaps_phase_without_recording() {
        let mut m = machine(25.0, 5.0);
        let events = m.toggle_cycle().unwrap();
        assert_eq!(m.phase(), Phase::Break);
        assert_eq!(m.remaining_secs(), 5 * 60);
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::BreakStarted { .. })));
        assert!(!events
            .iter()
            .any(|e| matches!(e, SessionEvent::CycleRecorded { .. })));

        m.toggle_cycle().unwrap();
        assert_eq!(m.phase(), Phase::Work);
        assert_eq!(m.remaining_secs(), 25 * 60);
    }

    #[test]
    fn toggle_rejected_while_running() {
        let mut m = machine(25.0, 5.0);
        m.start().unwrap();
        assert_eq!(m.toggle_cycle().unwrap_err(), ValidationError::WhileRunning);
    }

    #[test]
    fn reset_discards_break_and_pending_mood() {
        let mut m = machine(1.0, 1.0);
        m.start().unwrap();
        run_ticks(&mut m, 60);
        assert_eq!(m.status(), SessionStatus::AwaitingMood);
        m.reset();
        assert_eq!(m.status(), SessionStatus::Paused);
        assert_eq!(m.phase(), Phase::Work);
        assert_eq!(m.remaining_secs(), 60);
        assert!(m.state().pending_mood_capture.is_none());
    }

    #[test]
    fn user_action_cancels_scheduled_auto_start() {
        let mut m = machine(1.0, 1.0);
        m.start().unwrap();
        run_ticks(&mut m, 60);
        let events = m.resolve_mood(Mood::Good).unwrap();
        let ticket = events
            .iter()
            .find_map(|e| match e {
                SessionEvent::AutoStartScheduled { ticket, .. } => Some(*ticket),
                _ => None,
            })
            .unwrap();
        assert!(m.state().auto_start_pending);

        m.pause();
        assert!(!m.state().auto_start_pending);
        assert!(m.fire_auto_start(ticket).is_empty());
        assert!(!m.is_running());
    }

    #[test]
    fn auto_start_fires_with_current_ticket() {
        let mut m = machine(1.0, 1.0);
        m.start().unwrap();
        run_ticks(&mut m, 60);
        let events = m.resolve_mood(Mood::Tired).unwrap();
        let Some(SessionEvent::AutoStartScheduled { ticket, delay_ms }) = events.last().cloned()
        else {
            panic!("expected AutoStartScheduled last");
        };
        assert_eq!(delay_ms, 1000);
        let started = m.fire_auto_start(ticket);
        assert!(matches!(started[0], SessionEvent::Started { phase: Phase::Break, .. }));
        assert!(m.is_running());
        assert!(m.fire_auto_start(ticket).is_empty());
    }

    #[test]
    fn break_request_carries_work_streak_and_mood() {
        let mut m = machine(1.0, 1.0);
        m.start().unwrap();
        run_ticks(&mut m, 60);
        m.resolve_mood(Mood::KeepGoing).unwrap();
        m.start().unwrap();
        run_ticks(&mut m, 60);
        let events = m.resolve_mood(Mood::Stressed).unwrap();
        let request = events
            .iter()
            .find_map(|e| match e {
                SessionEvent::BreakStarted { request, .. } => Some(*request),
                _ => None,
            })
            .unwrap();
        assert_eq!(request.worked_for_minutes, 2.0);
        assert_eq!(request.break_minutes, 1.0);
        assert_eq!(request.mood, Some(Mood::Stressed));
    }

    #[test]
    fn suggestion_request_only_during_break() {
        let mut m = machine(1.0, 3.0);
        assert!(m.suggestion_request().is_none());
        m.toggle_cycle().unwrap();
        let request = m.suggestion_request().unwrap();
        assert_eq!(request.break_minutes, 3.0);
        assert_eq!(request.mood, None);
    }

    #[test]
    fn settings_rejected_while_awaiting_mood() {
        let mut m = machine(1.0, 1.0);
        m.start().unwrap();
        run_ticks(&mut m, 60);
        assert_eq!(m.save_settings(30, 10).unwrap_err(), ValidationError::AwaitingMood);
        assert_eq!(m.state().work_duration_minutes, 1.0);
        assert_eq!(m.state().remaining_secs, 0);
        assert_eq!(
            m.state().pending_mood_capture.as_ref().map(|p| p.duration_minutes),
            Some(1.0)
        );

        m.resolve_mood(Mood::Good).unwrap();
        assert!(m.save_settings(30, 10).is_ok());
        assert_eq!(m.state().break_duration_minutes, 10.0);
    }

    #[test]
    fn zero_length_phase_reports_complete_progress() {
        let m = machine(0.0, 5.0);
        assert_eq!(m.progress_fraction(), 1.0);
    }

    #[test]
    fn progress_tracks_elapsed_fraction() {
        let mut m = machine(1.0, 1.0);
        m.start().unwrap();
        run_ticks(&mut m, 15);
        assert!((m.progress_fraction() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn parse_minutes_rejects_text() {
        assert_eq!(parse_minutes("work", " 25 ").unwrap(), 25);
        assert!(matches!(
            parse_minutes("work", "abc"),
            Err(ValidationError::NotANumber { .. })
        ));
    }
}
