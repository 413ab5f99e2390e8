//! Integration tests for the session machine against a real cycle store.
//!
//! Covers the full work -> mood -> break -> work loop, the mood gate,
//! settings validation and behaviour when the store is unavailable.

use proptest::prelude::*;
use rhythm_core::storage::{CycleStatistics, TimerConfig};
use rhythm_core::timer::SilentNotifier;
use rhythm_core::{
    Cycle, CycleStore, CycleType, Database, Mood, Phase, SessionEvent, SessionMachine,
    SessionStatus, StorageError, ValidationError,
};

fn timer(work: f64, brk: f64) -> TimerConfig {
    TimerConfig {
        work_minutes: work,
        break_minutes: brk,
        ..TimerConfig::default()
    }
}

fn machine_with(store: Box<dyn CycleStore>, work: f64, brk: f64) -> SessionMachine {
    SessionMachine::new(&timer(work, brk), store, Box::new(SilentNotifier))
}

fn run_ticks(m: &mut SessionMachine, n: usize) -> Vec<SessionEvent> {
    (0..n).flat_map(|_| m.tick()).collect()
}

/// Database shared between the machine and the assertions.
struct SharedDb(std::sync::Arc<std::sync::Mutex<Database>>);

impl CycleStore for SharedDb {
    fn add_cycle(
        &self,
        cycle_type: CycleType,
        duration_minutes: f64,
        mood: Option<Mood>,
    ) -> Result<i64, StorageError> {
        self.0.lock().unwrap().add_cycle(cycle_type, duration_minutes, mood)
    }

    fn all_cycles(&self) -> Result<Vec<Cycle>, StorageError> {
        self.0.lock().unwrap().all_cycles()
    }

    fn statistics(&self) -> Result<CycleStatistics, StorageError> {
        self.0.lock().unwrap().statistics()
    }
}

fn shared() -> (std::sync::Arc<std::sync::Mutex<Database>>, Box<dyn CycleStore>) {
    let db = std::sync::Arc::new(std::sync::Mutex::new(Database::open_memory().unwrap()));
    (db.clone(), Box::new(SharedDb(db)))
}

struct BrokenStore;

impl CycleStore for BrokenStore {
    fn add_cycle(&self, _: CycleType, _: f64, _: Option<Mood>) -> Result<i64, StorageError> {
        Err(StorageError::Locked)
    }

    fn all_cycles(&self) -> Result<Vec<Cycle>, StorageError> {
        Err(StorageError::Locked)
    }

    fn statistics(&self) -> Result<CycleStatistics, StorageError> {
        Err(StorageError::Locked)
    }
}

#[test]
fn test_work_phase_waits_for_mood_without_writing() {
    let (db, store) = shared();
    let mut m = machine_with(store, 1.0, 1.0);
    m.start().unwrap();

    let events = run_ticks(&mut m, 59);
    assert_eq!(m.status(), SessionStatus::Running);
    assert!(!events.iter().any(|e| matches!(e, SessionEvent::PhaseCompleted { .. })));

    let events = run_ticks(&mut m, 1);
    assert_eq!(m.status(), SessionStatus::AwaitingMood);
    assert_eq!(m.remaining_secs(), 0);
    assert!(events.iter().any(|e| matches!(e, SessionEvent::MoodRequested { .. })));
    assert!(db.lock().unwrap().all_cycles().unwrap().is_empty());

    // Further ticks change nothing while the gate is closed.
    assert!(run_ticks(&mut m, 10).is_empty());
}

#[test]
fn test_keep_going_skips_the_break() {
    let (db, store) = shared();
    let mut m = machine_with(store, 1.0, 1.0);
    m.start().unwrap();
    run_ticks(&mut m, 60);

    let events = m.resolve_mood(Mood::KeepGoing).unwrap();
    assert_eq!(m.phase(), Phase::Work);
    assert_eq!(m.remaining_secs(), 60);
    assert_eq!(m.state().cycles_completed_this_session, 1);
    assert!(events
        .iter()
        .any(|e| matches!(e, SessionEvent::AutoStartScheduled { .. })));

    let cycles = db.lock().unwrap().all_cycles().unwrap();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].cycle_type, CycleType::Work);
    assert_eq!(cycles[0].mood, Some(Mood::KeepGoing));
}

#[test]
fn test_tired_mood_leads_to_break_then_back_to_work() {
    let (db, store) = shared();
    let mut m = machine_with(store, 1.0, 2.0);
    m.start().unwrap();
    run_ticks(&mut m, 60);

    let events = m.resolve_mood(Mood::Tired).unwrap();
    assert_eq!(m.phase(), Phase::Break);
    assert_eq!(m.remaining_secs(), 120);
    let request = events
        .iter()
        .find_map(|e| match e {
            SessionEvent::BreakStarted { request, .. } => Some(*request),
            _ => None,
        })
        .expect("break should request a suggestion");
    assert_eq!(request.worked_for_minutes, 1.0);
    assert_eq!(request.break_minutes, 2.0);
    assert_eq!(request.mood, Some(Mood::Tired));

    let ticket = events
        .iter()
        .find_map(|e| match e {
            SessionEvent::AutoStartScheduled { ticket, .. } => Some(*ticket),
            _ => None,
        })
        .unwrap();
    m.fire_auto_start(ticket);
    assert!(m.is_running());

    run_ticks(&mut m, 120);
    assert_eq!(m.phase(), Phase::Work);
    assert_eq!(m.remaining_secs(), 60);

    let cycles = db.lock().unwrap().all_cycles().unwrap();
    assert_eq!(cycles.len(), 2);
    let brk = cycles.iter().find(|c| c.cycle_type == CycleType::Break).unwrap();
    assert_eq!(brk.duration_minutes, 2.0);
    assert_eq!(brk.mood, None);

    let stats = m.statistics();
    assert_eq!(stats.snapshot.total_cycles, 2);
    assert_eq!(stats.daily.overall_mood, Some(Mood::Tired));
    assert_eq!(stats.daily.total_time_worked_minutes, 1.0);
}

#[test]
fn test_one_minute_break_completes_on_sixtieth_tick() {
    let (db, store) = shared();
    let mut m = machine_with(store, 25.0, 1.0);
    m.toggle_cycle().unwrap();
    m.start().unwrap();

    run_ticks(&mut m, 59);
    assert_eq!(m.phase(), Phase::Break);
    assert_eq!(m.remaining_secs(), 1);
    assert!(db.lock().unwrap().all_cycles().unwrap().is_empty());

    let events = m.tick();
    assert!(events.iter().any(|e| matches!(e, SessionEvent::PhaseCompleted { phase: Phase::Break, .. })));
    assert_eq!(m.phase(), Phase::Work);
    assert_eq!(m.remaining_secs(), 25 * 60);
    assert!(!m.is_running());
    assert_eq!(m.status(), SessionStatus::Paused);

    let cycles = db.lock().unwrap().all_cycles().unwrap();
    assert_eq!(cycles.len(), 1);
    assert_eq!(cycles[0].cycle_type, CycleType::Break);
    assert_eq!(cycles[0].duration_minutes, 1.0);
    assert_eq!(cycles[0].mood, None);
}

#[test]
fn test_user_action_claims_auto_start() {
    let (_db, store) = shared();
    let mut m = machine_with(store, 1.0, 1.0);
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

    m.reset();
    assert!(m.fire_auto_start(ticket).is_empty());
    assert!(!m.is_running());
    assert_eq!(m.phase(), Phase::Work);
}

#[test]
fn test_broken_store_does_not_freeze_the_session() {
    let mut m = machine_with(Box::new(BrokenStore), 1.0, 1.0);
    m.start().unwrap();
    run_ticks(&mut m, 60);

    let events = m.resolve_mood(Mood::Stressed).unwrap();
    assert!(events
        .iter()
        .any(|e| matches!(e, SessionEvent::StorageFailed { .. })));
    assert_eq!(m.phase(), Phase::Break);
    assert_eq!(m.status(), SessionStatus::Paused);
}

#[test]
fn test_settings_rejected_outside_ranges() {
    let (_db, store) = shared();
    let mut m = machine_with(store, 25.0, 5.0);
    for (work, brk) in [(0, 5), (61, 5), (25, 0), (25, 31)] {
        let err = m.save_settings(work, brk).unwrap_err();
        assert!(matches!(err, ValidationError::OutOfRange { .. }));
        assert_eq!(m.state().work_duration_minutes, 25.0);
        assert_eq!(m.state().break_duration_minutes, 5.0);
    }
}

#[test]
fn test_statistics_count_rows_from_other_days() {
    let db = Database::open_memory().unwrap();
    let long_ago = chrono::Utc::now() - chrono::Duration::days(3);
    for _ in 0..4 {
        db.add_cycle_at(CycleType::Work, 25.0, Some(Mood::Good), long_ago)
            .unwrap();
    }
    for _ in 0..2 {
        db.add_cycle_at(CycleType::Break, 5.0, None, long_ago).unwrap();
    }

    let stats = db.statistics().unwrap();
    assert_eq!(
        stats,
        CycleStatistics {
            total: 6,
            work: 4,
            breaks: 2,
            today: 0,
        }
    );
}

#[test]
fn test_initialize_is_idempotent_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rhythm.db");

    let db = Database::open_at(&path).unwrap();
    db.add_cycle(CycleType::Work, 25.0, Some(Mood::Good)).unwrap();
    db.initialize().unwrap();
    drop(db);

    let reopened = Database::open_at(&path).unwrap();
    assert_eq!(reopened.all_cycles().unwrap().len(), 1);
}

proptest! {
    #[test]
    fn prop_valid_settings_load_full_countdown(work in 1u32..=60, brk in 1u32..=30) {
        let mut m = machine_with(Box::new(Database::open_memory().unwrap()), 25.0, 5.0);
        m.save_settings(work, brk).unwrap();
        prop_assert!(!m.is_running());
        prop_assert_eq!(m.remaining_secs(), u64::from(work) * 60);
    }

    #[test]
    fn prop_toggle_twice_restores_phase(work in 1u32..=60, brk in 1u32..=30) {
        let mut m = machine_with(Box::new(Database::open_memory().unwrap()), 25.0, 5.0);
        m.save_settings(work, brk).unwrap();
        m.toggle_cycle().unwrap();
        prop_assert_eq!(m.remaining_secs(), u64::from(brk) * 60);
        m.toggle_cycle().unwrap();
        prop_assert_eq!(m.phase(), Phase::Work);
        prop_assert_eq!(m.remaining_secs(), u64::from(work) * 60);
    }

    #[test]
    fn prop_tick_counts_down_then_completes_once(
        secs in 1u64..=900,
        extra in 0usize..10,
        on_break in any::<bool>(),
    ) {
        let minutes = secs as f64 / 60.0;
        let mut m = machine_with(Box::new(Database::open_memory().unwrap()), minutes, minutes);
        if on_break {
            m.toggle_cycle().unwrap();
        }
        prop_assert_eq!(m.remaining_secs(), secs);
        m.start().unwrap();

        let mut completions = 0;
        for i in 0..secs as usize + extra {
            let before = m.remaining_secs();
            let done = m
                .tick()
                .iter()
                .filter(|e| matches!(e, SessionEvent::PhaseCompleted { .. }))
                .count();
            if completions == 0 {
                if done == 0 {
                    prop_assert!(m.remaining_secs() < before);
                } else {
                    prop_assert_eq!(i as u64, secs - 1);
                }
            }
            completions += done;
        }
        prop_assert_eq!(completions, 1);
        prop_assert!(!m.is_running());
    }
}
