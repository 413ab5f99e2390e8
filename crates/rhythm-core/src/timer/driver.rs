//! Async runtime around [`SessionMachine`].
//!
//! The machine itself is synchronous. The driver owns the clock (one ticker
//! task per running period), performs delayed auto-starts, fetches break
//! suggestions in the background and fans every event out to subscribers.

use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use super::session::{SessionMachine, SessionState, SessionStatus};
use crate::cycle::Mood;
use crate::error::ValidationError;
use crate::events::SessionEvent;
use crate::stats::SessionStatistics;
use crate::suggest::{BreakSuggester, Suggestion, SuggestionRequest};

const TICK_INTERVAL: Duration = Duration::from_secs(1);
const EVENT_BUFFER: usize = 256;

/// The suggestion shown for the current break.
///
/// `epoch` advances whenever a break is loaded or left, so a fetch that
/// finishes late can tell that its break is gone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuggestionSlot {
    pub epoch: u64,
    pub current: Option<Suggestion>,
}

#[derive(Clone)]
pub struct SessionDriver {
    machine: Arc<Mutex<SessionMachine>>,
    suggester: Arc<BreakSuggester>,
    ticker: Arc<StdMutex<Option<JoinHandle<()>>>>,
    events: broadcast::Sender<SessionEvent>,
    suggestion: Arc<StdMutex<SuggestionSlot>>,
}

fn lock<T>(m: &StdMutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SessionDriver {
    pub fn new(machine: SessionMachine, suggester: BreakSuggester) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            machine: Arc::new(Mutex::new(machine)),
            suggester: Arc::new(suggester),
            ticker: Arc::new(StdMutex::new(None)),
            events,
            suggestion: Arc::new(StdMutex::new(SuggestionSlot::default())),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub async fn state(&self) -> SessionState {
        self.machine.lock().await.state().clone()
    }

    pub async fn status(&self) -> SessionStatus {
        self.machine.lock().await.status()
    }

    pub async fn statistics(&self) -> SessionStatistics {
        self.machine.lock().await.statistics().clone()
    }

    /// `MM:SS` of the running phase.
    pub async fn remaining_display(&self) -> String {
        self.machine.lock().await.remaining_display()
    }

    pub fn current_suggestion(&self) -> Option<Suggestion> {
        lock(&self.suggestion).current.clone()
    }

    // ── Commands ─────────────────────────────────────────────────────

    pub async fn start(&self) -> Result<(), ValidationError> {
        let events = self.machine.lock().await.start()?;
        self.dispatch(events);
        Ok(())
    }

    pub async fn pause(&self) {
        let events = self.machine.lock().await.pause();
        self.dispatch(events);
    }

    pub async fn reset(&self) {
        let events = self.machine.lock().await.reset();
        self.dispatch(events);
    }

    pub async fn resolve_mood(&self, mood: Mood) -> Result<(), ValidationError> {
        let events = self.machine.lock().await.resolve_mood(mood)?;
        self.dispatch(events);
        Ok(())
    }

    pub async fn toggle_cycle(&self) -> Result<(), ValidationError> {
        let events = self.machine.lock().await.toggle_cycle()?;
        self.dispatch(events);
        Ok(())
    }

    pub async fn save_settings(
        &self,
        work_minutes: u32,
        break_minutes: u32,
    ) -> Result<(), ValidationError> {
        let events = self
            .machine
            .lock()
            .await
            .save_settings(work_minutes, break_minutes)?;
        self.dispatch(events);
        Ok(())
    }

    /// Ask again for the current break. The new fetch supersedes any that
    /// is still in flight.
    pub async fn refresh_suggestion(&self) -> Result<(), ValidationError> {
        let request = self
            .machine
            .lock()
            .await
            .suggestion_request()
            .ok_or(ValidationError::NotOnBreak)?;
        self.fetch_suggestion(request);
        Ok(())
    }

    /// Stop the clock task. The machine keeps its state.
    pub fn shutdown(&self) {
        self.stop_ticker();
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Publish events and react to the ones that need background work.
    fn dispatch(&self, events: Vec<SessionEvent>) {
        for event in events {
            match &event {
                SessionEvent::Started { .. } => self.spawn_ticker(),
                SessionEvent::Paused { .. } | SessionEvent::SettingsSaved { .. } => {
                    self.stop_ticker()
                }
                SessionEvent::Reset { .. } => {
                    self.stop_ticker();
                    self.clear_suggestion();
                }
                SessionEvent::AutoStartScheduled { ticket, delay_ms } => {
                    self.schedule_auto_start(*ticket, *delay_ms)
                }
                SessionEvent::BreakStarted { request, .. } => self.fetch_suggestion(*request),
                SessionEvent::WorkStarted { .. } => self.clear_suggestion(),
                _ => {}
            }
            // No subscribers is fine.
            let _ = self.events.send(event);
        }
    }

    fn spawn_ticker(&self) {
        let mut slot = lock(&self.ticker);
        if let Some(handle) = slot.take() {
            handle.abort();
        }

        let driver = self.clone();
        *slot = Some(tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let (events, running) = {
                    let mut machine = driver.machine.lock().await;
                    let events = machine.tick();
                    (events, machine.is_running())
                };
                driver.dispatch(events);
                if !running {
                    break;
                }
            }
        }));
    }

    fn stop_ticker(&self) {
        if let Some(handle) = lock(&self.ticker).take() {
            handle.abort();
        }
    }

    fn schedule_auto_start(&self, ticket: u64, delay_ms: u64) {
        let driver = self.clone();
        tokio::spawn(async move {
            time::sleep(Duration::from_millis(delay_ms)).await;
            let events = driver.machine.lock().await.fire_auto_start(ticket);
            driver.dispatch(events);
        });
    }

    fn clear_suggestion(&self) {
        let mut slot = lock(&self.suggestion);
        slot.epoch += 1;
        slot.current = None;
    }

    fn fetch_suggestion(&self, request: SuggestionRequest) {
        let epoch = {
            let mut slot = lock(&self.suggestion);
            slot.epoch += 1;
            slot.current = None;
            slot.epoch
        };

        let driver = self.clone();
        tokio::spawn(async move {
            let suggestion = driver.suggester.suggest(&request).await;
            {
                let mut slot = lock(&driver.suggestion);
                if slot.epoch != epoch {
                    debug!(epoch, current = slot.epoch, "dropping suggestion for a finished break");
                    return;
                }
                slot.current = Some(suggestion.clone());
            }
            info!("break suggestion applied");
            let _ = driver.events.send(SessionEvent::SuggestionReady { suggestion });
        });
    }
}
