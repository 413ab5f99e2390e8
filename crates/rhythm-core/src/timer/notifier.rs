use super::session::Phase;

/// Vibration pattern played when a phase ends: wait, buzz, pause, buzz (ms).
pub const ALERT_PATTERN_MS: [u64; 4] = [0, 500, 200, 500];

/// Fire-and-forget completion alert (vibration, bell, desktop notification).
///
/// Implementations must not block and must swallow their own failures.
pub trait Notifier: Send {
    fn phase_completed(&self, phase: Phase);
}

/// Discards every alert.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn phase_completed(&self, _phase: Phase) {}
}
