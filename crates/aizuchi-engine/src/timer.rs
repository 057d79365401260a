use std::time::Duration;

/// Opaque handle for a timer owned by the scheduler.
///
/// Ids are never reused within one scheduler, so a late callback from a
/// cancelled timer can always be recognized and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Repeating voice-activity poll during the confirmation window.
    Poll,
    /// One-shot confirmation deadline.
    Confirm,
}

/// Host-provided timer facility.
///
/// The scheduler arms and cancels timers through this trait; the host invokes
/// `AizuchiScheduler::on_timer_fire` when one elapses. Cancellation must take
/// effect synchronously, but the scheduler also tolerates a cancelled timer
/// firing late: its id no longer matches any pending cue.
pub trait TimerDriver {
    fn schedule_once(&mut self, id: TimerId, delay: Duration);
    fn schedule_repeating(&mut self, id: TimerId, period: Duration);
    fn cancel(&mut self, id: TimerId);
}

/// Driver for hosts that drive everything off the tick callback.
///
/// With no timers, voice-activity polling never runs; the confirmation
/// deadline is still honored lazily by `on_tick`.
pub struct NullTimerDriver;

impl TimerDriver for NullTimerDriver {
    fn schedule_once(&mut self, _id: TimerId, _delay: Duration) {}
    fn schedule_repeating(&mut self, _id: TimerId, _period: Duration) {}
    fn cancel(&mut self, _id: TimerId) {}
}
