/// Scheduler lifecycle.
///
/// `Armed` means a pending cue exists and the confirmation window is open;
/// `Cooldown` suppresses all scheduling until the window elapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Armed,
    Cooldown,
}

/// A fired backchannel cue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CueEvent {
    /// Token chosen from the cue catalog.
    pub token: String,
    /// Milliseconds since the scheduler was created.
    pub timestamp_ms: u64,
}

/// Counters maintained across the scheduler's lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineMetrics {
    pub ticks: u64,
    pub voiced_frames: u64,
    pub arms: u64,
    pub voice_cancels: u64,
    pub cues_emitted: u64,
}
