use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use aizuchi_dsp::{AudioFrame, EnergyMeter, PitchDetector};
use aizuchi_foundation::{FrameError, SharedClock};

use crate::catalog::CueCatalog;
use crate::config::EngineConfig;
use crate::timer::{TimerDriver, TimerId};
use crate::types::{CueEvent, EngineMetrics, SchedulerState};

/// On-demand source of a fresh audio frame for the voice-activity poll.
///
/// Mirrors the analyzer handle of a capture pipeline: each snapshot is a new
/// copy, so the scheduler never holds raw audio across calls. `None` means
/// no frame is available yet and is treated as inactive.
pub trait FrameTap: Send + Sync {
    fn snapshot(&self) -> Option<AudioFrame>;
}

/// In-flight cue awaiting confirmation that the speaker actually paused.
struct PendingCue {
    poll_timer: TimerId,
    confirm_timer: TimerId,
    deadline: Instant,
    speaking_observed: bool,
}

/// Phrase-end detector and cue scheduler.
///
/// Consumes one pitch estimate per tick, tracks a running F0 baseline, and
/// arms a cancellable cue whenever the pitch drops far enough below it. All
/// state mutation happens inside `on_tick`/`on_timer_fire`; the host must
/// serialize those calls (single-writer discipline).
pub struct AizuchiScheduler<D: TimerDriver> {
    config: EngineConfig,
    detector: PitchDetector,
    energy: EnergyMeter,
    tap: Arc<dyn FrameTap>,
    driver: D,
    catalog: CueCatalog,
    rng: fastrand::Rng,
    state: SchedulerState,
    history: VecDeque<f32>,
    pending: Option<PendingCue>,
    last_f0: Option<f32>,
    last_cue_at: Option<Instant>,
    started_at: Instant,
    next_timer_id: u64,
    metrics: EngineMetrics,
}

impl<D: TimerDriver> AizuchiScheduler<D> {
    pub fn new(config: EngineConfig, clock: SharedClock, tap: Arc<dyn FrameTap>, driver: D) -> Self {
        let detector = PitchDetector::new(
            config.pitch_min_hz,
            config.pitch_max_hz,
            config.voicing_floor,
        );
        Self {
            detector,
            energy: EnergyMeter::new(),
            tap,
            driver,
            catalog: CueCatalog::default(),
            rng: fastrand::Rng::new(),
            state: SchedulerState::Idle,
            history: VecDeque::with_capacity(config.history_limit.min(256)),
            pending: None,
            last_f0: None,
            last_cue_at: None,
            started_at: clock.now(),
            next_timer_id: 0,
            metrics: EngineMetrics::default(),
            config,
        }
    }

    pub fn with_catalog(mut self, catalog: CueCatalog) -> Self {
        // Re-normalize so a deserialized empty catalog cannot reach pick().
        self.catalog = CueCatalog::new(catalog.tokens().to_vec());
        self
    }

    /// Seed the cue selector for deterministic runs.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = fastrand::Rng::with_seed(seed);
        self
    }

    pub fn current_state(&self) -> SchedulerState {
        self.state
    }

    pub fn metrics(&self) -> &EngineMetrics {
        &self.metrics
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Most recent pitch estimate, `None` when the last tick was unvoiced.
    pub fn last_f0(&self) -> Option<f32> {
        self.last_f0
    }

    /// Running mean of the voiced history; `None` until a baseline exists.
    pub fn baseline_hz(&self) -> Option<f32> {
        if self.history.is_empty() {
            return None;
        }
        Some(self.history.iter().sum::<f32>() / self.history.len() as f32)
    }

    /// Process one sampling tick.
    ///
    /// Returns a cue event only when this tick observes an expired
    /// confirmation deadline before the one-shot timer does; the tick that
    /// fires a cue performs no arm evaluation of its own.
    pub fn on_tick(
        &mut self,
        frame: &AudioFrame,
        now: Instant,
    ) -> Result<Option<CueEvent>, FrameError> {
        frame.validate()?;
        self.metrics.ticks += 1;

        if self.state == SchedulerState::Cooldown {
            if self.in_cooldown(now) {
                return Ok(None);
            }
            self.state = SchedulerState::Idle;
            debug!("cooldown elapsed, scheduler idle");
        }

        if let Some(event) = self.evaluate_deadline(now) {
            return Ok(Some(event));
        }

        let estimate = self.detector.estimate(frame)?;
        self.last_f0 = estimate.hz();
        let Some(hz) = estimate.hz() else {
            return Ok(None);
        };

        self.metrics.voiced_frames += 1;
        self.push_history(hz);

        // The baseline includes the current estimate, so a single voiced
        // frame can never sit 20% below its own mean.
        if let Some(baseline) = self.baseline_hz() {
            if hz < baseline * (1.0 - self.config.f0_drop_ratio) {
                self.arm(now, hz, baseline);
            }
        }

        Ok(None)
    }

    /// Host callback for an elapsed timer.
    ///
    /// Ids that no longer match the pending cue (cancelled timers firing
    /// late, or no cue pending at all) are no-ops.
    pub fn on_timer_fire(&mut self, id: TimerId, now: Instant) -> Option<CueEvent> {
        let (poll_id, confirm_id, deadline) = match &self.pending {
            Some(p) => (p.poll_timer, p.confirm_timer, p.deadline),
            None => return None,
        };

        if id == poll_id {
            // Activity detections at or after the deadline no longer cancel;
            // the window has closed.
            if now >= deadline {
                return self.evaluate_deadline(now);
            }
            let Some(frame) = self.tap.snapshot() else {
                return None;
            };
            match self.energy.is_active(&frame, self.config.volume_threshold_db) {
                Ok(true) => {
                    if let Some(p) = self.pending.as_mut() {
                        p.speaking_observed = true;
                    }
                    self.metrics.voice_cancels += 1;
                    self.cancel_pending();
                    self.state = SchedulerState::Idle;
                    debug!("pending cue cancelled: speech resumed");
                }
                Ok(false) => {}
                Err(e) => {
                    warn!("voice-activity poll skipped a malformed frame: {}", e);
                }
            }
            None
        } else if id == confirm_id {
            // An early confirmation callback is host misuse; the deadline
            // check below turns it into a no-op and the next tick fires.
            self.evaluate_deadline(now)
        } else {
            None
        }
    }

    /// Drop all state back to startup, cancelling any pending cue.
    pub fn reset(&mut self) {
        self.cancel_pending();
        self.state = SchedulerState::Idle;
        self.history.clear();
        self.last_f0 = None;
        self.last_cue_at = None;
        self.metrics = EngineMetrics::default();
    }

    fn in_cooldown(&self, now: Instant) -> bool {
        match self.last_cue_at {
            Some(last) => now.saturating_duration_since(last) < self.config.cooldown(),
            None => false,
        }
    }

    fn push_history(&mut self, hz: f32) {
        if self.history.len() == self.config.history_limit {
            self.history.pop_front();
        }
        self.history.push_back(hz);
    }

    fn arm(&mut self, now: Instant, hz: f32, baseline: f32) {
        // Newest phrase-end signal wins: tear down any earlier pending cue
        // before its timers can fire.
        self.cancel_pending();

        let poll_timer = self.next_id();
        let confirm_timer = self.next_id();
        let deadline = now + self.config.confirm_delay();

        self.driver
            .schedule_repeating(poll_timer, self.config.check_interval());
        self.driver.schedule_once(confirm_timer, self.config.confirm_delay());

        self.pending = Some(PendingCue {
            poll_timer,
            confirm_timer,
            deadline,
            speaking_observed: false,
        });
        self.state = SchedulerState::Armed;
        self.metrics.arms += 1;
        debug!(
            current_hz = hz,
            baseline_hz = baseline,
            "pitch drop detected, cue armed"
        );
    }

    fn cancel_pending(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.driver.cancel(pending.poll_timer);
            self.driver.cancel(pending.confirm_timer);
        }
    }

    /// Fire or discard the pending cue once its deadline has passed.
    fn evaluate_deadline(&mut self, now: Instant) -> Option<CueEvent> {
        match &self.pending {
            Some(pending) if now >= pending.deadline => {}
            _ => return None,
        }

        let speaking = self
            .pending
            .as_ref()
            .map(|p| p.speaking_observed)
            .unwrap_or(false);
        self.cancel_pending();

        if speaking {
            self.state = SchedulerState::Idle;
            return None;
        }
        Some(self.fire(now))
    }

    fn fire(&mut self, now: Instant) -> CueEvent {
        let token = self.catalog.pick(&mut self.rng).to_string();
        self.last_cue_at = Some(now);
        self.state = SchedulerState::Cooldown;
        self.history.clear();
        self.metrics.cues_emitted += 1;

        let timestamp_ms = now.saturating_duration_since(self.started_at).as_millis() as u64;
        info!(token = %token, timestamp_ms, "backchannel cue fired");
        CueEvent {
            token,
            timestamp_ms,
        }
    }

    fn next_id(&mut self) -> TimerId {
        let id = TimerId(self.next_timer_id);
        self.next_timer_id += 1;
        id
    }
}
