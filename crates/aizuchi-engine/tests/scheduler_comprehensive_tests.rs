//! Comprehensive scheduler tests
//!
//! Tests cover:
//! - Arming on a sustained pitch drop and firing after the confirmation window
//! - Cancellation when voice activity resumes inside the window
//! - Re-arming while pending (newest phrase-end signal wins)
//! - Cooldown suppression and lazy expiry
//! - History lifecycle (cleared exactly on emission)
//! - Defensive handling of stale and late timer callbacks

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use aizuchi_dsp::AudioFrame;
use aizuchi_engine::{
    AizuchiScheduler, CueCatalog, EngineConfig, FrameTap, SchedulerState, TimerDriver, TimerId,
    TimerKind,
};
use aizuchi_foundation::clock::ManualClock;

const FS: u32 = 16_000;
const FRAME: usize = 512;
const TICK: Duration = Duration::from_millis(16);

fn sine_frame(freq_hz: f32) -> AudioFrame {
    let samples: Vec<f32> = (0..FRAME)
        .map(|i| 0.4 * (2.0 * std::f32::consts::PI * freq_hz * i as f32 / FS as f32).sin())
        .collect();
    AudioFrame::new(samples, FS)
}

fn silent_frame() -> AudioFrame {
    AudioFrame::new(vec![0.0; FRAME], FS)
}

// ─── Test doubles ────────────────────────────────────────────────────

#[derive(Default)]
struct DriverState {
    scheduled: Vec<(TimerId, TimerKind, Duration)>,
    cancelled: Vec<TimerId>,
}

#[derive(Clone, Default)]
struct RecordingDriver {
    state: Arc<Mutex<DriverState>>,
}

impl RecordingDriver {
    fn last_armed_pair(&self) -> (TimerId, TimerId) {
        let state = self.state.lock().unwrap();
        let confirm = state
            .scheduled
            .iter()
            .rev()
            .find(|(_, kind, _)| *kind == TimerKind::Confirm)
            .expect("no confirmation timer scheduled");
        let poll = state
            .scheduled
            .iter()
            .rev()
            .find(|(_, kind, _)| *kind == TimerKind::Poll)
            .expect("no poll timer scheduled");
        (poll.0, confirm.0)
    }

    fn cancelled(&self) -> Vec<TimerId> {
        self.state.lock().unwrap().cancelled.clone()
    }

    fn schedule_count(&self) -> usize {
        self.state.lock().unwrap().scheduled.len()
    }
}

impl TimerDriver for RecordingDriver {
    fn schedule_once(&mut self, id: TimerId, delay: Duration) {
        let mut state = self.state.lock().unwrap();
        state.scheduled.push((id, TimerKind::Confirm, delay));
    }

    fn schedule_repeating(&mut self, id: TimerId, period: Duration) {
        let mut state = self.state.lock().unwrap();
        state.scheduled.push((id, TimerKind::Poll, period));
    }

    fn cancel(&mut self, id: TimerId) {
        self.state.lock().unwrap().cancelled.push(id);
    }
}

#[derive(Clone, Default)]
struct SharedTap {
    frame: Arc<Mutex<Option<AudioFrame>>>,
}

impl SharedTap {
    fn set(&self, frame: AudioFrame) {
        *self.frame.lock().unwrap() = Some(frame);
    }
}

impl FrameTap for SharedTap {
    fn snapshot(&self) -> Option<AudioFrame> {
        self.frame.lock().unwrap().clone()
    }
}

struct Harness {
    scheduler: AizuchiScheduler<RecordingDriver>,
    clock: Arc<ManualClock>,
    driver: RecordingDriver,
    tap: SharedTap,
}

fn harness() -> Harness {
    harness_with(EngineConfig::default())
}

fn harness_with(config: EngineConfig) -> Harness {
    let clock = Arc::new(ManualClock::new());
    let driver = RecordingDriver::default();
    let tap = SharedTap::default();
    tap.set(silent_frame());

    let scheduler = AizuchiScheduler::new(
        config,
        clock.clone(),
        Arc::new(tap.clone()),
        driver.clone(),
    )
    .with_seed(17);

    Harness {
        scheduler,
        clock,
        driver,
        tap,
    }
}

impl Harness {
    fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Feed `count` ticks of the given frame, advancing the tick period each
    /// time. Panics if a cue fires; use the explicit paths for that.
    fn feed(&mut self, frame: &AudioFrame, count: usize) {
        for _ in 0..count {
            let event = self.scheduler.on_tick(frame, self.now()).unwrap();
            assert!(event.is_none(), "unexpected cue during feed");
            self.clock.advance(TICK);
        }
    }

    /// Converge the baseline on ~1s of a steady tone, then feed one dropped
    /// tone tick. Returns the arm time.
    fn arm_via_drop(&mut self) -> Instant {
        self.feed(&sine_frame(200.0), 62);
        let arm_time = self.now();
        let event = self.scheduler.on_tick(&sine_frame(150.0), arm_time).unwrap();
        assert!(event.is_none());
        assert_eq!(self.scheduler.current_state(), SchedulerState::Armed);
        arm_time
    }

    /// Run the 50ms activity poll with silence from `from` up to (but not
    /// including) the deadline.
    fn poll_silence_until(&mut self, poll: TimerId, from: Instant, deadline: Instant) {
        let mut t = from + Duration::from_millis(50);
        while t < deadline {
            self.clock.set(t);
            assert_eq!(self.scheduler.on_timer_fire(poll, t), None);
            t += Duration::from_millis(50);
        }
    }
}

// ─── End-to-end scenarios ────────────────────────────────────────────

#[test]
fn cue_fires_550ms_after_drop_followed_by_silence() {
    let mut h = harness();
    let arm_time = h.arm_via_drop();
    let (poll, confirm) = h.driver.last_armed_pair();
    let deadline = arm_time + Duration::from_millis(550);

    assert!(h.scheduler.history_len() > 0);
    h.poll_silence_until(poll, arm_time, deadline);
    assert_eq!(h.scheduler.current_state(), SchedulerState::Armed);

    h.clock.set(deadline);
    let event = h
        .scheduler
        .on_timer_fire(confirm, deadline)
        .expect("cue should fire at the confirmation deadline");

    assert!(CueCatalog::default()
        .tokens()
        .iter()
        .any(|t| *t == event.token));
    // 62 ticks * 16ms of tone, then the 550ms confirmation window.
    assert_eq!(event.timestamp_ms, 62 * 16 + 550);
    assert_eq!(h.scheduler.current_state(), SchedulerState::Cooldown);
    assert_eq!(h.scheduler.history_len(), 0, "history clears on emission");
    assert_eq!(h.scheduler.metrics().cues_emitted, 1);
}

#[test]
fn voice_activity_inside_window_cancels_the_cue() {
    let mut h = harness();
    let arm_time = h.arm_via_drop();
    let (poll, confirm) = h.driver.last_armed_pair();
    let history_before = h.scheduler.history_len();

    // Silent polls for 250ms, then the speaker resumes at +300ms.
    for k in 1..=5 {
        let t = arm_time + Duration::from_millis(50 * k);
        h.clock.set(t);
        assert_eq!(h.scheduler.on_timer_fire(poll, t), None);
    }
    let resume = arm_time + Duration::from_millis(300);
    h.clock.set(resume);
    h.tap.set(sine_frame(200.0));
    assert_eq!(h.scheduler.on_timer_fire(poll, resume), None);

    assert_eq!(h.scheduler.current_state(), SchedulerState::Idle);
    assert_eq!(h.scheduler.metrics().voice_cancels, 1);
    assert_eq!(
        h.scheduler.history_len(),
        history_before,
        "cancellation must not clear history"
    );

    // Both timers were torn down; late callbacks are no-ops.
    let cancelled = h.driver.cancelled();
    assert!(cancelled.contains(&poll) && cancelled.contains(&confirm));
    let deadline = arm_time + Duration::from_millis(550);
    h.clock.set(deadline);
    assert_eq!(h.scheduler.on_timer_fire(confirm, deadline), None);
    assert_eq!(h.scheduler.metrics().cues_emitted, 0);
}

#[test]
fn rearming_cancels_the_prior_pending_cue() {
    let mut h = harness();
    let first_arm = h.arm_via_drop();
    let (first_poll, first_confirm) = h.driver.last_armed_pair();

    // A second drop 100ms later while still armed.
    let second_arm = first_arm + Duration::from_millis(100);
    h.clock.set(second_arm);
    h.scheduler.on_tick(&sine_frame(150.0), second_arm).unwrap();
    assert_eq!(h.scheduler.current_state(), SchedulerState::Armed);
    assert_eq!(h.scheduler.metrics().arms, 2);

    let cancelled = h.driver.cancelled();
    assert!(cancelled.contains(&first_poll) && cancelled.contains(&first_confirm));

    let (second_poll, second_confirm) = h.driver.last_armed_pair();
    assert_ne!(second_confirm, first_confirm);

    // The first deadline passes: its timer is stale, nothing fires.
    let first_deadline = first_arm + Duration::from_millis(550);
    h.clock.set(first_deadline);
    assert_eq!(h.scheduler.on_timer_fire(first_confirm, first_deadline), None);
    assert_eq!(h.scheduler.metrics().cues_emitted, 0);

    // The second deadline fires exactly one cue.
    h.poll_silence_until(second_poll, first_deadline, second_arm + Duration::from_millis(550));
    let second_deadline = second_arm + Duration::from_millis(550);
    h.clock.set(second_deadline);
    let event = h.scheduler.on_timer_fire(second_confirm, second_deadline);
    assert!(event.is_some());
    assert_eq!(h.scheduler.metrics().cues_emitted, 1);
}

#[test]
fn cooldown_suppresses_further_cues_until_it_elapses() {
    let mut h = harness();
    let arm_time = h.arm_via_drop();
    let (_, confirm) = h.driver.last_armed_pair();
    let deadline = arm_time + Duration::from_millis(550);
    h.clock.set(deadline);
    h.scheduler.on_timer_fire(confirm, deadline).unwrap();
    let schedules_after_first = h.driver.schedule_count();

    // Drop events throughout the cooldown are no-ops: no history, no arming.
    for _ in 0..30 {
        h.clock.advance(Duration::from_millis(50));
        let event = h.scheduler.on_tick(&sine_frame(150.0), h.now()).unwrap();
        assert!(event.is_none());
    }
    assert_eq!(h.scheduler.current_state(), SchedulerState::Cooldown);
    assert_eq!(h.scheduler.history_len(), 0);
    assert_eq!(h.driver.schedule_count(), schedules_after_first);
    assert_eq!(h.scheduler.metrics().arms, 1);

    // 30 * 50ms = 1500ms so far; move past the 2000ms window.
    h.clock.advance(Duration::from_millis(600));
    h.scheduler.on_tick(&sine_frame(200.0), h.now()).unwrap();
    assert_eq!(h.scheduler.current_state(), SchedulerState::Idle);
    assert_eq!(h.scheduler.history_len(), 1);

    // A fresh baseline and drop arms again.
    h.clock.advance(TICK);
    h.feed(&sine_frame(200.0), 40);
    h.scheduler.on_tick(&sine_frame(150.0), h.now()).unwrap();
    assert_eq!(h.scheduler.current_state(), SchedulerState::Armed);
    assert_eq!(h.scheduler.metrics().arms, 2);
}

#[test]
fn activity_at_the_deadline_no_longer_cancels() {
    let mut h = harness();
    let arm_time = h.arm_via_drop();
    let (poll, _) = h.driver.last_armed_pair();
    let deadline = arm_time + Duration::from_millis(550);

    h.poll_silence_until(poll, arm_time, deadline);

    // The speaker resumes exactly at the deadline, observed by the poll
    // timer first: the window has closed, so the cue fires anyway.
    h.tap.set(sine_frame(200.0));
    h.clock.set(deadline);
    let event = h.scheduler.on_timer_fire(poll, deadline);
    assert!(event.is_some(), "deadline-crossing poll fires the cue");
    assert_eq!(h.scheduler.metrics().voice_cancels, 0);
    assert_eq!(h.scheduler.current_state(), SchedulerState::Cooldown);
}

#[test]
fn late_callbacks_after_cancellation_are_noops() {
    let mut h = harness();
    let arm_time = h.arm_via_drop();
    let (poll, confirm) = h.driver.last_armed_pair();

    let resume = arm_time + Duration::from_millis(100);
    h.clock.set(resume);
    h.tap.set(sine_frame(200.0));
    h.scheduler.on_timer_fire(poll, resume);
    assert_eq!(h.scheduler.current_state(), SchedulerState::Idle);

    // Both handles are dead; replaying them in any order changes nothing.
    for t_ms in [150u64, 550, 800] {
        let t = arm_time + Duration::from_millis(t_ms);
        h.clock.set(t);
        assert_eq!(h.scheduler.on_timer_fire(poll, t), None);
        assert_eq!(h.scheduler.on_timer_fire(confirm, t), None);
    }
    assert_eq!(h.scheduler.metrics().cues_emitted, 0);
}

#[test]
fn custom_catalog_supplies_the_tokens() {
    let mut h = harness();
    h.scheduler = {
        let clock = Arc::new(ManualClock::new());
        AizuchiScheduler::new(
            EngineConfig::default(),
            clock.clone(),
            Arc::new(h.tap.clone()),
            h.driver.clone(),
        )
        .with_catalog(CueCatalog::new(vec!["mm".into()]))
        .with_seed(2)
    };

    h.feed(&sine_frame(200.0), 62);
    let arm_time = h.now();
    h.scheduler.on_tick(&sine_frame(150.0), arm_time).unwrap();
    let (_, confirm) = h.driver.last_armed_pair();
    let deadline = arm_time + Duration::from_millis(550);
    h.clock.set(deadline);
    let event = h.scheduler.on_timer_fire(confirm, deadline).unwrap();
    assert_eq!(event.token, "mm");
}
