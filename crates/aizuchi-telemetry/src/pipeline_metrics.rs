use parking_lot::RwLock;
use std::sync::atomic::{AtomicI16, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Shared metrics for cross-task pipeline monitoring.
///
/// Gauges that need fractional precision are stored scaled (dB * 10,
/// Hz * 10, fps * 10) to stay atomic.
#[derive(Clone)]
pub struct PipelineMetrics {
    // Audio level monitoring
    pub audio_level_db: Arc<AtomicI16>, // Current level in dB * 10
    pub current_f0_hz: Arc<AtomicU64>,  // Latest voiced F0 * 10, 0 = unvoiced
    pub baseline_f0_hz: Arc<AtomicU64>, // Running-mean F0 * 10, 0 = no baseline

    // Throughput
    pub tick_fps: Arc<AtomicU64>, // Scheduler ticks per second * 10
    pub frames_processed: Arc<AtomicU64>,
    pub history_len: Arc<AtomicUsize>,

    // Scheduler activity
    pub arms: Arc<AtomicU64>,
    pub voice_cancels: Arc<AtomicU64>,
    pub cues_emitted: Arc<AtomicU64>,
    pub last_cue: Arc<RwLock<Option<Instant>>>,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self {
            audio_level_db: Arc::new(AtomicI16::new(-1000)),
            current_f0_hz: Arc::new(AtomicU64::new(0)),
            baseline_f0_hz: Arc::new(AtomicU64::new(0)),
            tick_fps: Arc::new(AtomicU64::new(0)),
            frames_processed: Arc::new(AtomicU64::new(0)),
            history_len: Arc::new(AtomicUsize::new(0)),
            arms: Arc::new(AtomicU64::new(0)),
            voice_cancels: Arc::new(AtomicU64::new(0)),
            cues_emitted: Arc::new(AtomicU64::new(0)),
            last_cue: Arc::new(RwLock::new(None)),
        }
    }
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_audio_level_db(&self, db: f32) {
        self.audio_level_db
            .store((db * 10.0) as i16, Ordering::Relaxed);
    }

    pub fn audio_level_db_value(&self) -> f32 {
        self.audio_level_db.load(Ordering::Relaxed) as f32 / 10.0
    }

    /// `None` clears the gauge back to the unvoiced sentinel.
    pub fn set_current_f0(&self, hz: Option<f32>) {
        let scaled = hz.map(|v| (v * 10.0) as u64).unwrap_or(0);
        self.current_f0_hz.store(scaled, Ordering::Relaxed);
    }

    pub fn set_baseline_f0(&self, hz: Option<f32>) {
        let scaled = hz.map(|v| (v * 10.0) as u64).unwrap_or(0);
        self.baseline_f0_hz.store(scaled, Ordering::Relaxed);
    }

    pub fn set_tick_fps(&self, fps: f64) {
        self.tick_fps.store((fps * 10.0) as u64, Ordering::Relaxed);
    }

    pub fn record_frame(&self) {
        self.frames_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_history_len(&self, len: usize) {
        self.history_len.store(len, Ordering::Relaxed);
    }

    pub fn record_arm(&self) {
        self.arms.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_voice_cancel(&self) {
        self.voice_cancels.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cue(&self, at: Instant) {
        self.cues_emitted.fetch_add(1, Ordering::Relaxed);
        *self.last_cue.write() = Some(at);
    }
}

/// Rolling frames-per-second estimate, reported roughly once a second.
pub struct FpsTracker {
    last_update: Instant,
    frame_count: u64,
}

impl FpsTracker {
    pub fn new() -> Self {
        Self {
            last_update: Instant::now(),
            frame_count: 0,
        }
    }

    pub fn tick(&mut self) -> Option<f64> {
        self.frame_count += 1;
        let elapsed = self.last_update.elapsed();

        if elapsed >= Duration::from_secs(1) {
            let fps = self.frame_count as f64 / elapsed.as_secs_f64();
            self.last_update = Instant::now();
            self.frame_count = 0;
            Some(fps)
        } else {
            None
        }
    }
}

impl Default for FpsTracker {
    fn default() -> Self {
        Self::new()
    }
}
