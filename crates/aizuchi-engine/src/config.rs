use std::time::Duration;

use serde::{Deserialize, Serialize};

use aizuchi_dsp::constants::{
    PITCH_MAX_HZ, PITCH_MIN_HZ, VOICING_CONFIDENCE_FLOOR, VOLUME_THRESHOLD_DB,
};

/// Scheduler tuning. Defaults follow the parameters of the dialogue
/// experiment the phrase-end heuristic was taken from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Relative F0 drop below the running mean that signals a phrase end
    /// (0.2 = a 20% drop).
    pub f0_drop_ratio: f32,
    /// Suppression window after a cue fires.
    pub cooldown_ms: u64,
    /// Wait after the drop before the phrase is considered ended.
    pub phrase_end_delay_ms: u64,
    /// Additional delay from phrase end to the cue itself.
    pub cue_delay_ms: u64,
    /// Energy threshold for the voice-activity poll (dBFS).
    pub volume_threshold_db: f32,
    /// Period of the voice-activity poll during the confirmation window.
    pub check_interval_ms: u64,
    /// Cap on retained voiced estimates; the oldest are evicted first.
    pub history_limit: usize,
    /// Pitch search range lower bound (Hz).
    pub pitch_min_hz: f32,
    /// Pitch search range upper bound (Hz).
    pub pitch_max_hz: f32,
    /// Minimum normalized autocorrelation peak to count as voiced.
    pub voicing_floor: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            f0_drop_ratio: 0.2,
            cooldown_ms: 2000,
            phrase_end_delay_ms: 250,
            cue_delay_ms: 300,
            volume_threshold_db: VOLUME_THRESHOLD_DB,
            check_interval_ms: 50,
            history_limit: 1024,
            pitch_min_hz: PITCH_MIN_HZ,
            pitch_max_hz: PITCH_MAX_HZ,
            voicing_floor: VOICING_CONFIDENCE_FLOOR,
        }
    }
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::new()
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Total delay from arming to the confirmation deadline.
    pub fn confirm_delay(&self) -> Duration {
        Duration::from_millis(self.phrase_end_delay_ms + self.cue_delay_ms)
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }
}

pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
        }
    }

    pub fn f0_drop_ratio(mut self, ratio: f32) -> Self {
        self.config.f0_drop_ratio = ratio.clamp(0.0, 1.0);
        self
    }

    pub fn cooldown_ms(mut self, ms: u64) -> Self {
        self.config.cooldown_ms = ms;
        self
    }

    pub fn phrase_end_delay_ms(mut self, ms: u64) -> Self {
        self.config.phrase_end_delay_ms = ms;
        self
    }

    pub fn cue_delay_ms(mut self, ms: u64) -> Self {
        self.config.cue_delay_ms = ms;
        self
    }

    pub fn volume_threshold_db(mut self, db: f32) -> Self {
        self.config.volume_threshold_db = db;
        self
    }

    pub fn check_interval_ms(mut self, ms: u64) -> Self {
        self.config.check_interval_ms = ms.max(1);
        self
    }

    pub fn history_limit(mut self, limit: usize) -> Self {
        self.config.history_limit = limit.max(1);
        self
    }

    pub fn pitch_range(mut self, min_hz: f32, max_hz: f32) -> Self {
        self.config.pitch_min_hz = min_hz;
        self.config.pitch_max_hz = max_hz;
        self
    }

    pub fn voicing_floor(mut self, floor: f32) -> Self {
        self.config.voicing_floor = floor.clamp(0.0, 1.0);
        self
    }

    pub fn build(self) -> EngineConfig {
        self.config
    }
}

impl Default for EngineConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
