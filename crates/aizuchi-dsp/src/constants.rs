//! Shared audio constants for the cue pipeline.

/// Standard sample rate for pipeline processing (Hz)
pub const SAMPLE_RATE_HZ: u32 = 16_000;

/// Standard frame size for pipeline processing (samples)
/// At 16kHz, 512 samples = 32ms frames
pub const FRAME_SIZE_SAMPLES: usize = 512;

/// Frame duration in milliseconds (derived constant)
pub const FRAME_DURATION_MS: f32 = (FRAME_SIZE_SAMPLES as f32 * 1000.0) / SAMPLE_RATE_HZ as f32;

/// Lower bound of the pitch search range (Hz, inclusive)
pub const PITCH_MIN_HZ: f32 = 50.0;

/// Upper bound of the pitch search range (Hz, exclusive)
pub const PITCH_MAX_HZ: f32 = 500.0;

/// Minimum normalized autocorrelation peak for a frame to count as voiced
pub const VOICING_CONFIDENCE_FLOOR: f32 = 0.5;

/// Default speech energy threshold (dBFS)
pub const VOLUME_THRESHOLD_DB: f32 = -50.0;
