pub mod constants;
pub mod energy;
pub mod frame;
pub mod pitch;

pub use constants::{
    FRAME_DURATION_MS, FRAME_SIZE_SAMPLES, PITCH_MAX_HZ, PITCH_MIN_HZ, SAMPLE_RATE_HZ,
    VOICING_CONFIDENCE_FLOOR, VOLUME_THRESHOLD_DB,
};
pub use energy::{is_voice_active, EnergyMeter};
pub use frame::AudioFrame;
pub use pitch::{estimate_pitch, PitchDetector, PitchEstimate};
