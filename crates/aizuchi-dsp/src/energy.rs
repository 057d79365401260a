use aizuchi_foundation::FrameError;

use crate::constants::VOLUME_THRESHOLD_DB;
use crate::frame::AudioFrame;

/// RMS/dBFS meter over float frames.
pub struct EnergyMeter {
    epsilon: f32,
}

impl EnergyMeter {
    pub fn new() -> Self {
        Self { epsilon: 1e-10 }
    }

    pub fn calculate_rms(&self, samples: &[f32]) -> f32 {
        if samples.is_empty() {
            return 0.0;
        }

        let sum_squares: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
        (sum_squares / samples.len() as f64).sqrt() as f32
    }

    /// Silence maps to the -100 dB floor rather than -inf.
    pub fn rms_to_dbfs(&self, rms: f32) -> f32 {
        if rms <= self.epsilon {
            return -100.0;
        }
        20.0 * rms.log10()
    }

    pub fn calculate_dbfs(&self, samples: &[f32]) -> f32 {
        self.rms_to_dbfs(self.calculate_rms(samples))
    }

    /// Energy-based voice activity check against a dBFS threshold.
    pub fn is_active(&self, frame: &AudioFrame, threshold_db: f32) -> Result<bool, FrameError> {
        frame.validate()?;
        Ok(self.calculate_dbfs(&frame.samples) > threshold_db)
    }
}

impl Default for EnergyMeter {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience wrapper using the default meter.
pub fn is_voice_active(frame: &AudioFrame, threshold_db: f32) -> Result<bool, FrameError> {
    EnergyMeter::new().is_active(frame, threshold_db)
}
