use aizuchi_foundation::FrameError;

use crate::constants::{PITCH_MAX_HZ, PITCH_MIN_HZ, VOICING_CONFIDENCE_FLOOR};
use crate::frame::AudioFrame;

/// Signal power below this is treated as silence.
const POWER_EPSILON: f32 = 1e-10;

/// F0 estimate for a single frame.
///
/// A frame is voiced only when the normalized autocorrelation peak clears the
/// configured confidence floor; everything else reports `Unvoiced`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PitchEstimate {
    Voiced { hz: f32, confidence: f32 },
    Unvoiced,
}

impl PitchEstimate {
    pub fn hz(&self) -> Option<f32> {
        match self {
            PitchEstimate::Voiced { hz, .. } => Some(*hz),
            PitchEstimate::Unvoiced => None,
        }
    }

    pub fn is_voiced(&self) -> bool {
        matches!(self, PitchEstimate::Voiced { .. })
    }
}

/// Autocorrelation pitch detector.
///
/// Stateless per frame: the estimate is purely a function of the samples and
/// the configured search range. Complexity is O(N * lag range).
#[derive(Debug, Clone, Copy)]
pub struct PitchDetector {
    pub min_hz: f32,
    pub max_hz: f32,
    pub confidence_floor: f32,
}

impl Default for PitchDetector {
    fn default() -> Self {
        Self {
            min_hz: PITCH_MIN_HZ,
            max_hz: PITCH_MAX_HZ,
            confidence_floor: VOICING_CONFIDENCE_FLOOR,
        }
    }
}

impl PitchDetector {
    pub fn new(min_hz: f32, max_hz: f32, confidence_floor: f32) -> Self {
        Self {
            min_hz,
            max_hz,
            confidence_floor,
        }
    }

    /// Estimate the dominant periodic frequency of one frame.
    ///
    /// Searches lags in `[Fs/max_hz, Fs/min_hz)`, normalizing each
    /// autocorrelation by total signal power. Zero-power frames and frames
    /// too short to cover the minimum lag report `Unvoiced`.
    pub fn estimate(&self, frame: &AudioFrame) -> Result<PitchEstimate, FrameError> {
        frame.validate()?;

        let samples = &frame.samples;
        let n = samples.len();
        let fs = frame.sample_rate_hz as f32;

        let power: f32 = samples.iter().map(|&s| s * s).sum();
        if power <= POWER_EPSILON {
            return Ok(PitchEstimate::Unvoiced);
        }

        let min_lag = (fs / self.max_hz) as usize;
        // Lags at or beyond the frame length have no overlapping samples.
        let max_lag = ((fs / self.min_hz) as usize).min(n);
        if min_lag == 0 || min_lag >= max_lag {
            return Ok(PitchEstimate::Unvoiced);
        }

        let mut best_confidence = 0.0f32;
        let mut best_hz = 0.0f32;

        for lag in min_lag..max_lag {
            let mut correlation = 0.0f32;
            for i in 0..n - lag {
                correlation += samples[i] * samples[i + lag];
            }
            let confidence = correlation / power;

            if confidence > best_confidence {
                best_confidence = confidence;
                best_hz = fs / lag as f32;
            }
        }

        if best_confidence < self.confidence_floor {
            Ok(PitchEstimate::Unvoiced)
        } else {
            Ok(PitchEstimate::Voiced {
                hz: best_hz,
                confidence: best_confidence,
            })
        }
    }
}

/// Convenience wrapper using the default search range.
pub fn estimate_pitch(frame: &AudioFrame) -> Result<PitchEstimate, FrameError> {
    PitchDetector::default().estimate(frame)
}
