use aizuchi_foundation::FrameError;

/// One frame of time-domain audio, sampled in [-1.0, 1.0].
///
/// A frame is an immutable snapshot owned by the caller for the duration of
/// one tick; the engine derives what it needs and drops the reference.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub samples: Vec<f32>,
    pub sample_rate_hz: u32,
}

impl AudioFrame {
    pub fn new(samples: Vec<f32>, sample_rate_hz: u32) -> Self {
        Self {
            samples,
            sample_rate_hz,
        }
    }

    /// Fail fast on malformed input. Silence and short-but-nonempty frames
    /// are valid; they resolve to sentinel outcomes downstream.
    pub fn validate(&self) -> Result<(), FrameError> {
        if self.samples.is_empty() {
            return Err(FrameError::EmptyFrame);
        }
        if self.sample_rate_hz == 0 {
            return Err(FrameError::InvalidSampleRate {
                hz: self.sample_rate_hz,
            });
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_ms(&self) -> f32 {
        (self.samples.len() as f32 * 1000.0) / self.sample_rate_hz as f32
    }
}
