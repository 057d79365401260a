use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::info;

use aizuchi_foundation::AppError;

/// Chunk size handed to the pipeline per pull (samples).
const CHUNK_LEN: usize = 256;

/// Pull-based mono sample stream standing in for the capture pipeline.
pub trait SampleSource: Send {
    fn sample_rate_hz(&self) -> u32;

    /// Next batch of samples, `None` once exhausted.
    fn next_chunk(&mut self) -> Option<Vec<f32>>;
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    /// `None` renders silence.
    freq_hz: Option<f32>,
    amplitude: f32,
    samples_left: usize,
}

/// Scripted tone/silence generator with a phase-continuous oscillator.
pub struct SyntheticSource {
    sample_rate_hz: u32,
    segments: VecDeque<Segment>,
    phase: f32,
}

impl SyntheticSource {
    pub fn new(sample_rate_hz: u32) -> Self {
        Self {
            sample_rate_hz,
            segments: VecDeque::new(),
            phase: 0.0,
        }
    }

    pub fn tone(mut self, freq_hz: f32, amplitude: f32, duration_ms: u64) -> Self {
        self.segments.push_back(Segment {
            freq_hz: Some(freq_hz),
            amplitude,
            samples_left: self.duration_samples(duration_ms),
        });
        self
    }

    pub fn silence(mut self, duration_ms: u64) -> Self {
        self.segments.push_back(Segment {
            freq_hz: None,
            amplitude: 0.0,
            samples_left: self.duration_samples(duration_ms),
        });
        self
    }

    /// A phrase shaped like the target pattern: steady tone, terminal pitch
    /// drop, then a pause long enough for a cue to fire.
    pub fn demo_phrase(self) -> Self {
        self.tone(200.0, 0.4, 1000)
            .tone(150.0, 0.4, 100)
            .silence(1500)
    }

    fn duration_samples(&self, duration_ms: u64) -> usize {
        (self.sample_rate_hz as u64 * duration_ms / 1000) as usize
    }
}

impl SampleSource for SyntheticSource {
    fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    fn next_chunk(&mut self) -> Option<Vec<f32>> {
        let mut chunk = Vec::with_capacity(CHUNK_LEN);

        while chunk.len() < CHUNK_LEN {
            let Some(segment) = self.segments.front_mut() else {
                break;
            };
            if segment.samples_left == 0 {
                self.segments.pop_front();
                continue;
            }

            let step = match segment.freq_hz {
                Some(freq) => 2.0 * std::f32::consts::PI * freq / self.sample_rate_hz as f32,
                None => 0.0,
            };
            while segment.samples_left > 0 && chunk.len() < CHUNK_LEN {
                let value = if segment.freq_hz.is_some() {
                    segment.amplitude * self.phase.sin()
                } else {
                    0.0
                };
                chunk.push(value);
                self.phase = (self.phase + step) % (2.0 * std::f32::consts::PI);
                segment.samples_left -= 1;
            }
        }

        if chunk.is_empty() {
            None
        } else {
            Some(chunk)
        }
    }
}

/// WAV file source. The file is decoded to mono float up front and served in
/// fixed chunks, which keeps session-length recordings simple to replay.
pub struct WavSource {
    sample_rate_hz: u32,
    samples: VecDeque<f32>,
}

impl WavSource {
    pub fn open(path: &Path) -> Result<Self, AppError> {
        let mut reader = hound::WavReader::open(path)
            .map_err(|e| AppError::Config(format!("cannot open {}: {}", path.display(), e)))?;
        let spec = reader.spec();

        let interleaved: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .samples::<f32>()
                .collect::<Result<_, _>>()
                .map_err(|e| AppError::Config(format!("bad sample in {}: {}", path.display(), e)))?,
            hound::SampleFormat::Int => {
                let scale = 1.0 / (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .samples::<i32>()
                    .map(|s| s.map(|v| v as f32 * scale))
                    .collect::<Result<_, _>>()
                    .map_err(|e| {
                        AppError::Config(format!("bad sample in {}: {}", path.display(), e))
                    })?
            }
        };

        // Mix down interleaved channels.
        let channels = spec.channels.max(1) as usize;
        let samples: VecDeque<f32> = interleaved
            .chunks(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();

        info!(
            path = %path.display(),
            sample_rate = spec.sample_rate,
            channels,
            samples = samples.len(),
            "loaded wav source"
        );
        Ok(Self {
            sample_rate_hz: spec.sample_rate,
            samples,
        })
    }
}

impl SampleSource for WavSource {
    fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    fn next_chunk(&mut self) -> Option<Vec<f32>> {
        if self.samples.is_empty() {
            return None;
        }
        let take = self.samples.len().min(CHUNK_LEN);
        Some(self.samples.drain(..take).collect())
    }
}

/// Delivers chunks in real time, paced by their audio duration.
pub async fn run_source(mut source: Box<dyn SampleSource>, tx: mpsc::Sender<Vec<f32>>) {
    let rate = source.sample_rate_hz() as f64;
    info!(sample_rate = rate, "sample source started");

    while let Some(chunk) = source.next_chunk() {
        let pace = Duration::from_secs_f64(chunk.len() as f64 / rate);
        if tx.send(chunk).await.is_err() {
            break;
        }
        tokio::time::sleep(pace).await;
    }
    info!("sample source exhausted");
}
