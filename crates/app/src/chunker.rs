use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tracing::info;

use aizuchi_dsp::{AudioFrame, FRAME_SIZE_SAMPLES, SAMPLE_RATE_HZ};
use aizuchi_engine::FrameTap;
use aizuchi_telemetry::PipelineMetrics;

#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    pub frame_size_samples: usize,
    pub sample_rate_hz: u32,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            frame_size_samples: FRAME_SIZE_SAMPLES,
            sample_rate_hz: SAMPLE_RATE_HZ,
        }
    }
}

impl ChunkerConfig {
    /// Frame size targeting ~32ms of audio, rounded up to a power of two so
    /// the pitch search window always fits.
    pub fn for_rate(sample_rate_hz: u32) -> Self {
        let target = (sample_rate_hz as usize * 32) / 1000;
        Self {
            frame_size_samples: target.next_power_of_two(),
            sample_rate_hz,
        }
    }
}

/// Most recent assembled frame, shared with the scheduler's activity poll.
///
/// Each `snapshot` hands out an owned copy, so no reader ever holds the
/// writer's buffer.
#[derive(Default)]
pub struct FrameSlot {
    latest: RwLock<Option<AudioFrame>>,
}

impl FrameSlot {
    pub fn publish(&self, frame: AudioFrame) {
        *self.latest.write() = Some(frame);
    }

    pub fn latest(&self) -> Option<AudioFrame> {
        self.latest.read().clone()
    }
}

impl FrameTap for FrameSlot {
    fn snapshot(&self) -> Option<AudioFrame> {
        self.latest()
    }
}

/// Buffers incoming sample chunks into fixed-size frames.
pub struct FrameAssembler {
    cfg: ChunkerConfig,
    buffer: VecDeque<f32>,
}

impl FrameAssembler {
    pub fn new(cfg: ChunkerConfig) -> Self {
        let cap = cfg.frame_size_samples * 4;
        Self {
            cfg,
            buffer: VecDeque::with_capacity(cap),
        }
    }

    pub fn push(&mut self, samples: &[f32]) {
        self.buffer.extend(samples.iter().copied());
    }

    pub fn next_frame(&mut self) -> Option<AudioFrame> {
        if self.buffer.len() < self.cfg.frame_size_samples {
            return None;
        }
        let samples: Vec<f32> = self.buffer.drain(..self.cfg.frame_size_samples).collect();
        Some(AudioFrame::new(samples, self.cfg.sample_rate_hz))
    }
}

/// Drains the sample channel into the frame slot until the source closes.
pub async fn run_chunker(
    mut rx: mpsc::Receiver<Vec<f32>>,
    mut assembler: FrameAssembler,
    slot: Arc<FrameSlot>,
    metrics: Arc<PipelineMetrics>,
) {
    info!("frame chunker started");
    while let Some(chunk) = rx.recv().await {
        assembler.push(&chunk);
        while let Some(frame) = assembler.next_frame() {
            metrics.record_frame();
            slot.publish(frame);
        }
    }
    info!("frame chunker shutting down");
}
