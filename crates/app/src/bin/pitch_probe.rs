//! Offline F0 trace of a WAV file: one line per frame with pitch, confidence
//! and level, for eyeballing how a recording will drive the scheduler.

use aizuchi_app::chunker::{ChunkerConfig, FrameAssembler};
use aizuchi_app::source::{SampleSource, WavSource};
use aizuchi_dsp::{EnergyMeter, PitchDetector, PitchEstimate};
use std::path::PathBuf;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .ok_or_else(|| anyhow::anyhow!("usage: pitch_probe <file.wav>"))?;

    let mut source = WavSource::open(&path)?;
    let cfg = ChunkerConfig::for_rate(source.sample_rate_hz());
    let mut assembler = FrameAssembler::new(cfg);
    let detector = PitchDetector::default();
    let energy = EnergyMeter::new();

    println!("time_ms\tf0_hz\tconfidence\tlevel_db");
    let mut elapsed_ms = 0.0f64;
    while let Some(chunk) = source.next_chunk() {
        assembler.push(&chunk);
        while let Some(frame) = assembler.next_frame() {
            let db = energy.calculate_dbfs(&frame.samples);
            match detector.estimate(&frame)? {
                PitchEstimate::Voiced { hz, confidence } => {
                    println!("{:.0}\t{:.1}\t{:.2}\t{:.1}", elapsed_ms, hz, confidence, db);
                }
                PitchEstimate::Unvoiced => {
                    println!("{:.0}\t-\t-\t{:.1}", elapsed_ms, db);
                }
            }
            elapsed_ms += frame.duration_ms() as f64;
        }
    }
    Ok(())
}
