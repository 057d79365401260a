use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use aizuchi_engine::{AizuchiScheduler, CueCatalog, CueEvent, EngineConfig, TimerId};
use aizuchi_foundation::{AppError, Clock, SharedClock};
use aizuchi_telemetry::{FpsTracker, PipelineMetrics};

use crate::chunker::{run_chunker, ChunkerConfig, FrameAssembler, FrameSlot};
use crate::source::{run_source, SampleSource};
use crate::timer::{TokioClock, TokioTimerDriver};

/// Options for starting the cue pipeline.
#[derive(Clone, Debug)]
pub struct AppRuntimeOptions {
    pub engine: EngineConfig,
    pub catalog: CueCatalog,
    /// Cadence of the pitch-evaluation tick.
    pub tick_interval: Duration,
    /// Seed for cue selection; random when unset.
    pub seed: Option<u64>,
}

impl Default for AppRuntimeOptions {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            catalog: CueCatalog::default(),
            tick_interval: Duration::from_millis(16),
            seed: None,
        }
    }
}

/// Handle to the running pipeline.
pub struct AppHandle {
    pub metrics: Arc<PipelineMetrics>,
    cue_tx: broadcast::Sender<CueEvent>,
    source_handle: JoinHandle<()>,
    chunker_handle: JoinHandle<()>,
    engine_handle: JoinHandle<()>,
}

impl AppHandle {
    /// Subscribe to cue events (multiple subscribers supported).
    pub fn subscribe_cues(&self) -> broadcast::Receiver<CueEvent> {
        self.cue_tx.subscribe()
    }

    /// Stop the pipeline and wait for its tasks.
    pub async fn shutdown(self) {
        info!("shutting down aizuchi runtime");
        self.source_handle.abort();
        self.chunker_handle.abort();
        self.engine_handle.abort();

        let _ = self.source_handle.await;
        let _ = self.chunker_handle.await;
        let _ = self.engine_handle.await;
        info!("aizuchi runtime shutdown complete");
    }
}

/// Wire source → chunker → scheduler and spawn the pipeline tasks.
pub fn start(options: AppRuntimeOptions, source: Box<dyn SampleSource>) -> Result<AppHandle, AppError> {
    if options.tick_interval.is_zero() {
        return Err(AppError::Config("tick interval must be nonzero".into()));
    }

    let metrics = Arc::new(PipelineMetrics::new());
    let clock: SharedClock = Arc::new(TokioClock);
    let slot = Arc::new(FrameSlot::default());

    let (sample_tx, sample_rx) = mpsc::channel::<Vec<f32>>(64);
    let (timer_tx, timer_rx) = mpsc::channel::<TimerId>(32);
    let (cue_tx, _) = broadcast::channel::<CueEvent>(32);

    let chunker_cfg = ChunkerConfig::for_rate(source.sample_rate_hz());
    let assembler = FrameAssembler::new(chunker_cfg);

    let mut scheduler = AizuchiScheduler::new(
        options.engine,
        clock.clone(),
        slot.clone(),
        TokioTimerDriver::new(timer_tx),
    )
    .with_catalog(options.catalog);
    if let Some(seed) = options.seed {
        scheduler = scheduler.with_seed(seed);
    }

    let source_handle = tokio::spawn(run_source(source, sample_tx));
    let chunker_handle = tokio::spawn(run_chunker(
        sample_rx,
        assembler,
        slot.clone(),
        metrics.clone(),
    ));
    let engine_handle = tokio::spawn(run_engine(
        scheduler,
        clock,
        slot,
        timer_rx,
        cue_tx.clone(),
        metrics.clone(),
        options.tick_interval,
    ));

    info!(
        frame_size = chunker_cfg.frame_size_samples,
        sample_rate = chunker_cfg.sample_rate_hz,
        "aizuchi pipeline started"
    );
    Ok(AppHandle {
        metrics,
        cue_tx,
        source_handle,
        chunker_handle,
        engine_handle,
    })
}

/// Single-writer engine task: the scheduler is only ever touched here, with
/// timer callbacks arriving as queued messages.
async fn run_engine(
    mut scheduler: AizuchiScheduler<TokioTimerDriver>,
    clock: SharedClock,
    slot: Arc<FrameSlot>,
    mut timer_rx: mpsc::Receiver<TimerId>,
    cue_tx: broadcast::Sender<CueEvent>,
    metrics: Arc<PipelineMetrics>,
    tick_interval: Duration,
) {
    info!("engine task started");
    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut stats = tokio::time::interval(Duration::from_secs(5));
    let mut fps = FpsTracker::new();
    let energy = aizuchi_dsp::EnergyMeter::new();

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(frame) = slot.latest() else { continue };
                let now = clock.now();

                match scheduler.on_tick(&frame, now) {
                    Ok(Some(event)) => publish_cue(&cue_tx, &metrics, event, &clock),
                    Ok(None) => {}
                    Err(e) => warn!("tick dropped a malformed frame: {}", e),
                }

                metrics.set_audio_level_db(energy.calculate_dbfs(&frame.samples));
                metrics.set_current_f0(scheduler.last_f0());
                metrics.set_baseline_f0(scheduler.baseline_hz());
                metrics.set_history_len(scheduler.history_len());
                mirror_counters(&metrics, scheduler.metrics());
                if let Some(value) = fps.tick() {
                    metrics.set_tick_fps(value);
                }
            }
            fired = timer_rx.recv() => {
                let Some(id) = fired else { break };
                if let Some(event) = scheduler.on_timer_fire(id, clock.now()) {
                    publish_cue(&cue_tx, &metrics, event, &clock);
                }
                mirror_counters(&metrics, scheduler.metrics());
            }
            _ = stats.tick() => {
                debug!(
                    state = ?scheduler.current_state(),
                    level_db = metrics.audio_level_db_value(),
                    ticks = scheduler.metrics().ticks,
                    cues = scheduler.metrics().cues_emitted,
                    "pipeline stats"
                );
            }
        }
    }
    info!(
        ticks = scheduler.metrics().ticks,
        cues = scheduler.metrics().cues_emitted,
        "engine task shutting down"
    );
}

/// Keep the shared gauges in step with the scheduler's own counters.
fn mirror_counters(metrics: &Arc<PipelineMetrics>, engine: &aizuchi_engine::EngineMetrics) {
    use std::sync::atomic::Ordering;
    metrics.arms.store(engine.arms, Ordering::Relaxed);
    metrics.voice_cancels.store(engine.voice_cancels, Ordering::Relaxed);
}

fn publish_cue(
    cue_tx: &broadcast::Sender<CueEvent>,
    metrics: &Arc<PipelineMetrics>,
    event: CueEvent,
    clock: &SharedClock,
) {
    metrics.record_cue(clock.now());
    info!(token = %event.token, at_ms = event.timestamp_ms, "cue ready for playback");
    // No subscribers is fine; the event still counted.
    let _ = cue_tx.send(event);
}
