use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::info;

use aizuchi_app::runtime::{start, AppRuntimeOptions};
use aizuchi_app::source::{SampleSource, SyntheticSource, WavSource};
use aizuchi_dsp::SAMPLE_RATE_HZ;
use aizuchi_engine::{CueCatalog, EngineConfig};

#[derive(Parser, Debug)]
#[command(name = "aizuchi", about = "Backchannel cue engine")]
struct Cli {
    /// Replay a WAV recording instead of the built-in synthetic phrases
    #[arg(long)]
    wav: Option<PathBuf>,

    /// How long to run before shutting down
    #[arg(long, default_value_t = 20)]
    duration_secs: u64,

    /// Seed for cue selection, for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// TOML file overriding the engine defaults
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default)]
struct AppConfig {
    engine: Option<EngineConfig>,
    cue_tokens: Option<Vec<String>>,
    tick_ms: Option<u64>,
}

fn init_logging() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt().with_env_filter(log_level).init();
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<AppConfig> {
    let Some(path) = path else {
        return Ok(AppConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read config {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("cannot parse config {}", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref())?;

    let source: Box<dyn SampleSource> = match &cli.wav {
        Some(path) => Box::new(WavSource::open(path)?),
        None => {
            // Three scripted phrases, each ending in a pitch drop and a pause.
            let mut source = SyntheticSource::new(SAMPLE_RATE_HZ);
            for _ in 0..3 {
                source = source.demo_phrase();
            }
            Box::new(source)
        }
    };

    let mut options = AppRuntimeOptions {
        engine: config.engine.unwrap_or_default(),
        catalog: CueCatalog::new(config.cue_tokens.unwrap_or_default()),
        seed: cli.seed,
        ..Default::default()
    };
    if let Some(tick_ms) = config.tick_ms {
        options.tick_interval = Duration::from_millis(tick_ms.max(1));
    }

    let handle = start(options, source)?;
    let mut cue_rx = handle.subscribe_cues();

    let deadline = tokio::time::sleep(Duration::from_secs(cli.duration_secs));
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => {
                info!("run duration elapsed");
                break;
            }
            event = cue_rx.recv() => match event {
                Ok(cue) => info!(token = %cue.token, at_ms = cue.timestamp_ms, "aizuchi"),
                Err(RecvError::Lagged(skipped)) => {
                    info!(skipped, "cue subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    handle.shutdown().await;
    Ok(())
}
