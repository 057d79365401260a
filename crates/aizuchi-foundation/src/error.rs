use thiserror::Error;

/// Caller contract violations on a single audio frame.
///
/// Degenerate but well-formed input (silence, frames shorter than the pitch
/// search window) never produces an error; it resolves to sentinel outcomes
/// downstream. These variants cover input that is malformed outright.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("audio frame is empty")]
    EmptyFrame,

    #[error("invalid sample rate: {hz} Hz")]
    InvalidSampleRate { hz: u32 },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Frame contract violation: {0}")]
    Frame(#[from] FrameError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Pipeline error: {0}")]
    Pipeline(String),

    #[error("Shutdown requested")]
    ShutdownRequested,

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),
}
