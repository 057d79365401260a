pub mod clock;
pub mod error;

pub use clock::{manual_clock, real_clock, Clock, ManualClock, RealClock, SharedClock};
pub use error::{AppError, FrameError};
