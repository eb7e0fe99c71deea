pub mod config;
pub mod dsp;
pub mod engine; // Graph realization and parameter scheduling
pub mod error;
pub mod graph; // Declarative audio graph description
pub mod shifter;

pub use config::ShifterConfig;
pub use engine::{AudioEngine, OfflineEngine, ParamEvent};
#[cfg(feature = "rtrb")]
pub use engine::{RealtimeEngine, RealtimeRenderer};
pub use error::{Result, ShiftError};
pub use shifter::{Direction, PitchShifter, PitchState, RangeCheck, SharedPitch};

pub const MAX_BLOCK_SIZE: usize = 2048;
pub(crate) const EVENT_QUEUE_SIZE: usize = 64;
