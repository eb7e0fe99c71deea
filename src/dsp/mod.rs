//! Low-level DSP primitives used by the pitch shifter and the reference engine.
//!
//! Buffer generation allocates once at construction time; everything that runs
//! per sample (delay reads, smoothing, gain) is allocation-free and realtime-safe.

/// Gain and summing helpers for gain-controlled mixing.
pub mod amplify;
/// Variable delay line with fractional reads.
pub mod delay;
/// Crossfade windows and delay-time ramps for looped grains.
pub mod envelope;
/// Exponential parameter smoothing.
pub mod smooth;
/// Transpose amount to pitch multiplier curve.
pub mod transpose;

pub use envelope::{
    make_delay_ramp_buffer, make_fade_buffer, DelayRampBuffer, EnvelopeBuffer, GrainBuffer,
    GrainLayout,
};
pub use transpose::transpose;
