use std::sync::Arc;

use crate::dsp::envelope::GrainBuffer;

/*
Grain Scheduling
================

The shifter owns no clock. It reads the engine's `now()` once, computes two
absolute start times, and tells the engine to loop each grain buffer from
there. The engine's own sample clock keeps them locked together forever.

    first  = now + start_latency
    second = first + (active - fade)

A grain buffer loops every 2 * (active - fade) seconds (active region plus
tail), so `active - fade` is exactly half a period: while one grain sits in
its tail, the other is playing, and their fade edges overlap.

    grain A  /‾‾‾‾\____/‾‾‾‾\____/‾‾‾‾\____
    grain B  ___/‾‾‾‾\____/‾‾‾‾\____/‾‾‾‾\_
               ^ offset = active - fade

The latency keeps both starts in the future of the engine clock, so no
grain misses its first sample. Starts are rounded to whole frames and may
fall anywhere inside a block; players switch on at that exact frame.
*/

/// A loop buffer plus the absolute time its playback starts.
#[derive(Debug, Clone)]
pub struct Grain {
    pub buffer: Arc<[f32]>,
    /// Engine time in seconds.
    pub start_time: f64,
    pub looping: bool,
}

impl Grain {
    pub fn looped(buffer: &GrainBuffer, start_time: f64) -> Self {
        Self {
            buffer: buffer.shared(),
            start_time,
            looping: true,
        }
    }
}

/// Start times of the two interlocked grains.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GrainSchedule {
    pub first: f64,
    pub second: f64,
}

impl GrainSchedule {
    pub fn new(now: f64, start_latency: f64, active_time: f64, fade_time: f64) -> Self {
        let first = now + start_latency;
        let second = first + (active_time - fade_time);
        log::debug!("grains scheduled at {first:.4}s and {second:.4}s (now {now:.4}s)");
        Self { first, second }
    }

    /// Offset between the two grains, half a loop period.
    pub fn offset(&self) -> f64 {
        self.second - self.first
    }

    /// Both grains of one role, sharing `buffer`.
    pub fn pair(&self, buffer: &GrainBuffer) -> [Grain; 2] {
        [
            Grain::looped(buffer, self.first),
            Grain::looped(buffer, self.second),
        ]
    }
}
