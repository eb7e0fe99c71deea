use std::sync::Arc;

use crate::error::{Result, ShiftError};

/*
Grain Envelope Buffers
======================

The shifter never computes its windows on the fly. It renders two kinds of
single-cycle buffers once, hands them to looped buffer players, and lets the
engine replay them forever.

Vocabulary
----------

  active time   Length of one grain (seconds). The part of the buffer that
                carries signal.

  fade time     Length of each fade edge (seconds).

  tail          Silence appended after the active region. Its length is
                active - 2 * fade, which makes the loop period
                2 * active - 2 * fade. Two players started half a loop apart
                then hand over exactly inside each other's fade edges.

  fade buffer   Amplitude window: equal-power fade in, plateau, equal-power
                fade out, tail.

  ramp buffer   Normalized delay-time control: a linear ramp over the active
                region, tail. Scaled by the delay depth downstream.


The Fade Shape
--------------

    1.0 ┐    ____________
        │  /              \
        │ /                \
    0.0 └/──────────────────\______________→ i
        0   fadeLength  fadeIndex2  length1   length

  i < fadeLength              sqrt(i / fadeLength)
  i >= fadeIndex2             sqrt(1 - (i - fadeIndex2) / fadeLength)
  otherwise                   1
  length1 <= i < length       0

The square root keeps power, not amplitude, constant across the overlap:
sqrt(x)^2 + sqrt(1 - x)^2 = 1.

With fadeLength == 0 the fade edges vanish and the window is a unit step.


The Ramp Shape
--------------

  shift up     (length1 - i) / length    falls toward 0
  shift down   i / length1               rises toward 1

A falling delay time reads the input faster than real time (pitch up); a
rising one reads it slower (pitch down). The shift-up ramp divides by the full
loop length, not the active length, so with a tail it starts below 1.


Lengths
-------

All lengths are rounded to whole samples:

  length1     round(active * sr)
  fadeLength  round(fade * sr)
  fadeIndex2  length1 - fadeLength
  length2     round((active - 2 * fade) * sr)
*/

/// Sample counts for one grain layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrainLayout {
    /// Samples in the active region (`length1`).
    pub active_len: usize,
    /// Samples in each fade edge.
    pub fade_len: usize,
    /// Samples of silence after the active region (`length2`).
    pub tail_len: usize,
}

impl GrainLayout {
    /// Validate timing and convert it to sample counts.
    pub fn new(sample_rate: f32, active_time: f64, fade_time: f64) -> Result<Self> {
        if !(sample_rate > 0.0) || !sample_rate.is_finite() {
            return Err(ShiftError::InvalidSampleRate(sample_rate));
        }

        let sustain = active_time - 2.0 * fade_time;
        let timing_ok = active_time.is_finite()
            && fade_time.is_finite()
            && active_time > 0.0
            && fade_time >= 0.0
            && sustain > -1e-12;
        if !timing_ok {
            return Err(ShiftError::InvalidTiming {
                active_time,
                fade_time,
            });
        }

        let sr = sample_rate as f64;
        let active_len = (active_time * sr).round() as usize;
        let fade_len = (fade_time * sr).round() as usize;
        let tail_len = (sustain.max(0.0) * sr).round() as usize;

        if active_len == 0 || 2 * fade_len > active_len {
            return Err(ShiftError::InvalidTiming {
                active_time,
                fade_time,
            });
        }

        Ok(Self {
            active_len,
            fade_len,
            tail_len,
        })
    }

    /// Full loop length in samples.
    #[inline]
    pub fn len(&self) -> usize {
        self.active_len + self.tail_len
    }

    /// First sample of the fade-out edge.
    #[inline]
    pub fn fade_out_start(&self) -> usize {
        self.active_len - self.fade_len
    }
}

/// An immutable single-cycle buffer meant for looped playback.
///
/// Samples are shared through an `Arc`, so every player looping the same
/// buffer reads one allocation.
#[derive(Debug, Clone)]
pub struct GrainBuffer {
    samples: Arc<[f32]>,
    sample_rate: f32,
    layout: GrainLayout,
}

/// Amplitude window produced by [`make_fade_buffer`].
pub type EnvelopeBuffer = GrainBuffer;

/// Normalized delay-time ramp produced by [`make_delay_ramp_buffer`].
pub type DelayRampBuffer = GrainBuffer;

impl GrainBuffer {
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Shared handle to the samples, for handing to a buffer player.
    pub fn shared(&self) -> Arc<[f32]> {
        Arc::clone(&self.samples)
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    pub fn layout(&self) -> GrainLayout {
        self.layout
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Loop period in seconds.
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Build the equal-power crossfade window.
pub fn make_fade_buffer(
    sample_rate: f32,
    active_time: f64,
    fade_time: f64,
) -> Result<EnvelopeBuffer> {
    let layout = GrainLayout::new(sample_rate, active_time, fade_time)?;
    let fade_len = layout.fade_len;
    let fade_out_start = layout.fade_out_start();

    let mut samples = vec![0.0f32; layout.len()];
    for (i, sample) in samples[..layout.active_len].iter_mut().enumerate() {
        *sample = if fade_len == 0 {
            1.0
        } else if i < fade_len {
            (i as f64 / fade_len as f64).sqrt() as f32
        } else if i >= fade_out_start {
            (1.0 - (i - fade_out_start) as f64 / fade_len as f64).sqrt() as f32
        } else {
            1.0
        };
    }

    Ok(GrainBuffer {
        samples: samples.into(),
        sample_rate,
        layout,
    })
}

/// Build the normalized delay-time ramp for one shift direction.
pub fn make_delay_ramp_buffer(
    sample_rate: f32,
    active_time: f64,
    fade_time: f64,
    shift_up: bool,
) -> Result<DelayRampBuffer> {
    let layout = GrainLayout::new(sample_rate, active_time, fade_time)?;
    let active_len = layout.active_len as f64;
    let total_len = layout.len() as f64;

    let mut samples = vec![0.0f32; layout.len()];
    for (i, sample) in samples[..layout.active_len].iter_mut().enumerate() {
        let i = i as f64;
        *sample = if shift_up {
            ((active_len - i) / total_len) as f32
        } else {
            (i / active_len) as f32
        };
    }

    Ok(GrainBuffer {
        samples: samples.into(),
        sample_rate,
        layout,
    })
}
