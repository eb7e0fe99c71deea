//! Smoothed parameter values.

/*
Parameter Smoothing
===================

Writing a new gain or delay depth straight into a running graph produces a
step in the signal, which we hear as a click. Instead, every control change
is applied as a first-order exponential approach toward the new target:

    v(t) = target + (v0 - target) * exp(-(t - t0) / tc)

  v0    value when the approach starts
  t0    start time of the approach (seconds)
  tc    time constant (seconds). After one tc the remaining distance has
        shrunk to 1/e (~37%), after five tc to under 1%.

Per sample, the same curve is produced by a one-pole low-pass on the value:

    coeff = 1 - exp(-1 / (tc * sample_rate))
    v    += (target - v) * coeff

`SmoothedParam` is the audio-side half: it steps once per sample and can hold
one scheduled start frame. `ExponentialApproach` is the control-side half: it
evaluates the closed form at any time, so a controller can tell where the
audio side is without asking it.

Scheduling is last-writer-wins: a new target replaces a pending one that has
not started yet, and `set_value` cancels everything.
*/

/// Distance below which a ramp snaps onto its target.
const SNAP_EPSILON: f32 = 1e-7;

/// Per-sample coefficient for an exponential approach with time constant `tc`.
#[inline]
pub fn smoothing_coefficient(time_constant: f32, sample_rate: f32) -> f32 {
    if time_constant <= 0.0 || sample_rate <= 0.0 {
        return 1.0;
    }
    1.0 - (-1.0 / (time_constant * sample_rate)).exp()
}

#[derive(Debug, Clone, Copy)]
struct PendingTarget {
    target: f32,
    start_frame: u64,
    coeff: f32,
}

/// Audio-rate parameter with sample-accurate target scheduling.
#[derive(Debug, Clone)]
pub struct SmoothedParam {
    value: f32,
    target: f32,
    coeff: f32,
    pending: Option<PendingTarget>,
}

impl SmoothedParam {
    pub fn new(value: f32) -> Self {
        Self {
            value,
            target: value,
            coeff: 0.0,
            pending: None,
        }
    }

    /// Jump to `value` immediately, dropping any ramp in flight.
    pub fn set_value(&mut self, value: f32) {
        self.value = value;
        self.target = value;
        self.coeff = 0.0;
        self.pending = None;
    }

    /// Start approaching `target` at `start_frame`.
    pub fn set_target_at(
        &mut self,
        target: f32,
        start_frame: u64,
        time_constant: f32,
        sample_rate: f32,
    ) {
        self.pending = Some(PendingTarget {
            target,
            start_frame,
            coeff: smoothing_coefficient(time_constant, sample_rate),
        });
    }

    /// Value for `frame`, then advance one sample.
    #[inline]
    pub fn next(&mut self, frame: u64) -> f32 {
        if let Some(pending) = self.pending {
            if frame >= pending.start_frame {
                self.target = pending.target;
                self.coeff = pending.coeff;
                self.pending = None;
            }
        }

        let out = self.value;
        if self.coeff > 0.0 {
            let next = self.value + (self.target - self.value) * self.coeff;
            // Also snap once the step falls below f32 resolution
            if next == self.value || (self.target - next).abs() <= SNAP_EPSILON {
                self.value = self.target;
                self.coeff = 0.0;
            } else {
                self.value = next;
            }
        }
        out
    }

    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn target(&self) -> f32 {
        self.target
    }

    /// True while a ramp is running or scheduled.
    pub fn is_ramping(&self) -> bool {
        self.coeff > 0.0 || self.pending.is_some()
    }
}

/// Closed-form exponential approach, evaluated on the control side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExponentialApproach {
    pub start_value: f64,
    pub target: f64,
    pub start_time: f64,
    pub time_constant: f64,
}

impl ExponentialApproach {
    /// A settled value that never moves.
    pub fn constant(value: f64) -> Self {
        Self {
            start_value: value,
            target: value,
            start_time: 0.0,
            time_constant: 0.0,
        }
    }

    pub fn value_at(&self, time: f64) -> f64 {
        if time <= self.start_time {
            return self.start_value;
        }
        if self.time_constant <= 0.0 {
            return self.target;
        }
        let decay = (-(time - self.start_time) / self.time_constant).exp();
        self.target + (self.start_value - self.target) * decay
    }

    /// Retarget from wherever this approach is at `time`.
    pub fn retarget(&self, target: f64, time: f64, time_constant: f64) -> Self {
        Self {
            start_value: self.value_at(time),
            target,
            start_time: time,
            time_constant,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const SR: f32 = 48_000.0;

    #[test]
    fn set_value_is_immediate() {
        let mut param = SmoothedParam::new(0.0);
        param.set_value(0.7);
        assert_eq!(param.next(0), 0.7);
        assert!(!param.is_ramping());
    }

    #[test]
    fn one_time_constant_covers_most_of_the_distance() {
        let mut param = SmoothedParam::new(0.0);
        param.set_target_at(1.0, 0, 0.01, SR);

        let tc_frames = (0.01 * SR) as u64;
        for frame in 0..tc_frames {
            param.next(frame);
        }
        // 1 - 1/e
        assert_abs_diff_eq!(param.value(), 0.632_12, epsilon = 1e-3);
    }

    #[test]
    fn scheduled_target_waits_for_start_frame() {
        let mut param = SmoothedParam::new(0.5);
        param.set_target_at(0.0, 100, 0.01, SR);

        for frame in 0..100 {
            assert_eq!(param.next(frame), 0.5);
        }
        param.next(100);
        assert!(param.value() < 0.5);
    }

    #[test]
    fn settles_exactly_on_target() {
        let mut param = SmoothedParam::new(0.2);
        param.set_target_at(0.05, 0, 0.001, SR);
        for frame in 0..48_000 {
            param.next(frame);
        }
        assert_eq!(param.value(), 0.05);
        assert!(!param.is_ramping());
    }

    #[test]
    fn later_target_replaces_pending_one() {
        let mut param = SmoothedParam::new(0.0);
        param.set_target_at(1.0, 10, 0.001, SR);
        param.set_target_at(-1.0, 10, 0.001, SR);
        for frame in 0..4_800 {
            param.next(frame);
        }
        assert_eq!(param.target(), -1.0);
        assert!(param.value() < -0.99);
    }

    #[test]
    fn closed_form_matches_per_sample_ramp() {
        let approach = ExponentialApproach::constant(0.05).retarget(0.0, 0.0, 0.01);
        let mut param = SmoothedParam::new(0.05);
        param.set_target_at(0.0, 0, 0.01, SR);

        let frames = 960;
        for frame in 0..frames {
            param.next(frame);
        }
        let expected = approach.value_at(frames as f64 / SR as f64);
        assert_abs_diff_eq!(param.value() as f64, expected, epsilon = 1e-5);
    }

    #[test]
    fn retarget_continues_from_current_value() {
        let first = ExponentialApproach::constant(0.0).retarget(1.0, 0.0, 0.01);
        let midway = first.value_at(0.01);
        let second = first.retarget(0.0, 0.01, 0.01);

        assert_abs_diff_eq!(second.value_at(0.01), midway, epsilon = 1e-12);
        assert!(second.value_at(0.1) < 1e-4);
    }

    #[test]
    fn zero_time_constant_jumps() {
        assert_eq!(smoothing_coefficient(0.0, SR), 1.0);
        let approach = ExponentialApproach::constant(1.0).retarget(0.0, 0.5, 0.0);
        assert_eq!(approach.value_at(0.5), 1.0);
        assert_eq!(approach.value_at(0.5001), 0.0);
    }
}
