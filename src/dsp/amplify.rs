//! Gain and summing primitives.

/*
Gain-Controlled Mixing
======================

Everything the shifter does to a signal after the delay lines is gain: the
crossfade windows multiply each delay output, and the two windowed outputs
are summed. Control signals follow the same rules, since a gain node scaling
a ramp buffer is how the delay depth reaches the delay lines.

  summing       Several connections into one input add up:
                  in[i] = a[i] + b[i] + ...

  gain          Scale a signal by a per-sample factor:
                  out[i] = in[i] * g[i]

  param input   A signal connected to a parameter is added to the
                parameter's own (intrinsic) value:
                  g[i] = intrinsic[i] + mod_a[i] + mod_b[i] + ...

So a gain node whose intrinsic value is 0 and whose gain param is driven by a
fade window outputs exactly `in * window`. That is how the crossfade works.
*/

/// Add `input` into `out`, sample by sample.
#[inline]
pub fn accumulate(out: &mut [f32], input: &[f32]) {
    debug_assert_eq!(out.len(), input.len());

    for (o, &x) in out.iter_mut().zip(input.iter()) {
        *o += x;
    }
}

/// Multiply a signal by a per-sample gain, in place.
#[inline]
pub fn multiply_in_place(signal: &mut [f32], gain: &[f32]) {
    debug_assert_eq!(signal.len(), gain.len());

    for (s, &g) in signal.iter_mut().zip(gain.iter()) {
        *s *= g;
    }
}

/// Scale a signal by a constant gain, in place.
#[inline]
pub fn apply_gain(signal: &mut [f32], gain: f32) {
    for sample in signal.iter_mut() {
        *sample *= gain;
    }
}
