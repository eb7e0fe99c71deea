//! Transpose curve: musical transpose amount to pitch multiplier.

/*
Transpose Curve
===============

The shifter's pitch amount (`mult`) is not a frequency ratio. It scales how far
the delay time sweeps across one grain, and the perceived interval that sweep
produces is not linear in `mult`. This curve maps a musical transpose amount
onto a `mult` that lands close to the requested interval.

  x < 0    x / 12          linear, one twelfth per unit (down regime)
  x = 0    0               bypass
  x > 0    a0 + a1 x + ... + a5 x^5

The positive branch is an empirical degree-5 fit. The coefficients are opaque
and must stay exactly as they are.

Note the jump at zero: the polynomial starts at a0 (~0.0228), not 0. Any
positive input, however small, lands at least a0 away from bypass.

Callers pass half the semitone count (the shifter does `mult / 2`), so
x = -12 (24 semitones down) gives a multiplier of -1.
*/

/// Polynomial coefficients, lowest order first.
pub const TRANSPOSE_COEFFICIENTS: [f64; 6] = [
    0.02278153473118749,
    0.23005591195033048,
    -0.014147877819596033,
    0.0009795096626987743,
    -0.000019413043101157434,
    1.8149080040913423e-7,
];

/// Map a transpose amount to a signed pitch multiplier.
///
/// No bounds are applied to `x`; range handling belongs to the shifter.
#[inline]
pub fn transpose(x: f64) -> f64 {
    if x < 0.0 {
        x / 12.0
    } else if x == 0.0 {
        0.0
    } else {
        // Horner form of a0 + a1 x + ... + a5 x^5
        TRANSPOSE_COEFFICIENTS
            .iter()
            .rev()
            .fold(0.0, |acc, &a| acc * x + a)
    }
}
