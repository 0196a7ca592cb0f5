//! Angle math - normalization and shortest angular distance
//!
//! Convention: every normalized angle lies in the half-open interval
//! `(reference - PI, reference + PI]`. An input exactly `PI` away from the
//! reference in the negative direction is reported on the positive boundary.

use std::f64::consts::{PI, TAU};

/// Returns `angle` normalized about `reference`, i.e. the value congruent to
/// `angle` modulo 2π inside `(reference - PI, reference + PI]`.
///
/// Non-finite inputs produce NaN. The cost is constant for any finite input.
pub fn normalize_about(angle: f64, reference: f64) -> f64 {
    let diff = angle - reference;
    if !diff.is_finite() {
        return f64::NAN;
    }

    // [0, TAU], TAU only through rounding of tiny negative inputs
    let mut wrapped = diff.rem_euclid(TAU);
    if wrapped > PI {
        wrapped -= TAU;
    }

    wrapped + reference
}

/// Signed displacement of minimal magnitude (at most PI) carrying `from` to an
/// angle congruent with `to`.
pub fn shortest_angular_distance(from: f64, to: f64) -> f64 {
    normalize_about(to, from) - from
}
