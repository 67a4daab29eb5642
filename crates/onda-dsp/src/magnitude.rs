//! Robertson's magnitude approximation for complex samples.
//!
//! `sqrt(I^2 + Q^2)` is approximated by `max + min/2`, which stays within
//! about 0.97 dB of the true envelope - plenty for envelope detection and
//! level measurement - at the cost of two compares and a shift.

/// Estimate the magnitude of a complex sample from its components.
#[inline]
pub fn magnitude_estimate(i: f32, q: f32) -> f32 {
    let i_magnitude = if i < 0.0 { -i } else { i };
    let q_magnitude = if q < 0.0 { -q } else { q };

    if i_magnitude > q_magnitude {
        i_magnitude + 0.5 * q_magnitude
    } else {
        q_magnitude + 0.5 * i_magnitude
    }
}

/// Integer form over raw 8-bit tuner components, as used by the block
/// signal detector.
#[inline]
pub fn magnitude_estimate_i8(i: i8, q: i8) -> u32 {
    let i_magnitude = u32::from(i.unsigned_abs());
    let q_magnitude = u32::from(q.unsigned_abs());

    if i_magnitude > q_magnitude {
        i_magnitude + (q_magnitude >> 1)
    } else {
        q_magnitude + (i_magnitude >> 1)
    }
}
