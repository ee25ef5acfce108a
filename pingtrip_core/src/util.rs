//! Integer helpers shared by calibration, detection and drift correction.
//!
//! All detection arithmetic is integer with truncating division toward zero,
//! computed in `i64` so that sums of two `i32` never overflow.

/// `(a + b) / 2`, truncated toward zero.
#[inline]
pub fn avg2_trunc(a: i32, b: i32) -> i32 {
    let sum = i64::from(a) + i64::from(b);
    // |sum / 2| <= max(|a|, |b|), so this always fits.
    i32::try_from(sum / 2).unwrap_or(if sum < 0 { i32::MIN } else { i32::MAX })
}

/// `|a - b|`, saturating at `i32::MAX`.
#[inline]
pub fn abs_diff_i32(a: i32, b: i32) -> i32 {
    i32::try_from(a.abs_diff(b)).unwrap_or(i32::MAX)
}

/// `a - b`, saturating.
#[inline]
pub fn sub_sat(a: i32, b: i32) -> i32 {
    a.saturating_sub(b)
}
