//! Numeric conversion helpers centralizing casts and rounding used by the
//! aggregators and reaction-time bookkeeping.

use num_traits::cast::cast;

/// Round seconds to millisecond precision, returning 0.0 for non-finite values.
#[must_use]
pub fn round_secs(value: f64) -> f64 {
    if !value.is_finite() {
        return 0.0;
    }
    (value * 1000.0).round() / 1000.0
}

/// Convert a count to f64 while allowing precision loss in a single location.
#[must_use]
pub fn count_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

/// Whole frames needed to cover `seconds` at `fps`, saturating on overflow.
#[must_use]
pub fn secs_to_frames(seconds: f64, fps: u32) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    cast::<f64, u64>((seconds * f64::from(fps)).ceil()).unwrap_or(u64::MAX)
}

/// Convert a money amount to f64 for averaging.
#[must_use]
pub fn i64_to_f64(value: i64) -> f64 {
    cast::<i64, f64>(value).unwrap_or(0.0)
}

/// Convert a signed count to i64, saturating at the range limits.
#[must_use]
pub fn count_to_i64(value: usize) -> i64 {
    cast::<usize, i64>(value).unwrap_or(i64::MAX)
}

/// Arithmetic mean, `None` for an empty slice.
#[must_use]
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / count_to_f64(values.len()))
}

/// Percentage of `part` in `total`, 0.0 when `total` is zero.
#[must_use]
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    count_to_f64(part) / count_to_f64(total) * 100.0
}
