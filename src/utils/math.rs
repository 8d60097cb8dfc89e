//! Rounding helpers shared by the scorers
//!
//! All derived numbers round half-up (`floor(x + 0.5)`), so -2.5 rounds to -2
//! and 2.5 rounds to 3. `f64::round` rounds half away from zero, which would
//! disagree on negative percent changes.

/// Round half-up to the nearest integer
#[inline]
pub fn round_half_up(value: f64) -> i64 {
    if !value.is_finite() {
        return 0;
    }
    (value + 0.5).floor() as i64
}

/// Round a non-negative weighted count and clamp to `[0, max]`
#[inline]
pub fn clamped_round(value: f64, max: u32) -> u32 {
    round_half_up(value).clamp(0, max as i64) as u32
}

/// Arithmetic mean, zero for an empty slice
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Round to two decimal places (half-up) for presentation fields
#[inline]
pub fn round2(value: f64) -> f64 {
    round_half_up(value * 100.0) as f64 / 100.0
}
