//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Convert a counter to f64, returning 0.0 if the value cannot be represented.
#[must_use]
pub fn count_to_f64(value: u64) -> f64 {
    cast::<u64, f64>(value).unwrap_or(0.0)
}

/// Ratio of two counters; 0.0 when the denominator is zero.
#[must_use]
pub fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    count_to_f64(numerator) / count_to_f64(denominator)
}

/// Binomial standard error of an observed rate over `samples` trials.
#[must_use]
pub fn binomial_std_error(rate: f64, samples: u64) -> f64 {
    if samples == 0 || !rate.is_finite() {
        return 0.0;
    }
    let clamped = rate.clamp(0.0, 1.0);
    (clamped * (1.0 - clamped) / count_to_f64(samples)).sqrt()
}

/// Convert a slice index into a `u16`, saturating at `u16::MAX`.
#[must_use]
pub fn index_to_u16(index: usize) -> u16 {
    u16::try_from(index).unwrap_or(u16::MAX)
}
