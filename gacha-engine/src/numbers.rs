//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Ceil a f64 and clamp it to the u64 range, returning 0 for NaN values.
#[must_use]
pub fn ceil_f64_to_u64(value: f64) -> u64 {
    if value.is_nan() {
        return 0;
    }
    let max = cast::<u64, f64>(u64::MAX).unwrap_or(f64::MAX);
    let clamped = value.clamp(0.0, max).ceil();
    cast::<f64, u64>(clamped).unwrap_or(u64::MAX)
}

/// Convert a count to f64 while allowing precision loss in a single location.
#[must_use]
pub fn u64_to_f64(value: u64) -> f64 {
    cast::<u64, f64>(value).unwrap_or(0.0)
}

/// Ratio of two counts, 0.0 when the denominator is zero.
#[must_use]
pub fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    u64_to_f64(numerator) / u64_to_f64(denominator)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceil_clamps_and_handles_nan() {
        assert_eq!(ceil_f64_to_u64(1.2), 2);
        assert_eq!(ceil_f64_to_u64(52.97), 53);
        assert_eq!(ceil_f64_to_u64(-4.0), 0);
        assert_eq!(ceil_f64_to_u64(f64::NAN), 0);
        assert_eq!(ceil_f64_to_u64(f64::INFINITY), u64::MAX);
    }

    #[test]
    fn ratio_guards_zero_denominator() {
        assert!((ratio(3, 0) - 0.0).abs() < f64::EPSILON);
        assert!((ratio(1, 4) - 0.25).abs() < f64::EPSILON);
    }
}
