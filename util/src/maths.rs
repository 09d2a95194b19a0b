//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where
    T: Float,
{
    target_range.0
        + ((value - source_range.0) * (target_range.1 - target_range.0)
            / (source_range.1 - source_range.0))
}

/// Linearly interpolate from `a` towards `b` by the blend factor `t`.
///
/// `t = 0` yields `a`, `t = 1` yields `b`. `t` is not clamped, callers
/// requiring a bounded blend shall clamp it first.
pub fn lerp<T>(a: T, b: T, t: T) -> T
where
    T: Float,
{
    a + (b - a) * t
}

/// Clamp a value into the range `[min, max]`.
pub fn clamp<T>(value: &T, min: &T, max: &T) -> T
where
    T: Float,
{
    let mut ret = *value;

    if ret > *max {
        ret = *max
    }
    if ret < *min {
        ret = *min
    }

    ret
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_lin_map() {
        assert_eq!(lin_map((0f64, 1f64), (0f64, 100f64), 0.5), 50f64);
        assert_eq!(lin_map((0f64, 10f64), (10f64, 0f64), 2.5), 7.5f64);
        assert_eq!(lin_map((-1f64, 1f64), (0f64, 1f64), 0f64), 0.5f64);
    }

    #[test]
    fn test_lerp() {
        assert_eq!(lerp(0f64, 10f64, 0f64), 0f64);
        assert_eq!(lerp(0f64, 10f64, 1f64), 10f64);
        assert_eq!(lerp(0f64, 10f64, 0.15), 1.5f64);
        assert_eq!(lerp(10f64, 0f64, 0.5), 5f64);
    }

    #[test]
    fn test_clamp() {
        assert_eq!(clamp(&5f64, &0f64, &1f64), 1f64);
        assert_eq!(clamp(&-5f64, &0f64, &1f64), 0f64);
        assert_eq!(clamp(&0.5f64, &0f64, &1f64), 0.5f64);
    }
}
