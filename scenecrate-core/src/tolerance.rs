//! Numeric tolerances shared by classification, decomposition and inversion

/// Absolute tolerance for `almost_zero` / `almost_one`
pub const ABSOLUTE_TOLERANCE: f64 = 1e-5;

/// Pairs closer than this are equal regardless of magnitude
pub const EPSILON_ABSOLUTE: f64 = 1e-10;

/// Relative tolerance, scaled by the larger operand
pub const EPSILON_RELATIVE: f64 = 1e-4;

/// Machine epsilon scale used for degeneracy checks
pub const EPS: f64 = 1.110223024e-16;

#[inline]
pub fn almost_zero(x: f64) -> bool {
    x.abs() < ABSOLUTE_TOLERANCE
}

#[inline]
pub fn almost_one(x: f64) -> bool {
    (x - 1.0).abs() < ABSOLUTE_TOLERANCE
}

/// Dual absolute/relative comparison.
///
/// Near-equal pairs pass on the absolute threshold; otherwise the difference
/// must be small relative to the larger magnitude. NaN never compares equal.
pub fn almost_equal(a: f64, b: f64) -> bool {
    let diff = (a - b).abs();
    if diff < EPSILON_ABSOLUTE {
        return true;
    }
    let largest = a.abs().max(b.abs());
    diff < EPSILON_RELATIVE * largest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_almost_zero_and_one() {
        assert!(almost_zero(9e-6));
        assert!(!almost_zero(2e-5));
        assert!(almost_one(1.0 - 5e-6));
        assert!(!almost_one(1.001));
    }

    #[test]
    fn test_almost_equal_absolute_branch() {
        assert!(almost_equal(1e-12, 0.0));
        assert!(almost_equal(0.0, 0.0));
    }

    #[test]
    fn test_almost_equal_relative_branch() {
        // Absolute difference is large but small relative to magnitude
        assert!(almost_equal(1.0e8, 1.0e8 + 100.0));
        assert!(!almost_equal(1.0, 1.01));
        assert!(!almost_equal(f64::NAN, f64::NAN));
    }
}
