//! Wind vector helpers.

/// Meteorological direction in degrees, measured clockwise from north, that a
/// vector `(u, v)` blows from.
///
/// Calm vectors (both components zero, of either sign) have direction 0.
pub fn vector_direction(u: f64, v: f64) -> f64 {
    if u == 0.0 && v == 0.0 {
        return 0.0;
    }
    let direction = (90.0 - (-v).atan2(-u).to_degrees()).rem_euclid(360.0);
    if direction >= 360.0 {
        0.0
    } else {
        direction
    }
}

/// Euclidean length of `(u, v)`.
pub fn vector_magnitude(u: f64, v: f64) -> f64 {
    u.hypot(v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::assert_approx_eq;

    #[test]
    fn test_calm_direction_ignores_sign_of_zero() {
        for (u, v) in [(0.0, 0.0), (0.0, -0.0), (-0.0, 0.0), (-0.0, -0.0)] {
            assert_eq!(vector_direction(u, v), 0.0);
        }
    }

    #[test]
    fn test_cardinal_directions() {
        // westerly, southerly, northeasterly
        assert_approx_eq!(vector_direction(10.0, 0.0), 270.0, 1e-9);
        assert_approx_eq!(vector_direction(0.0, 10.0), 180.0, 1e-9);
        assert_approx_eq!(vector_direction(-10.0, -10.0), 45.0, 1e-9);
        assert_approx_eq!(vector_direction(-10.0, 0.0), 90.0, 1e-9);
        assert_approx_eq!(vector_direction(0.0, -10.0), 0.0, 1e-9);
    }

    #[test]
    fn test_direction_in_range() {
        for u in [-3.0, -1.0, 0.5, 2.0] {
            for v in [-2.0, 0.0, 1.5] {
                let d = vector_direction(u, v);
                assert!((0.0..360.0).contains(&d), "{} for ({}, {})", d, u, v);
            }
        }
    }

    #[test]
    fn test_magnitude() {
        assert_eq!(vector_magnitude(1.0, 0.0), 1.0);
        assert_approx_eq!(vector_magnitude(1.0, 1.0), std::f64::consts::SQRT_2, 1e-12);
        assert_eq!(vector_magnitude(0.0, 0.0), 0.0);
        assert_eq!(vector_magnitude(3.0, -4.0), 5.0);
    }
}
