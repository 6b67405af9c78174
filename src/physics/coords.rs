//! Cartesian <-> spherical conversion for velocity vectors.
//!
//! Spherical coordinates use the physics convention: `incline` (θ) is the
//! polar angle measured from +Z and `azimuth` (φ) is measured in the XY plane
//! from +X.
//!
//! The azimuth uses the single-argument arctangent `atan(y / x)`, which folds
//! vectors with negative x onto the right half-plane. Round-trips through
//! [`to_spherical`] and [`to_cartesian`] are therefore only exact for x > 0
//! (and for the degenerate x = 0 / radius = 0 cases documented below).
//! [`to_spherical_atan2`] is the quadrant-correct variant.

use bevy::math::DVec3;

/// A velocity expressed as magnitude and two angles (radians).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Spherical {
    /// Magnitude of the vector
    pub radius: f64,
    /// Polar angle θ from +Z
    pub incline: f64,
    /// Azimuthal angle φ from +X
    pub azimuth: f64,
}

impl Spherical {
    pub fn new(radius: f64, incline: f64, azimuth: f64) -> Self {
        Self {
            radius,
            incline,
            azimuth,
        }
    }

    pub fn to_cartesian(self) -> DVec3 {
        to_cartesian(self.radius, self.incline, self.azimuth)
    }
}

/// Convert a Cartesian vector to spherical coordinates.
///
/// Degenerate cases resolve to zero rather than failing:
/// - incline is 0 when the radius is 0
/// - azimuth is 0 when x is 0 (including vectors along ±Y)
pub fn to_spherical(v: DVec3) -> Spherical {
    let radius = v.length();

    // Rounding in the norm can push |z / r| a hair past 1.
    let incline = if radius != 0.0 {
        (v.z / radius).clamp(-1.0, 1.0).acos()
    } else {
        0.0
    };

    let azimuth = if v.x != 0.0 { (v.y / v.x).atan() } else { 0.0 };

    Spherical {
        radius,
        incline,
        azimuth,
    }
}

/// Same as [`to_spherical`] but with a two-argument arctangent for the azimuth.
pub fn to_spherical_atan2(v: DVec3) -> Spherical {
    let mut spherical = to_spherical(v);
    spherical.azimuth = if v.x != 0.0 || v.y != 0.0 {
        v.y.atan2(v.x)
    } else {
        0.0
    };
    spherical
}

/// Convert spherical coordinates to a Cartesian vector.
pub fn to_cartesian(radius: f64, incline: f64, azimuth: f64) -> DVec3 {
    let (sin_incline, cos_incline) = incline.sin_cos();
    let (sin_azimuth, cos_azimuth) = azimuth.sin_cos();

    DVec3::new(
        radius * sin_incline * cos_azimuth,
        radius * sin_incline * sin_azimuth,
        radius * cos_incline,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

    #[test]
    fn test_vertical_vector_round_trips_exactly() {
        let v = DVec3::new(0.0, 0.0, 5.0);
        let s = to_spherical(v);

        assert_eq!(s.radius, 5.0);
        assert_eq!(s.incline, 0.0);
        assert_eq!(s.azimuth, 0.0);
        assert_eq!(to_cartesian(5.0, 0.0, 0.0), v);
    }

    #[test]
    fn test_zero_vector_is_degenerate() {
        let s = to_spherical(DVec3::ZERO);
        assert_eq!(s, Spherical::default());
        assert_eq!(s.to_cartesian(), DVec3::ZERO);
    }

    #[test]
    fn test_positive_x_round_trip() {
        let v = DVec3::new(3.0, -4.0, 2.0);
        let back = to_spherical(v).to_cartesian();

        assert_relative_eq!(back.x, v.x, epsilon = 1e-12);
        assert_relative_eq!(back.y, v.y, epsilon = 1e-12);
        assert_relative_eq!(back.z, v.z, epsilon = 1e-12);
    }

    #[test]
    fn test_horizontal_diagonal() {
        let s = to_spherical(DVec3::new(1.0, 1.0, 0.0));
        assert_relative_eq!(s.radius, 2f64.sqrt(), epsilon = 1e-12);
        assert_relative_eq!(s.incline, FRAC_PI_2, epsilon = 1e-12);
        assert_relative_eq!(s.azimuth, FRAC_PI_4, epsilon = 1e-12);
    }

    #[test]
    fn test_single_argument_arctangent_folds_negative_x() {
        // (-1, -1) and (1, 1) share the same azimuth under atan(y / x).
        let folded = to_spherical(DVec3::new(-1.0, -1.0, 0.0));
        assert_relative_eq!(folded.azimuth, FRAC_PI_4, epsilon = 1e-12);

        let back = folded.to_cartesian();
        assert_relative_eq!(back.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(back.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_atan2_variant_keeps_quadrant() {
        let v = DVec3::new(-1.0, -1.0, 0.5);
        let back = to_spherical_atan2(v).to_cartesian();

        assert_relative_eq!(back.x, v.x, epsilon = 1e-12);
        assert_relative_eq!(back.y, v.y, epsilon = 1e-12);
        assert_relative_eq!(back.z, v.z, epsilon = 1e-12);
    }

    #[test]
    fn test_pure_y_vector_loses_azimuth() {
        // x == 0 resolves azimuth to 0, so the vector comes back along +X.
        let s = to_spherical(DVec3::new(0.0, 2.0, 0.0));
        assert_eq!(s.azimuth, 0.0);
        let back = s.to_cartesian();
        assert_relative_eq!(back.x, 2.0, epsilon = 1e-12);
        assert_relative_eq!(back.y, 0.0, epsilon = 1e-12);
    }
}
