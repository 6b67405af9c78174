//! Property-based tests for the kinematics and coordinate conversion using proptest.

use bevy::math::DVec3;
use proptest::prelude::*;

use super::coords::{to_cartesian, to_spherical, to_spherical_atan2};
use super::kinematics::{displacement_at, rotation_at};

fn component() -> impl Strategy<Value = f64> {
    -1000.0f64..1000.0
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Cartesian -> spherical -> Cartesian reproduces vectors with positive x.
    #[test]
    fn prop_round_trip_positive_x(
        x in 1e-3f64..1000.0,
        y in component(),
        z in component(),
    ) {
        let v = DVec3::new(x, y, z);
        let s = to_spherical(v);
        let back = to_cartesian(s.radius, s.incline, s.azimuth);

        let tolerance = 1e-9 * v.length().max(1.0);
        prop_assert!((back - v).length() < tolerance, "{v:?} came back as {back:?}");
    }

    /// The two-argument variant round-trips every non-degenerate vector.
    #[test]
    fn prop_atan2_round_trip(
        x in component(),
        y in component(),
        z in component(),
    ) {
        let v = DVec3::new(x, y, z);
        prop_assume!(v.length() > 1e-6);

        let back = to_spherical_atan2(v).to_cartesian();
        let tolerance = 1e-9 * v.length().max(1.0);
        prop_assert!((back - v).length() < tolerance, "{v:?} came back as {back:?}");
    }

    /// Incline always lies in [0, π] and radius is never negative.
    #[test]
    fn prop_spherical_ranges(
        x in component(),
        y in component(),
        z in component(),
    ) {
        let s = to_spherical(DVec3::new(x, y, z));
        prop_assert!(s.radius >= 0.0);
        prop_assert!((0.0..=std::f64::consts::PI).contains(&s.incline));
        prop_assert!(s.azimuth.abs() <= std::f64::consts::FRAC_PI_2);
    }

    /// Frame zero is exactly the starting point for any motion.
    #[test]
    fn prop_frame_zero_is_identity(
        px in component(), py in component(), pz in component(),
        vx in component(), vy in component(), vz in component(),
        frame_rate in 1u32..240,
    ) {
        let p = DVec3::new(px, py, pz);
        let v = DVec3::new(vx, vy, vz);
        prop_assert_eq!(displacement_at(p, v, DVec3::new(0.0, 0.0, -9.81), frame_rate, 0), p);
        prop_assert_eq!(rotation_at(p, v, frame_rate, 0), p);
    }

    /// Without gravity, displacement grows linearly with the frame index.
    #[test]
    fn prop_zero_gravity_linear(
        vx in component(), vy in component(), vz in component(),
        frame_rate in 1u32..240,
        frame in 1u32..500,
    ) {
        let v = DVec3::new(vx, vy, vz);
        let one = displacement_at(DVec3::ZERO, v, DVec3::ZERO, frame_rate, 1);
        let many = displacement_at(DVec3::ZERO, v, DVec3::ZERO, frame_rate, frame);

        let expected = one * frame as f64;
        let tolerance = 1e-9 * expected.length().max(1.0);
        prop_assert!((many - expected).length() < tolerance);
    }
}
