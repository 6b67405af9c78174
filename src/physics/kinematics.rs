//! Constant-acceleration kinematics on the scene's frame grid.
//!
//! Time is discretized by the scene frame rate: frame index `n` corresponds to
//! `dt = n / frame_rate` seconds after the start.

use bevy::math::DVec3;

/// Seconds elapsed after `frame_index` frames at `frame_rate`.
#[inline]
pub fn frame_time(frame_rate: u32, frame_index: u32) -> f64 {
    frame_index as f64 / frame_rate as f64
}

/// Position after `frame_index` frames under constant acceleration.
///
/// `s = s0 + v·dt + ½·g·dt²`. Frame index 0 returns `initial` unchanged.
pub fn displacement_at(
    initial: DVec3,
    velocity: DVec3,
    gravity: DVec3,
    frame_rate: u32,
    frame_index: u32,
) -> DVec3 {
    if frame_index == 0 {
        return initial;
    }

    let dt = frame_time(frame_rate, frame_index);
    initial + velocity * dt + gravity * (0.5 * dt * dt)
}

/// Euler rotation after `frame_index` frames at a constant angular rate.
pub fn rotation_at(
    initial: DVec3,
    angular_velocity: DVec3,
    frame_rate: u32,
    frame_index: u32,
) -> DVec3 {
    if frame_index == 0 {
        return initial;
    }

    initial + angular_velocity * frame_time(frame_rate, frame_index)
}

/// Velocity of an object from its positions on two consecutive frames.
pub fn finite_difference_velocity(previous: DVec3, current: DVec3, frame_rate: u32) -> DVec3 {
    (current - previous) * frame_rate as f64
}
