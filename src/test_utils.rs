//! Test utilities for prediction and instancing tests.
//!
//! Provides emitter snapshots, throwaway entity ids and scripted collision
//! oracles.

use bevy::math::DVec3;
use bevy::prelude::*;

use crate::collision::{CollisionResult, HitObject};
use crate::emitter::EmitterState;
use crate::types::SimulationConfig;

/// Fixtures for building prediction inputs.
pub mod fixtures {
    use super::*;

    /// `count` distinct entity ids from a scratch world.
    pub fn entities(count: usize) -> Vec<Entity> {
        let mut world = World::new();
        (0..count).map(|_| world.spawn_empty().id()).collect()
    }

    /// Clean emitter snapshot at `position` with the default frame range.
    pub fn emitter_state(id: Entity, position: DVec3, velocity: DVec3) -> EmitterState {
        EmitterState {
            id,
            position,
            velocity,
            angular_velocity: DVec3::ZERO,
            start_frame: 1,
            end_frame: 50,
            is_dirty: false,
        }
    }

    pub fn config(gravity: DVec3, frame_rate: u32, end_frame: u32) -> SimulationConfig {
        SimulationConfig {
            gravity,
            frame_rate,
            end_frame,
        }
    }
}

/// Scripted collision oracles.
pub mod oracles {
    use super::*;

    /// Oracle for an empty scene.
    pub fn no_obstruction(_from: DVec3, _to: DVec3, _max: f64) -> CollisionResult {
        CollisionResult::miss()
    }

    /// Oracle reporting a wall at `x = wall_x`, spanning all y and z.
    pub fn wall_at_x(
        wall_x: f64,
        object: HitObject,
    ) -> impl Fn(DVec3, DVec3, f64) -> CollisionResult {
        move |from: DVec3, to: DVec3, _max: f64| {
            let crosses = (from.x - wall_x) * (to.x - wall_x) <= 0.0 && from.x != to.x;
            if crosses {
                let t = (wall_x - from.x) / (to.x - from.x);
                CollisionResult::hit_at(from.lerp(to, t), object)
            } else {
                CollisionResult::miss()
            }
        }
    }

    /// Oracle hitting `object` at the start of every queried segment.
    pub fn always_hit(object: HitObject) -> impl Fn(DVec3, DVec3, f64) -> CollisionResult {
        move |from: DVec3, _to: DVec3, _max: f64| CollisionResult::hit_at(from, object)
    }
}
