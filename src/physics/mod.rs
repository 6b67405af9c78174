//! Kinematics, coordinate conversion and rigid body world settings.
//!
//! The rigid body solver itself is external; this module only owns the
//! settings handed to it and the closed-form motion used for prediction and
//! instance hand-off.

pub mod coords;
pub mod kinematics;

#[cfg(test)]
mod proptest_physics;

use bevy::prelude::*;

pub use coords::{Spherical, to_cartesian, to_spherical, to_spherical_atan2};
pub use kinematics::{displacement_at, finite_difference_velocity, frame_time, rotation_at};

use crate::types::{ProjectileSettings, SceneSettings, SolverQuality};

/// Solver iterations used by every quality preset.
pub const SOLVER_ITERATIONS: u32 = 20;

/// Plugin keeping the rigid body world settings in line with the chosen quality.
pub struct PhysicsPlugin;

impl Plugin for PhysicsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RigidBodyWorld>().add_systems(
            Update,
            apply_solver_quality.run_if(
                resource_changed::<ProjectileSettings>.or(resource_changed::<SceneSettings>),
            ),
        );
    }
}

/// Settings consumed by the external rigid body solver.
#[derive(Resource, Clone, Debug, PartialEq, Eq)]
pub struct RigidBodyWorld {
    /// Solver substeps per frame
    pub substeps_per_frame: u32,
    /// Constraint solver iterations
    pub solver_iterations: u32,
}

impl Default for RigidBodyWorld {
    fn default() -> Self {
        Self {
            substeps_per_frame: 10,
            solver_iterations: 10,
        }
    }
}

impl RigidBodyWorld {
    /// Apply a quality preset for the given frame rate.
    pub fn set_quality(&mut self, quality: SolverQuality, frame_rate: u32) {
        self.substeps_per_frame = frame_rate * quality.substep_multiplier();
        self.solver_iterations = SOLVER_ITERATIONS;
    }
}

/// Re-derive solver settings after a quality or frame rate change.
pub fn apply_solver_quality(
    settings: Res<ProjectileSettings>,
    scene: Res<SceneSettings>,
    mut world: ResMut<RigidBodyWorld>,
) {
    let mut updated = world.clone();
    updated.set_quality(settings.quality, scene.frame_rate);

    if *world != updated {
        debug!(
            "Solver quality {:?}: {} substeps, {} iterations",
            settings.quality, updated.substeps_per_frame, updated.solver_iterations
        );
        *world = updated;
    }
}
