//! Projectile - ballistic emitters for rigid body scenes
//!
//! A library crate providing emitters that spawn projectile copies of an
//! object, predict their paths against the scene, and keep their settings
//! editable in Cartesian or spherical form.

pub mod camera;
pub mod collision;
pub mod emitter;
pub mod input;
pub mod instancing;
pub mod physics;
pub mod prediction;
pub mod render;
pub mod sync;
pub mod time;
pub mod types;
pub mod ui;

#[cfg(test)]
pub mod test_utils;

use bevy::prelude::*;

/// Plugin bundling the window-independent projectile systems.
///
/// Drawing, camera, input and UI need a window and are added separately.
pub struct ProjectilePlugin;

impl Plugin for ProjectilePlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            emitter::EmitterPlugin,
            sync::SyncPlugin,
            physics::PhysicsPlugin,
            time::TimelinePlugin,
        ));
    }
}
