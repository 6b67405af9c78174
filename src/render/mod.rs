//! Rendering systems for the projectile scene.
//!
//! Trajectory lines are drawn by the prediction module; this module keeps
//! object transforms in step with their physics placements.

mod sync;

use bevy::prelude::*;
use bevy::transform::TransformSystems;

pub use self::sync::sync_placements;

/// Plugin aggregating rendering functionality.
pub struct RenderPlugin;

impl Plugin for RenderPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(PostUpdate, sync_placements.before(TransformSystems::Propagate));
    }
}
