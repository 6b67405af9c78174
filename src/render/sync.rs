//! Placement synchronization between physics and rendering.
//!
//! Physics placements are f64 in the Z-up frame; Transforms are f32 in
//! Bevy's Y-up frame.

use bevy::prelude::*;

use crate::types::{Placement, render_rotation, to_render};

/// Copy changed placements onto render transforms.
pub fn sync_placements(mut query: Query<(&Placement, &mut Transform), Changed<Placement>>) {
    for (placement, mut transform) in query.iter_mut() {
        transform.translation = to_render(placement.pos);
        transform.rotation = render_rotation(placement.rot);
    }
}
