//! Common test utilities for integration tests.

#![allow(dead_code)]

use bevy::math::DVec3;
use bevy::prelude::*;
use projectile::ProjectilePlugin;
use projectile::collision::Collider;
use projectile::emitter::{Emitter, InstanceOf};
use projectile::types::{ObjectName, Placement};

/// Headless app with the projectile systems and no window.
pub fn create_projectile_app() -> App {
    let mut app = App::new();
    app.add_plugins(MinimalPlugins).add_plugins(ProjectilePlugin);
    app
}

/// Spawn a plain object that can become an emitter source.
pub fn spawn_source(app: &mut App, name: &str, pos: DVec3) -> Entity {
    app.world_mut()
        .spawn((
            ObjectName(name.into()),
            Collider::cuboid(DVec3::splat(0.5)),
            Placement::at(pos),
            Transform::default(),
            Visibility::default(),
        ))
        .id()
}

/// The emitter entity created for `source`, if any.
pub fn emitter_for(app: &mut App, source: Entity) -> Option<Entity> {
    let mut query = app
        .world_mut()
        .query_filtered::<(Entity, &projectile::emitter::InstanceSource), With<Emitter>>();
    query
        .iter(app.world())
        .find(|(_, s)| s.0 == source)
        .map(|(entity, _)| entity)
}

/// Instances currently owned by `emitter`.
pub fn instances_of(app: &mut App, emitter: Entity) -> Vec<Entity> {
    let mut query = app.world_mut().query::<(Entity, &InstanceOf)>();
    query
        .iter(app.world())
        .filter(|(_, owner)| owner.0 == emitter)
        .map(|(entity, _)| entity)
        .collect()
}
