//! Projectile - ballistic emitters for rigid body scenes
//!
//! A desktop demo scene: a ground plane, a wall and one emitter throwing
//! copies of a cube. Use the side panel or the keyboard to edit and execute.

use bevy::math::DVec3;
use bevy::prelude::*;
use bevy_egui::EguiPlugin;

use projectile::ProjectilePlugin;
use projectile::camera::CameraPlugin;
use projectile::collision::Collider;
use projectile::emitter::{Emitter, ExecuteEmitterEvent, spawn_emitter};
use projectile::input::InputPlugin;
use projectile::prediction::PredictionPlugin;
use projectile::render::RenderPlugin;
use projectile::types::{ActiveObject, ObjectName, Placement, Selected};
use projectile::ui::UiPlugin;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins)
        .add_plugins(EguiPlugin::default())
        .add_plugins(ProjectilePlugin)
        .add_plugins((
            PredictionPlugin,
            RenderPlugin,
            CameraPlugin,
            InputPlugin,
            UiPlugin,
        ))
        .add_systems(Startup, setup_scene)
        .run();
}

fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    mut active: ResMut<ActiveObject>,
    mut execute: MessageWriter<ExecuteEmitterEvent>,
) {
    commands.spawn((
        ObjectName("ground".into()),
        Collider::ground(),
        Placement::default(),
        Transform::default(),
        Mesh3d(meshes.add(Plane3d::default().mesh().size(60.0, 60.0).build())),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::linear_rgb(0.2, 0.3, 0.25),
            perceptual_roughness: 1.0,
            ..default()
        })),
    ));

    let wall_half_extents = DVec3::new(0.5, 4.0, 2.0);
    commands.spawn((
        ObjectName("wall".into()),
        Collider::cuboid(wall_half_extents),
        Placement::at(DVec3::new(12.0, 0.0, 2.0)),
        Transform::default(),
        // Render frame is Y-up: physics (x, y, z) extents become (x, z, y).
        Mesh3d(meshes.add(Cuboid::new(1.0, 4.0, 8.0))),
        MeshMaterial3d(materials.add(Color::srgb_u8(160, 150, 140))),
    ));

    let source = commands
        .spawn((
            ObjectName("cube".into()),
            Collider::cuboid(DVec3::splat(0.25)),
            Placement::at(DVec3::new(0.0, 0.0, 1.0)),
            Transform::default(),
            Visibility::Hidden,
            Mesh3d(meshes.add(Cuboid::new(0.5, 0.5, 0.5))),
            MeshMaterial3d(materials.add(Color::srgb_u8(124, 144, 255))),
        ))
        .id();

    let emitter = spawn_emitter(
        &mut commands,
        source,
        "cube",
        DVec3::new(0.0, 0.0, 1.0),
        Emitter {
            end_frame: 100,
            instance_count: 8,
            lifetime: 60,
            start_hidden: true,
            ..default()
        },
        DVec3::new(6.0, 0.0, 7.0),
    );
    commands.entity(emitter).insert(Selected);
    active.0 = Some(emitter);
    execute.write(ExecuteEmitterEvent { emitter });
}
