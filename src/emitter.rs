//! Emitter entities and the operators acting on them.
//!
//! An emitter is an empty object that owns a set of projectile instances,
//! copies of a source mesh object. The operators here mirror the user-facing
//! actions: add an emitter from an object, remove it again, and execute it
//! (rebuild its instances from the current settings). Any edit to an
//! emitter's settings marks it dirty until it is executed again.

use bevy::math::DVec3;
use bevy::prelude::*;

use crate::collision::Collider;
use crate::instancing::{Instance, InstanceRequest, plan_instances};
use crate::physics::{RigidBodyWorld, finite_difference_velocity, to_spherical};
use crate::sync::{SphericalVelocity, VelocitySync};
use crate::types::{
    ActiveObject, MAX_FRAME, ObjectName, Placement, ProjectileSettings, ProjectileSystemSet,
    SceneSettings, Selected, SimulationConfig,
};

/// Errors raised by emitter validation and operators.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EmitterError {
    #[error("object {0} does not exist or has no placement")]
    MissingSource(Entity),

    #[error("object {0} is already an emitter or an instance")]
    AlreadyEmitter(Entity),

    #[error("object {0} is not an emitter")]
    NotAnEmitter(Entity),

    #[error("start frame must be at least 1 (got {0})")]
    InvalidStartFrame(u32),

    #[error("frame range [{start}, {end}] contains no frames")]
    EmptyFrameRange { start: u32, end: u32 },

    #[error("frame {0} is past the last allowed frame")]
    FrameOutOfRange(u32),

    #[error("instance count must be at least 1")]
    ZeroInstances,

    #[error("frame rate must be positive (got {0})")]
    InvalidFrameRate(u32),
}

/// Emitter settings that drive instancing.
#[derive(Component, Clone, Debug, PartialEq)]
pub struct Emitter {
    /// First frame instances are spawned on
    pub start_frame: u32,
    /// Last frame instances are spawned on
    pub end_frame: u32,
    /// Number of instances spread across the frame range
    pub instance_count: u32,
    /// Hide instances before they are spawned
    pub start_hidden: bool,
    /// Frames an instance stays alive (0 = forever)
    pub lifetime: u32,
    /// Angular velocity as Euler rates (rad/s)
    pub angular_velocity: DVec3,
}

impl Default for Emitter {
    fn default() -> Self {
        Self {
            start_frame: 1,
            end_frame: 50,
            instance_count: 1,
            start_hidden: false,
            lifetime: 0,
            angular_velocity: DVec3::ZERO,
        }
    }
}

impl Emitter {
    pub fn validate(&self) -> Result<(), EmitterError> {
        if self.start_frame < 1 {
            return Err(EmitterError::InvalidStartFrame(self.start_frame));
        }
        if self.end_frame > MAX_FRAME {
            return Err(EmitterError::FrameOutOfRange(self.end_frame));
        }
        if self.end_frame <= self.start_frame {
            return Err(EmitterError::EmptyFrameRange {
                start: self.start_frame,
                end: self.end_frame,
            });
        }
        if self.instance_count == 0 {
            return Err(EmitterError::ZeroInstances);
        }
        Ok(())
    }
}

/// Initial linear velocity of emitted instances (m/s, physics frame).
#[derive(Component, Clone, Copy, Debug, Default, PartialEq)]
pub struct EmitterVelocity(pub DVec3);

/// Collision shape handed to the rigid body solver for instances.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CollisionShapeKind {
    Box,
    Sphere,
    Capsule,
    Cylinder,
    Cone,
    #[default]
    ConvexHull,
    Mesh,
    Compound,
}

impl CollisionShapeKind {
    pub const ALL: [CollisionShapeKind; 8] = [
        CollisionShapeKind::Box,
        CollisionShapeKind::Sphere,
        CollisionShapeKind::Capsule,
        CollisionShapeKind::Cylinder,
        CollisionShapeKind::Cone,
        CollisionShapeKind::ConvexHull,
        CollisionShapeKind::Mesh,
        CollisionShapeKind::Compound,
    ];

    pub fn label(self) -> &'static str {
        match self {
            CollisionShapeKind::Box => "Box",
            CollisionShapeKind::Sphere => "Sphere",
            CollisionShapeKind::Capsule => "Capsule",
            CollisionShapeKind::Cylinder => "Cylinder",
            CollisionShapeKind::Cone => "Cone",
            CollisionShapeKind::ConvexHull => "Convex Hull",
            CollisionShapeKind::Mesh => "Mesh",
            CollisionShapeKind::Compound => "Compound Parent",
        }
    }
}

/// Rigid body settings copied onto every instance.
#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct InstancePhysics {
    /// Resistance to movement, 0..1
    pub friction: f64,
    /// Restitution, 0..1
    pub bounciness: f64,
    pub collision_shape: CollisionShapeKind,
}

impl Default for InstancePhysics {
    fn default() -> Self {
        Self {
            friction: 0.5,
            bounciness: 0.0,
            collision_shape: CollisionShapeKind::ConvexHull,
        }
    }
}

/// Whether the emitter's instances are stale.
#[derive(Component, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EmitterStatus {
    pub is_dirty: bool,
}

/// The object an emitter makes copies of.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstanceSource(pub Entity);

/// Back-reference from a spawned instance to its emitter.
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstanceOf(pub Entity);

/// Keyframed emitter positions, linearly interpolated between keys.
#[derive(Component, Clone, Debug, Default, PartialEq)]
pub struct EmitterTrack {
    keys: Vec<(u32, DVec3)>,
}

impl EmitterTrack {
    pub fn new(mut keys: Vec<(u32, DVec3)>) -> Self {
        keys.sort_by_key(|(frame, _)| *frame);
        keys.dedup_by_key(|(frame, _)| *frame);
        Self { keys }
    }

    /// Position on `frame`; held constant before the first and after the last key.
    pub fn position_at(&self, frame: u32) -> Option<DVec3> {
        let first = self.keys.first()?;
        if frame <= first.0 {
            return Some(first.1);
        }

        for pair in self.keys.windows(2) {
            let (f0, p0) = pair[0];
            let (f1, p1) = pair[1];
            if frame <= f1 {
                let t = (frame - f0) as f64 / (f1 - f0) as f64;
                return Some(p0.lerp(p1, t));
            }
        }

        self.keys.last().map(|(_, pos)| *pos)
    }

    /// Emitter motion velocity on `frame` from the previous frame's position.
    pub fn velocity_at(&self, frame: u32, frame_rate: u32) -> DVec3 {
        match (
            self.position_at(frame.saturating_sub(1)),
            self.position_at(frame),
        ) {
            (Some(previous), Some(current)) => {
                finite_difference_velocity(previous, current, frame_rate)
            }
            _ => DVec3::ZERO,
        }
    }
}

/// Read-only snapshot of the emitter values trajectory prediction needs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EmitterState {
    pub id: Entity,
    pub position: DVec3,
    pub velocity: DVec3,
    pub angular_velocity: DVec3,
    pub start_frame: u32,
    pub end_frame: u32,
    pub is_dirty: bool,
}

impl EmitterState {
    pub fn new(
        id: Entity,
        emitter: &Emitter,
        velocity: &EmitterVelocity,
        placement: &Placement,
        status: &EmitterStatus,
    ) -> Self {
        Self {
            id,
            position: placement.pos,
            velocity: velocity.0,
            angular_velocity: emitter.angular_velocity,
            start_frame: emitter.start_frame,
            end_frame: emitter.end_frame,
            is_dirty: status.is_dirty,
        }
    }
}

/// Request to turn an object into an emitter of copies of itself.
#[derive(Message, Clone, Copy, Debug)]
pub struct AddEmitterEvent {
    pub source: Entity,
}

/// Request to remove an emitter and all of its instances.
#[derive(Message, Clone, Copy, Debug)]
pub struct RemoveEmitterEvent {
    pub emitter: Entity,
}

/// Request to rebuild the instances of one emitter.
#[derive(Message, Clone, Copy, Debug)]
pub struct ExecuteEmitterEvent {
    pub emitter: Entity,
}

/// Request to rebuild the instances of every dirty emitter.
#[derive(Message, Clone, Copy, Debug, Default)]
pub struct ExecuteAllEvent;

/// Raised when a watched scene setting changes and trajectories need redrawing.
#[derive(Message, Clone, Copy, Debug, Default)]
pub struct TrajectoryRedrawEvent;

/// Scene values whose change invalidates every emitter.
#[derive(Clone, Copy, Debug, PartialEq)]
struct WatchedScene {
    gravity: DVec3,
    use_gravity: bool,
    frame_rate: u32,
}

impl From<&SceneSettings> for WatchedScene {
    fn from(scene: &SceneSettings) -> Self {
        Self {
            gravity: scene.gravity,
            use_gravity: scene.use_gravity,
            frame_rate: scene.frame_rate,
        }
    }
}

/// Plugin providing emitter operators and dirty tracking.
pub struct EmitterPlugin;

impl Plugin for EmitterPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SceneSettings>()
            .init_resource::<ProjectileSettings>()
            .init_resource::<ActiveObject>()
            .add_message::<AddEmitterEvent>()
            .add_message::<RemoveEmitterEvent>()
            .add_message::<ExecuteEmitterEvent>()
            .add_message::<ExecuteAllEvent>()
            .add_message::<TrajectoryRedrawEvent>()
            .configure_sets(
                Update,
                (
                    ProjectileSystemSet::Edit,
                    ProjectileSystemSet::Sync,
                    ProjectileSystemSet::Operators,
                )
                    .chain(),
            )
            .add_systems(
                Update,
                (
                    watch_scene_settings,
                    mark_edited_emitters_dirty,
                    handle_add_emitter,
                    handle_remove_emitter,
                    handle_execute_emitter,
                )
                    .chain()
                    .in_set(ProjectileSystemSet::Operators),
            );
    }
}

/// Spawn an emitter entity for `source` at `pos`.
///
/// The spherical velocity is derived up front so the first sync pass has
/// nothing to propagate.
pub fn spawn_emitter(
    commands: &mut Commands,
    source: Entity,
    name: &str,
    pos: DVec3,
    emitter: Emitter,
    velocity: DVec3,
) -> Entity {
    commands
        .spawn((
            emitter,
            EmitterVelocity(velocity),
            SphericalVelocity(to_spherical(velocity)),
            VelocitySync::default(),
            InstancePhysics::default(),
            EmitterStatus { is_dirty: true },
            InstanceSource(source),
            ObjectName(format!("emitter_{name}")),
            Placement::at(pos),
            Transform::default(),
            Visibility::default(),
        ))
        .id()
}

/// Whether any emitter has stale instances.
pub fn any_dirty(statuses: &Query<&EmitterStatus, With<Emitter>>) -> bool {
    statuses.iter().any(|status| status.is_dirty)
}

/// Mark every emitter dirty and request a redraw when gravity or frame rate change.
fn watch_scene_settings(
    scene: Res<SceneSettings>,
    mut last: Local<Option<WatchedScene>>,
    mut statuses: Query<&mut EmitterStatus, With<Emitter>>,
    mut redraw: MessageWriter<TrajectoryRedrawEvent>,
) {
    if !scene.is_changed() {
        return;
    }

    let current = WatchedScene::from(scene.as_ref());
    let previous = last.replace(current);
    if previous.is_none() || previous == Some(current) {
        return;
    }

    debug!("Scene physics settings changed, marking emitters dirty");
    for mut status in statuses.iter_mut() {
        status.is_dirty = true;
    }
    redraw.write(TrajectoryRedrawEvent);
}

/// Mark emitters whose settings were edited since the last frame.
fn mark_edited_emitters_dirty(
    mut emitters: Query<(
        Ref<Emitter>,
        Ref<EmitterVelocity>,
        Ref<SphericalVelocity>,
        Ref<InstancePhysics>,
        &mut EmitterStatus,
    )>,
) {
    for (emitter, velocity, spherical, physics, mut status) in emitters.iter_mut() {
        let edited = (emitter.is_changed() && !emitter.is_added())
            || (velocity.is_changed() && !velocity.is_added())
            || (spherical.is_changed() && !spherical.is_added())
            || (physics.is_changed() && !physics.is_added());

        if edited && !status.is_dirty {
            status.is_dirty = true;
        }
    }
}

/// Turn objects into emitters.
fn handle_add_emitter(
    mut commands: Commands,
    mut events: MessageReader<AddEmitterEvent>,
    sources: Query<(&Placement, Option<&ObjectName>, Has<Emitter>, Has<InstanceOf>)>,
    selected: Query<Entity, With<Selected>>,
    settings: Res<ProjectileSettings>,
    scene: Res<SceneSettings>,
    mut active: ResMut<ActiveObject>,
    mut execute: MessageWriter<ExecuteEmitterEvent>,
    rigid_body_world: Option<ResMut<RigidBodyWorld>>,
) {
    let mut added_any = false;

    for event in events.read() {
        let source = event.source;
        let (placement, name, is_emitter, is_instance) = match sources.get(source) {
            Ok(found) => found,
            Err(_) => {
                warn!("Cannot add emitter: {}", EmitterError::MissingSource(source));
                continue;
            }
        };
        if is_emitter || is_instance {
            warn!("Cannot add emitter: {}", EmitterError::AlreadyEmitter(source));
            continue;
        }

        let name = name.map_or_else(|| format!("{source}"), |n| n.0.clone());
        let emitter = spawn_emitter(
            &mut commands,
            source,
            &name,
            placement.pos,
            Emitter::default(),
            DVec3::ZERO,
        );

        // The source only lives on through its instances.
        commands
            .entity(source)
            .insert(Visibility::Hidden)
            .remove::<Selected>();
        for entity in selected.iter() {
            commands.entity(entity).remove::<Selected>();
        }
        commands.entity(emitter).insert(Selected);
        active.0 = Some(emitter);

        info!("Added emitter {} for '{}'", emitter, name);
        execute.write(ExecuteEmitterEvent { emitter });
        added_any = true;
    }

    if added_any && let Some(mut world) = rigid_body_world {
        world.set_quality(settings.quality, scene.frame_rate);
    }
}

/// Remove emitters, their instances, and restore the source objects.
fn handle_remove_emitter(
    mut commands: Commands,
    mut events: MessageReader<RemoveEmitterEvent>,
    emitters: Query<&InstanceSource, With<Emitter>>,
    instances: Query<(Entity, &InstanceOf)>,
    mut active: ResMut<ActiveObject>,
) {
    for event in events.read() {
        let Ok(source) = emitters.get(event.emitter) else {
            warn!("Cannot remove emitter: {}", EmitterError::NotAnEmitter(event.emitter));
            continue;
        };

        let mut removed = 0;
        for (instance, owner) in instances.iter() {
            if owner.0 == event.emitter {
                commands.entity(instance).despawn();
                removed += 1;
            }
        }
        commands.entity(event.emitter).despawn();

        commands
            .entity(source.0)
            .insert((Visibility::Inherited, Selected));
        active.0 = Some(source.0);

        info!("Removed emitter {} and {} instances", event.emitter, removed);
    }
}

/// Rebuild the instances of executed emitters.
fn handle_execute_emitter(
    mut commands: Commands,
    mut events: MessageReader<ExecuteEmitterEvent>,
    mut execute_all: MessageReader<ExecuteAllEvent>,
    mut emitters: Query<(
        Entity,
        &Emitter,
        &EmitterVelocity,
        &InstancePhysics,
        &Placement,
        &InstanceSource,
        Option<&EmitterTrack>,
        &mut EmitterStatus,
    )>,
    sources: Query<(
        Option<&Collider>,
        Option<&Mesh3d>,
        Option<&MeshMaterial3d<StandardMaterial>>,
        Option<&ObjectName>,
    )>,
    instances: Query<(Entity, &InstanceOf)>,
    scene: Res<SceneSettings>,
) {
    let mut targets: Vec<Entity> = events.read().map(|event| event.emitter).collect();

    if execute_all.read().count() > 0 {
        targets.extend(
            emitters
                .iter()
                .filter(|(.., status)| status.is_dirty)
                .map(|(entity, ..)| entity),
        );
    }
    targets.sort();
    targets.dedup();

    if targets.is_empty() {
        return;
    }
    if let Err(err) = scene.validate() {
        warn!("Cannot execute emitters: {}", err);
        return;
    }
    let config = SimulationConfig::from_scene(&scene);

    for target in targets {
        let Ok((entity, emitter, velocity, physics, placement, source, track, mut status)) =
            emitters.get_mut(target)
        else {
            warn!("Cannot execute: {}", EmitterError::NotAnEmitter(target));
            continue;
        };

        if let Err(err) = emitter.validate() {
            warn!("Cannot execute emitter {}: {}", entity, err);
            continue;
        }

        let rest = *placement;
        let emitter_pose = |frame: u32| Placement {
            pos: track.and_then(|t| t.position_at(frame)).unwrap_or(rest.pos),
            rot: rest.rot,
        };
        let emitter_velocity = |frame: u32| {
            track.map_or(DVec3::ZERO, |t| t.velocity_at(frame, config.frame_rate))
        };

        let request = InstanceRequest {
            start_frame: emitter.start_frame,
            end_frame: emitter.end_frame,
            instance_count: emitter.instance_count,
            lifetime: emitter.lifetime,
            start_hidden: emitter.start_hidden,
            velocity: velocity.0,
            angular_velocity: emitter.angular_velocity,
            gravity: config.gravity,
            frame_rate: config.frame_rate,
            emitter_pose: &emitter_pose,
            emitter_velocity: &emitter_velocity,
        };

        let planned = match plan_instances(&request) {
            Ok(planned) => planned,
            Err(err) => {
                warn!("Cannot execute emitter {}: {}", entity, err);
                continue;
            }
        };

        for (instance, owner) in instances.iter() {
            if owner.0 == entity {
                commands.entity(instance).despawn();
            }
        }

        let (collider, mesh, material, name) = sources.get(source.0).unwrap_or_default();
        let name = name.map_or_else(|| format!("{}", source.0), |n| n.0.clone());
        let count = planned.len();

        for instance in planned {
            let start = instance
                .activations
                .first()
                .map(|a| a.start)
                .unwrap_or(rest);
            let visibility = if instance.start_hidden {
                Visibility::Hidden
            } else {
                Visibility::Inherited
            };

            let mut spawned = commands.spawn((
                instance,
                InstanceOf(entity),
                *physics,
                ObjectName(format!("{name}_instance")),
                start,
                Transform::default(),
                visibility,
            ));
            if let Some(collider) = collider {
                spawned.insert(*collider);
            }
            if let Some(mesh) = mesh {
                spawned.insert(mesh.clone());
            }
            if let Some(material) = material {
                spawned.insert(material.clone());
            }
        }

        status.is_dirty = false;
        info!("Executed emitter {}: {} instances", entity, count);
    }
}
