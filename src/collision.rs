//! Scene ray casting used to truncate predicted trajectories.
//!
//! Collidable objects carry a [`Collider`] and a [`Placement`]. Each query
//! builds a [`SceneColliders`] snapshot and casts rays against it analytically,
//! returning the nearest surface hit within the requested distance. Surfaces
//! are hit from either side, so a ray starting inside a sphere or box reports
//! the exit point.

use bevy::math::{DQuat, DVec3, EulerRot};
use bevy::prelude::*;

use crate::emitter::InstanceOf;
use crate::types::Placement;

/// Below this, a ray direction is treated as parallel to a plane or slab.
const PARALLEL_EPSILON: f64 = 1e-12;

/// Collision geometry of an object, expressed in its local frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ColliderShape {
    /// Infinite two-sided plane through the object's origin.
    Plane {
        /// Plane normal in the object's local frame
        normal: DVec3,
    },
    /// Sphere centered on the object's origin.
    Sphere { radius: f64 },
    /// Box centered on the object's origin, oriented by the object's rotation.
    Cuboid { half_extents: DVec3 },
}

/// Marks an object as collidable for trajectory prediction.
#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct Collider {
    pub shape: ColliderShape,
}

impl Collider {
    pub fn ground() -> Self {
        Self {
            shape: ColliderShape::Plane { normal: DVec3::Z },
        }
    }

    pub fn sphere(radius: f64) -> Self {
        Self {
            shape: ColliderShape::Sphere { radius },
        }
    }

    pub fn cuboid(half_extents: DVec3) -> Self {
        Self {
            shape: ColliderShape::Cuboid { half_extents },
        }
    }
}

/// The object a ray hit, with its emitter back-reference if it is an instance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HitObject {
    pub entity: Entity,
    /// Emitter that spawned this object, if any
    pub spawned_by: Option<Entity>,
}

/// Outcome of a segment or ray query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CollisionResult {
    pub hit: bool,
    /// Hit location (zero when nothing was hit)
    pub point: DVec3,
    pub hit_object: Option<HitObject>,
}

impl CollisionResult {
    pub fn miss() -> Self {
        Self {
            hit: false,
            point: DVec3::ZERO,
            hit_object: None,
        }
    }

    pub fn hit_at(point: DVec3, object: HitObject) -> Self {
        Self {
            hit: true,
            point,
            hit_object: Some(object),
        }
    }

    /// Whether the hit object was spawned by `emitter`.
    pub fn is_spawned_by(&self, emitter: Entity) -> bool {
        self.hit_object
            .and_then(|object| object.spawned_by)
            .is_some_and(|owner| owner == emitter)
    }
}

/// Answers "is the straight segment from `from` to `to` obstructed?".
///
/// Implemented for [`SceneColliders`] and for any closure with the same
/// signature, which keeps the trajectory predictor independent of the scene.
pub trait CollisionOracle {
    fn collide(&self, from: DVec3, to: DVec3, max_distance: f64) -> CollisionResult;
}

impl<F> CollisionOracle for F
where
    F: Fn(DVec3, DVec3, f64) -> CollisionResult,
{
    fn collide(&self, from: DVec3, to: DVec3, max_distance: f64) -> CollisionResult {
        self(from, to, max_distance)
    }
}

/// Query data read for each collidable object.
pub type ColliderData = (
    Entity,
    &'static Collider,
    &'static Placement,
    Option<&'static InstanceOf>,
);

/// Query data for resolving visibility through the parent chain.
pub type VisibilityData = (Option<&'static Visibility>, Option<&'static ChildOf>);

/// Whether `entity` ends up hidden once inherited visibility is resolved.
fn is_hidden(entity: Entity, hierarchy: &Query<VisibilityData>) -> bool {
    let mut current = entity;
    loop {
        let Ok((visibility, parent)) = hierarchy.get(current) else {
            return false;
        };
        match visibility {
            Some(Visibility::Hidden) => return true,
            Some(Visibility::Visible) => return false,
            Some(Visibility::Inherited) | None => {}
        }
        match parent {
            Some(child_of) => current = child_of.parent(),
            None => return false,
        }
    }
}

/// A collidable object placed in the physics frame.
#[derive(Clone, Copy, Debug)]
struct PlacedCollider {
    entity: Entity,
    spawned_by: Option<Entity>,
    shape: ColliderShape,
    center: DVec3,
    rotation: DQuat,
}

/// Snapshot of every collidable object in the scene.
#[derive(Clone, Debug, Default)]
pub struct SceneColliders {
    colliders: Vec<PlacedCollider>,
}

impl SceneColliders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the visible collidable objects of the scene.
    ///
    /// An object is skipped when it, or the nearest ancestor with an explicit
    /// visibility, is hidden.
    pub fn from_query(
        colliders: &Query<ColliderData>,
        hierarchy: &Query<VisibilityData>,
    ) -> Self {
        let mut scene = Self::new();
        for (entity, collider, placement, instance_of) in colliders.iter() {
            if is_hidden(entity, hierarchy) {
                continue;
            }
            scene.insert(entity, *collider, *placement, instance_of.map(|i| i.0));
        }
        scene
    }

    pub fn insert(
        &mut self,
        entity: Entity,
        collider: Collider,
        placement: Placement,
        spawned_by: Option<Entity>,
    ) {
        let rot = placement.rot;
        self.colliders.push(PlacedCollider {
            entity,
            spawned_by,
            shape: collider.shape,
            center: placement.pos,
            rotation: DQuat::from_euler(EulerRot::XYZ, rot.x, rot.y, rot.z),
        });
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    /// Cast a ray and return the nearest hit within `max_distance`.
    ///
    /// A zero-length direction never hits anything.
    pub fn ray_cast(&self, origin: DVec3, direction: DVec3, max_distance: f64) -> CollisionResult {
        let Some(direction) = direction.try_normalize() else {
            return CollisionResult::miss();
        };

        let mut best: Option<(f64, &PlacedCollider)> = None;
        for collider in &self.colliders {
            if let Some(t) = collider.intersect(origin, direction)
                && t <= max_distance
                && best.is_none_or(|(best_t, _)| t < best_t)
            {
                best = Some((t, collider));
            }
        }

        match best {
            Some((t, collider)) => CollisionResult::hit_at(
                origin + direction * t,
                HitObject {
                    entity: collider.entity,
                    spawned_by: collider.spawned_by,
                },
            ),
            None => CollisionResult::miss(),
        }
    }
}

impl CollisionOracle for SceneColliders {
    fn collide(&self, from: DVec3, to: DVec3, max_distance: f64) -> CollisionResult {
        self.ray_cast(from, to - from, max_distance)
    }
}

impl PlacedCollider {
    /// Distance along a unit-length ray to this collider's surface.
    fn intersect(&self, origin: DVec3, direction: DVec3) -> Option<f64> {
        match self.shape {
            ColliderShape::Plane { normal } => {
                let normal = (self.rotation * normal).try_normalize()?;
                let denom = normal.dot(direction);
                if denom.abs() < PARALLEL_EPSILON {
                    return None;
                }
                let t = normal.dot(self.center - origin) / denom;
                (t >= 0.0).then_some(t)
            }

            ColliderShape::Sphere { radius } => {
                let offset = origin - self.center;
                let b = offset.dot(direction);
                let c = offset.length_squared() - radius * radius;
                let discriminant = b * b - c;
                if discriminant < 0.0 {
                    return None;
                }
                let root = discriminant.sqrt();
                nearest_non_negative(-b - root, -b + root)
            }

            ColliderShape::Cuboid { half_extents } => {
                // Slab test in the box's local frame.
                let inverse = self.rotation.inverse();
                let local_origin = inverse * (origin - self.center);
                let local_direction = inverse * direction;

                let mut t_near = f64::NEG_INFINITY;
                let mut t_far = f64::INFINITY;
                for axis in 0..3 {
                    let o = local_origin[axis];
                    let d = local_direction[axis];
                    let h = half_extents[axis];

                    if d.abs() < PARALLEL_EPSILON {
                        if o.abs() > h {
                            return None;
                        }
                        continue;
                    }

                    let t1 = (-h - o) / d;
                    let t2 = (h - o) / d;
                    t_near = t_near.max(t1.min(t2));
                    t_far = t_far.min(t1.max(t2));
                    if t_near > t_far {
                        return None;
                    }
                }
                nearest_non_negative(t_near, t_far)
            }
        }
    }
}

/// Smallest of the entry/exit distances that lies ahead of the ray origin.
fn nearest_non_negative(t_enter: f64, t_exit: f64) -> Option<f64> {
    if t_enter >= 0.0 {
        Some(t_enter)
    } else if t_exit >= 0.0 {
        Some(t_exit)
    } else {
        None
    }
}
