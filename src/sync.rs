//! Keeps an emitter's Cartesian and spherical velocity in step.
//!
//! Both representations are editable. A change handler for each one writes
//! the other, which would then trigger the opposite handler and bounce back.
//! [`VelocitySync`] breaks the loop per emitter: before a handler writes the
//! other representation it marks that representation as suppressed, and the
//! receiving handler consumes the mark and returns without propagating.

use bevy::prelude::*;

use crate::emitter::EmitterVelocity;
use crate::physics::{Spherical, to_spherical};
use crate::types::ProjectileSystemSet;

/// Emitter velocity as radius, incline and azimuth.
#[derive(Component, Clone, Copy, Debug, Default, PartialEq)]
pub struct SphericalVelocity(pub Spherical);

/// One of the two velocity representations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VelocityRepr {
    Cartesian,
    Spherical,
}

/// Per-emitter guard naming the representation whose next change came from sync.
#[derive(Component, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct VelocitySync {
    suppressed: Option<VelocityRepr>,
}

impl VelocitySync {
    /// Record that `target` is about to be written by the sync path.
    pub fn suppress(&mut self, target: VelocityRepr) {
        self.suppressed = Some(target);
    }

    /// If `repr` is suppressed, clear the mark and return true.
    pub fn consume(&mut self, repr: VelocityRepr) -> bool {
        if self.suppressed == Some(repr) {
            self.suppressed = None;
            true
        } else {
            false
        }
    }

    pub fn is_suppressed(&self, repr: VelocityRepr) -> bool {
        self.suppressed == Some(repr)
    }
}

/// Plugin running the two velocity change handlers.
pub struct SyncPlugin;

impl Plugin for SyncPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            Update,
            (cartesian_changed, spherical_changed)
                .chain()
                .in_set(ProjectileSystemSet::Sync),
        );
    }
}

/// Propagate Cartesian velocity edits to the spherical representation.
pub fn cartesian_changed(
    mut emitters: Query<
        (&EmitterVelocity, &mut SphericalVelocity, &mut VelocitySync),
        Changed<EmitterVelocity>,
    >,
) {
    for (velocity, mut spherical, mut sync) in emitters.iter_mut() {
        if sync.consume(VelocityRepr::Cartesian) {
            continue;
        }

        let derived = SphericalVelocity(to_spherical(velocity.0));
        if *spherical != derived {
            sync.suppress(VelocityRepr::Spherical);
            *spherical = derived;
        }
    }
}

/// Propagate spherical velocity edits to the Cartesian representation.
pub fn spherical_changed(
    mut emitters: Query<
        (&SphericalVelocity, &mut EmitterVelocity, &mut VelocitySync),
        Changed<SphericalVelocity>,
    >,
) {
    for (spherical, mut velocity, mut sync) in emitters.iter_mut() {
        if sync.consume(VelocityRepr::Spherical) {
            continue;
        }

        let derived = EmitterVelocity(spherical.0.to_cartesian());
        if *velocity != derived {
            sync.suppress(VelocityRepr::Cartesian);
            *velocity = derived;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::math::DVec3;

    #[test]
    fn test_guard_consumes_once() {
        let mut sync = VelocitySync::default();
        assert!(!sync.consume(VelocityRepr::Spherical));

        sync.suppress(VelocityRepr::Spherical);
        assert!(sync.is_suppressed(VelocityRepr::Spherical));
        assert!(!sync.consume(VelocityRepr::Cartesian));
        assert!(sync.consume(VelocityRepr::Spherical));
        assert!(!sync.consume(VelocityRepr::Spherical));
    }

    fn sync_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins).add_plugins(SyncPlugin);
        app
    }

    fn spawn_synced(app: &mut App, velocity: DVec3) -> Entity {
        app.world_mut()
            .spawn((
                EmitterVelocity(velocity),
                SphericalVelocity(to_spherical(velocity)),
                VelocitySync::default(),
            ))
            .id()
    }

    #[test]
    fn test_cartesian_edit_updates_spherical() {
        let mut app = sync_app();
        let entity = spawn_synced(&mut app, DVec3::ZERO);
        app.update();

        app.world_mut().get_mut::<EmitterVelocity>(entity).unwrap().0 = DVec3::new(0.0, 0.0, 5.0);
        app.update();

        let spherical = app.world().get::<SphericalVelocity>(entity).unwrap().0;
        assert_eq!(spherical.radius, 5.0);
        assert_eq!(spherical.incline, 0.0);

        // The write back must not bounce: the guard is clear and nothing moves.
        app.update();
        let sync = app.world().get::<VelocitySync>(entity).unwrap();
        assert_eq!(*sync, VelocitySync::default());
        let velocity = app.world().get::<EmitterVelocity>(entity).unwrap().0;
        assert_eq!(velocity, DVec3::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn test_spherical_edit_is_not_folded_back() {
        let mut app = sync_app();
        let entity = spawn_synced(&mut app, DVec3::ZERO);
        app.update();

        // An azimuth past π/2 would be folded by atan(y / x) if it came back.
        let edited = Spherical::new(2.0, std::f64::consts::FRAC_PI_2, 3.0);
        app.world_mut().get_mut::<SphericalVelocity>(entity).unwrap().0 = edited;
        app.update();
        app.update();
        app.update();

        let spherical = app.world().get::<SphericalVelocity>(entity).unwrap().0;
        assert_eq!(spherical, edited);

        let velocity = app.world().get::<EmitterVelocity>(entity).unwrap().0;
        let expected = edited.to_cartesian();
        assert!((velocity - expected).length() < 1e-12);
        assert!(velocity.x < 0.0);
    }

    #[test]
    fn test_guards_are_per_emitter() {
        let mut app = sync_app();
        let a = spawn_synced(&mut app, DVec3::ZERO);
        let b = spawn_synced(&mut app, DVec3::ZERO);
        app.update();

        app.world_mut().get_mut::<EmitterVelocity>(a).unwrap().0 = DVec3::new(1.0, 0.0, 0.0);
        app.world_mut().get_mut::<SphericalVelocity>(b).unwrap().0 = Spherical::new(3.0, 0.0, 0.0);
        app.update();
        app.update();

        assert_eq!(app.world().get::<SphericalVelocity>(a).unwrap().0.radius, 1.0);
        assert_eq!(
            app.world().get::<EmitterVelocity>(b).unwrap().0,
            DVec3::new(0.0, 0.0, 3.0)
        );
        assert_eq!(*app.world().get::<VelocitySync>(a).unwrap(), VelocitySync::default());
        assert_eq!(*app.world().get::<VelocitySync>(b).unwrap(), VelocitySync::default());
    }
}
