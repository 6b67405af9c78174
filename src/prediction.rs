//! Trajectory prediction for emitters.
//!
//! Before running the rigid body simulation, each emitter's ballistic path is
//! predicted frame by frame with the closed-form kinematic equation and cut
//! short at the first obstruction in the scene. Paths are recomputed from
//! scratch on every draw; nothing is cached between frames.

use bevy::math::DVec3;
use bevy::prelude::*;
use bevy::window::RequestRedraw;

use crate::collision::{ColliderData, CollisionOracle, SceneColliders, VisibilityData};
use crate::emitter::{
    Emitter, EmitterState, EmitterStatus, EmitterVelocity, TrajectoryRedrawEvent,
};
use crate::physics::displacement_at;
use crate::types::{
    DrawMode, MAX_FRAME, Placement, ProjectileSettings, SceneSettings, Selected, SimulationConfig,
    to_render,
};

/// Plugin drawing predicted trajectories with gizmos.
pub struct PredictionPlugin;

impl Plugin for PredictionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TrajectoryDrawHandle>().add_systems(
            Update,
            (
                toggle_trajectory_drawing.run_if(resource_changed::<ProjectileSettings>),
                forward_redraw_requests,
                draw_trajectories.run_if(|handle: Res<TrajectoryDrawHandle>| handle.is_enabled()),
            )
                .chain(),
        );
    }
}

/// Registration of the trajectory draw pass.
///
/// Holds at most one active registration. `enable` and `disable` are
/// idempotent and report whether they changed anything.
#[derive(Resource, Debug, Default)]
pub struct TrajectoryDrawHandle {
    active: Option<u32>,
    registrations: u32,
}

impl TrajectoryDrawHandle {
    pub fn enable(&mut self) -> bool {
        if self.active.is_some() {
            return false;
        }
        self.registrations += 1;
        self.active = Some(self.registrations);
        true
    }

    pub fn disable(&mut self) -> bool {
        self.active.take().is_some()
    }

    pub fn is_enabled(&self) -> bool {
        self.active.is_some()
    }

    /// Identifier of the active registration, if any.
    pub fn active(&self) -> Option<u32> {
        self.active
    }

    /// Enable or disable to match a draw mode.
    pub fn apply(&mut self, mode: DrawMode) -> bool {
        match mode {
            DrawMode::All | DrawMode::Selected => self.enable(),
            DrawMode::None => self.disable(),
        }
    }
}

/// Predict the path of one emitter.
///
/// The path starts at the emitter position and advances one frame at a time
/// up to `config.end_frame`. Each step asks the oracle whether the segment
/// from the previous point is obstructed. The first hit on anything other
/// than this emitter's own instances becomes the final point. Without a hit,
/// the last point is the kinematic position on `end_frame`.
///
/// The result is never empty. It has `end_frame + 1` points when nothing is
/// hit, and `k + 1` points when the first hit is found on frame `k`.
pub fn predict<O>(emitter: &EmitterState, config: &SimulationConfig, oracle: &O) -> Vec<DVec3>
where
    O: CollisionOracle + ?Sized,
{
    let position_at = |frame: u32| {
        displacement_at(
            emitter.position,
            emitter.velocity,
            config.gravity,
            config.frame_rate,
            frame,
        )
    };

    let seed = position_at(0);
    let mut points = Vec::with_capacity(config.end_frame.min(MAX_FRAME) as usize + 1);
    points.push(seed);

    if config.end_frame == 0 || config.frame_rate == 0 {
        return points;
    }

    let mut previous = seed;
    for frame in 1..config.end_frame {
        let candidate = position_at(frame);
        let distance = previous.distance(candidate);

        let result = oracle.collide(previous, candidate, distance);
        if result.hit && !result.is_spawned_by(emitter.id) {
            points.push(result.point);
            return points;
        }

        points.push(candidate);
        previous = candidate;
    }

    points.push(position_at(config.end_frame));
    points
}

/// Expand a polyline into line-list endpoints: `p0 p1, p1 p2, ...`.
pub fn line_list(points: &[DVec3]) -> Vec<DVec3> {
    points
        .windows(2)
        .flat_map(|pair| [pair[0], pair[1]])
        .collect()
}

/// Predict every emitter independently and concatenate the paths as a line list.
pub fn trajectory_lines<O>(
    emitters: &[EmitterState],
    config: &SimulationConfig,
    oracle: &O,
) -> Vec<DVec3>
where
    O: CollisionOracle + ?Sized,
{
    emitters
        .iter()
        .flat_map(|emitter| line_list(&predict(emitter, config, oracle)))
        .collect()
}

/// Register or unregister the draw pass when the display mode changes.
fn toggle_trajectory_drawing(
    settings: Res<ProjectileSettings>,
    mut handle: ResMut<TrajectoryDrawHandle>,
) {
    if handle.apply(settings.draw_trajectories) {
        debug!(
            "Trajectory drawing {}",
            if handle.is_enabled() { "enabled" } else { "disabled" }
        );
    }
}

/// Turn trajectory redraw requests into window redraws.
fn forward_redraw_requests(
    mut events: MessageReader<TrajectoryRedrawEvent>,
    mut redraw: MessageWriter<RequestRedraw>,
) {
    if events.read().count() > 0 {
        redraw.write(RequestRedraw);
    }
}

/// Draw the predicted paths of the emitters chosen by the display mode.
fn draw_trajectories(
    settings: Res<ProjectileSettings>,
    scene: Res<SceneSettings>,
    emitters: Query<(
        Entity,
        &Emitter,
        &EmitterVelocity,
        &Placement,
        &EmitterStatus,
        Has<Selected>,
    )>,
    colliders: Query<ColliderData>,
    hierarchy: Query<VisibilityData>,
    mut gizmos: Gizmos,
) {
    let states: Vec<EmitterState> = emitters
        .iter()
        .filter(|(.., selected)| match settings.draw_trajectories {
            DrawMode::All => true,
            DrawMode::Selected => *selected,
            DrawMode::None => false,
        })
        .map(|(entity, emitter, velocity, placement, status, _)| {
            EmitterState::new(entity, emitter, velocity, placement, status)
        })
        .collect();

    if states.is_empty() {
        return;
    }
    if let Err(err) = scene.validate() {
        debug!("Skipping trajectories: {}", err);
        return;
    }

    let oracle = SceneColliders::from_query(&colliders, &hierarchy);
    let config = SimulationConfig::from_scene(&scene);
    let lines = trajectory_lines(&states, &config, &oracle);

    for segment in lines.chunks_exact(2) {
        gizmos.line(
            to_render(segment[0]),
            to_render(segment[1]),
            settings.trajectory_color,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{CollisionResult, HitObject};
    use crate::test_utils::fixtures::{config, emitter_state, entities};
    use crate::test_utils::oracles::{always_hit, no_obstruction, wall_at_x};
    use approx::assert_relative_eq;

    #[test]
    fn test_vertical_throw_endpoint() {
        let id = entities(1)[0];
        let state = emitter_state(id, DVec3::ZERO, DVec3::new(0.0, 0.0, 10.0));
        let points = predict(&state, &config(DVec3::new(0.0, 0.0, -10.0), 24, 24), &no_obstruction);

        assert_eq!(points.len(), 25);
        let last = points[points.len() - 1];
        assert_relative_eq!(last.z, 5.0, epsilon = 1e-12);
        assert_eq!(last.x, 0.0);
    }

    #[test]
    fn test_straight_line_without_gravity() {
        let id = entities(1)[0];
        let state = emitter_state(id, DVec3::ZERO, DVec3::new(1.0, 2.0, 0.0));
        let points = predict(&state, &config(DVec3::ZERO, 10, 20), &no_obstruction);

        assert_eq!(points.len(), 21);
        let step = points[1] - points[0];
        for pair in points.windows(2) {
            let delta = pair[1] - pair[0];
            assert_relative_eq!(delta.x, step.x, epsilon = 1e-9);
            assert_relative_eq!(delta.y, step.y, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_hit_truncates_path() {
        let ids = entities(2);
        let state = emitter_state(ids[0], DVec3::ZERO, DVec3::new(1.0, 0.0, 0.0));
        let wall = HitObject {
            entity: ids[1],
            spawned_by: None,
        };

        // Crossed between frames 3 and 4 at 10 fps.
        let points = predict(&state, &config(DVec3::ZERO, 10, 20), &wall_at_x(0.35, wall));
        assert_eq!(points.len(), 5);
        assert_relative_eq!(points[4].x, 0.35, epsilon = 1e-12);
    }

    #[test]
    fn test_own_instances_are_ignored() {
        let ids = entities(2);
        let state = emitter_state(ids[0], DVec3::ZERO, DVec3::new(1.0, 0.0, 0.0));
        let instance = HitObject {
            entity: ids[1],
            spawned_by: Some(ids[0]),
        };

        let points = predict(&state, &config(DVec3::ZERO, 10, 20), &always_hit(instance));
        assert_eq!(points.len(), 21);
    }

    #[test]
    fn test_other_emitters_instances_truncate() {
        let ids = entities(3);
        let state = emitter_state(ids[0], DVec3::ZERO, DVec3::new(1.0, 0.0, 0.0));
        let instance = HitObject {
            entity: ids[2],
            spawned_by: Some(ids[1]),
        };

        let points = predict(&state, &config(DVec3::ZERO, 10, 20), &always_hit(instance));
        assert_eq!(points.len(), 2);
        assert_eq!(points[1], points[0]);
    }

    #[test]
    fn test_oracle_sees_segment_and_distance() {
        let id = entities(1)[0];
        let state = emitter_state(id, DVec3::ZERO, DVec3::new(0.0, 3.0, 4.0));
        let calls = std::cell::RefCell::new(Vec::new());
        let oracle = |from: DVec3, to: DVec3, max: f64| {
            calls.borrow_mut().push((from, to, max));
            CollisionResult::miss()
        };

        predict(&state, &config(DVec3::ZERO, 1, 4), &oracle);

        let calls = calls.into_inner();
        assert_eq!(calls.len(), 3);
        for (from, to, max) in calls {
            assert_relative_eq!(max, 5.0, epsilon = 1e-12);
            assert_relative_eq!(from.distance(to), max, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_zero_end_frame_returns_seed() {
        let id = entities(1)[0];
        let state = emitter_state(id, DVec3::ONE, DVec3::X);
        let points = predict(&state, &config(DVec3::ZERO, 24, 0), &no_obstruction);
        assert_eq!(points, vec![DVec3::ONE]);
    }

    #[test]
    fn test_line_list_pairs_segments() {
        let points = [DVec3::ZERO, DVec3::X, DVec3::Y];
        assert_eq!(
            line_list(&points),
            vec![DVec3::ZERO, DVec3::X, DVec3::X, DVec3::Y]
        );
        assert!(line_list(&points[..1]).is_empty());
    }

    #[test]
    fn test_trajectory_lines_concatenates_emitters() {
        let ids = entities(2);
        let states = [
            emitter_state(ids[0], DVec3::ZERO, DVec3::X),
            emitter_state(ids[1], DVec3::ZERO, DVec3::Y),
        ];
        let lines = trajectory_lines(&states, &config(DVec3::ZERO, 24, 3), &no_obstruction);

        // 4 points -> 3 segments -> 6 endpoints per emitter
        assert_eq!(lines.len(), 12);
        assert!(lines[..6].iter().all(|p| p.y == 0.0));
        assert!(lines[6..].iter().all(|p| p.x == 0.0));
    }

    #[test]
    fn test_draw_handle_is_idempotent() {
        let mut handle = TrajectoryDrawHandle::default();
        assert!(!handle.disable());

        assert!(handle.enable());
        let first = handle.active();
        assert!(!handle.enable());
        assert_eq!(handle.active(), first);

        assert!(handle.disable());
        assert!(!handle.is_enabled());
        assert!(!handle.disable());

        assert!(handle.apply(DrawMode::All));
        assert!(!handle.apply(DrawMode::Selected));
        assert!(handle.apply(DrawMode::None));
    }
}
