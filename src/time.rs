//! Timeline playback.
//!
//! Advances the scene frame at the scene frame rate while playing, looping
//! over the scene range. Each frame, instances are placed on their ballistic
//! pose and shown or hidden according to their activation schedule, and
//! emitters with a keyframed track follow it.

use bevy::prelude::*;

use crate::emitter::{Emitter, EmitterTrack};
use crate::instancing::{Instance, InstancePhase};
use crate::types::{Placement, ProjectileSystemSet, SceneSettings};

/// Current frame and playback state.
#[derive(Resource, Clone, Debug, PartialEq)]
pub struct Timeline {
    pub current_frame: u32,
    pub playing: bool,
    /// Real seconds accumulated toward the next frame
    accumulator: f64,
}

impl Default for Timeline {
    fn default() -> Self {
        Self {
            current_frame: 1,
            playing: false,
            accumulator: 0.0,
        }
    }
}

impl Timeline {
    pub fn toggle(&mut self) {
        self.playing = !self.playing;
        self.accumulator = 0.0;
    }

    /// Jump to `frame`, clamped to the scene range.
    pub fn set_frame(&mut self, frame: u32, scene: &SceneSettings) {
        self.current_frame = frame.clamp(scene.frame_start, scene.frame_end.max(scene.frame_start));
        self.accumulator = 0.0;
    }

    /// Advance by `delta` real seconds. Returns the number of frames stepped.
    pub fn advance(&mut self, delta: f64, scene: &SceneSettings) -> u32 {
        if !self.playing || scene.frame_rate == 0 {
            return 0;
        }

        self.accumulator += delta;
        let frame_duration = scene.frame_duration();
        let mut stepped = 0;
        while self.accumulator >= frame_duration {
            self.accumulator -= frame_duration;
            self.current_frame = if self.current_frame >= scene.frame_end {
                scene.frame_start
            } else {
                self.current_frame + 1
            };
            stepped += 1;
        }
        stepped
    }
}

/// Plugin providing timeline playback.
pub struct TimelinePlugin;

impl Plugin for TimelinePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Timeline>().add_systems(
            Update,
            (
                advance_timeline,
                pose_instances,
                follow_emitter_tracks
                    .run_if(resource_changed::<Timeline>.or(resource_changed::<SceneSettings>)),
            )
                .chain()
                .after(ProjectileSystemSet::Operators),
        );
    }
}

fn advance_timeline(mut timeline: ResMut<Timeline>, scene: Res<SceneSettings>, time: Res<Time>) {
    if !timeline.playing {
        return;
    }
    timeline.advance(time.delta_secs_f64(), &scene);
}

/// Place instances on their pose for the current frame.
///
/// Every instance is re-posed when the frame or the scene changes. Otherwise
/// only freshly spawned instances are, so executing an emitter on a paused
/// timeline still shows its instances where they belong.
fn pose_instances(
    timeline: Res<Timeline>,
    scene: Res<SceneSettings>,
    mut instances: Query<(Ref<Instance>, &mut Placement, &mut Visibility)>,
) {
    let frame = timeline.current_frame;
    let gravity = scene.effective_gravity();
    let repose_all = timeline.is_changed() || scene.is_changed();

    for (instance, mut placement, mut visibility) in instances.iter_mut() {
        if !repose_all && !instance.is_added() {
            continue;
        }

        let phase = instance.phase_at(frame);
        let visible = match phase {
            InstancePhase::Waiting => !instance.start_hidden,
            InstancePhase::Kinematic | InstancePhase::Simulated => true,
            InstancePhase::Retired => false,
        };
        visibility.set_if_neq(if visible {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        });

        if let Some(pose) = instance.pose_at(frame, gravity, scene.frame_rate) {
            placement.set_if_neq(pose);
        } else if phase == InstancePhase::Waiting
            && let Some(first) = instance.activations.first()
        {
            placement.set_if_neq(first.start);
        }
    }
}

fn follow_emitter_tracks(
    timeline: Res<Timeline>,
    mut emitters: Query<(&EmitterTrack, &mut Placement), With<Emitter>>,
) {
    for (track, mut placement) in emitters.iter_mut() {
        if let Some(pos) = track.position_at(timeline.current_frame)
            && placement.pos != pos
        {
            placement.pos = pos;
        }
    }
}
