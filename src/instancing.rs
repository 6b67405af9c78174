//! Instance scheduling for emitters.
//!
//! Executing an emitter turns its settings into a fixed set of instance
//! entities. Each instance may be activated several times when a lifetime is
//! set: instances whose lifetime ended go back to a pool and are reused for
//! later spawn frames, so the number of entities stays bounded by the number
//! of simultaneously alive projectiles.

use std::collections::VecDeque;

use bevy::math::DVec3;
use bevy::prelude::*;

use crate::emitter::EmitterError;
use crate::physics::{displacement_at, rotation_at};
use crate::types::Placement;

/// Frames an instance stays kinematic before the solver takes over.
pub const KINEMATIC_HANDOFF_FRAMES: u32 = 2;

/// One spawn of an instance: where it starts, how fast, and when it retires.
#[derive(Clone, Debug, PartialEq)]
pub struct Activation {
    /// Frame the instance appears on
    pub start_frame: u32,
    /// Frame the instance is retired on (None if it outlives the range)
    pub end_frame: Option<u32>,
    /// Initial linear velocity (emitter motion plus configured velocity)
    pub velocity: DVec3,
    /// Angular velocity (Euler rates, rad/s)
    pub angular_velocity: DVec3,
    /// Pose on the start frame
    pub start: Placement,
    /// Pose at the end of the kinematic hand-off
    pub handoff: Placement,
}

impl Activation {
    /// Whether this activation is alive on `frame`.
    pub fn contains(&self, frame: u32) -> bool {
        frame >= self.start_frame && self.end_frame.is_none_or(|end| frame < end)
    }
}

/// How an instance behaves on a given frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstancePhase {
    /// Not yet spawned
    Waiting,
    /// Driven by keyframes between start and hand-off
    Kinematic,
    /// Owned by the rigid body solver
    Simulated,
    /// Lifetime ended, parked until the next activation
    Retired,
}

/// A spawned projectile copy and its activation schedule.
#[derive(Component, Clone, Debug, Default)]
pub struct Instance {
    pub activations: Vec<Activation>,
    /// Hide the instance before its first activation
    pub start_hidden: bool,
}

impl Instance {
    /// The activation alive on `frame`, if any.
    pub fn activation_at(&self, frame: u32) -> Option<&Activation> {
        self.activations.iter().find(|a| a.contains(frame))
    }

    pub fn phase_at(&self, frame: u32) -> InstancePhase {
        if let Some(activation) = self.activation_at(frame) {
            if frame - activation.start_frame < KINEMATIC_HANDOFF_FRAMES {
                InstancePhase::Kinematic
            } else {
                InstancePhase::Simulated
            }
        } else if self
            .activations
            .first()
            .is_none_or(|first| frame < first.start_frame)
        {
            InstancePhase::Waiting
        } else {
            InstancePhase::Retired
        }
    }

    /// Ballistic pose on `frame`, used for playback in place of the solver.
    pub fn pose_at(&self, frame: u32, gravity: DVec3, frame_rate: u32) -> Option<Placement> {
        let activation = self.activation_at(frame)?;
        let elapsed = frame - activation.start_frame;
        Some(Placement {
            pos: displacement_at(
                activation.start.pos,
                activation.velocity,
                gravity,
                frame_rate,
                elapsed,
            ),
            rot: rotation_at(
                activation.start.rot,
                activation.angular_velocity,
                frame_rate,
                elapsed,
            ),
        })
    }
}

/// Frames on which new instances are spawned.
///
/// At most one instance is spawned per frame: the count is capped by the
/// length of the range and the spawns are spread evenly across it.
pub fn spawn_frames(
    start_frame: u32,
    end_frame: u32,
    instance_count: u32,
) -> Result<Vec<u32>, EmitterError> {
    if start_frame < 1 {
        return Err(EmitterError::InvalidStartFrame(start_frame));
    }
    if end_frame <= start_frame {
        return Err(EmitterError::EmptyFrameRange {
            start: start_frame,
            end: end_frame,
        });
    }
    if instance_count == 0 {
        return Err(EmitterError::ZeroInstances);
    }

    let frames = end_frame - start_frame;
    let number = frames.min(instance_count);
    let step = frames as f64 / number as f64;

    Ok((0..number)
        .map(|i| start_frame + (i as f64 * step) as u32)
        .collect())
}

/// Assignment of one activation to a pooled instance slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SlotActivation {
    pub slot: usize,
    pub start_frame: u32,
    pub end_frame: Option<u32>,
}

/// Assign spawn frames to instance slots, reusing retired slots.
///
/// Walks the frame range in order. Each spawn takes the most recently retired
/// slot, or a new one if the pool is empty. With a non-zero lifetime the
/// oldest live instance retires on `spawn + lifetime` if that frame lies in
/// the range. Returns the activations and the number of slots needed.
pub fn assign_slots(
    spawn_frames: &[u32],
    lifetime: u32,
    start_frame: u32,
    end_frame: u32,
) -> (Vec<SlotActivation>, usize) {
    let mut activations: Vec<SlotActivation> = Vec::with_capacity(spawn_frames.len());
    let mut live: VecDeque<usize> = VecDeque::new();
    let mut pool: Vec<usize> = Vec::new();
    let mut slot_count = 0;

    for frame in start_frame..=end_frame {
        if spawn_frames.contains(&frame) {
            let slot = pool.pop().unwrap_or_else(|| {
                slot_count += 1;
                slot_count - 1
            });
            live.push_back(activations.len());
            activations.push(SlotActivation {
                slot,
                start_frame: frame,
                end_frame: None,
            });
        }

        if lifetime == 0 {
            continue;
        }

        if let Some(&oldest) = live.front()
            && activations[oldest].start_frame.checked_add(lifetime) == Some(frame)
        {
            live.pop_front();
            activations[oldest].end_frame = Some(frame);
            pool.push(activations[oldest].slot);
        }
    }

    (activations, slot_count)
}

/// Everything needed to build the activations of one emitter.
#[derive(Clone)]
pub struct InstanceRequest<'a> {
    pub start_frame: u32,
    pub end_frame: u32,
    pub instance_count: u32,
    pub lifetime: u32,
    pub start_hidden: bool,
    pub velocity: DVec3,
    pub angular_velocity: DVec3,
    pub gravity: DVec3,
    pub frame_rate: u32,
    /// Emitter pose on a given frame
    pub emitter_pose: &'a dyn Fn(u32) -> Placement,
    /// Emitter motion velocity on a given frame
    pub emitter_velocity: &'a dyn Fn(u32) -> DVec3,
}

/// Build the instances an emitter should own after execution.
pub fn plan_instances(request: &InstanceRequest) -> Result<Vec<Instance>, EmitterError> {
    if request.frame_rate == 0 {
        return Err(EmitterError::InvalidFrameRate(request.frame_rate));
    }

    let frames = spawn_frames(
        request.start_frame,
        request.end_frame,
        request.instance_count,
    )?;
    let (slots, slot_count) = assign_slots(
        &frames,
        request.lifetime,
        request.start_frame,
        request.end_frame,
    );

    let mut instances = vec![
        Instance {
            activations: Vec::new(),
            start_hidden: request.start_hidden,
        };
        slot_count
    ];

    for slot in slots {
        let start = (request.emitter_pose)(slot.start_frame);
        let velocity = (request.emitter_velocity)(slot.start_frame) + request.velocity;
        let handoff = Placement {
            pos: displacement_at(
                start.pos,
                velocity,
                request.gravity,
                request.frame_rate,
                KINEMATIC_HANDOFF_FRAMES,
            ),
            rot: rotation_at(
                start.rot,
                request.angular_velocity,
                request.frame_rate,
                KINEMATIC_HANDOFF_FRAMES,
            ),
        };

        instances[slot.slot].activations.push(Activation {
            start_frame: slot.start_frame,
            end_frame: slot.end_frame,
            velocity,
            angular_velocity: request.angular_velocity,
            start,
            handoff,
        });
    }

    Ok(instances)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn request<'a>(
        pose: &'a dyn Fn(u32) -> Placement,
        motion: &'a dyn Fn(u32) -> DVec3,
    ) -> InstanceRequest<'a> {
        InstanceRequest {
            start_frame: 1,
            end_frame: 50,
            instance_count: 1,
            lifetime: 0,
            start_hidden: false,
            velocity: DVec3::new(5.0, 0.0, 5.0),
            angular_velocity: DVec3::ZERO,
            gravity: DVec3::new(0.0, 0.0, -9.81),
            frame_rate: 24,
            emitter_pose: pose,
            emitter_velocity: motion,
        }
    }

    #[test]
    fn test_spawn_frames_spread_evenly() {
        assert_eq!(spawn_frames(1, 11, 5).unwrap(), vec![1, 3, 5, 7, 9]);
        assert_eq!(spawn_frames(1, 50, 1).unwrap(), vec![1]);
    }

    #[test]
    fn test_spawn_frames_capped_by_range() {
        // Only 4 frames in range, so at most 4 spawns.
        assert_eq!(spawn_frames(10, 14, 100).unwrap(), vec![10, 11, 12, 13]);
    }

    #[test]
    fn test_spawn_frames_truncates_fractional_step() {
        // 10 frames, 3 instances: step 3.33 -> offsets 0, 3, 6
        assert_eq!(spawn_frames(1, 11, 3).unwrap(), vec![1, 4, 7]);
    }

    #[test]
    fn test_spawn_frames_rejects_bad_input() {
        assert!(matches!(spawn_frames(0, 10, 1), Err(EmitterError::InvalidStartFrame(0))));
        assert!(matches!(
            spawn_frames(5, 5, 1),
            Err(EmitterError::EmptyFrameRange { start: 5, end: 5 })
        ));
        assert!(matches!(spawn_frames(1, 10, 0), Err(EmitterError::ZeroInstances)));
    }

    #[test]
    fn test_assign_slots_without_lifetime_uses_one_slot_per_spawn() {
        let (activations, slots) = assign_slots(&[1, 3, 5], 0, 1, 10);
        assert_eq!(slots, 3);
        assert!(activations.iter().all(|a| a.end_frame.is_none()));
        let used: Vec<usize> = activations.iter().map(|a| a.slot).collect();
        assert_eq!(used, vec![0, 1, 2]);
    }

    #[test]
    fn test_assign_slots_reuses_retired_instances() {
        // Spawn every 2 frames, live for 3: at most two alive at once.
        let frames = spawn_frames(1, 11, 5).unwrap();
        let (activations, slots) = assign_slots(&frames, 3, 1, 11);

        assert_eq!(slots, 2);
        assert_eq!(activations[0].end_frame, Some(4));
        assert_eq!(activations[2].slot, activations[0].slot);
        assert_eq!(activations[3].slot, activations[1].slot);
    }

    #[test]
    fn test_assign_slots_keeps_instances_past_range_alive() {
        let (activations, _) = assign_slots(&[1, 8], 5, 1, 10);
        assert_eq!(activations[0].end_frame, Some(6));
        // 8 + 5 = 13 lies beyond the range.
        assert_eq!(activations[1].end_frame, None);
    }

    #[test]
    fn test_assign_slots_with_huge_lifetime_never_retires() {
        let (activations, slots) = assign_slots(&[1, 2], u32::MAX, 1, 3);
        assert_eq!(slots, 2);
        assert!(activations.iter().all(|a| a.end_frame.is_none()));
    }

    #[test]
    fn test_plan_instances_hand_off_pose() {
        let pose = |_frame: u32| Placement::at(DVec3::new(0.0, 0.0, 1.0));
        let motion = |_frame: u32| DVec3::ZERO;
        let instances = plan_instances(&request(&pose, &motion)).unwrap();

        assert_eq!(instances.len(), 1);
        let activation = &instances[0].activations[0];
        let dt = 2.0 / 24.0;
        assert_relative_eq!(activation.handoff.pos.x, 5.0 * dt, epsilon = 1e-12);
        assert_relative_eq!(
            activation.handoff.pos.z,
            1.0 + 5.0 * dt - 0.5 * 9.81 * dt * dt,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_plan_instances_adds_emitter_motion() {
        let pose = |_frame: u32| Placement::default();
        let motion = |_frame: u32| DVec3::new(0.0, 2.0, 0.0);
        let instances = plan_instances(&request(&pose, &motion)).unwrap();

        assert_eq!(instances[0].activations[0].velocity, DVec3::new(5.0, 2.0, 5.0));
    }

    #[test]
    fn test_plan_instances_rejects_zero_frame_rate() {
        let pose = |_frame: u32| Placement::default();
        let motion = |_frame: u32| DVec3::ZERO;
        let mut req = request(&pose, &motion);
        req.frame_rate = 0;
        assert!(matches!(plan_instances(&req), Err(EmitterError::InvalidFrameRate(0))));
    }

    #[test]
    fn test_instance_phases() {
        let pose = |_frame: u32| Placement::default();
        let motion = |_frame: u32| DVec3::ZERO;
        let mut req = request(&pose, &motion);
        req.start_frame = 10;
        req.end_frame = 30;
        req.lifetime = 5;
        let instance = &plan_instances(&req).unwrap()[0];

        assert_eq!(instance.phase_at(5), InstancePhase::Waiting);
        assert_eq!(instance.phase_at(10), InstancePhase::Kinematic);
        assert_eq!(instance.phase_at(11), InstancePhase::Kinematic);
        assert_eq!(instance.phase_at(12), InstancePhase::Simulated);
        assert_eq!(instance.phase_at(15), InstancePhase::Retired);
        assert!(instance.pose_at(15, DVec3::ZERO, 24).is_none());
    }

    #[test]
    fn test_pose_at_follows_ballistic_path() {
        let pose = |_frame: u32| Placement::default();
        let motion = |_frame: u32| DVec3::ZERO;
        let instance = &plan_instances(&request(&pose, &motion)).unwrap()[0];

        let at_start = instance.pose_at(1, DVec3::ZERO, 24).unwrap();
        assert_eq!(at_start.pos, DVec3::ZERO);

        let later = instance.pose_at(25, DVec3::ZERO, 24).unwrap();
        assert_relative_eq!(later.pos.x, 5.0, epsilon = 1e-12);
    }
}
