//! Core scene types, settings resources and frame conventions.
//!
//! Physics quantities live in a right-handed Z-up frame. Rendering uses Bevy's
//! Y-up frame; [`to_render`] and [`render_rotation`] convert between the two.

use std::f32::consts::FRAC_PI_2;

use bevy::math::DVec3;
use bevy::prelude::*;

use crate::emitter::EmitterError;

/// Default scene frame rate (frames per second).
pub const DEFAULT_FRAME_RATE: u32 = 24;

/// Default last frame of the scene range.
pub const DEFAULT_FRAME_END: u32 = 250;

/// Standard gravity (m/s²)
pub const STANDARD_GRAVITY: f64 = 9.81;

/// Highest frame number the scene range and emitters may use.
pub const MAX_FRAME: u32 = 1_048_574;

/// System sets for ordering the projectile systems within `Update`.
///
/// Edits (panel, shortcuts) must land before the velocity sync runs, and the
/// sync must finish before dirty flags are collected by the operators.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProjectileSystemSet {
    /// User-facing edits of emitter and scene settings
    Edit,
    /// Cartesian/spherical velocity synchronization
    Sync,
    /// Dirty marking and add/remove/execute operators
    Operators,
}

/// Scene-wide physics and timeline settings.
#[derive(Resource, Clone, Debug, PartialEq)]
pub struct SceneSettings {
    /// Gravity vector in m/s² (physics frame)
    pub gravity: DVec3,
    /// Whether gravity is applied at all
    pub use_gravity: bool,
    /// Frames per second
    pub frame_rate: u32,
    /// First frame of the scene range
    pub frame_start: u32,
    /// Last frame of the scene range (also bounds trajectory prediction)
    pub frame_end: u32,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            gravity: DVec3::new(0.0, 0.0, -STANDARD_GRAVITY),
            use_gravity: true,
            frame_rate: DEFAULT_FRAME_RATE,
            frame_start: 1,
            frame_end: DEFAULT_FRAME_END,
        }
    }
}

impl SceneSettings {
    /// Gravity actually applied to projectiles (zero when disabled).
    pub fn effective_gravity(&self) -> DVec3 {
        if self.use_gravity {
            self.gravity
        } else {
            DVec3::ZERO
        }
    }

    pub fn validate(&self) -> Result<(), EmitterError> {
        if self.frame_rate == 0 {
            return Err(EmitterError::InvalidFrameRate(self.frame_rate));
        }
        if self.frame_end > MAX_FRAME {
            return Err(EmitterError::FrameOutOfRange(self.frame_end));
        }
        if self.frame_end < self.frame_start {
            return Err(EmitterError::EmptyFrameRange {
                start: self.frame_start,
                end: self.frame_end,
            });
        }
        Ok(())
    }

    /// Length of one frame in seconds.
    pub fn frame_duration(&self) -> f64 {
        1.0 / self.frame_rate.max(1) as f64
    }
}

/// Snapshot of the scene values the kinematic prediction depends on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimulationConfig {
    /// Gravity, or zero if gravity is disabled
    pub gravity: DVec3,
    /// Frames per second (> 0)
    pub frame_rate: u32,
    /// Last frame to predict
    pub end_frame: u32,
}

impl SimulationConfig {
    pub fn from_scene(scene: &SceneSettings) -> Self {
        Self {
            gravity: scene.effective_gravity(),
            frame_rate: scene.frame_rate,
            end_frame: scene.frame_end,
        }
    }
}

/// Which emitters get their trajectory drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DrawMode {
    /// Every emitter in the scene
    All,
    /// Only selected emitters
    #[default]
    Selected,
    /// Trajectory drawing disabled
    None,
}

impl DrawMode {
    /// Next mode in the All -> Selected -> None cycle.
    pub fn cycle(self) -> Self {
        match self {
            DrawMode::All => DrawMode::Selected,
            DrawMode::Selected => DrawMode::None,
            DrawMode::None => DrawMode::All,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DrawMode::All => "All",
            DrawMode::Selected => "Selected",
            DrawMode::None => "None",
        }
    }
}

/// Rigid body solver quality preset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SolverQuality {
    /// Particle-like behaviour, one substep per frame
    #[default]
    VeryLow,
    Low,
    Medium,
    High,
}

impl SolverQuality {
    pub const ALL: [SolverQuality; 4] = [
        SolverQuality::VeryLow,
        SolverQuality::Low,
        SolverQuality::Medium,
        SolverQuality::High,
    ];

    /// Solver substeps per simulated second of one frame-rate unit.
    pub fn substep_multiplier(self) -> u32 {
        match self {
            SolverQuality::VeryLow => 1,
            SolverQuality::Low => 4,
            SolverQuality::Medium => 10,
            SolverQuality::High => 20,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SolverQuality::VeryLow => "Particle",
            SolverQuality::Low => "Low",
            SolverQuality::Medium => "Medium",
            SolverQuality::High => "High",
        }
    }
}

/// Global projectile tool settings.
#[derive(Resource, Clone, Debug, PartialEq)]
pub struct ProjectileSettings {
    /// Trajectory display mode
    pub draw_trajectories: DrawMode,
    /// Solver quality preset
    pub quality: SolverQuality,
    /// Edit velocity with spherical coordinates in the panel
    pub spherical: bool,
    /// Uniform color for trajectory lines
    pub trajectory_color: Color,
}

impl Default for ProjectileSettings {
    fn default() -> Self {
        Self {
            draw_trajectories: DrawMode::Selected,
            quality: SolverQuality::VeryLow,
            spherical: true,
            trajectory_color: Color::WHITE,
        }
    }
}

/// Location and Euler rotation (XYZ, radians) of an object in the physics frame.
#[derive(Component, Clone, Copy, Debug, Default, PartialEq)]
pub struct Placement {
    pub pos: DVec3,
    pub rot: DVec3,
}

impl Placement {
    pub fn at(pos: DVec3) -> Self {
        Self {
            pos,
            rot: DVec3::ZERO,
        }
    }
}

/// Marker for objects in the current selection.
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Selected;

/// The object the panel and operators act on.
#[derive(Resource, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActiveObject(pub Option<Entity>);

/// Human-readable object name shown in the panel.
#[derive(Component, Clone, Debug)]
pub struct ObjectName(pub String);

/// Map a physics-frame (Z-up) position to Bevy's render frame (Y-up).
pub fn to_render(pos: DVec3) -> Vec3 {
    Vec3::new(pos.x as f32, pos.z as f32, -pos.y as f32)
}

/// Map a physics-frame Euler rotation to a render-frame quaternion.
pub fn render_rotation(rot: DVec3) -> Quat {
    let basis = Quat::from_rotation_x(-FRAC_PI_2);
    let physics = Quat::from_euler(EulerRot::XYZ, rot.x as f32, rot.y as f32, rot.z as f32);
    basis * physics * basis.inverse()
}
