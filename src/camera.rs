//! Orbit camera for viewing the scene.
//!
//! Provides zoom and orbit controls around a fixed focus point.

use bevy::{
    input::mouse::{AccumulatedMouseMotion, AccumulatedMouseScroll},
    prelude::*,
};

/// Closest camera distance from the focus.
pub const MIN_DISTANCE: f32 = 2.0;

/// Furthest camera distance from the focus.
pub const MAX_DISTANCE: f32 = 200.0;

/// Zoom speed multiplier for scroll wheel.
pub const ZOOM_SPEED: f32 = 0.1;

/// Orbit speed in radians per pixel.
pub const ORBIT_SPEED: f32 = 0.005;

/// Marker component for the main camera.
#[derive(Component)]
pub struct MainCamera;

/// Spherical camera placement around the focus point.
#[derive(Resource, Clone, Copy, Debug)]
pub struct CameraState {
    pub focus: Vec3,
    pub distance: f32,
    /// Rotation about the render Y axis
    pub yaw: f32,
    /// Elevation above the ground plane
    pub pitch: f32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            focus: Vec3::ZERO,
            distance: 30.0,
            yaw: 0.6,
            pitch: 0.5,
        }
    }
}

impl CameraState {
    pub fn transform(&self) -> Transform {
        let rotation = Quat::from_euler(EulerRot::YXZ, self.yaw, -self.pitch, 0.0);
        let eye = self.focus + rotation * Vec3::Z * self.distance;
        Transform::from_translation(eye).looking_at(self.focus, Vec3::Y)
    }
}

/// Plugin providing camera functionality.
pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CameraState>()
            .add_systems(Startup, setup_camera)
            .add_systems(Update, (camera_zoom, camera_orbit, apply_camera_state).chain());
    }
}

fn setup_camera(mut commands: Commands, state: Res<CameraState>) {
    commands.spawn((Camera3d::default(), state.transform(), MainCamera));
    commands.spawn((
        DirectionalLight {
            illuminance: 8000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(4.0, 10.0, 6.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));
}

/// Handle mouse scroll wheel for zoom.
fn camera_zoom(mouse_scroll: Res<AccumulatedMouseScroll>, mut state: ResMut<CameraState>) {
    if mouse_scroll.delta.y == 0.0 {
        return;
    }

    let zoom_factor = 1.0 - mouse_scroll.delta.y * ZOOM_SPEED;
    state.distance = (state.distance * zoom_factor).clamp(MIN_DISTANCE, MAX_DISTANCE);
}

/// Orbit around the focus with the middle mouse button.
fn camera_orbit(
    mouse_buttons: Res<ButtonInput<MouseButton>>,
    mouse_motion: Res<AccumulatedMouseMotion>,
    mut state: ResMut<CameraState>,
) {
    if !mouse_buttons.pressed(MouseButton::Middle) || mouse_motion.delta == Vec2::ZERO {
        return;
    }

    state.yaw -= mouse_motion.delta.x * ORBIT_SPEED;
    state.pitch = (state.pitch + mouse_motion.delta.y * ORBIT_SPEED).clamp(-1.5, 1.5);
}

fn apply_camera_state(
    state: Res<CameraState>,
    mut camera_query: Query<&mut Transform, With<MainCamera>>,
) {
    if !state.is_changed() {
        return;
    }

    let Ok(mut transform) = camera_query.single_mut() else {
        return;
    };
    *transform = state.transform();
}
