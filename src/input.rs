//! Keyboard shortcuts for playback, emitter operators and display toggles.

use bevy::prelude::*;
use bevy_egui::EguiContexts;

use crate::emitter::{
    AddEmitterEvent, Emitter, ExecuteAllEvent, ExecuteEmitterEvent, RemoveEmitterEvent,
};
use crate::time::Timeline;
use crate::types::{ActiveObject, ProjectileSettings, ProjectileSystemSet};

/// Plugin providing keyboard input handling.
pub struct InputPlugin;

impl Plugin for InputPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, keyboard_shortcuts.in_set(ProjectileSystemSet::Edit));
    }
}

/// Handle keyboard shortcuts.
#[allow(clippy::too_many_arguments)]
fn keyboard_shortcuts(
    keys: Res<ButtonInput<KeyCode>>,
    mut contexts: EguiContexts,
    mut timeline: ResMut<Timeline>,
    mut settings: ResMut<ProjectileSettings>,
    active: Res<ActiveObject>,
    emitters: Query<(), With<Emitter>>,
    mut add: MessageWriter<AddEmitterEvent>,
    mut remove: MessageWriter<RemoveEmitterEvent>,
    mut execute: MessageWriter<ExecuteEmitterEvent>,
    mut execute_all: MessageWriter<ExecuteAllEvent>,
) {
    // Typing into a panel field is not a shortcut.
    if let Ok(ctx) = contexts.ctx_mut()
        && ctx.wants_keyboard_input()
    {
        return;
    }

    if keys.just_pressed(KeyCode::Space) {
        timeline.toggle();
        info!("Timeline {}", if timeline.playing { "playing" } else { "paused" });
    }

    if keys.just_pressed(KeyCode::KeyT) {
        settings.draw_trajectories = settings.draw_trajectories.cycle();
        info!("Trajectory display: {}", settings.draw_trajectories.label());
    }

    let shift = keys.any_pressed([KeyCode::ShiftLeft, KeyCode::ShiftRight]);
    let active_emitter = active.0.filter(|entity| emitters.contains(*entity));

    if keys.just_pressed(KeyCode::KeyE) {
        if shift {
            execute_all.write(ExecuteAllEvent);
        } else if let Some(emitter) = active_emitter {
            execute.write(ExecuteEmitterEvent { emitter });
        }
    }

    if keys.just_pressed(KeyCode::KeyA)
        && shift
        && let Some(source) = active.0
        && active_emitter.is_none()
    {
        add.write(AddEmitterEvent { source });
    }

    if keys.just_pressed(KeyCode::Delete)
        && let Some(emitter) = active_emitter
    {
        remove.write(RemoveEmitterEvent { emitter });
    }
}
