//! Side panel with emitter, rigid body, timeline and global settings.
//!
//! Every section edits a local copy and writes it back only when something
//! changed, so an idle panel never trips change detection.

use bevy::math::DVec3;
use bevy::prelude::*;
use bevy_egui::{EguiContexts, egui};

use crate::emitter::{
    AddEmitterEvent, CollisionShapeKind, Emitter, EmitterStatus, EmitterVelocity,
    ExecuteAllEvent, ExecuteEmitterEvent, InstanceOf, InstancePhysics, RemoveEmitterEvent,
    any_dirty,
};
use crate::physics::Spherical;
use crate::sync::SphericalVelocity;
use crate::time::Timeline;
use crate::types::{
    ActiveObject, DrawMode, MAX_FRAME, ObjectName, Placement, ProjectileSettings, SceneSettings,
    SolverQuality,
};

use super::icons;

mod colors {
    use bevy_egui::egui::Color32;

    pub const DIRTY: Color32 = Color32::from_rgb(221, 170, 85);
    pub const CLEAN: Color32 = Color32::from_rgb(85, 221, 136);
    pub const MUTED: Color32 = Color32::from_rgb(140, 140, 150);
}

const PANEL_WIDTH: f32 = 280.0;

/// Status line shown under the emitter header.
pub fn emitter_status_text(status: &EmitterStatus) -> &'static str {
    if status.is_dirty {
        "Instances out of date"
    } else {
        "Instances up to date"
    }
}

/// Label of the velocity section for the current edit mode.
pub fn velocity_label(spherical: bool) -> &'static str {
    if spherical {
        "Velocity (spherical)"
    } else {
        "Velocity (Cartesian)"
    }
}

type EmitterData = (
    &'static mut Emitter,
    &'static mut EmitterVelocity,
    &'static mut SphericalVelocity,
    &'static mut InstancePhysics,
    &'static EmitterStatus,
    Option<&'static ObjectName>,
);

type EmitterItem<'a> = (
    Mut<'a, Emitter>,
    Mut<'a, EmitterVelocity>,
    Mut<'a, SphericalVelocity>,
    Mut<'a, InstancePhysics>,
    &'a EmitterStatus,
    Option<&'a ObjectName>,
);

/// Render the projectile panel.
#[allow(clippy::too_many_arguments)]
pub fn projectile_panel(
    mut contexts: EguiContexts,
    mut settings: ResMut<ProjectileSettings>,
    mut scene: ResMut<SceneSettings>,
    mut timeline: ResMut<Timeline>,
    active: Res<ActiveObject>,
    mut emitters: Query<EmitterData>,
    objects: Query<(Option<&ObjectName>, Has<InstanceOf>), With<Placement>>,
    statuses: Query<&EmitterStatus, With<Emitter>>,
    mut add: MessageWriter<AddEmitterEvent>,
    mut remove: MessageWriter<RemoveEmitterEvent>,
    mut execute: MessageWriter<ExecuteEmitterEvent>,
    mut execute_all: MessageWriter<ExecuteAllEvent>,
) {
    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };

    let dirty = any_dirty(&statuses);

    egui::SidePanel::right("projectile_panel")
        .exact_width(PANEL_WIDTH)
        .show(ctx, |ui| {
            ui.heading(format!("{} Projectile", icons::EMITTER));
            ui.separator();

            match active.0 {
                Some(entity) if emitters.contains(entity) => {
                    if let Ok(item) = emitters.get_mut(entity) {
                        let action = emitter_section(ui, item, settings.spherical);
                        match action {
                            EmitterAction::Execute => {
                                execute.write(ExecuteEmitterEvent { emitter: entity });
                            }
                            EmitterAction::Remove => {
                                remove.write(RemoveEmitterEvent { emitter: entity });
                            }
                            EmitterAction::None => {}
                        }
                    }
                }
                Some(entity) => match objects.get(entity) {
                    Ok((name, false)) => {
                        let name = name.map_or("object", |n| n.0.as_str());
                        ui.label(format!("Active: {name}"));
                        if ui
                            .button(format!("{} Add Emitter", icons::ADD))
                            .on_hover_text("Emit copies of this object (Shift+A)")
                            .clicked()
                        {
                            add.write(AddEmitterEvent { source: entity });
                        }
                    }
                    Ok((_, true)) => {
                        ui.colored_label(colors::MUTED, "Instances cannot be emitters");
                    }
                    Err(_) => {
                        ui.colored_label(colors::MUTED, "No object selected");
                    }
                },
                None => {
                    ui.colored_label(colors::MUTED, "No object selected");
                }
            }

            ui.separator();
            timeline_section(ui, &mut timeline, &scene);

            ui.separator();
            scene_section(ui, &mut scene);

            ui.separator();
            global_section(ui, &mut settings);

            ui.add_space(8.0);
            let button = egui::Button::new(format!("{} Execute All", icons::EXECUTE));
            if ui
                .add_enabled(dirty, button)
                .on_hover_text("Rebuild every out-of-date emitter (Shift+E)")
                .clicked()
            {
                execute_all.write(ExecuteAllEvent);
            }
        });
}

enum EmitterAction {
    None,
    Execute,
    Remove,
}

fn emitter_section(ui: &mut egui::Ui, item: EmitterItem, spherical_mode: bool) -> EmitterAction {
    let (mut emitter, mut velocity, mut spherical, mut physics, status, name) = item;
    let mut action = EmitterAction::None;

    let name = name.map_or("emitter", |n| n.0.as_str());
    ui.label(egui::RichText::new(name).strong());
    let (icon, color) = if status.is_dirty {
        (icons::WARNING, colors::DIRTY)
    } else {
        (icons::SUCCESS, colors::CLEAN)
    };
    ui.colored_label(color, format!("{icon} {}", emitter_status_text(status)));

    egui::CollapsingHeader::new("Emitter")
        .default_open(true)
        .show(ui, |ui| {
            let mut edited = emitter.clone();
            egui::Grid::new("emitter_grid").num_columns(2).show(ui, |ui| {
                ui.label("Start frame");
                ui.add(egui::DragValue::new(&mut edited.start_frame).range(1..=MAX_FRAME));
                ui.end_row();

                ui.label("End frame");
                ui.add(egui::DragValue::new(&mut edited.end_frame).range(1..=MAX_FRAME));
                ui.end_row();

                ui.label("Instances");
                ui.add(egui::DragValue::new(&mut edited.instance_count).range(1..=10_000));
                ui.end_row();

                ui.label("Lifetime")
                    .on_hover_text("Frames each instance stays alive, 0 for forever");
                ui.add(egui::DragValue::new(&mut edited.lifetime).range(0..=MAX_FRAME));
                ui.end_row();

                ui.label("Start hidden");
                ui.checkbox(&mut edited.start_hidden, "");
                ui.end_row();
            });

            ui.label(velocity_label(spherical_mode));
            if spherical_mode {
                let mut edited_spherical = spherical.0;
                spherical_editor(ui, &mut edited_spherical);
                spherical.set_if_neq(SphericalVelocity(edited_spherical));
            } else {
                let mut edited_velocity = velocity.0;
                vector_editor(ui, "velocity", &mut edited_velocity, 0.1);
                velocity.set_if_neq(EmitterVelocity(edited_velocity));
            }

            ui.label("Angular velocity (deg/s)");
            let mut degrees = DVec3::new(
                edited.angular_velocity.x.to_degrees(),
                edited.angular_velocity.y.to_degrees(),
                edited.angular_velocity.z.to_degrees(),
            );
            vector_editor(ui, "angular", &mut degrees, 1.0);
            let radians = DVec3::new(
                degrees.x.to_radians(),
                degrees.y.to_radians(),
                degrees.z.to_radians(),
            );
            // Round-tripping through degrees drifts in the last bits.
            if (radians - edited.angular_velocity).abs().max_element() > 1e-12 {
                edited.angular_velocity = radians;
            }

            emitter.set_if_neq(edited);
        });

    egui::CollapsingHeader::new(format!("{} Rigid Body", icons::PHYSICS))
        .default_open(false)
        .show(ui, |ui| {
            let mut edited = *physics;
            ui.add(egui::Slider::new(&mut edited.friction, 0.0..=1.0).text("Friction"));
            ui.add(egui::Slider::new(&mut edited.bounciness, 0.0..=1.0).text("Bounciness"));
            egui::ComboBox::from_label("Shape")
                .selected_text(edited.collision_shape.label())
                .show_ui(ui, |ui| {
                    for shape in CollisionShapeKind::ALL {
                        ui.selectable_value(&mut edited.collision_shape, shape, shape.label());
                    }
                });
            physics.set_if_neq(edited);
        });

    ui.horizontal(|ui| {
        if ui
            .button(format!("{} Execute", icons::EXECUTE))
            .on_hover_text("Rebuild instances (E)")
            .clicked()
        {
            action = EmitterAction::Execute;
        }
        if ui
            .button(format!("{} Remove", icons::DELETE))
            .on_hover_text("Remove emitter and instances (Delete)")
            .clicked()
        {
            action = EmitterAction::Remove;
        }
    });

    action
}

fn vector_editor(ui: &mut egui::Ui, id: &str, value: &mut DVec3, speed: f64) {
    ui.push_id(id, |ui| {
        ui.horizontal(|ui| {
            ui.add(egui::DragValue::new(&mut value.x).speed(speed).prefix("x "));
            ui.add(egui::DragValue::new(&mut value.y).speed(speed).prefix("y "));
            ui.add(egui::DragValue::new(&mut value.z).speed(speed).prefix("z "));
        });
    });
}

fn spherical_editor(ui: &mut egui::Ui, value: &mut Spherical) {
    let mut incline = value.incline.to_degrees();
    let mut azimuth = value.azimuth.to_degrees();

    egui::Grid::new("spherical_grid").num_columns(2).show(ui, |ui| {
        ui.label("Speed");
        ui.add(
            egui::DragValue::new(&mut value.radius)
                .speed(0.1)
                .range(0.0..=f64::MAX)
                .suffix(" m/s"),
        );
        ui.end_row();

        ui.label("Incline");
        ui.add(egui::DragValue::new(&mut incline).range(0.0..=180.0).suffix("°"));
        ui.end_row();

        ui.label("Azimuth");
        ui.add(egui::DragValue::new(&mut azimuth).range(-360.0..=360.0).suffix("°"));
        ui.end_row();
    });

    if (incline - value.incline.to_degrees()).abs() > 1e-9 {
        value.incline = incline.to_radians();
    }
    if (azimuth - value.azimuth.to_degrees()).abs() > 1e-9 {
        value.azimuth = azimuth.to_radians();
    }
}

fn timeline_section(ui: &mut egui::Ui, timeline: &mut ResMut<Timeline>, scene: &SceneSettings) {
    let mut edited = (**timeline).clone();

    ui.horizontal(|ui| {
        let icon = if edited.playing { icons::PAUSE } else { icons::PLAY };
        if ui.button(icon).on_hover_text("Play/Pause (Space)").clicked() {
            edited.toggle();
        }

        let mut frame = edited.current_frame;
        let end = scene.frame_end.max(scene.frame_start);
        if ui
            .add(egui::Slider::new(&mut frame, scene.frame_start..=end).text("Frame"))
            .changed()
        {
            edited.set_frame(frame, scene);
        }
    });

    timeline.set_if_neq(edited);
}

fn scene_section(ui: &mut egui::Ui, scene: &mut ResMut<SceneSettings>) {
    let mut edited = (**scene).clone();

    egui::CollapsingHeader::new(format!("{} Scene", icons::SCENE))
        .default_open(false)
        .show(ui, |ui| {
            ui.checkbox(&mut edited.use_gravity, "Gravity");
            ui.add_enabled_ui(edited.use_gravity, |ui| {
                vector_editor(ui, "gravity", &mut edited.gravity, 0.1);
            });

            egui::Grid::new("scene_grid").num_columns(2).show(ui, |ui| {
                ui.label("Frame rate");
                ui.add(egui::DragValue::new(&mut edited.frame_rate).range(1..=240));
                ui.end_row();

                ui.label("Start");
                ui.add(egui::DragValue::new(&mut edited.frame_start).range(0..=MAX_FRAME));
                ui.end_row();

                ui.label("End");
                ui.add(egui::DragValue::new(&mut edited.frame_end).range(0..=MAX_FRAME));
                ui.end_row();
            });
        });

    scene.set_if_neq(edited);
}

fn global_section(ui: &mut egui::Ui, settings: &mut ResMut<ProjectileSettings>) {
    let mut edited = (**settings).clone();

    egui::CollapsingHeader::new(format!("{} Display", icons::TRAJECTORY))
        .default_open(true)
        .show(ui, |ui| {
            egui::ComboBox::from_label("Trajectories")
                .selected_text(edited.draw_trajectories.label())
                .show_ui(ui, |ui| {
                    for mode in [DrawMode::All, DrawMode::Selected, DrawMode::None] {
                        ui.selectable_value(&mut edited.draw_trajectories, mode, mode.label());
                    }
                });

            egui::ComboBox::from_label("Quality")
                .selected_text(edited.quality.label())
                .show_ui(ui, |ui| {
                    for quality in SolverQuality::ALL {
                        ui.selectable_value(&mut edited.quality, quality, quality.label());
                    }
                });

            ui.checkbox(&mut edited.spherical, "Spherical velocity");
        });

    settings.set_if_neq(edited);
}
