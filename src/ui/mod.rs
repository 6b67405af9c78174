//! UI module providing the egui projectile panel.

pub mod icons;
mod panel;

use bevy::prelude::*;
use bevy_egui::EguiPrimaryContextPass;

pub use panel::{emitter_status_text, velocity_label};

/// Plugin that adds all UI systems.
pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<icons::IconFontReady>().add_systems(
            EguiPrimaryContextPass,
            (
                icons::install_icon_font,
                panel::projectile_panel.run_if(|ready: Res<icons::IconFontReady>| ready.0),
            )
                .chain(),
        );
    }
}
