//! Panel icons.
//!
//! The panel draws its glyphs from the Phosphor regular set, which egui does
//! not ship. `install_icon_font` merges it into the egui fonts once, on the
//! first pass where a context exists.

use bevy::prelude::*;
use bevy_egui::{EguiContexts, egui};

/// Set once the icon font has been handed to egui.
#[derive(Resource, Default)]
pub struct IconFontReady(pub bool);

/// egui's default fonts with the Phosphor regular glyphs appended.
pub fn icon_font_definitions() -> egui::FontDefinitions {
    let mut fonts = egui::FontDefinitions::default();
    egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
    fonts
}

pub fn install_icon_font(mut contexts: EguiContexts, mut ready: ResMut<IconFontReady>) {
    if ready.0 {
        return;
    }
    // No primary context yet; retry next pass.
    let Ok(ctx) = contexts.ctx_mut() else {
        return;
    };

    ctx.set_fonts(icon_font_definitions());
    ready.0 = true;
    debug!("Panel icon font installed");
}

// Browse all icons at https://phosphoricons.com/

pub const PLAY: &str = egui_phosphor::regular::PLAY;
pub const PAUSE: &str = egui_phosphor::regular::PAUSE;
pub const ADD: &str = egui_phosphor::regular::PLUS;
pub const DELETE: &str = egui_phosphor::regular::TRASH;
/// Execute emitter (rebuild instances)
pub const EXECUTE: &str = egui_phosphor::regular::LIGHTNING;
pub const EMITTER: &str = egui_phosphor::regular::SHOOTING_STAR;
pub const PHYSICS: &str = egui_phosphor::regular::CUBE;
pub const SCENE: &str = egui_phosphor::regular::GLOBE;
pub const TRAJECTORY: &str = egui_phosphor::regular::PATH;
/// Instances are stale
pub const WARNING: &str = egui_phosphor::regular::WARNING;
/// Instances are up to date
pub const SUCCESS: &str = egui_phosphor::regular::CHECK_CIRCLE;
