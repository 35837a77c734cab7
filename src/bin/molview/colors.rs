//! Canvas and sidebar colors.

use eframe::egui::Color32;
use molview::Theme;

pub const LIGHT_CANVAS: Color32 = Color32::from_rgb(255, 255, 255);
pub const DARK_CANVAS: Color32 = Color32::from_rgb(30, 30, 34);

pub const CANVAS_BORDER: Color32 = Color32::from_rgba_premultiplied(128, 128, 128, 96);

pub fn canvas_fill(theme: Theme) -> Color32 {
    match theme {
        Theme::Light => LIGHT_CANVAS,
        Theme::Dark => DARK_CANVAS,
    }
}
