//! UI rendering methods for the molecule viewer.

use crate::colors;
use crate::constants::{KEY_ZOOM_DELTA, SIDEBAR_WIDTH};
use crate::raster::CanvasTexture;
use crate::{BackendState, MolviewApp};
use eframe::egui;
use molview::{
    CanvasSize, GestureInput, InputSource, Point, StructurePayload, Vec2, ViewportState,
};
use std::time::Instant;

const CONTROLS_HINT: &str =
    "Scroll: Zoom | Shift+Scroll: Pan | Drag: Pan | Double-click: Reset | +/-: Zoom | 0: Reset | T: Theme";

/// Longest molecule key shown in the status bar.
const STATUS_KEY_CHARS: usize = 48;

/// Keyboard shortcuts as gestures: zoom about the canvas center and reset.
fn key_gestures(zoom_in: bool, zoom_out: bool, reset: bool, canvas: CanvasSize) -> Vec<GestureInput> {
    let zoom = |delta| GestureInput::Wheel {
        delta: Vec2::new(0.0, delta),
        position: canvas.center(),
        pan: false,
    };
    let mut inputs = Vec::new();
    if zoom_in {
        inputs.push(zoom(-KEY_ZOOM_DELTA));
    }
    if zoom_out {
        inputs.push(zoom(KEY_ZOOM_DELTA));
    }
    if reset {
        inputs.push(GestureInput::DoubleActivate {
            source: InputSource::Keyboard,
        });
    }
    inputs
}

impl MolviewApp {
    /// Handles keyboard shortcuts for zoom, reset and theme.
    pub fn handle_keyboard_input(&mut self, ctx: &egui::Context) {
        if ctx.wants_keyboard_input() {
            return;
        }
        let (zoom_in, zoom_out, reset, theme) = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::Plus) || i.key_pressed(egui::Key::Equals),
                i.key_pressed(egui::Key::Minus),
                i.key_pressed(egui::Key::Num0),
                i.key_pressed(egui::Key::T),
            )
        });

        if let Some(canvas) = self.canvas {
            let now = Instant::now();
            for input in key_gestures(zoom_in, zoom_out, reset, canvas) {
                if let Some(signal) = self.viewport.handle_input(input, canvas, now) {
                    log::info!(target: "molview::telemetry", "{signal:?}");
                }
            }
        }
        if theme {
            self.set_theme(self.viewport.theme().toggled());
        }
    }

    /// Renders the bottom status bar with controls hint, molecule key and zoom.
    pub fn show_status_bar(&self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(CONTROLS_HINT);

                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    if let Some(zoom) = self.viewport.zoom() {
                        ui.monospace(format!("{:.0}%", zoom * 100.0));
                    }
                    if let Some(key) = self.viewport.molecule_key() {
                        let key = key.as_str();
                        let shown: String = key.chars().take(STATUS_KEY_CHARS).collect();
                        let label = ui.monospace(if shown.len() < key.len() {
                            format!("{shown}…")
                        } else {
                            shown
                        });
                        label.on_hover_text(key);
                    }
                });
            });
        });
    }

    /// Renders the left sidebar panel.
    pub fn show_sidebar(&mut self, ctx: &egui::Context) {
        egui::SidePanel::left("sidebar")
            .exact_width(SIDEBAR_WIDTH)
            .resizable(false)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.show_sidebar_content(ui);
                });
            });
    }

    /// Renders the sidebar content: samples, SMILES entry and appearance.
    fn show_sidebar_content(&mut self, ui: &mut egui::Ui) {
        ui.add_space(4.0);

        ui.strong("Samples");
        ui.separator();

        if self.samples.is_empty() {
            ui.label("No samples loaded");
        } else {
            let mut clicked = None;
            for (idx, sample) in self.samples.iter().enumerate() {
                if ui
                    .selectable_label(self.selected_sample == Some(idx), &sample.name)
                    .clicked()
                {
                    clicked = Some(idx);
                }
            }
            if let Some(idx) = clicked
                && self.selected_sample != Some(idx)
            {
                self.selected_sample = Some(idx);
                let payload = self.samples[idx].payload();
                self.open(payload);
            }
        }

        ui.add_space(12.0);

        ui.strong("SMILES");
        ui.separator();

        let response = ui.text_edit_singleline(&mut self.smiles_input);
        let submitted = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        if (ui.button("Open").clicked() || submitted) && !self.smiles_input.trim().is_empty() {
            self.selected_sample = None;
            self.open(StructurePayload::from_line_notation(self.smiles_input.trim()));
        }

        ui.add_space(12.0);

        ui.strong("Appearance");
        ui.separator();

        let mut dark = self.viewport.theme().is_dark();
        if ui.checkbox(&mut dark, "Dark theme").changed() {
            self.set_theme(self.viewport.theme().toggled());
        }

        ui.add_space(12.0);

        ui.strong("Depiction");
        ui.separator();

        match &self.backend {
            BackendState::Ready(backend) => {
                ui.small(backend.version());
            }
            BackendState::Loading(_) => {
                ui.small("Loading…");
            }
            BackendState::Failed(_) => {
                ui.small("Unavailable");
            }
        }
    }

    /// Renders the central panel containing the molecule canvas.
    pub fn show_central_panel(&mut self, ctx: &egui::Context) {
        egui::CentralPanel::default().show(ctx, |ui| {
            match &self.backend {
                BackendState::Loading(_) => {
                    ui.centered_and_justified(|ui| {
                        ui.horizontal_centered(|ui| {
                            ui.spinner();
                            ui.label("Loading depiction library…");
                        });
                    });
                    return;
                }
                BackendState::Failed(msg) => {
                    let mut retry = false;
                    ui.vertical_centered(|ui| {
                        ui.add_space(ui.available_height() / 3.0);
                        ui.label(format!("Depiction library unavailable: {msg}"));
                        retry = ui.button("Retry").clicked();
                    });
                    if retry {
                        self.load_backend();
                    }
                    return;
                }
                BackendState::Ready(_) => {}
            }
            self.show_canvas(ui);
        });
    }

    /// Renders the scene and feeds canvas input to the viewport.
    fn show_canvas(&mut self, ui: &mut egui::Ui) {
        let (rect, response) =
            ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());
        let canvas = CanvasSize::new(rect.width() as f64, rect.height() as f64);
        self.canvas = Some(canvas);

        let painter = ui.painter_at(rect);
        painter.rect_filled(rect, 4.0, colors::canvas_fill(self.viewport.theme()));
        painter.rect_stroke(
            rect,
            4.0,
            egui::Stroke::new(1.0, colors::CANVAS_BORDER),
            egui::StrokeKind::Inside,
        );

        match self.viewport.state() {
            ViewportState::Rendering => {
                ui.put(
                    egui::Rect::from_center_size(rect.center(), egui::vec2(24.0, 24.0)),
                    egui::Spinner::new(),
                );
                return;
            }
            ViewportState::Empty => {
                let text = if self.viewport.molecule_key().is_some() {
                    "No depiction"
                } else {
                    "Pick a sample or enter SMILES"
                };
                painter.text(
                    rect.center(),
                    egui::Align2::CENTER_CENTER,
                    text,
                    egui::FontId::proportional(14.0),
                    ui.visuals().weak_text_color(),
                );
                return;
            }
            ViewportState::TornDown => return,
            ViewportState::Ready => {}
        }

        self.handle_canvas_input(ui, &response, rect, canvas);

        let Some(svg) = self.viewport.to_svg(canvas) else {
            return;
        };
        let ppp = ui.ctx().pixels_per_point();
        let pixels = [
            (rect.width() * ppp).round() as usize,
            (rect.height() * ppp).round() as usize,
        ];
        if pixels[0] == 0 || pixels[1] == 0 {
            return;
        }

        if !self
            .texture
            .as_ref()
            .is_some_and(|texture| texture.is_current(&svg, pixels))
        {
            self.texture = match CanvasTexture::create(ui.ctx(), svg, pixels, &self.svg_options) {
                Ok(texture) => Some(texture),
                Err(err) => {
                    log::error!("{err}");
                    None
                }
            };
        }

        if let Some(texture) = &self.texture {
            painter.image(
                texture.id(),
                rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            );
        }
    }

    /// Translates egui pointer, touch and scroll state into gesture inputs.
    fn handle_canvas_input(
        &mut self,
        ui: &egui::Ui,
        response: &egui::Response,
        rect: egui::Rect,
        canvas: CanvasSize,
    ) {
        let (touching, multi_touch, scroll, shift, hover) = ui.input(|i| {
            (
                i.any_touches(),
                i.multi_touch().is_some(),
                i.raw_scroll_delta,
                i.modifiers.shift,
                i.pointer.hover_pos(),
            )
        });
        let local = |pos: egui::Pos2| Point::new((pos.x - rect.min.x) as f64, (pos.y - rect.min.y) as f64);

        let mut inputs = Vec::new();

        if response.double_clicked() {
            let source = self.drag_source.take().unwrap_or(InputSource::Mouse);
            inputs.push(GestureInput::DoubleActivate { source });
        } else {
            if response.drag_started()
                && let Some(pos) = response.interact_pointer_pos()
            {
                let source = if touching {
                    InputSource::Touch
                } else {
                    InputSource::Mouse
                };
                self.drag_source = Some(source);
                inputs.push(GestureInput::Press {
                    source,
                    position: local(pos),
                });
            }

            if multi_touch && !self.multi_touch {
                // A second finger ends the touch pan.
                inputs.push(GestureInput::Press {
                    source: InputSource::Touch,
                    position: hover.map(local).unwrap_or_default(),
                });
            }

            if let Some(source) = self.drag_source
                && response.dragged()
                && let Some(pos) = response.interact_pointer_pos()
            {
                inputs.push(GestureInput::Move {
                    source,
                    position: local(pos),
                });
            }

            if response.drag_stopped()
                && let Some(source) = self.drag_source.take()
            {
                inputs.push(GestureInput::Release { source });
            }
        }
        self.multi_touch = multi_touch;

        if scroll != egui::Vec2::ZERO
            && let Some(pos) = hover.filter(|pos| rect.contains(*pos))
        {
            // egui scroll deltas point the other way from DOM wheel deltas
            inputs.push(GestureInput::Wheel {
                delta: Vec2::new(-scroll.x as f64, -scroll.y as f64),
                position: local(pos),
                pan: shift,
            });
        }

        let now = Instant::now();
        for input in inputs {
            if let Some(signal) = self.viewport.handle_input(input, canvas, now) {
                log::info!(target: "molview::telemetry", "{signal:?}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_key_is_a_double_activation() {
        let canvas = CanvasSize::new(400.0, 300.0);
        assert_eq!(
            key_gestures(false, false, true, canvas),
            [GestureInput::DoubleActivate {
                source: InputSource::Keyboard
            }]
        );
    }

    #[test]
    fn zoom_keys_wheel_at_canvas_center() {
        let canvas = CanvasSize::new(400.0, 300.0);
        let inputs = key_gestures(true, true, false, canvas);
        assert_eq!(
            inputs,
            [
                GestureInput::Wheel {
                    delta: Vec2::new(0.0, -KEY_ZOOM_DELTA),
                    position: Point::new(200.0, 150.0),
                    pan: false,
                },
                GestureInput::Wheel {
                    delta: Vec2::new(0.0, KEY_ZOOM_DELTA),
                    position: Point::new(200.0, 150.0),
                    pan: false,
                },
            ]
        );
    }
}
