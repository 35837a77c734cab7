//! Pointer, touch and wheel input turned into clamped view box changes.
//!
//! Every input source goes through the same [`GestureInput`] path so pan and
//! zoom math exist once.

use crate::clamp::{ClampLimits, clamp, clamp_range};
use crate::config::ViewerConfig;
use crate::geometry::{CanvasSize, ViewBox};
use kurbo::{Point, Vec2};
use std::time::{Duration, Instant};

/// Device a gesture originates from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputSource {
    Mouse,
    Touch,
    Keyboard,
}

/// One input event, in canvas-local pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GestureInput {
    /// Button or finger down.
    Press { source: InputSource, position: Point },
    Move { source: InputSource, position: Point },
    /// Button or finger up; ends the gesture.
    Release { source: InputSource },
    /// Scroll wheel, with DOM sign conventions (positive `delta.y` scrolls
    /// down). With `pan` set the wheel pans instead of zooming.
    Wheel { delta: Vec2, position: Point, pan: bool },
    /// Double click or double tap.
    DoubleActivate { source: InputSource },
}

/// Telemetry emitted when a gesture finishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureSignal {
    Pan,
    Zoom,
    Reset,
}

/// State captured when a press starts a pan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DragSession {
    pub source: InputSource,
    pub origin: Point,
    pub captured: ViewBox,
    moved: bool,
}

/// The view boxes a gesture is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewFrame {
    pub live: ViewBox,
    pub initial: ViewBox,
    pub content_bounds: Option<ViewBox>,
}

/// Result of feeding one input to the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GestureOutcome {
    /// New live view box, if it changed.
    pub view_box: Option<ViewBox>,
    /// Whether the live view box should now be written to the view cache.
    pub persist: bool,
    /// Telemetry to report, after de-duplication.
    pub signal: Option<GestureSignal>,
}

/// Merges identical consecutive signals that arrive within a window.
#[derive(Debug, Clone)]
pub struct SignalDeduper {
    window: Duration,
    last: Option<(GestureSignal, Instant)>,
}

impl SignalDeduper {
    pub fn new(window: Duration) -> Self {
        Self { window, last: None }
    }

    /// Returns the signal if it should be reported. A merged signal extends
    /// the window.
    pub fn admit(&mut self, signal: GestureSignal, now: Instant) -> Option<GestureSignal> {
        let merged = self.last.is_some_and(|(last, at)| {
            last == signal && now.saturating_duration_since(at) < self.window
        });
        self.last = Some((signal, now));
        if merged {
            log::trace!("Merged repeated {signal:?} signal");
            None
        } else {
            Some(signal)
        }
    }
}

/// Tuning for [`InteractionController`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionSettings {
    pub limits: ClampLimits,
    pub wheel_sensitivity: f64,
    pub wheel_pan_sensitivity: f64,
}

impl From<&ViewerConfig> for InteractionSettings {
    fn from(config: &ViewerConfig) -> Self {
        Self {
            limits: config.clamp_limits(),
            wheel_sensitivity: config.wheel_sensitivity,
            wheel_pan_sensitivity: config.wheel_pan_sensitivity,
        }
    }
}

/// Translates gestures into view box updates.
#[derive(Debug, Clone)]
pub struct InteractionController {
    settings: InteractionSettings,
    drag: Option<DragSession>,
    signals: SignalDeduper,
}

impl InteractionController {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            settings: InteractionSettings::from(config),
            drag: None,
            signals: SignalDeduper::new(config.telemetry_window()),
        }
    }

    pub fn drag_session(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    /// Drops any in-flight drag without persisting it.
    pub fn cancel(&mut self) {
        if self.drag.take().is_some() {
            log::debug!("Gesture abandoned");
        }
    }

    pub fn handle(
        &mut self,
        input: GestureInput,
        frame: &ViewFrame,
        canvas: CanvasSize,
        now: Instant,
    ) -> GestureOutcome {
        match input {
            GestureInput::Press { source, position } => {
                if self.drag.is_some_and(|drag| drag.source == InputSource::Touch)
                    && source == InputSource::Touch
                {
                    // A second finger is not a pan.
                    self.drag = None;
                } else {
                    self.drag = Some(DragSession {
                        source,
                        origin: position,
                        captured: frame.live,
                        moved: false,
                    });
                }
                GestureOutcome::default()
            }
            GestureInput::Move { source, position } => {
                let Some(drag) = self.drag.as_mut().filter(|drag| drag.source == source) else {
                    return GestureOutcome::default();
                };
                if !canvas.is_measurable() {
                    return GestureOutcome::default();
                }
                let scale_x = drag.captured.width / canvas.width;
                let scale_y = drag.captured.height / canvas.height;
                let delta = position - drag.origin;
                let candidate = drag
                    .captured
                    .shifted(-delta.x * scale_x, -delta.y * scale_y);
                drag.moved |= delta != Vec2::ZERO;
                GestureOutcome {
                    view_box: Some(self.clamp(candidate, frame)),
                    ..GestureOutcome::default()
                }
            }
            GestureInput::Release { source } => {
                let Some(drag) = self.drag.take_if(|drag| drag.source == source) else {
                    return GestureOutcome::default();
                };
                GestureOutcome {
                    view_box: None,
                    persist: true,
                    signal: drag
                        .moved
                        .then(|| self.signals.admit(GestureSignal::Pan, now))
                        .flatten(),
                }
            }
            GestureInput::Wheel {
                delta,
                position,
                pan,
            } => {
                let candidate = if pan {
                    let s = self.settings.wheel_pan_sensitivity;
                    frame.live.shifted(delta.x * s, delta.y * s)
                } else {
                    self.wheel_zoom_candidate(frame, delta.y, position, canvas)
                };
                let signal = if pan {
                    GestureSignal::Pan
                } else {
                    GestureSignal::Zoom
                };
                GestureOutcome {
                    view_box: Some(self.clamp(candidate, frame)),
                    persist: true,
                    signal: self.signals.admit(signal, now),
                }
            }
            GestureInput::DoubleActivate { .. } => {
                self.drag = None;
                GestureOutcome {
                    view_box: Some(frame.initial),
                    persist: true,
                    signal: self.signals.admit(GestureSignal::Reset, now),
                }
            }
        }
    }

    /// Exponential zoom about the cursor. Negative `delta_y` (wheel up)
    /// narrows the view, i.e. zooms in.
    fn wheel_zoom_candidate(
        &self,
        frame: &ViewFrame,
        delta_y: f64,
        position: Point,
        canvas: CanvasSize,
    ) -> ViewBox {
        let live = frame.live;
        let limits = &self.settings.limits;
        let factor = (1.0 + self.settings.wheel_sensitivity).powf(delta_y);
        let width = clamp_range(
            live.width * factor,
            limits.min_width(&frame.initial),
            limits.max_width(&frame.initial),
        );
        let height = width * frame.initial.aspect();

        let (rel_x, rel_y) = if canvas.is_measurable() {
            (
                (position.x / canvas.width).clamp(0.0, 1.0),
                (position.y / canvas.height).clamp(0.0, 1.0),
            )
        } else {
            (0.5, 0.5)
        };

        ViewBox::new(
            live.min_x + (live.width - width) * rel_x,
            live.min_y + (live.height - height) * rel_y,
            width,
            height,
        )
    }

    fn clamp(&self, candidate: ViewBox, frame: &ViewFrame) -> ViewBox {
        clamp(
            candidate,
            frame.initial,
            frame.content_bounds,
            &self.settings.limits,
        )
    }
}
