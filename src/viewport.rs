//! One molecule viewport: owns the scene and its view boxes and coordinates
//! rendering, content measurement, interaction and the view cache.

use crate::bounds::{BoundsMargin, content_bounds};
use crate::cache::ViewCache;
use crate::clamp::{clamp, clamp_zoom};
use crate::config::ViewerConfig;
use crate::depiction::{DepictionBackend, StructurePayload};
use crate::geometry::{CanvasSize, ViewBox};
use crate::interaction::{GestureInput, GestureSignal, InteractionController, ViewFrame};
use crate::key::MoleculeKey;
use crate::render::{RenderError, RenderedScene, render};
use crate::sanitize::LabelClassifier;
use crate::scene::Scene;
use crate::theme::{Theme, ThemeAdapter};
use std::time::Instant;

/// Identifies one render pass. Results carrying an outdated ticket are
/// dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderTicket {
    generation: u64,
    key: Option<MoleculeKey>,
}

impl RenderTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn key(&self) -> Option<&MoleculeKey> {
        self.key.as_ref()
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingBounds {
    due: Instant,
    generation: u64,
}

/// Coarse lifecycle state, for host display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportState {
    /// Nothing requested yet, or the last render failed.
    Empty,
    /// A render pass is in flight.
    Rendering,
    Ready,
    TornDown,
}

#[derive(Debug)]
pub struct Viewport {
    config: ViewerConfig,
    cache: ViewCache,
    theme: Theme,
    controller: InteractionController,
    alive: bool,
    generation: u64,
    rendering: bool,
    key: Option<MoleculeKey>,
    scene: Option<Scene>,
    theme_adapter: ThemeAdapter,
    canvas: Option<CanvasSize>,
    live: Option<ViewBox>,
    initial: Option<ViewBox>,
    content_bounds: Option<ViewBox>,
    cached_view: Option<ViewBox>,
    /// The live view came from the cache and still needs a position clamp
    /// once content bounds are measured.
    restored: bool,
    pending_bounds: Option<PendingBounds>,
}

impl Viewport {
    pub fn new(config: ViewerConfig, cache: ViewCache, theme: Theme) -> Self {
        Self {
            controller: InteractionController::new(&config),
            theme_adapter: ThemeAdapter::new(&config),
            config,
            cache,
            theme,
            alive: true,
            generation: 0,
            rendering: false,
            key: None,
            scene: None,
            canvas: None,
            live: None,
            initial: None,
            content_bounds: None,
            cached_view: None,
            restored: false,
            pending_bounds: None,
        }
    }

    pub fn config(&self) -> &ViewerConfig {
        &self.config
    }

    pub fn state(&self) -> ViewportState {
        if !self.alive {
            ViewportState::TornDown
        } else if self.rendering {
            ViewportState::Rendering
        } else if self.live.is_some() {
            ViewportState::Ready
        } else {
            ViewportState::Empty
        }
    }

    pub fn molecule_key(&self) -> Option<&MoleculeKey> {
        self.key.as_ref()
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    pub fn live_view_box(&self) -> Option<ViewBox> {
        self.live
    }

    pub fn initial_view_box(&self) -> Option<ViewBox> {
        self.initial
    }

    pub fn content_bounds(&self) -> Option<ViewBox> {
        self.content_bounds
    }

    pub fn canvas(&self) -> Option<CanvasSize> {
        self.canvas
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Current zoom relative to the initial framing (1.0 = initial).
    pub fn zoom(&self) -> Option<f64> {
        Some(self.initial?.width / self.live?.width)
    }

    /// Switches to a new structure.
    ///
    /// The outgoing view is saved under the outgoing key before anything
    /// else happens. A drag in progress is abandoned, and the view it started
    /// from is what gets saved. The returned ticket must accompany the render
    /// result.
    pub fn begin_load(&mut self, payload: &StructurePayload) -> RenderTicket {
        let pre_gesture = self.controller.drag_session().map(|drag| drag.captured);
        self.controller.cancel();
        if let (Some(key), Some(view_box)) = (&self.key, pre_gesture.or(self.live)) {
            self.cache.set(key, view_box);
        }

        self.generation += 1;
        self.key = MoleculeKey::from_payload(payload);
        self.cached_view = self.key.as_ref().and_then(|key| self.cache.get(key));
        self.rendering = self.alive;
        self.clear_refs();

        if let Some(key) = &self.key {
            log::info!(
                "Loading {key}{}",
                if self.cached_view.is_some() { " (cached view)" } else { "" }
            );
        }

        RenderTicket {
            generation: self.generation,
            key: self.key.clone(),
        }
    }

    /// Installs a finished render. Returns `false` if the result was stale
    /// (superseded or torn down) and discarded.
    pub fn apply_render(
        &mut self,
        ticket: &RenderTicket,
        result: Result<RenderedScene, RenderError>,
        now: Instant,
    ) -> bool {
        if !self.alive || ticket.generation != self.generation {
            log::debug!(
                "Discarding render {} (current {})",
                ticket.generation,
                self.generation
            );
            return false;
        }
        self.rendering = false;

        let rendered = match result {
            Ok(rendered) => rendered,
            Err(err) => {
                log::error!("Render failed: {err}");
                self.cached_view = None;
                self.clear_refs();
                self.scene = Some(Scene::empty());
                return true;
            }
        };

        let mut scene = rendered.scene;
        self.theme_adapter = ThemeAdapter::new(&self.config);
        self.theme_adapter.apply(&mut scene, self.theme);

        self.scene = Some(scene);
        self.canvas = Some(rendered.canvas);
        self.initial = Some(rendered.initial_view_box);
        let initial = rendered.initial_view_box;
        self.restored = self.cached_view.is_some();
        self.live = Some(match self.cached_view.take() {
            Some(cached) => clamp_zoom(cached, initial, &self.config.clamp_limits()),
            None => initial,
        });
        self.content_bounds = None;
        self.pending_bounds = Some(PendingBounds {
            due: now + self.config.settle_delay(),
            generation: self.generation,
        });
        true
    }

    /// Convenience for hosts that render on the calling thread.
    pub fn load<B: DepictionBackend + ?Sized>(
        &mut self,
        backend: &B,
        payload: &StructurePayload,
        host: Option<CanvasSize>,
        classifier: &dyn LabelClassifier,
        now: Instant,
    ) -> RenderTicket {
        let ticket = self.begin_load(payload);
        let result = render(backend, payload, host, &self.config, classifier);
        self.apply_render(&ticket, result, now);
        ticket
    }

    /// When the settle delay has passed, measures content bounds. Returns
    /// `true` if bounds were computed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(pending) = self.pending_bounds else {
            return false;
        };
        if !self.alive || pending.generation != self.generation {
            self.pending_bounds = None;
            return false;
        }
        if now < pending.due {
            return false;
        }
        self.pending_bounds = None;

        let Some(scene) = &self.scene else {
            return false;
        };
        self.content_bounds = content_bounds(scene, &BoundsMargin::from(&self.config));
        if std::mem::take(&mut self.restored)
            && let (Some(live), Some(initial)) = (self.live, self.initial)
        {
            self.live = Some(clamp(
                live,
                initial,
                self.content_bounds,
                &self.config.clamp_limits(),
            ));
        }
        match self.content_bounds {
            Some(bounds) => log::debug!("Content bounds {bounds:?}"),
            None => log::debug!("No measurable primitives; using fallback pan limits"),
        }
        true
    }

    /// Time at which [`Viewport::tick`] has work to do, if any.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending_bounds.map(|pending| pending.due)
    }

    /// Feeds one input event. `canvas` is the host's current client size.
    ///
    /// Input is ignored until a valid view box exists.
    pub fn handle_input(
        &mut self,
        input: GestureInput,
        canvas: CanvasSize,
        now: Instant,
    ) -> Option<GestureSignal> {
        if !self.alive {
            return None;
        }
        let (Some(live), Some(initial)) = (self.live, self.initial) else {
            return None;
        };
        let frame = ViewFrame {
            live,
            initial,
            content_bounds: self.content_bounds,
        };

        let outcome = self.controller.handle(input, &frame, canvas, now);
        if let Some(view_box) = outcome.view_box {
            self.live = Some(view_box);
        }
        if outcome.persist {
            self.save_current();
        }
        if let Some(signal) = outcome.signal {
            log::debug!("Gesture {signal:?}");
        }
        outcome.signal
    }

    /// Restores the initial framing and persists it.
    pub fn reset(&mut self) {
        if !self.alive {
            return;
        }
        self.controller.cancel();
        if let Some(initial) = self.initial {
            self.live = Some(initial);
            self.save_current();
        }
    }

    pub fn set_theme(&mut self, theme: Theme) {
        if self.theme == theme {
            return;
        }
        self.theme = theme;
        if let Some(scene) = &mut self.scene {
            self.theme_adapter.apply(scene, theme);
        }
    }

    /// The scene as currently framed, ready for rasterization.
    pub fn to_svg(&self, size: CanvasSize) -> Option<String> {
        Some(self.scene.as_ref()?.to_svg_with_view(self.live?, size))
    }

    /// Discards all state. Pending continuations and in-flight gestures are
    /// dropped without writing anything.
    pub fn teardown(&mut self) {
        self.alive = false;
        self.rendering = false;
        self.controller.cancel();
        self.clear_refs();
    }

    fn save_current(&self) {
        if let (Some(key), Some(live)) = (&self.key, self.live) {
            self.cache.set(key, live);
        }
    }

    fn clear_refs(&mut self) {
        self.scene = None;
        self.canvas = None;
        self.live = None;
        self.initial = None;
        self.content_bounds = None;
        self.restored = false;
        self.pending_bounds = None;
    }
}

impl Drop for Viewport {
    fn drop(&mut self) {
        self.teardown();
    }
}
