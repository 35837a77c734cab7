//! Structure payload to framed, sanitized scene.

use crate::config::ViewerConfig;
use crate::depiction::{DepictionBackend, DepictionError, StructurePayload};
use crate::geometry::{CanvasSize, ViewBox};
use crate::sanitize::{LabelClassifier, SanitizeReport, sanitize};
use crate::scene::{Scene, SceneError};
use thiserror::Error;

/// Errors that can occur while rendering a structure.
#[derive(Error, Debug)]
pub enum RenderError {
    #[error("no structure to render")]
    NoPayload,
    #[error("structure could not be parsed ({})", .attempts.join("; "))]
    StructureParse { attempts: Vec<String> },
    #[error(transparent)]
    Depiction(#[from] DepictionError),
    #[error("depiction is not valid SVG: {0}")]
    Scene(#[from] SceneError),
    #[error("depiction has no usable view box")]
    MissingViewBox,
}

/// Output of one render pass.
#[derive(Debug, Clone)]
pub struct RenderedScene {
    pub scene: Scene,
    /// Reference framing for zoom limits and reset.
    pub initial_view_box: ViewBox,
    /// Pixel size the depiction was generated at.
    pub canvas: CanvasSize,
    pub sanitized: SanitizeReport,
}

/// Canvas size to depict at: at least the configured minimum, larger if the
/// host is larger, the default while the host cannot be measured.
pub fn canvas_size(host: Option<CanvasSize>, config: &ViewerConfig) -> CanvasSize {
    match host.filter(CanvasSize::is_measurable) {
        Some(host) => config.min_canvas.max(host),
        None => config.default_canvas,
    }
}

/// Initial framing: zoom in about the center by `scale`, then shift down by
/// `vertical_offset` scene units.
pub fn initial_framing(raw: ViewBox, scale: f64, vertical_offset: f64) -> ViewBox {
    let scale = if scale.is_finite() && scale > 0.0 { scale } else { 1.0 };
    raw.scaled_about_center(scale).shifted(0.0, vertical_offset)
}

/// Runs the full depiction pipeline.
///
/// The structured notation is tried first, then the line notation. A failed
/// normalization is logged and the un-normalized structure is depicted.
pub fn render<B: DepictionBackend + ?Sized>(
    backend: &B,
    payload: &StructurePayload,
    host: Option<CanvasSize>,
    config: &ViewerConfig,
    classifier: &dyn LabelClassifier,
) -> Result<RenderedScene, RenderError> {
    if payload.is_empty() {
        return Err(RenderError::NoPayload);
    }

    let mut molecule = parse_with_fallback(backend, payload)?;

    if let Err(err) = backend.normalize(&mut molecule) {
        log::warn!("{err}; depicting without normalization");
    }

    let canvas = canvas_size(host, config);
    let svg = backend.depict(&molecule, canvas, config.crop_margin)?;

    let mut scene = Scene::parse(&svg)?;
    let sanitized = sanitize(&mut scene, classifier, &config.stereo_highlight);
    if sanitized.total() > 0 {
        log::debug!(
            "Removed {} highlighted and {} rejected labels",
            sanitized.highlighted,
            sanitized.rejected
        );
    }

    let raw = scene.view_box().ok_or(RenderError::MissingViewBox)?;
    let initial_view_box = initial_framing(
        raw,
        config.initial_frame_scale,
        config.initial_vertical_offset,
    );
    if !initial_view_box.is_valid() {
        return Err(RenderError::MissingViewBox);
    }
    scene.set_view_box(initial_view_box);
    scene.set_pixel_size(canvas);

    Ok(RenderedScene {
        scene,
        initial_view_box,
        canvas,
        sanitized,
    })
}

fn parse_with_fallback<B: DepictionBackend + ?Sized>(
    backend: &B,
    payload: &StructurePayload,
) -> Result<B::Molecule, RenderError> {
    let mut attempts = Vec::new();

    if let Some(text) = payload.structured.as_deref().filter(|t| !t.trim().is_empty()) {
        match backend.parse_structured(text) {
            Ok(molecule) => return Ok(molecule),
            Err(err) => attempts.push(err.to_string()),
        }
    }

    if let Some(text) = payload.line_notation.as_deref().filter(|t| !t.trim().is_empty()) {
        match backend.parse_line_notation(text) {
            Ok(molecule) => return Ok(molecule),
            Err(err) => attempts.push(err.to_string()),
        }
    }

    Err(RenderError::StructureParse { attempts })
}
