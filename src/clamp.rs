//! Zoom and pan limits for the live view box.

use crate::geometry::ViewBox;

/// Limits applied by [`clamp`]; usually built from
/// [`ViewerConfig::clamp_limits`](crate::config::ViewerConfig::clamp_limits).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClampLimits {
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub min_content_visible: f64,
    pub fallback_pan_x: f64,
    pub fallback_pan_y: f64,
}

impl Default for ClampLimits {
    fn default() -> Self {
        crate::config::ViewerConfig::default().clamp_limits()
    }
}

impl ClampLimits {
    pub fn min_width(&self, initial: &ViewBox) -> f64 {
        initial.width * self.min_zoom
    }

    pub fn max_width(&self, initial: &ViewBox) -> f64 {
        initial.width * self.max_zoom
    }
}

/// Bounds a candidate view box against the initial framing and the measured
/// content.
///
/// The result always has the initial aspect ratio and a width within
/// `[initial.width * min_zoom, initial.width * max_zoom]`. With content bounds,
/// at least `min_content_visible` of the view stays over content on every
/// edge. Without them, the origin may drift at most `fallback_pan_x/y` of the
/// initial size away from the initial origin.
///
/// The lower pan bound on each axis is measured from the content's near edge
/// (`content.min_x - width * (1 - min_content_visible)`), not from the far
/// edge (`content.right() - width * 0.9`), which would keep the view pinned
/// over the content's right and bottom edges.
pub fn clamp(
    candidate: ViewBox,
    initial: ViewBox,
    content_bounds: Option<ViewBox>,
    limits: &ClampLimits,
) -> ViewBox {
    let aspect = initial.aspect();
    let width = clamp_range(
        candidate.width,
        limits.min_width(&initial),
        limits.max_width(&initial),
    );
    let height = width * aspect;

    let (min_x, min_y) = match content_bounds {
        Some(content) => {
            let keep = limits.min_content_visible;
            (
                clamp_range(
                    candidate.min_x,
                    content.min_x - width * (1.0 - keep),
                    content.right() - width * keep,
                ),
                clamp_range(
                    candidate.min_y,
                    content.min_y - height * (1.0 - keep),
                    content.bottom() - height * keep,
                ),
            )
        }
        None => {
            let slack_x = initial.width * limits.fallback_pan_x;
            let slack_y = initial.height * limits.fallback_pan_y;
            (
                clamp_range(
                    candidate.min_x,
                    initial.min_x - slack_x,
                    initial.min_x + slack_x,
                ),
                clamp_range(
                    candidate.min_y,
                    initial.min_y - slack_y,
                    initial.min_y + slack_y,
                ),
            )
        }
    };

    ViewBox::new(min_x, min_y, width, height)
}

/// Limits only the width of `candidate` and locks it to the initial aspect
/// ratio, keeping its center. Position is left to [`clamp`] once content
/// bounds are known.
pub fn clamp_zoom(candidate: ViewBox, initial: ViewBox, limits: &ClampLimits) -> ViewBox {
    let width = clamp_range(
        candidate.width,
        limits.min_width(&initial),
        limits.max_width(&initial),
    );
    let height = width * initial.aspect();
    let center = candidate.center();
    ViewBox::new(center.x - width / 2.0, center.y - height / 2.0, width, height)
}

/// Like `f64::clamp`, but tolerates `lo > hi` (favouring `lo`) and NaN input.
pub(crate) fn clamp_range(value: f64, lo: f64, hi: f64) -> f64 {
    if value.is_nan() {
        return lo;
    }
    value.min(hi).max(lo)
}
