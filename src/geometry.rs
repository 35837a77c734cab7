//! View-space geometry shared by every part of the viewport.

use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Visible window into a scene's coordinate space (the SVG `viewBox`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewBox {
    pub min_x: f64,
    pub min_y: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewBox {
    pub const fn new(min_x: f64, min_y: f64, width: f64, height: f64) -> Self {
        Self {
            min_x,
            min_y,
            width,
            height,
        }
    }

    /// All components finite and a strictly positive size.
    pub fn is_valid(&self) -> bool {
        self.min_x.is_finite()
            && self.min_y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
            && self.width > 0.0
            && self.height > 0.0
    }

    pub fn right(&self) -> f64 {
        self.min_x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.min_y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(
            self.min_x + self.width / 2.0,
            self.min_y + self.height / 2.0,
        )
    }

    /// Height over width.
    pub fn aspect(&self) -> f64 {
        self.height / self.width
    }

    pub fn shifted(&self, dx: f64, dy: f64) -> Self {
        Self {
            min_x: self.min_x + dx,
            min_y: self.min_y + dy,
            ..*self
        }
    }

    /// Shrinks (`scale > 1`) or grows (`scale < 1`) the box about its center.
    pub fn scaled_about_center(&self, scale: f64) -> Self {
        let center = self.center();
        let width = self.width / scale;
        let height = self.height / scale;
        Self {
            min_x: center.x - width / 2.0,
            min_y: center.y - height / 2.0,
            width,
            height,
        }
    }

    /// Grows the box by `margin` on every edge.
    pub fn expanded(&self, margin: f64) -> Self {
        Self {
            min_x: self.min_x - margin,
            min_y: self.min_y - margin,
            width: self.width + 2.0 * margin,
            height: self.height + 2.0 * margin,
        }
    }

    pub fn to_rect(&self) -> Rect {
        Rect::new(self.min_x, self.min_y, self.right(), self.bottom())
    }

    pub fn from_rect(rect: Rect) -> Self {
        let rect = rect.abs();
        Self::new(rect.x0, rect.y0, rect.width(), rect.height())
    }

    /// Parses an SVG `viewBox` attribute (`"min-x min-y width height"`,
    /// whitespace and/or comma separated).
    pub fn parse(attr: &str) -> Option<Self> {
        let mut parts = attr
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|part| !part.is_empty())
            .map(str::parse::<f64>);

        let view_box = Self::new(
            parts.next()?.ok()?,
            parts.next()?.ok()?,
            parts.next()?.ok()?,
            parts.next()?.ok()?,
        );

        if parts.next().is_some() || !view_box.is_valid() {
            return None;
        }
        Some(view_box)
    }

    /// Formats the box as an SVG `viewBox` attribute value.
    pub fn to_attr(&self) -> String {
        format!(
            "{} {} {} {}",
            self.min_x, self.min_y, self.width, self.height
        )
    }
}

/// Pixel size of the host canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl CanvasSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Whether the host has been laid out yet.
    pub fn is_measurable(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }

    /// Component-wise maximum.
    pub fn max(self, other: Self) -> Self {
        Self::new(self.width.max(other.width), self.height.max(other.height))
    }

    pub fn center(&self) -> Point {
        Point::new(self.width / 2.0, self.height / 2.0)
    }
}
