//! Measures the extent of what a scene actually draws.

use crate::geometry::ViewBox;
use crate::scene::{Element, PrimitiveKind, Scene};
use kurbo::{Affine, BezPath, Point, Rect, Shape, Vec2};

/// Rough advance of one glyph, as a fraction of the font size.
const GLYPH_ADVANCE: f64 = 0.6;
/// Part of the font size above the baseline.
const GLYPH_ASCENT: f64 = 0.8;
const DEFAULT_FONT_SIZE: f64 = 16.0;

/// Margin rule applied around the union of primitive bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundsMargin {
    pub fraction: f64,
    pub minimum: f64,
}

impl BoundsMargin {
    pub fn for_size(&self, width: f64, height: f64) -> f64 {
        (width * self.fraction)
            .max(height * self.fraction)
            .max(self.minimum)
    }
}

impl From<&crate::config::ViewerConfig> for BoundsMargin {
    fn from(config: &crate::config::ViewerConfig) -> Self {
        Self {
            fraction: config.bounds_margin_fraction,
            minimum: config.bounds_margin_min,
        }
    }
}

/// Union of every primitive's bounding box plus the margin, or `None` when
/// nothing has a nonzero extent.
pub fn content_bounds(scene: &Scene, margin: &BoundsMargin) -> Option<ViewBox> {
    let raw = raw_bounds(scene)?;
    let pad = margin.for_size(raw.width(), raw.height());
    let padded = ViewBox::from_rect(raw).expanded(pad);
    padded.is_valid().then_some(padded)
}

/// Union of every primitive's bounding box in root coordinates.
pub fn raw_bounds(scene: &Scene) -> Option<Rect> {
    let mut union: Option<Rect> = None;
    visit(scene.root(), Affine::IDENTITY, &mut |rect| {
        union = Some(match union {
            Some(acc) => acc.union(rect),
            None => rect,
        });
    });
    union
}

fn visit(element: &Element, parent: Affine, sink: &mut impl FnMut(Rect)) {
    for child in element.child_elements() {
        // Definitions are only drawn through references.
        if matches!(child.name.as_str(), "defs" | "clipPath" | "mask" | "symbol") {
            continue;
        }
        let transform = match child.attr("transform").and_then(parse_transform) {
            Some(local) => parent * local,
            None => parent,
        };
        if let Some(rect) = element_bounds(child) {
            let rect = transform.transform_rect_bbox(rect);
            if has_extent(rect) {
                sink(rect);
            }
        }
        if child.kind() != Some(PrimitiveKind::Text) {
            visit(child, transform, sink);
        }
    }
}

fn has_extent(rect: Rect) -> bool {
    rect.is_finite() && (rect.width() > 0.0 || rect.height() > 0.0)
}

/// Local-space bounding box of a single primitive.
pub fn element_bounds(element: &Element) -> Option<Rect> {
    let num = |name: &str| element.attr_f64(name).unwrap_or(0.0);

    match element.kind()? {
        PrimitiveKind::Line => Some(Rect::from_points(
            Point::new(num("x1"), num("y1")),
            Point::new(num("x2"), num("y2")),
        )),
        PrimitiveKind::Circle => {
            let r = num("r").abs();
            Some(Rect::from_center_size(
                Point::new(num("cx"), num("cy")),
                (2.0 * r, 2.0 * r),
            ))
        }
        PrimitiveKind::Ellipse => Some(Rect::from_center_size(
            Point::new(num("cx"), num("cy")),
            (2.0 * num("rx").abs(), 2.0 * num("ry").abs()),
        )),
        PrimitiveKind::Path => {
            let path = BezPath::from_svg(element.attr("d")?).ok()?;
            (!path.elements().is_empty()).then(|| path.bounding_box())
        }
        PrimitiveKind::Polygon | PrimitiveKind::Polyline => {
            let points = parse_numbers(element.attr("points")?);
            let mut pairs = points.chunks_exact(2).map(|pair| Point::new(pair[0], pair[1]));
            let first = pairs.next()?;
            Some(pairs.fold(Rect::from_points(first, first), |acc, p| {
                acc.union_pt(p)
            }))
        }
        PrimitiveKind::Text => text_bounds(element),
    }
}

fn text_bounds(element: &Element) -> Option<Rect> {
    let glyphs = element.text_content().trim().chars().count();
    if glyphs == 0 {
        return None;
    }
    let font_size = element
        .property("font-size")
        .and_then(|size| size.trim().trim_end_matches("px").parse::<f64>().ok())
        .unwrap_or(DEFAULT_FONT_SIZE);
    let x = first_number(element.attr("x")).unwrap_or(0.0);
    let y = first_number(element.attr("y")).unwrap_or(0.0);
    let width = glyphs as f64 * font_size * GLYPH_ADVANCE;

    let x0 = match element.property("text-anchor") {
        Some("middle") => x - width / 2.0,
        Some("end") => x - width,
        _ => x,
    };
    let y0 = y - font_size * GLYPH_ASCENT;
    Some(Rect::new(x0, y0, x0 + width, y0 + font_size))
}

fn first_number(value: Option<&str>) -> Option<f64> {
    parse_numbers(value?).first().copied()
}

fn parse_numbers(list: &str) -> Vec<f64> {
    list.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|part| !part.is_empty())
        .filter_map(|part| part.parse().ok())
        .collect()
}

/// Parses an SVG `transform` list into a single affine.
pub fn parse_transform(list: &str) -> Option<Affine> {
    let mut result = Affine::IDENTITY;
    let mut rest = list.trim();

    while !rest.is_empty() {
        let open = rest.find('(')?;
        let close = open + rest[open..].find(')')?;
        let name = rest[..open].trim().trim_start_matches(',').trim();
        let args = parse_numbers(&rest[open + 1..close]);

        let step = match (name, args.as_slice()) {
            ("matrix", [a, b, c, d, e, f]) => Affine::new([*a, *b, *c, *d, *e, *f]),
            ("translate", [tx]) => Affine::translate(Vec2::new(*tx, 0.0)),
            ("translate", [tx, ty]) => Affine::translate(Vec2::new(*tx, *ty)),
            ("scale", [s]) => Affine::scale(*s),
            ("scale", [sx, sy]) => Affine::scale_non_uniform(*sx, *sy),
            ("rotate", [deg]) => Affine::rotate(deg.to_radians()),
            ("rotate", [deg, cx, cy]) => {
                Affine::rotate_about(deg.to_radians(), Point::new(*cx, *cy))
            }
            ("skewX", [deg]) => Affine::skew(deg.to_radians().tan(), 0.0),
            ("skewY", [deg]) => Affine::skew(0.0, deg.to_radians().tan()),
            _ => return None,
        };
        result *= step;
        rest = rest[close + 1..].trim_start();
    }

    Some(result)
}
