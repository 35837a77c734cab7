//! Editable tree of vector primitives produced by the depiction step.
//!
//! Depiction output is parsed with `roxmltree` into an owned element tree so
//! labels can be dropped and paints rewritten, then serialized back to SVG
//! with whatever view box the viewport currently shows.

use crate::geometry::{CanvasSize, ViewBox};
use std::fmt::Write as _;
use thiserror::Error;

const SVG_NS: &str = "http://www.w3.org/2000/svg";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// Errors that can occur when reading depiction output.
#[derive(Error, Debug)]
pub enum SceneError {
    #[error("invalid SVG: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("root element is <{0}>, expected <svg>")]
    NotSvg(String),
}

/// Kinds of drawn primitive that carry geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Line,
    Circle,
    Ellipse,
    Path,
    Polygon,
    Polyline,
    Text,
}

impl PrimitiveKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        Some(match tag {
            "line" => Self::Line,
            "circle" => Self::Circle,
            "ellipse" => Self::Ellipse,
            "path" => Self::Path,
            "polygon" => Self::Polygon,
            "polyline" => Self::Polyline,
            "text" => Self::Text,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn kind(&self) -> Option<PrimitiveKind> {
        PrimitiveKind::from_tag(&self.name)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn attr_f64(&self, name: &str) -> Option<f64> {
        let value = self.attr(name)?.trim();
        let value = value.strip_suffix("px").unwrap_or(value);
        value.parse().ok().filter(|v: &f64| v.is_finite())
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(key, _)| key == name) {
            Some((_, slot)) => *slot = value,
            None => self.attrs.push((name.to_owned(), value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) {
        self.attrs.retain(|(key, _)| key != name);
    }

    /// Reads a presentation property, preferring an inline `style`
    /// declaration over the attribute of the same name.
    pub fn property(&self, name: &str) -> Option<&str> {
        self.style_property(name).or_else(|| self.attr(name))
    }

    /// Writes a presentation property as an attribute and drops any
    /// conflicting `style` declaration.
    pub fn set_property(&mut self, name: &str, value: impl Into<String>) {
        if self.style_property(name).is_some()
            && let Some(style) = self.attr("style")
        {
            let rest = style
                .split(';')
                .filter(|decl| {
                    decl.split_once(':')
                        .is_none_or(|(key, _)| key.trim() != name)
                })
                .filter(|decl| !decl.trim().is_empty())
                .collect::<Vec<_>>()
                .join(";");
            if rest.is_empty() {
                self.remove_attr("style");
            } else {
                self.set_attr("style", rest);
            }
        }
        self.set_attr(name, value);
    }

    fn style_property(&self, name: &str) -> Option<&str> {
        self.attr("style")?.split(';').find_map(|decl| {
            let (key, value) = decl.split_once(':')?;
            (key.trim() == name).then(|| value.trim())
        })
    }

    /// Concatenated character data of this element and its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        collect_text(self, &mut out);
        out
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }
}

fn collect_text(element: &Element, out: &mut String) {
    for child in &element.children {
        match child {
            Node::Text(text) => out.push_str(text),
            Node::Element(inner) => collect_text(inner, out),
        }
    }
}

/// A parsed depiction.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    root: Element,
}

impl Scene {
    /// An `<svg>` with nothing in it.
    pub fn empty() -> Self {
        Self {
            root: Element::new("svg"),
        }
    }

    pub fn parse(svg: &str) -> Result<Self, SceneError> {
        let doc = roxmltree::Document::parse(svg)?;
        let root = doc.root_element();
        if root.tag_name().name() != "svg" {
            return Err(SceneError::NotSvg(root.tag_name().name().to_owned()));
        }
        Ok(Self {
            root: convert(root),
        })
    }

    pub fn root(&self) -> &Element {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Element {
        &mut self.root
    }

    /// The depiction's own view box, falling back to `0 0 width height`.
    pub fn view_box(&self) -> Option<ViewBox> {
        if let Some(view_box) = self.root.attr("viewBox").and_then(ViewBox::parse) {
            return Some(view_box);
        }
        let width = self.root.attr_f64("width")?;
        let height = self.root.attr_f64("height")?;
        let view_box = ViewBox::new(0.0, 0.0, width, height);
        view_box.is_valid().then_some(view_box)
    }

    pub fn set_view_box(&mut self, view_box: ViewBox) {
        self.root.set_attr("viewBox", view_box.to_attr());
    }

    pub fn set_pixel_size(&mut self, size: CanvasSize) {
        self.root.set_attr("width", size.width.to_string());
        self.root.set_attr("height", size.height.to_string());
    }

    /// Number of geometry-carrying primitives.
    pub fn primitive_count(&self) -> usize {
        let mut count = 0;
        self.walk(&mut |element| {
            if element.kind().is_some() {
                count += 1;
            }
        });
        count
    }

    pub fn is_empty(&self) -> bool {
        self.primitive_count() == 0
    }

    /// Visits every element below the root in document order.
    pub fn walk(&self, visit: &mut impl FnMut(&Element)) {
        fn recurse(element: &Element, visit: &mut impl FnMut(&Element)) {
            for child in element.child_elements() {
                visit(child);
                recurse(child, visit);
            }
        }
        recurse(&self.root, visit);
    }

    /// Mutable counterpart of [`Scene::walk`]; the visit order is stable as
    /// long as the tree is not restructured.
    pub fn walk_mut(&mut self, visit: &mut impl FnMut(&mut Element)) {
        fn recurse(element: &mut Element, visit: &mut impl FnMut(&mut Element)) {
            for child in &mut element.children {
                if let Node::Element(child) = child {
                    visit(child);
                    recurse(child, visit);
                }
            }
        }
        recurse(&mut self.root, visit);
    }

    /// Removes every element (and its subtree) for which `keep` is false.
    /// Returns how many were removed.
    pub fn retain(&mut self, keep: &mut impl FnMut(&Element) -> bool) -> usize {
        fn recurse(element: &mut Element, keep: &mut impl FnMut(&Element) -> bool) -> usize {
            let before = element.children.len();
            element.children.retain(|child| match child {
                Node::Element(inner) => keep(inner),
                Node::Text(_) => true,
            });
            let mut removed = before - element.children.len();
            for child in &mut element.children {
                if let Node::Element(inner) = child {
                    removed += recurse(inner, keep);
                }
            }
            removed
        }
        recurse(&mut self.root, keep)
    }

    /// Serializes the scene as shown through `view_box` at `size` pixels.
    pub fn to_svg_with_view(&self, view_box: ViewBox, size: CanvasSize) -> String {
        let mut scene = self.clone();
        scene.set_view_box(view_box);
        scene.set_pixel_size(size);
        scene.to_svg()
    }

    pub fn to_svg(&self) -> String {
        let mut out = String::new();
        write_element(&self.root, true, &mut out);
        out
    }
}

fn convert(node: roxmltree::Node<'_, '_>) -> Element {
    let attrs = node
        .attributes()
        .map(|attr| {
            let name = match attr.namespace() {
                Some(XLINK_NS) => format!("xlink:{}", attr.name()),
                Some("http://www.w3.org/XML/1998/namespace") => format!("xml:{}", attr.name()),
                _ => attr.name().to_owned(),
            };
            (name, attr.value().to_owned())
        })
        .collect();

    let children = node
        .children()
        .filter_map(|child| {
            if child.is_element() {
                Some(Node::Element(convert(child)))
            } else if child.is_text() {
                child
                    .text()
                    .filter(|text| !text.trim().is_empty())
                    .map(|text| Node::Text(text.to_owned()))
            } else {
                None
            }
        })
        .collect();

    Element {
        name: node.tag_name().name().to_owned(),
        attrs,
        children,
    }
}

fn write_element(element: &Element, is_root: bool, out: &mut String) {
    out.push('<');
    out.push_str(&element.name);
    if is_root {
        let _ = write!(out, " xmlns=\"{SVG_NS}\" xmlns:xlink=\"{XLINK_NS}\"");
    }
    for (name, value) in &element.attrs {
        let _ = write!(out, " {name}=\"{}\"", escape(value));
    }
    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for child in &element.children {
        match child {
            Node::Element(inner) => write_element(inner, false, out),
            Node::Text(text) => out.push_str(&escape(text)),
        }
    }
    let _ = write!(out, "</{}>", element.name);
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
