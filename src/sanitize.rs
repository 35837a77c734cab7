//! Removes annotation text the depiction library adds but the viewer does not
//! want shown (stereo descriptors, highlight labels, long captions).

use crate::color::HueRange;
use crate::scene::{PrimitiveKind, Scene};
use regex::Regex;
use std::collections::HashSet;

/// Decides whether a text label survives sanitization.
pub trait LabelClassifier {
    fn keep(&self, label: &str) -> bool;
}

impl<F> LabelClassifier for F
where
    F: Fn(&str) -> bool,
{
    fn keep(&self, label: &str) -> bool {
        self(label)
    }
}

const STEREO_DESCRIPTORS: [&str; 10] = ["R", "S", "E", "Z", "abs", "rac", "and", "or", "AND", "OR"];

const FRAGMENT_TOKENS: [&str; 12] = [
    "NH", "NH2", "NH3+", "OH", "CH3", "COOH", "COO-", "CF3", "NO2", "SO3H", "OMe", "OAc",
];

/// Drops stereo descriptors, then any label longer than `max_len` unless it
/// looks like an atom label (element symbols with counts and a charge) or a
/// known fragment token.
#[derive(Debug, Clone)]
pub struct AllowListClassifier {
    descriptors: HashSet<String>,
    fragments: HashSet<String>,
    atom_label: Regex,
    max_len: usize,
}

impl Default for AllowListClassifier {
    fn default() -> Self {
        Self {
            descriptors: STEREO_DESCRIPTORS.iter().map(|s| s.to_string()).collect(),
            fragments: FRAGMENT_TOKENS.iter().map(|s| s.to_string()).collect(),
            atom_label: Regex::new(r"^(?:(?:[A-Z][a-z]?|\d+)+[+\-]?|\d*[+\-]+)$")
                .expect("static regex"),
            max_len: 3,
        }
    }
}

impl AllowListClassifier {
    /// Adds extra fragment tokens that may exceed the length limit.
    pub fn with_fragments<I, S>(mut self, fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fragments.extend(fragments.into_iter().map(Into::into));
        self
    }
}

impl LabelClassifier for AllowListClassifier {
    fn keep(&self, label: &str) -> bool {
        let label = label.trim();
        if self.descriptors.contains(label) {
            return false;
        }
        if label.chars().count() <= self.max_len {
            return true;
        }
        self.fragments.contains(label) || self.atom_label.is_match(label)
    }
}

/// Counts of removed labels, by reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SanitizeReport {
    pub highlighted: usize,
    pub rejected: usize,
}

impl SanitizeReport {
    pub fn total(&self) -> usize {
        self.highlighted + self.rejected
    }
}

/// Strips unwanted text primitives from `scene`.
pub fn sanitize(
    scene: &mut Scene,
    classifier: &dyn LabelClassifier,
    stereo_highlight: &HueRange,
) -> SanitizeReport {
    let mut report = SanitizeReport::default();
    scene.retain(&mut |element| {
        if element.kind() != Some(PrimitiveKind::Text) {
            return true;
        }
        let highlighted = ["fill", "stroke"].iter().any(|prop| {
            element
                .property(prop)
                .is_some_and(|paint| stereo_highlight.contains_paint(paint))
        });
        if highlighted {
            report.highlighted += 1;
            return false;
        }
        if !classifier.keep(&element.text_content()) {
            report.rejected += 1;
            return false;
        }
        true
    });
    report
}
