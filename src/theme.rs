//! Light/dark recoloring of a rendered scene.

use crate::color::{HueRange, Rgb};
use crate::config::ViewerConfig;
use crate::scene::Scene;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Foreground ink used for neutral (black) strokes and fills.
    pub fn ink(self) -> Rgb {
        match self {
            Theme::Light => Rgb::BLACK,
            Theme::Dark => Rgb::new(0xe8, 0xe8, 0xe8),
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn is_dark(self) -> bool {
        self == Theme::Dark
    }
}

/// Paint as first seen on one element.
#[derive(Debug, Clone, Default, PartialEq)]
struct RecordedPaint {
    stroke: Option<String>,
    fill: Option<String>,
    stroke_width: Option<f64>,
}

/// Remembers each element's original paint so theme flips are reversible.
///
/// One adapter belongs to one render pass; a fresh scene needs a fresh
/// adapter.
#[derive(Debug, Clone)]
pub struct ThemeAdapter {
    recorded: Option<Vec<Option<RecordedPaint>>>,
    stereo_highlight: HueRange,
    dark_stroke_multiplier: f64,
}

impl ThemeAdapter {
    pub fn new(config: &ViewerConfig) -> Self {
        Self {
            recorded: None,
            stereo_highlight: config.stereo_highlight,
            dark_stroke_multiplier: config.dark_stroke_multiplier,
        }
    }

    pub fn has_recorded(&self) -> bool {
        self.recorded.is_some()
    }

    /// Repaints `scene` for `theme`, recording originals on the first call.
    pub fn apply(&mut self, scene: &mut Scene, theme: Theme) {
        if self.recorded.is_none() {
            self.recorded = Some(self.record(scene));
        }
        let Some(recorded) = &self.recorded else {
            return;
        };

        let ink = theme.ink().to_hex();
        let multiplier = self.dark_stroke_multiplier;
        let mut index = 0;
        scene.walk_mut(&mut |element| {
            let slot = recorded.get(index);
            index += 1;
            let Some(Some(paint)) = slot else {
                return;
            };

            for (name, original) in [("stroke", &paint.stroke), ("fill", &paint.fill)] {
                if let Some(original) = original {
                    let value = if Rgb::parse(original) == Some(Rgb::BLACK) {
                        ink.clone()
                    } else {
                        original.clone()
                    };
                    element.set_property(name, value);
                }
            }

            if let Some(width) = paint.stroke_width {
                let width = if theme.is_dark() { width * multiplier } else { width };
                element.set_property("stroke-width", width.to_string());
            }
        });
    }

    fn record(&self, scene: &mut Scene) -> Vec<Option<RecordedPaint>> {
        let stereo = self.stereo_highlight;
        let mut recorded = Vec::new();
        scene.walk_mut(&mut |element| {
            let mut paint = RecordedPaint::default();
            for name in ["stroke", "fill"] {
                let Some(value) = element.property(name).map(str::to_owned) else {
                    continue;
                };
                let value = if stereo.contains_paint(&value) {
                    // Highlight colors become plain ink once, for good.
                    element.set_property(name, Rgb::BLACK.to_hex());
                    Rgb::BLACK.to_hex()
                } else {
                    value
                };
                match name {
                    "stroke" => paint.stroke = Some(value),
                    _ => paint.fill = Some(value),
                }
            }
            paint.stroke_width = element
                .property("stroke-width")
                .and_then(|w| w.trim().trim_end_matches("px").parse().ok());

            recorded.push((paint != RecordedPaint::default()).then_some(paint));
        });
        recorded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Element;

    fn scene() -> Scene {
        Scene::parse(
            r##"<svg xmlns="http://www.w3.org/2000/svg">
                 <g stroke="#000000" stroke-width="2">
                   <line x1="0" y1="0" x2="1" y2="1"/>
                   <line x1="0" y1="0" x2="1" y2="1" stroke="#ff0000"/>
                 </g>
                 <text x="0" y="0" fill="#c000ff">O</text>
                 <circle cx="0" cy="0" r="1" style="fill:rgb(0,0,0)"/>
               </svg>"##,
        )
        .unwrap()
    }

    fn elements(scene: &Scene) -> Vec<Element> {
        let mut out = Vec::new();
        scene.walk(&mut |element| out.push(element.clone()));
        out
    }

    #[test]
    fn dark_theme_inks_neutral_paint_and_thickens_strokes() {
        let mut scene = scene();
        let mut adapter = ThemeAdapter::new(&ViewerConfig::default());
        adapter.apply(&mut scene, Theme::Dark);

        let els = elements(&scene);
        assert_eq!(els[0].property("stroke"), Some("#e8e8e8"));
        assert_eq!(els[0].property("stroke-width"), Some("2.5"));
        assert_eq!(els[2].property("stroke"), Some("#ff0000"));
        // highlighted text was normalized to black, so it follows the ink
        assert_eq!(els[3].property("fill"), Some("#e8e8e8"));
        assert_eq!(els[4].property("fill"), Some("#e8e8e8"));
    }

    #[test]
    fn flipping_back_restores_originals() {
        let mut scene = scene();
        let mut adapter = ThemeAdapter::new(&ViewerConfig::default());
        adapter.apply(&mut scene, Theme::Dark);
        adapter.apply(&mut scene, Theme::Light);
        adapter.apply(&mut scene, Theme::Dark);
        adapter.apply(&mut scene, Theme::Light);

        let els = elements(&scene);
        assert_eq!(els[0].property("stroke"), Some("#000000"));
        assert_eq!(els[0].property("stroke-width"), Some("2"));
        assert_eq!(els[2].property("stroke"), Some("#ff0000"));
        assert_eq!(els[3].property("fill"), Some("#000000"));
        assert_eq!(els[1].attr("stroke"), None);
    }

    #[test]
    fn theme_toggle() {
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert!(Theme::default().toggled().is_dark());
    }
}
