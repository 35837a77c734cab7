//! SVG paint values as emitted by depiction libraries.

use serde::{Deserialize, Serialize};

/// An opaque sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb::new(0, 0, 0);
    pub const WHITE: Rgb = Rgb::new(255, 255, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rgb`, `#rrggbb`, `rgb(r, g, b)` and a few keywords.
    ///
    /// Returns `None` for non-color paints (`none`, `currentColor`, `url(...)`).
    pub fn parse(paint: &str) -> Option<Self> {
        let paint = paint.trim();

        if let Some(hex) = paint.strip_prefix('#') {
            return Self::parse_hex(hex);
        }

        if let Some(args) = paint
            .strip_prefix("rgb(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let mut channels = args.split(',').map(|channel| {
                let channel = channel.trim();
                match channel.strip_suffix('%') {
                    Some(percent) => percent
                        .trim()
                        .parse::<f64>()
                        .ok()
                        .map(|p| (p.clamp(0.0, 100.0) * 2.55).round() as u8),
                    None => channel
                        .parse::<f64>()
                        .ok()
                        .map(|v| v.clamp(0.0, 255.0).round() as u8),
                }
            });
            let color = Self::new(channels.next()??, channels.next()??, channels.next()??);
            return channels.next().is_none().then_some(color);
        }

        match paint.to_ascii_lowercase().as_str() {
            "black" => Some(Self::BLACK),
            "white" => Some(Self::WHITE),
            "red" => Some(Self::new(255, 0, 0)),
            "green" => Some(Self::new(0, 128, 0)),
            "blue" => Some(Self::new(0, 0, 255)),
            "gray" | "grey" => Some(Self::new(128, 128, 128)),
            "purple" => Some(Self::new(128, 0, 128)),
            "magenta" | "fuchsia" => Some(Self::new(255, 0, 255)),
            _ => None,
        }
    }

    fn parse_hex(hex: &str) -> Option<Self> {
        let digit = |i: usize| u8::from_str_radix(hex.get(i..i + 1)?, 16).ok();
        let pair = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        match hex.len() {
            3 => Some(Self::new(digit(0)? * 17, digit(1)? * 17, digit(2)? * 17)),
            6 => Some(Self::new(pair(0)?, pair(2)?, pair(4)?)),
            _ => None,
        }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }

    /// Hue in degrees `[0, 360)` and HSL saturation in `[0, 1]`.
    ///
    /// Achromatic colors have no hue.
    pub fn hue_saturation(self) -> Option<(f64, f64)> {
        let r = f64::from(self.r) / 255.0;
        let g = f64::from(self.g) / 255.0;
        let b = f64::from(self.b) / 255.0;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let chroma = max - min;
        if chroma <= f64::EPSILON {
            return None;
        }

        let hue = if max == r {
            60.0 * ((g - b) / chroma).rem_euclid(6.0)
        } else if max == g {
            60.0 * ((b - r) / chroma + 2.0)
        } else {
            60.0 * ((r - g) / chroma + 4.0)
        };

        let lightness = (max + min) / 2.0;
        let saturation = chroma / (1.0 - (2.0 * lightness - 1.0).abs());
        Some((hue, saturation.min(1.0)))
    }
}

/// A band of hues, used to recognise the depiction library's reserved
/// stereo-highlight color.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HueRange {
    /// Lower hue bound in degrees.
    pub start: f64,
    /// Upper hue bound in degrees. May be below `start` to wrap through red.
    pub end: f64,
    /// Colors less saturated than this never match.
    pub min_saturation: f64,
}

impl Default for HueRange {
    fn default() -> Self {
        Self {
            start: 270.0,
            end: 330.0,
            min_saturation: 0.35,
        }
    }
}

impl HueRange {
    pub fn contains(&self, color: Rgb) -> bool {
        let Some((hue, saturation)) = color.hue_saturation() else {
            return false;
        };
        if saturation < self.min_saturation {
            return false;
        }
        if self.start <= self.end {
            (self.start..=self.end).contains(&hue)
        } else {
            hue >= self.start || hue <= self.end
        }
    }

    /// Convenience for raw paint strings.
    pub fn contains_paint(&self, paint: &str) -> bool {
        Rgb::parse(paint).is_some_and(|color| self.contains(color))
    }
}
