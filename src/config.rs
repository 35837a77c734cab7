//! Tunable viewer constants, loadable from a RON file.

use crate::clamp::ClampLimits;
use crate::color::HueRange;
use crate::geometry::CanvasSize;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when loading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: ron::de::SpannedError,
    },
    #[error("invalid zoom range in '{path}': min_zoom {min_zoom}, max_zoom {max_zoom}")]
    ZoomRange {
        path: PathBuf,
        min_zoom: f64,
        max_zoom: f64,
    },
}

/// Every constant the viewport engine uses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Narrowest allowed width, as a fraction of the initial width.
    pub min_zoom: f64,
    /// Widest allowed width, as a multiple of the initial width.
    pub max_zoom: f64,
    /// Base of the exponential wheel zoom.
    pub wheel_sensitivity: f64,
    /// Scene units per wheel unit when panning with the modifier held.
    pub wheel_pan_sensitivity: f64,
    /// Fraction of the content that must stay on-screen on every edge.
    pub min_content_visible: f64,
    /// Horizontal pan limit (fraction of initial width) when content bounds are unknown.
    pub fallback_pan_x: f64,
    /// Vertical pan limit (fraction of initial height) when content bounds are unknown.
    pub fallback_pan_y: f64,
    /// Initial framing zoom; values above 1 zoom in.
    pub initial_frame_scale: f64,
    /// Initial framing vertical shift, in scene units.
    pub initial_vertical_offset: f64,
    /// Delay between inserting a scene and measuring its content bounds.
    pub settle_delay_ms: u64,
    pub min_canvas: CanvasSize,
    /// Used while the host cannot be measured yet.
    pub default_canvas: CanvasSize,
    /// Margin the depiction is auto-cropped to, in pixels.
    pub crop_margin: f64,
    pub bounds_margin_fraction: f64,
    pub bounds_margin_min: f64,
    /// Stroke width multiplier applied in dark mode.
    pub dark_stroke_multiplier: f64,
    pub stereo_highlight: HueRange,
    /// Window in which identical consecutive telemetry signals are merged.
    pub telemetry_dedup_ms: u64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            min_zoom: 0.1,
            max_zoom: 4.0,
            wheel_sensitivity: 0.001,
            wheel_pan_sensitivity: 1.0,
            min_content_visible: 0.1,
            fallback_pan_x: 0.37,
            fallback_pan_y: 0.25,
            initial_frame_scale: 1.15,
            initial_vertical_offset: 10.0,
            settle_delay_ms: 50,
            min_canvas: CanvasSize::new(300.0, 300.0),
            default_canvas: CanvasSize::new(400.0, 300.0),
            crop_margin: 20.0,
            bounds_margin_fraction: 0.05,
            bounds_margin_min: 5.0,
            dark_stroke_multiplier: 1.25,
            stereo_highlight: HueRange::default(),
            telemetry_dedup_ms: 1000,
        }
    }
}

impl ViewerConfig {
    /// Loads a config file. Missing fields take their default values.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = ron::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if !config.has_valid_zoom_range() {
            return Err(ConfigError::ZoomRange {
                path: path.to_path_buf(),
                min_zoom: config.min_zoom,
                max_zoom: config.max_zoom,
            });
        }
        Ok(config)
    }

    /// Both zoom limits are finite and positive, and `min_zoom <= max_zoom`.
    pub fn has_valid_zoom_range(&self) -> bool {
        let positive = |z: f64| z.is_finite() && z > 0.0;
        positive(self.min_zoom) && positive(self.max_zoom) && self.min_zoom <= self.max_zoom
    }

    /// Loads `path`, or the per-user default location when `None`.
    ///
    /// A missing file yields the defaults; a broken one is logged and
    /// also yields the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path.map(Path::to_path_buf).or_else(Self::default_path) else {
            return Self::default();
        };

        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::load(&path) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(err) => {
                log::error!("{err}; using defaults");
                Self::default()
            }
        }
    }

    /// `<config dir>/molview/config.ron`
    pub fn default_path() -> Option<PathBuf> {
        Some(dirs::config_dir()?.join("molview").join("config.ron"))
    }

    pub fn clamp_limits(&self) -> ClampLimits {
        ClampLimits {
            min_zoom: self.min_zoom,
            max_zoom: self.max_zoom,
            min_content_visible: self.min_content_visible,
            fallback_pan_x: self.fallback_pan_x,
            fallback_pan_y: self.fallback_pan_y,
        }
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn telemetry_window(&self) -> Duration {
        Duration::from_millis(self.telemetry_dedup_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: ViewerConfig = ron::from_str("(max_zoom: 8.0, settle_delay_ms: 10)").unwrap();
        assert_eq!(config.max_zoom, 8.0);
        assert_eq!(config.settle_delay(), Duration::from_millis(10));
        assert_eq!(config.min_zoom, ViewerConfig::default().min_zoom);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ViewerConfig::load_or_default(Some(&dir.path().join("absent.ron")));
        assert_eq!(config, ViewerConfig::default());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ron");
        std::fs::write(&path, "(max_zoom: \"wide\")").unwrap();
        assert!(matches!(
            ViewerConfig::load(&path),
            Err(ConfigError::Parse { .. })
        ));
        assert_eq!(ViewerConfig::load_or_default(Some(&path)), ViewerConfig::default());
    }

    #[test]
    fn inverted_or_non_positive_zoom_range_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ron");
        for body in ["(min_zoom: 5.0, max_zoom: 4.0)", "(min_zoom: 0.0)", "(max_zoom: -1.0)"] {
            std::fs::write(&path, body).unwrap();
            assert!(
                matches!(ViewerConfig::load(&path), Err(ConfigError::ZoomRange { .. })),
                "{body} should be rejected"
            );
            assert_eq!(ViewerConfig::load_or_default(Some(&path)), ViewerConfig::default());
        }
        assert!(ViewerConfig::default().has_valid_zoom_range());
    }
}
