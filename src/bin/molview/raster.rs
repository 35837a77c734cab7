//! Rasterizes the framed scene into an egui texture.

use eframe::egui::{self, ColorImage, TextureHandle, TextureOptions};
use resvg::{tiny_skia, usvg};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RasterError {
    #[error("failed to parse scene SVG: {0}")]
    Parse(#[from] usvg::Error),
    #[error("failed to allocate {width}x{height} pixmap")]
    Pixmap { width: u32, height: u32 },
}

/// Texture for one SVG string at one pixel size.
pub struct CanvasTexture {
    svg: String,
    pixels: [usize; 2],
    handle: TextureHandle,
}

impl CanvasTexture {
    pub fn is_current(&self, svg: &str, pixels: [usize; 2]) -> bool {
        self.pixels == pixels && self.svg == svg
    }

    pub fn id(&self) -> egui::TextureId {
        self.handle.id()
    }

    pub fn create(
        ctx: &egui::Context,
        svg: String,
        pixels: [usize; 2],
        options: &usvg::Options<'_>,
    ) -> Result<Self, RasterError> {
        let image = rasterize(&svg, pixels, options)?;
        let handle = ctx.load_texture("molecule", image, TextureOptions::LINEAR);
        Ok(Self {
            svg,
            pixels,
            handle,
        })
    }
}

/// Renders `svg` scaled to fit `pixels`, keeping its aspect ratio.
pub fn rasterize(
    svg: &str,
    pixels: [usize; 2],
    options: &usvg::Options<'_>,
) -> Result<ColorImage, RasterError> {
    let (width, height) = (pixels[0] as u32, pixels[1] as u32);
    let mut pixmap =
        tiny_skia::Pixmap::new(width, height).ok_or(RasterError::Pixmap { width, height })?;
    let tree = usvg::Tree::from_str(svg, options)?;

    let size = tree.size();
    let scale = (width as f32 / size.width()).min(height as f32 / size.height());
    resvg::render(
        &tree,
        tiny_skia::Transform::from_scale(scale, scale),
        &mut pixmap.as_mut(),
    );

    Ok(ColorImage::from_rgba_premultiplied(pixels, pixmap.data()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rasterizes_line_at_requested_size() {
        let svg = r##"<svg xmlns="http://www.w3.org/2000/svg" width="40" height="20" viewBox="0 0 40 20">
                        <line x1="0" y1="10" x2="40" y2="10" stroke="#000000" stroke-width="4"/>
                      </svg>"##;
        let image = rasterize(svg, [80, 40], &usvg::Options::default()).unwrap();
        assert_eq!(image.size, [80, 40]);
        // middle row is inked, top row is transparent
        assert!(image.pixels[20 * 80 + 40].a() > 0);
        assert_eq!(image.pixels[40].a(), 0);
    }

    #[test]
    fn zero_size_is_an_error() {
        let svg = r#"<svg xmlns="http://www.w3.org/2000/svg" width="10" height="10"/>"#;
        assert!(matches!(
            rasterize(svg, [0, 10], &usvg::Options::default()),
            Err(RasterError::Pixmap { .. })
        ));
    }
}
