//! SVG rasterization using resvg/usvg.

use std::path::{Path, PathBuf};

use image::RgbaImage;
use resvg::tiny_skia::{Color as SkiaColor, Pixmap, Transform};
use resvg::usvg::{ImageHrefResolver, Options, Tree};

use crate::color::Color;
use crate::error::Error;

// ============================================================================
// SvgRasterizer
// ============================================================================

/// Settings used to turn SVG documents into pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct SvgRasterizer {
    /// Resolution used for physical units (`mm`, `pt`, ...).
    pub dpi: f32,

    /// Multiplier applied to the requested canvas size.
    pub scale: f32,

    /// Fill drawn under the document, transparent when `None`.
    pub background: Option<Color>,

    /// Directory external references resolve against.
    ///
    /// `None` keeps parsing self-contained: `<image>` elements referring to
    /// files are dropped and only embedded `data:` images are decoded.
    pub resources_dir: Option<PathBuf>,
}

impl Default for SvgRasterizer {
    fn default() -> Self {
        Self {
            dpi: 96.0,
            scale: 1.0,
            background: None,
            resources_dir: None,
        }
    }
}

impl SvgRasterizer {
    /// Renders an SVG document into a `size x size` RGBA image.
    ///
    /// The drawing is scaled to fit and centered. When `color` is set, every
    /// pixel's RGB channels are replaced with it while alpha is kept, which
    /// recolors single-color glyphs without touching their anti-aliasing.
    pub fn render(
        &self,
        path: &Path,
        svg_data: &[u8],
        size: u32,
        color: Option<Color>,
    ) -> Result<RgbaImage, Error> {
        let side = (size as f32 * self.scale).round() as u32;
        if side == 0 {
            return Err(Error::geometry(format!(
                "cannot rasterize {} at {size} px",
                path.display()
            )));
        }

        let opts = Options {
            dpi: self.dpi,
            resources_dir: self.resources_dir.clone(),
            image_href_resolver: self.href_resolver(),
            ..Options::default()
        };
        let tree = Tree::from_data(svg_data, &opts).map_err(|source| Error::Svg {
            path: path.to_path_buf(),
            source,
        })?;

        // Scale to fit within side x side, centered
        let svg_size = tree.size();
        let scale = side as f32 / svg_size.width().max(svg_size.height());
        let dx = (side as f32 - svg_size.width() * scale) / 2.0;
        let dy = (side as f32 - svg_size.height() * scale) / 2.0;

        let mut pixmap = Pixmap::new(side, side)
            .ok_or_else(|| Error::geometry(format!("cannot allocate a {side} px canvas")))?;
        if let Some(background) = self.background {
            let [r, g, b, a] = background.0.0;
            pixmap.fill(SkiaColor::from_rgba8(r, g, b, a));
        }

        let transform = Transform::from_scale(scale, scale).post_translate(dx, dy);
        resvg::render(&tree, transform, &mut pixmap.as_mut());

        let mut img = to_rgba_image(&pixmap);
        if let Some(color) = color {
            replace_rgb(&mut img, color);
        }
        Ok(img)
    }

    /// Keeps `data:` images and follows file references only when a
    /// resources directory is set.
    fn href_resolver(&self) -> ImageHrefResolver<'static> {
        if self.resources_dir.is_some() {
            return ImageHrefResolver::default();
        }
        ImageHrefResolver {
            resolve_data: ImageHrefResolver::default_data_resolver(),
            resolve_string: Box::new(|_, _| None),
        }
    }
}

/// Sets the RGB channels of every pixel to `color`, keeping alpha.
pub fn replace_rgb(img: &mut RgbaImage, color: Color) {
    let [r, g, b] = color.channels();
    for pixel in img.pixels_mut() {
        pixel.0 = [r, g, b, pixel.0[3]];
    }
}

/// Copies a premultiplied pixmap into a straight-alpha image.
fn to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let mut img = RgbaImage::new(pixmap.width(), pixmap.height());
    for (out, pixel) in img.pixels_mut().zip(pixmap.pixels()) {
        let color = pixel.demultiply();
        out.0 = [color.red(), color.green(), color.blue(), color.alpha()];
    }
    img
}

// ============================================================================
// Tests
// ============================================================================
