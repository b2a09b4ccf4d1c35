//! Raster passthrough with near-black recoloring.

use std::path::Path;

use image::RgbaImage;

use crate::color::Color;
use crate::error::Error;

/// Per-channel distance from the reference color still treated as a match.
pub const COLOR_TOLERANCE: u8 = 10;

/// Decodes raster bytes to RGBA and recolors the near-black glyph.
///
/// Rasters are decoded at native resolution; resizing happens later.
pub fn ingest(path: &Path, bytes: &[u8], color: Option<Color>) -> Result<RgbaImage, Error> {
    let mut img = image::load_from_memory(bytes)
        .map_err(|source| Error::Image {
            path: path.to_path_buf(),
            source,
        })?
        .into_rgba8();

    if let Some(color) = color {
        substitute_color(&mut img, Color::BLACK, color, COLOR_TOLERANCE);
    }

    Ok(img)
}

/// Replaces pixels close to `from` with `to`, keeping their offset.
///
/// A pixel matches when each of its RGB channels is within `tolerance` of
/// `from`. Its channels become `to` plus the same per-channel delta, so the
/// anti-aliased fringe of a glyph keeps its gradient. Alpha is untouched.
pub fn substitute_color(img: &mut RgbaImage, from: Color, to: Color, tolerance: u8) {
    let from = from.channels();
    let to = to.channels();
    let tolerance = i16::from(tolerance);

    for pixel in img.pixels_mut() {
        let [r, g, b, a] = pixel.0;
        let deltas = [
            i16::from(r) - i16::from(from[0]),
            i16::from(g) - i16::from(from[1]),
            i16::from(b) - i16::from(from[2]),
        ];
        if deltas.iter().any(|delta| delta.abs() > tolerance) {
            continue;
        }

        let shift = |channel: usize| (i16::from(to[channel]) + deltas[channel]).clamp(0, 255) as u8;
        pixel.0 = [shift(0), shift(1), shift(2), a];
    }
}
