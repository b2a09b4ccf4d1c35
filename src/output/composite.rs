//! Canvas allocation and alpha compositing.

use image::{Rgba, RgbaImage, imageops};

use crate::color::Color;
use crate::geometry::SizePx;

/// Fill of the square canvas an output image is placed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Background {
    #[default]
    Transparent,
    Solid(Color),
}

impl Background {
    /// Parses `transparent` or any color form accepted by [`Color`].
    pub fn parse(raw: &str) -> Result<Self, crate::Error> {
        if raw.trim().eq_ignore_ascii_case("transparent") {
            Ok(Self::Transparent)
        } else {
            raw.parse().map(Self::Solid)
        }
    }

    pub fn fill(&self) -> Rgba<u8> {
        match self {
            Self::Transparent => Color::TRANSPARENT.0,
            Self::Solid(color) => color.0,
        }
    }

    /// Allocates a `side x side` canvas filled with this background.
    pub fn canvas(&self, side: u32) -> RgbaImage {
        RgbaImage::from_pixel(side, side, self.fill())
    }
}

/// Places `core` at the center of a `target x target` canvas.
///
/// Core pixels are blended source-over onto the background, so a
/// translucent core lets a solid background show through.
pub fn compose(core: &RgbaImage, target: u32, background: Background) -> RgbaImage {
    let mut canvas = background.canvas(target);
    let (x, y) = SizePx::new(core.width(), core.height()).centered_in(SizePx::square(target));
    imageops::overlay(&mut canvas, core, i64::from(x), i64::from(y));
    canvas
}
