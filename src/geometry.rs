//! Pixel geometry shared by the ingest and output stages.

/// A 2D size in pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SizePx {
    pub width: u32,
    pub height: u32,
}

impl SizePx {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn square(side: u32) -> Self {
        Self::new(side, side)
    }

    /// Returns true if width equals height.
    pub fn is_square(&self) -> bool {
        self.width == self.height
    }

    /// Returns true if either dimension exceeds the matching one in `other`.
    pub fn exceeds(&self, other: SizePx) -> bool {
        self.width > other.width || self.height > other.height
    }

    /// Scales the longer side to `longest`, keeping the aspect ratio.
    ///
    /// The shorter side is rounded half to even.
    pub fn fit_longest_side(&self, longest: u32) -> SizePx {
        if self.is_square() {
            return SizePx::square(longest);
        }

        let ratio = |short: u32, long: u32| {
            (f64::from(short) * (f64::from(longest) / f64::from(long))).round_ties_even() as u32
        };

        if self.width > self.height {
            SizePx::new(longest, ratio(self.height, self.width))
        } else {
            SizePx::new(ratio(self.width, self.height), longest)
        }
    }

    /// Top-left offset that centers `self` inside `outer`.
    ///
    /// Offsets are floor-divided and may be negative when `self` is larger.
    pub fn centered_in(&self, outer: SizePx) -> (i32, i32) {
        let offset = |outer: u32, inner: u32| (i64::from(outer) - i64::from(inner)).div_euclid(2) as i32;
        (
            offset(outer.width, self.width),
            offset(outer.height, self.height),
        )
    }
}

/// The outer canvas size and inner content size for one output image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizePair {
    /// Side of the final square canvas.
    pub target: u32,
    /// Side of the content before the margin is added. Zero when the
    /// margin swallows the whole canvas.
    pub core: u32,
}

impl SizePair {
    pub fn new(target: u32, core: u32) -> Self {
        Self { target, core }
    }
}
