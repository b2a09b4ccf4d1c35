//! Input ingesters: decode an asset into an RGBA raster ready for output.
//!
//! An [`Input`] reads its asset once when it is built and can then be
//! ingested any number of times, once per output size:
//!
//! - raster inputs (`png`, `jpg`, `jpeg`) decode at native resolution and
//!   recolor near-black pixels when a color is requested
//! - vector inputs (`svg`) rasterize at the requested size and replace the
//!   color of every pixel when a color is requested

pub mod raster;
pub mod svg;

pub use raster::substitute_color;
pub use svg::SvgRasterizer;

use std::fs;
use std::path::PathBuf;

use image::RgbaImage;
use serde::Deserialize;

use crate::color::Color;
use crate::error::{Error, io_error};
use crate::registry::{Fragment, Registry, decode};
use crate::source::Asset;

/// Whether an input is stored as pixels or as a vector drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Raster,
    Vector,
}

/// What the output stage asks of an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestRequest {
    /// Color to apply, if any.
    pub color: Option<Color>,
    /// Side of the square to rasterize at. Only vector inputs use it.
    pub size: Option<u32>,
}

/// An asset loaded into memory.
#[derive(Debug, Clone)]
pub struct Input {
    asset: Asset,
    kind: InputKind,
    bytes: Vec<u8>,
    rasterizer: SvgRasterizer,
}

#[derive(Debug, Deserialize)]
struct InputFields {
    path: PathBuf,
    format: String,
    source_root: PathBuf,
    #[serde(default)]
    dpi: Option<f32>,
    #[serde(default)]
    scale: Option<f32>,
    #[serde(default)]
    background: Option<Color>,
    #[serde(default, rename = "unsafe")]
    allow_external: bool,
}

impl Input {
    /// Builds an input of the given kind, reading the asset from disk.
    pub fn from_fragment(fragment: Fragment, kind: InputKind) -> Result<Self, Error> {
        let fields: InputFields = decode("input", fragment)?;
        let bytes = fs::read(&fields.path).map_err(|err| io_error(&fields.path, err))?;

        let defaults = SvgRasterizer::default();
        let rasterizer = SvgRasterizer {
            dpi: fields.dpi.unwrap_or(defaults.dpi),
            scale: fields.scale.unwrap_or(defaults.scale),
            background: fields.background,
            resources_dir: fields
                .allow_external
                .then(|| fields.path.parent().map(PathBuf::from))
                .flatten(),
        };

        Ok(Self {
            asset: Asset::new(fields.path, fields.format, fields.source_root),
            kind,
            bytes,
            rasterizer,
        })
    }

    /// Builds an input from bytes already in memory.
    pub fn from_bytes(asset: Asset, kind: InputKind, bytes: Vec<u8>) -> Self {
        Self {
            asset,
            kind,
            bytes,
            rasterizer: SvgRasterizer::default(),
        }
    }

    pub fn asset(&self) -> &Asset {
        &self.asset
    }

    pub fn kind(&self) -> InputKind {
        self.kind
    }

    pub fn is_vector(&self) -> bool {
        self.kind == InputKind::Vector
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn rasterizer(&self) -> &SvgRasterizer {
        &self.rasterizer
    }

    /// Decodes the input for one output size.
    pub fn ingest(&self, request: IngestRequest) -> Result<RgbaImage, Error> {
        match self.kind {
            InputKind::Raster => raster::ingest(&self.asset.path, &self.bytes, request.color),
            InputKind::Vector => {
                let size = request.size.ok_or_else(|| {
                    Error::validation(format!(
                        "vector input {} needs an explicit size",
                        self.asset.path.display()
                    ))
                })?;
                self.rasterizer
                    .render(&self.asset.path, &self.bytes, size, request.color)
            }
        }
    }
}

/// Creates the input registry, dispatching on the asset `format`.
pub fn registry() -> Registry<Input> {
    let mut registry = Registry::new("input");
    registry.register(["png", "jpg", "jpeg"], |fragment| {
        Input::from_fragment(fragment, InputKind::Raster)
    });
    registry.register(["svg"], |fragment| Input::from_fragment(fragment, InputKind::Vector));
    registry
}
