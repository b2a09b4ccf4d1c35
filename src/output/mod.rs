//! Output generation: margins, aspect-preserving resize and compositing.
//!
//! An [`Output`] describes one family of generated images: a file format,
//! the list of target sizes, a margin, a background and naming rules. For
//! every target size it yields a [`SizePair`], and [`Output::generate`]
//! turns a decoded input into the final canvas and its destination path.

pub mod composite;
pub mod margin;

pub use composite::{Background, compose};
pub use margin::Margin;

use std::fs;
use std::path::PathBuf;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, RgbaImage};
use serde::Deserialize;
use serde_yaml::Value;

use crate::color::Color;
use crate::error::{Error, io_error};
use crate::geometry::{SizePair, SizePx};
use crate::input::Input;
use crate::registry::{Fragment, Registry, decode};
use crate::source::Asset;

/// Resampling filter for the core resize.
///
/// Triangle is the windowed filter in `image` closest to a Hamming window
/// in both cost and downscaling quality.
pub const RESIZE_FILTER: FilterType = FilterType::Triangle;

/// Which assets an output applies to, by file stem.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selectors {
    #[default]
    All,
    Stems(Vec<String>),
}

impl Selectors {
    pub fn matches(&self, stem: &str) -> bool {
        match self {
            Self::All => true,
            Self::Stems(stems) => stems.iter().any(|s| s == stem),
        }
    }
}

impl<'de> Deserialize<'de> for Selectors {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            One(String),
            Many(Vec<String>),
        }

        Ok(match Option::<Raw>::deserialize(deserializer)? {
            None => Self::All,
            Some(Raw::One(stem)) if stem == "*" => Self::All,
            Some(Raw::One(stem)) => Self::Stems(vec![stem]),
            Some(Raw::Many(stems)) if stems.is_empty() => Self::All,
            Some(Raw::Many(stems)) => Self::Stems(stems),
        })
    }
}

#[derive(Debug, Deserialize)]
struct OutputFields {
    format: String,
    sizes: Vec<u32>,
    #[serde(default)]
    margin: Value,
    #[serde(default)]
    background: Option<String>,
    #[serde(default)]
    color: Option<Color>,
    #[serde(default)]
    file_prefix: Option<String>,
    #[serde(default)]
    directory_override: Option<PathBuf>,
    #[serde(default)]
    selectors: Selectors,
    #[serde(default)]
    base_path: PathBuf,
}

/// One configured family of output images.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    /// File extension written, as configured (`png`, `jpg`, `jpeg`).
    pub format: String,
    pub image_format: ImageFormat,
    pub sizes: Vec<u32>,
    pub margin: Margin,
    pub background: Background,
    pub color: Option<Color>,
    pub file_prefix: Option<String>,
    pub directory_override: Option<PathBuf>,
    pub selectors: Selectors,
    /// Folder all destinations are placed under.
    pub base_path: PathBuf,
}

/// A composited image and where it belongs.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedArtifact {
    pub image: RgbaImage,
    pub destination: PathBuf,
}

impl GeneratedArtifact {
    /// Encodes the image to its destination, creating missing folders.
    pub fn write(&self, format: ImageFormat) -> Result<(), Error> {
        if let Some(parent) = self.destination.parent() {
            fs::create_dir_all(parent).map_err(|err| io_error(parent, err))?;
        }

        let image = DynamicImage::ImageRgba8(self.image.clone());
        // JPEG has no alpha channel.
        let image = match format {
            ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.into_rgb8()),
            _ => image,
        };

        image
            .save_with_format(&self.destination, format)
            .map_err(|source| Error::Image {
                path: self.destination.clone(),
                source,
            })
    }
}

impl Output {
    fn from_fragment(fragment: Fragment, image_format: ImageFormat) -> Result<Self, Error> {
        let fields: OutputFields = decode("output", fragment)?;
        let background = match fields.background.as_deref() {
            Some(raw) => Background::parse(raw)?,
            None => Background::Transparent,
        };

        Ok(Self {
            format: fields.format,
            image_format,
            sizes: fields.sizes,
            margin: Margin::from_value(&fields.margin)?,
            background,
            color: fields.color,
            file_prefix: fields.file_prefix.filter(|prefix| !prefix.is_empty()),
            directory_override: fields.directory_override,
            selectors: fields.selectors,
            base_path: fields.base_path,
        })
    }

    /// Whether this output applies to the asset with the given stem.
    pub fn selects(&self, stem: &str) -> bool {
        self.selectors.matches(stem)
    }

    /// Yields the target and core size for every configured size.
    pub fn generate_sizes(&self) -> impl Iterator<Item = SizePair> + '_ {
        self.sizes
            .iter()
            .map(|&target| SizePair::new(target, self.margin.core_size(target)))
    }

    /// Produces the composited image for one size pair.
    ///
    /// Fails with a recoverable geometry error when the core would be
    /// larger than the decoded image.
    pub fn generate(&self, img: &RgbaImage, input: &Input, sizes: SizePair) -> Result<GeneratedArtifact, Error> {
        let destination = self.destination(input.asset(), sizes.target);
        let core = fit_core(img, sizes.core)?;
        let image = compose(&core, sizes.target, self.background);
        Ok(GeneratedArtifact { image, destination })
    }

    /// Where the image for `asset` at `target` px is written.
    pub fn destination(&self, asset: &Asset, target: u32) -> PathBuf {
        let dir = match &self.directory_override {
            Some(dir) => dir.clone(),
            None => asset.relative_dir(),
        };

        let target = target.to_string();
        let mut parts = Vec::with_capacity(3);
        if let Some(prefix) = &self.file_prefix {
            parts.push(prefix.as_str());
        }
        parts.push(asset.stem());
        parts.push(&target);

        let file_name = format!("{}.{}", parts.join("-"), self.format);
        self.base_path.join(dir).join(file_name)
    }
}

/// Resizes `img` so its longer side is `core`, keeping the aspect ratio.
pub fn fit_core(img: &RgbaImage, core: u32) -> Result<RgbaImage, Error> {
    if core == 0 {
        return Err(Error::geometry("the core size must be at least 1 px"));
    }

    let original = SizePx::new(img.width(), img.height());
    let fitted = original.fit_longest_side(core);
    if fitted.exceeds(original) {
        return Err(Error::geometry(
            "The target size cannot be larger than the original image size",
        ));
    }
    if fitted == original {
        return Ok(img.clone());
    }

    Ok(imageops::resize(img, fitted.width.max(1), fitted.height.max(1), RESIZE_FILTER))
}

/// Creates the output registry, dispatching on `format`.
pub fn registry() -> Registry<Output> {
    let mut registry = Registry::new("output");
    registry.register(["png"], |fragment| Output::from_fragment(fragment, ImageFormat::Png));
    registry.register(["jpg", "jpeg"], |fragment| Output::from_fragment(fragment, ImageFormat::Jpeg));
    registry
}
