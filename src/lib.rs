//! iconsmith: configuration-driven icon generation
//!
//! This crate turns icon sources (local files, local directories, remote
//! files and zip archives) into a matrix of resized, recolored and padded
//! raster images composited onto a background.
//!
//! Every entity is built from a YAML fragment through a [`Registry`] that
//! dispatches on a discriminator field, so sources, inputs and outputs can
//! be extended by registering new builders.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use iconsmith::{IconsConfig, Pipeline, Settings};
//!
//! let config = IconsConfig::load(Path::new("icons-config.yaml"))?;
//! let report = Pipeline::new(Settings::default()).run(&config)?;
//! println!("{} images written", report.written);
//! # Ok::<(), iconsmith::Error>(())
//! ```
//!
//! # Building single entities
//!
//! ```
//! use iconsmith::output::{self, Background};
//! use iconsmith::registry::Fragment;
//!
//! let fragment = serde_yaml::from_str("{format: png, sizes: [16, 32], margin: 25%}").unwrap();
//! let output = output::registry().build(fragment, Fragment::new()).unwrap();
//!
//! let cores: Vec<u32> = output.generate_sizes().map(|pair| pair.core).collect();
//! assert_eq!(cores, vec![8, 16]);
//! assert_eq!(output.background, Background::Transparent);
//! ```

pub mod color;
pub mod config;
pub mod error;
pub mod geometry;
pub mod input;
pub mod output;
pub mod pipeline;
pub mod registry;
pub mod source;

pub use color::Color;
pub use config::{IconsConfig, SourceEntry};
pub use error::Error;
pub use geometry::{SizePair, SizePx};
pub use input::{IngestRequest, Input, InputKind};
pub use output::{Background, GeneratedArtifact, Margin, Output, Selectors};
pub use pipeline::{Execution, Pipeline, Providers, RunReport, Settings};
pub use registry::{FallbackMethod, Fragment, Registry};
pub use source::{Asset, Fetch, HttpFetcher, Source};
