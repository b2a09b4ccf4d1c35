//! The configuration document and its two-level defaults.
//!
//! ```yaml
//! source-defaults:
//!   recurse: true
//! output-defaults:
//!   background: transparent
//! sources:
//!   - type: directory
//!     format: svg
//!     path: icons
//!     outputs:
//!       - format: png
//!         sizes: [16, 32, 48]
//!         margin: 10%
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_yaml::Value;

use crate::error::{Error, io_error};
use crate::registry::{Fragment, layer, value_type};

/// The parsed configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct IconsConfig {
    /// Layered under every source.
    #[serde(default, alias = "source_defaults")]
    pub source_defaults: Fragment,

    /// Layered under every output.
    #[serde(default, alias = "output_defaults")]
    pub output_defaults: Fragment,

    #[serde(default)]
    pub sources: Vec<Fragment>,
}

/// One source with its defaults applied and its nested fields split off.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceEntry {
    /// Fragment for the source registry.
    pub source: Fragment,
    /// Fragments for the output registry, each layered over the output defaults.
    pub outputs: Vec<Fragment>,
    /// Rasterization overrides for the inputs of this source.
    pub rasterize: Fragment,
}

impl IconsConfig {
    /// Reads and parses a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self, Error> {
        let raw = fs::read_to_string(path).map_err(|err| io_error(path, err))?;
        Self::from_yaml(&raw).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_yaml(raw: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(raw)
    }

    /// Applies the defaults to every source and its outputs.
    pub fn entries(&self) -> Result<Vec<SourceEntry>, Error> {
        self.sources
            .iter()
            .map(|source| self.entry(source.clone()))
            .collect()
    }

    fn entry(&self, source: Fragment) -> Result<SourceEntry, Error> {
        let mut source = layer(self.source_defaults.clone(), source);

        let outputs = match source.remove("outputs") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Sequence(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::Mapping(output) => Ok(layer(self.output_defaults.clone(), output)),
                    other => Err(Error::validation(format!(
                        "each output must be a mapping, got {}",
                        value_type(&other)
                    ))),
                })
                .collect::<Result<_, _>>()?,
            Some(other) => {
                return Err(Error::validation(format!(
                    "source outputs must be a list, got {}",
                    value_type(&other)
                )));
            }
        };

        let rasterize = match source.remove("rasterize") {
            None | Some(Value::Null) => Fragment::new(),
            Some(Value::Mapping(rasterize)) => rasterize,
            Some(other) => {
                return Err(Error::validation(format!(
                    "source rasterize settings must be a mapping, got {}",
                    value_type(&other)
                )));
            }
        };

        Ok(SourceEntry {
            source,
            outputs,
            rasterize,
        })
    }
}
