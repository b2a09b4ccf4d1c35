//! Single-file sources.

use std::iter;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::{Asset, Assets, has_format};
use crate::error::Error;
use crate::registry::{Fragment, decode};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FileSource {
    pub format: String,
    pub path: PathBuf,
    #[serde(default)]
    pub base_path: PathBuf,
}

impl FileSource {
    pub fn from_fragment(fragment: Fragment) -> Result<Self, Error> {
        decode("file source", fragment)
    }

    pub fn resolve(&self) -> Result<Assets, Error> {
        let asset = resolve_file(&self.base_path, &self.path, &self.format)?;
        Ok(Box::new(iter::once(Ok(asset))))
    }
}

/// Validates the extension of `base/path` and wraps it as an asset.
pub(crate) fn resolve_file(base: &Path, path: &Path, format: &str) -> Result<Asset, Error> {
    if !has_format(path, format) {
        return Err(Error::validation(format!(
            "path {} does not have the correct extension for {format}",
            path.display()
        )));
    }

    Ok(Asset::new(base.join(path), format, base))
}
