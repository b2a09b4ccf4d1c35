//! Source resolvers: turn a source configuration into concrete asset paths.
//!
//! Three kinds are registered by default:
//!
//! - `file`: a single file whose extension must match the declared format
//! - `directory` / `folder`: every matching file under a directory,
//!   optionally recursive and optionally limited to named subfolders
//! - `url`: a remote file or zip archive, downloaded once into a cache
//!   directory and then resolved like a file or a directory

pub mod directory;
pub mod file;
pub mod url;

pub use directory::DirectorySource;
pub use file::FileSource;
pub use url::{Fetch, HttpFetcher, UrlSource};

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::Error;
use crate::registry::{Fragment, FallbackMethod, Registry};

/// One resolved file eligible for processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Asset {
    /// Location of the file on disk.
    pub path: PathBuf,
    /// Declared format of the source that produced it (`svg`, `png`, ...).
    pub format: String,
    /// Base path of the producing source; outputs mirror the asset's
    /// position relative to it.
    pub source_root: PathBuf,
}

impl Asset {
    pub fn new(path: impl Into<PathBuf>, format: impl Into<String>, source_root: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            format: format.into(),
            source_root: source_root.into(),
        }
    }

    /// File name without its extension.
    pub fn stem(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or_default()
    }

    /// The asset's parent directory relative to its source root.
    ///
    /// When the root is not a prefix of the asset path, every component
    /// that also appears in the root is dropped instead.
    pub fn relative_dir(&self) -> PathBuf {
        let parent = self.path.parent().unwrap_or(Path::new(""));
        if let Ok(relative) = parent.strip_prefix(&self.source_root) {
            return relative.to_path_buf();
        }

        let root: Vec<_> = self.source_root.components().collect();
        parent
            .components()
            .filter(|component| !root.contains(component))
            .collect()
    }

    /// Converts the asset into the fragment the input registry builds from.
    pub fn to_fragment(&self) -> Result<Fragment, Error> {
        match serde_yaml::to_value(self) {
            Ok(serde_yaml::Value::Mapping(fragment)) => Ok(fragment),
            Ok(_) => Err(Error::validation("asset did not serialize to a mapping")),
            Err(source) => Err(Error::Fragment {
                kind: "input",
                source,
            }),
        }
    }
}

/// A lazily evaluated sequence of assets, consumed once.
pub type Assets = Box<dyn Iterator<Item = Result<Asset, Error>>>;

/// A configured source of assets.
#[derive(Debug, Clone)]
pub enum Source {
    File(FileSource),
    Directory(DirectorySource),
    Url(UrlSource),
}

impl Source {
    /// Whether resolving this source performs a network fetch.
    pub fn requires_fetching(&self) -> bool {
        matches!(self, Self::Url(_))
    }

    pub fn format(&self) -> &str {
        match self {
            Self::File(source) => &source.format,
            Self::Directory(source) => &source.format,
            Self::Url(source) => &source.format,
        }
    }

    /// Enumerates the assets this source provides.
    ///
    /// `fetcher` is only used by sources that require fetching.
    pub fn resolve(&self, fetcher: &dyn Fetch) -> Result<Assets, Error> {
        match self {
            Self::File(source) => source.resolve(),
            Self::Directory(source) => Ok(source.resolve()),
            Self::Url(source) => source.resolve(fetcher),
        }
    }
}

/// Creates the source registry, dispatching on a consumed `type` field.
pub fn registry() -> Registry<Source> {
    let mut registry = Registry::new("source").with_fallback("type", FallbackMethod::Pop);
    registry.register(["file"], |fragment| FileSource::from_fragment(fragment).map(Source::File));
    registry.register(["directory", "folder"], |fragment| {
        DirectorySource::from_fragment(fragment).map(Source::Directory)
    });
    registry.register(["url"], |fragment| UrlSource::from_fragment(fragment).map(Source::Url));
    registry
}

/// Returns true when `path` has exactly the extension `format`.
pub(crate) fn has_format(path: &Path, format: &str) -> bool {
    path.extension().and_then(|ext| ext.to_str()) == Some(format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::entry;

    #[test]
    fn relative_dir_strips_source_root() {
        let asset = Asset::new("/work/src/icons/home.svg", "svg", "/work/src");
        assert_eq!(asset.relative_dir(), PathBuf::from("icons"));
        assert_eq!(asset.stem(), "home");
    }

    #[test]
    fn relative_dir_at_root_is_empty() {
        let asset = Asset::new("src/home.svg", "svg", "src");
        assert_eq!(asset.relative_dir(), PathBuf::new());
    }

    #[test]
    fn relative_dir_without_common_prefix_drops_shared_components() {
        let asset = Asset::new("assets/icons/home.svg", "svg", "icons");
        assert_eq!(asset.relative_dir(), PathBuf::from("assets"));
    }

    #[test]
    fn asset_fragment_carries_path_and_format() {
        let asset = Asset::new("a/b.png", "png", "a");
        let fragment = asset.to_fragment().unwrap();
        assert_eq!(fragment.get("format"), Some(&"png".into()));
        assert_eq!(fragment.get("path"), Some(&"a/b.png".into()));
    }

    #[test]
    fn registry_pops_type() {
        let registry = registry();
        assert_eq!(registry.keys(), vec!["directory", "file", "folder", "url"]);

        let mut fragment = entry("type", "folder");
        fragment.insert("format".into(), "svg".into());
        fragment.insert("path".into(), "icons".into());
        let source = registry.build(fragment, Fragment::new()).unwrap();
        assert!(matches!(source, Source::Directory(_)));
        assert!(!source.requires_fetching());
        assert_eq!(source.format(), "svg");
    }

    #[test]
    fn unknown_source_type() {
        let err = registry()
            .build(entry("type", "ftp"), Fragment::new())
            .unwrap_err();
        assert!(matches!(err, Error::UnknownProvider { kind: "source", .. }));
    }
}
