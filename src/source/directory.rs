//! Directory sources, matched the way `*.ext` / `**/*.ext` globs match.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::warn;
use walkdir::WalkDir;

use super::{Asset, Assets, has_format};
use crate::error::Error;
use crate::registry::{Fragment, decode};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DirectorySource {
    pub format: String,
    pub path: PathBuf,
    #[serde(default)]
    pub base_path: PathBuf,
    #[serde(default)]
    pub recurse: bool,
    #[serde(default)]
    pub target_folders: Vec<PathBuf>,
}

impl DirectorySource {
    pub fn from_fragment(fragment: Fragment) -> Result<Self, Error> {
        decode("directory source", fragment)
    }

    pub fn resolve(&self) -> Assets {
        let scan = Scan {
            root: self.base_path.join(&self.path),
            source_root: self.base_path.clone(),
            format: self.format.clone(),
            recurse: self.recurse,
            target_folders: self.target_folders.clone(),
        };
        scan.assets()
    }
}

/// A directory walk shared by directory sources and extracted archives.
#[derive(Debug, Clone)]
pub(crate) struct Scan {
    pub root: PathBuf,
    pub source_root: PathBuf,
    pub format: String,
    pub recurse: bool,
    pub target_folders: Vec<PathBuf>,
}

impl Scan {
    pub fn assets(self) -> Assets {
        let folders = if self.target_folders.is_empty() {
            vec![self.root.clone()]
        } else {
            self.target_folders
                .iter()
                .map(|folder| self.root.join(folder))
                .collect()
        };

        Box::new(folders.into_iter().flat_map(move |folder| {
            walk(&folder, &self.source_root, &self.format, self.recurse)
        }))
    }
}

fn walk(folder: &Path, source_root: &Path, format: &str, recurse: bool) -> Assets {
    if !folder.is_dir() {
        warn!(path = %folder.display(), "source folder does not exist, nothing to resolve");
        return Box::new(std::iter::empty());
    }

    let source_root = source_root.to_path_buf();
    let format = format.to_owned();
    let walker = WalkDir::new(folder)
        .min_depth(1)
        .max_depth(if recurse { usize::MAX } else { 1 })
        .sort_by_file_name()
        .into_iter();

    Box::new(walker.filter_map(move |entry| match entry {
        Ok(entry) if entry.file_type().is_file() && has_format(entry.path(), &format) => {
            Some(Ok(Asset::new(entry.into_path(), format.clone(), source_root.clone())))
        }
        Ok(_) => None,
        Err(source) => Some(Err(Error::Walk {
            path: source.path().map(Path::to_path_buf).unwrap_or_default(),
            source,
        })),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    fn fixture() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        touch(root, "icons/home.svg");
        touch(root, "icons/settings.svg");
        touch(root, "icons/readme.txt");
        touch(root, "icons/.hidden.svg");
        touch(root, "icons/nav/back.svg");
        touch(root, "icons/brand/logo.svg");
        touch(root, "icons/.cache/stale.svg");
        dir
    }

    fn source(base: &Path, recurse: bool, target_folders: &[&str]) -> DirectorySource {
        DirectorySource {
            format: "svg".into(),
            path: "icons".into(),
            base_path: base.to_path_buf(),
            recurse,
            target_folders: target_folders.iter().map(PathBuf::from).collect(),
        }
    }

    fn names(assets: Assets) -> Vec<String> {
        assets
            .map(|asset| {
                let asset = asset.unwrap();
                asset
                    .path
                    .strip_prefix(&asset.source_root)
                    .unwrap()
                    .display()
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn flat_match_skips_subfolders() {
        let dir = fixture();
        let found = names(source(dir.path(), false, &[]).resolve());
        assert_eq!(found, vec!["icons/.hidden.svg", "icons/home.svg", "icons/settings.svg"]);
    }

    #[test]
    fn recursive_match() {
        let dir = fixture();
        let mut found = names(source(dir.path(), true, &[]).resolve());
        found.sort();
        assert_eq!(
            found,
            vec![
                "icons/.cache/stale.svg",
                "icons/.hidden.svg",
                "icons/brand/logo.svg",
                "icons/home.svg",
                "icons/nav/back.svg",
                "icons/settings.svg",
            ]
        );
    }

    #[test]
    fn target_folders_limit_the_walk() {
        let dir = fixture();
        let found = names(source(dir.path(), false, &["nav", "brand"]).resolve());
        assert_eq!(found, vec!["icons/nav/back.svg", "icons/brand/logo.svg"]);
    }

    #[test]
    fn missing_folder_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(names(source(dir.path(), true, &[]).resolve()).is_empty());
    }

    #[test]
    fn decodes_dashed_keys_after_normalization() {
        let fragment: Fragment =
            serde_yaml::from_str("{format: svg, path: icons, recurse: true, target-folders: [a]}").unwrap();
        let source = DirectorySource::from_fragment(crate::registry::normalize_keys(fragment)).unwrap();
        assert!(source.recurse);
        assert_eq!(source.target_folders, vec![PathBuf::from("a")]);
    }
}
