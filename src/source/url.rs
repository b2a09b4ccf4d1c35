//! Remote sources: a downloaded file or zip archive.
//!
//! Resolution runs in two phases. The download step makes sure the remote
//! file is present in the cache directory (fetching it only once), and
//! extracts it when it is a zip archive. The result is then resolved by
//! the directory walk (archives) or the single-file check (anything else).

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, info};
use zip::ZipArchive;

use super::directory::Scan;
use super::file::resolve_file;
use super::{Asset, Assets};
use crate::error::{Error, io_error};
use crate::registry::{Fragment, decode};

/// Retrieves the body of a remote resource.
pub trait Fetch: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, Error>;
}

/// Blocking HTTP fetcher backed by `reqwest`.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(client: reqwest::blocking::Client) -> Self {
        Self { client }
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, Error> {
        let http_error = |source| Error::Http {
            url: url.to_owned(),
            source,
        };

        let response = self.client.get(url).send().map_err(http_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                url: url.to_owned(),
                status,
            });
        }

        Ok(response.bytes().map_err(http_error)?.to_vec())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UrlSource {
    pub format: String,
    /// The remote location, kept as a string so `//` survives intact.
    #[serde(rename = "path")]
    pub url: String,
    #[serde(default)]
    pub recurse: bool,
    #[serde(default)]
    pub target_folders: Vec<PathBuf>,
    /// Where downloads are cached and archives extracted.
    #[serde(default = "std::env::temp_dir")]
    pub cache_dir: PathBuf,
}

impl UrlSource {
    pub fn from_fragment(fragment: Fragment) -> Result<Self, Error> {
        decode("url source", fragment)
    }

    /// Name of the cached download: the last segment of the URL path.
    pub fn file_name(&self) -> Result<String, Error> {
        let url = Url::parse(&self.url)
            .map_err(|err| Error::validation(format!("invalid source url \"{}\": {err}", self.url)))?;

        url.path_segments()
            .and_then(|mut segments| segments.next_back())
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
            .ok_or_else(|| Error::validation(format!("source url \"{}\" does not name a file", self.url)))
    }

    /// Location of the cached download.
    pub fn download_path(&self) -> Result<PathBuf, Error> {
        Ok(self.cache_dir.join(self.file_name()?))
    }

    pub fn resolve(&self, fetcher: &dyn Fetch) -> Result<Assets, Error> {
        let download = self.download(fetcher)?;

        if !is_zip(&download)? {
            let name = PathBuf::from(self.file_name()?);
            let asset = resolve_file(&self.cache_dir, &name, &self.format)?;
            return Ok(Box::new(std::iter::once(Ok::<Asset, Error>(asset))));
        }

        extract(&download, &self.cache_dir)?;
        let stem = download.file_stem().map(PathBuf::from).unwrap_or_default();
        let scan = Scan {
            root: self.cache_dir.join(stem),
            source_root: self.cache_dir.clone(),
            format: self.format.clone(),
            recurse: self.recurse,
            target_folders: self.target_folders.clone(),
        };
        Ok(scan.assets())
    }

    /// Makes sure the remote file is cached, fetching it when missing.
    fn download(&self, fetcher: &dyn Fetch) -> Result<PathBuf, Error> {
        let path = self.download_path()?;
        if path.exists() {
            debug!(url = %self.url, path = %path.display(), "using cached download");
            return Ok(path);
        }

        info!(url = %self.url, "downloading source");
        let body = fetcher.fetch(&self.url)?;

        fs::create_dir_all(&self.cache_dir).map_err(|err| io_error(&self.cache_dir, err))?;
        // Written under a temporary name first so a reader never sees a partial file.
        let mut staged =
            tempfile::NamedTempFile::new_in(&self.cache_dir).map_err(|err| io_error(&self.cache_dir, err))?;
        staged.write_all(&body).map_err(|err| io_error(staged.path(), err))?;
        staged
            .persist(&path)
            .map_err(|err| io_error(&path, err.error))?;

        Ok(path)
    }
}

fn is_zip(path: &Path) -> Result<bool, Error> {
    let file = File::open(path).map_err(|err| io_error(path, err))?;
    Ok(ZipArchive::new(file).is_ok())
}

fn extract(archive: &Path, into: &Path) -> Result<(), Error> {
    debug!(archive = %archive.display(), into = %into.display(), "extracting archive");
    let file = File::open(archive).map_err(|err| io_error(archive, err))?;
    let archive_error = |source| Error::Archive {
        path: archive.to_path_buf(),
        source,
    };

    let mut zip = ZipArchive::new(file).map_err(archive_error)?;
    zip.extract(into).map_err(archive_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingFetcher {
        body: Vec<u8>,
        calls: AtomicUsize,
    }

    impl CountingFetcher {
        fn new(body: Vec<u8>) -> Self {
            Self {
                body,
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl Fetch for CountingFetcher {
        fn fetch(&self, _url: &str) -> Result<Vec<u8>, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.body.clone())
        }
    }

    fn source(url: &str, cache_dir: &Path) -> UrlSource {
        UrlSource {
            format: "svg".into(),
            url: url.into(),
            recurse: true,
            target_folders: Vec::new(),
            cache_dir: cache_dir.to_path_buf(),
        }
    }

    fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default();
        for (name, content) in entries {
            writer.start_file(*name, options).unwrap();
            writer.write_all(content.as_bytes()).unwrap();
        }
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn file_name_comes_from_last_segment() {
        let source = source("https://example.com/pack/v2/icons.zip?token=1", Path::new("/tmp"));
        assert_eq!(source.file_name().unwrap(), "icons.zip");
        assert_eq!(source.download_path().unwrap(), PathBuf::from("/tmp/icons.zip"));
    }

    #[test]
    fn url_without_file_name_is_rejected() {
        let source = source("https://example.com/", Path::new("/tmp"));
        assert!(matches!(source.file_name(), Err(Error::Validation { .. })));
    }

    #[test]
    fn downloads_are_cached() {
        let cache = tempfile::tempdir().unwrap();
        let fetcher = CountingFetcher::new(b"<svg/>".to_vec());
        let source = source("https://example.com/logo.svg", cache.path());

        for _ in 0..2 {
            let assets: Vec<_> = source
                .resolve(&fetcher)
                .unwrap()
                .collect::<Result<_, _>>()
                .unwrap();
            assert_eq!(assets, vec![Asset::new(cache.path().join("logo.svg"), "svg", cache.path())]);
        }

        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn non_archive_with_wrong_extension_fails() {
        let cache = tempfile::tempdir().unwrap();
        let fetcher = CountingFetcher::new(b"png bytes".to_vec());
        let source = source("https://example.com/logo.png", cache.path());

        assert!(matches!(source.resolve(&fetcher), Err(Error::Validation { .. })));
    }

    #[test]
    fn archives_resolve_as_directories() {
        let cache = tempfile::tempdir().unwrap();
        let fetcher = CountingFetcher::new(zip_bytes(&[
            ("pack/home.svg", "<svg/>"),
            ("pack/nav/back.svg", "<svg/>"),
            ("pack/notes.txt", "skip"),
        ]));
        let source = source("https://example.com/pack.zip", cache.path());

        let mut assets: Vec<_> = source
            .resolve(&fetcher)
            .unwrap()
            .map(|asset| asset.unwrap())
            .collect();
        assets.sort_by(|a, b| a.path.cmp(&b.path));

        let paths: Vec<_> = assets.iter().map(|asset| asset.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                cache.path().join("pack/home.svg"),
                cache.path().join("pack/nav/back.svg"),
            ]
        );
        assert_eq!(assets[1].relative_dir(), PathBuf::from("pack/nav"));

        // Extraction runs again on the second pass, the download does not.
        fs::remove_file(cache.path().join("pack/home.svg")).unwrap();
        let again = source.resolve(&fetcher).unwrap().count();
        assert_eq!(again, 2);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_fetch_is_fatal() {
        struct Offline;
        impl Fetch for Offline {
            fn fetch(&self, url: &str) -> Result<Vec<u8>, Error> {
                Err(Error::HttpStatus {
                    url: url.to_owned(),
                    status: reqwest::StatusCode::NOT_FOUND,
                })
            }
        }

        let cache = tempfile::tempdir().unwrap();
        let source = source("https://example.com/missing.svg", cache.path());
        let err = source.resolve(&Offline).err().unwrap();
        assert!(err.to_string().contains("404"));
        assert!(!cache.path().join("missing.svg").exists());
    }
}
