//! Error type shared by every stage of the pipeline.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors produced while loading configuration, resolving sources,
/// ingesting inputs and generating outputs.
///
/// Only [`Error::Geometry`] is recoverable: the orchestrator logs it and
/// skips the offending size. Everything else aborts the run.
#[derive(Debug, Error)]
pub enum Error {
    /// No builder is registered under the requested discriminator.
    #[error("no {kind} builder registered for \"{key}\"")]
    UnknownProvider { kind: &'static str, key: String },

    /// The configuration fragment lacks the field used to pick a builder.
    #[error("{kind} configuration is missing the \"{field}\" field")]
    MissingDiscriminator { kind: &'static str, field: String },

    /// A configuration fragment could not be decoded into its typed fields.
    #[error("invalid {kind} configuration: {source}")]
    Fragment {
        kind: &'static str,
        #[source]
        source: serde_yaml::Error,
    },

    /// The configuration file itself is not valid YAML for the document shape.
    #[error("failed to parse configuration {path:?}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A configured value violates an invariant (extension, margin, color).
    #[error("{message}")]
    Validation { message: String },

    /// The requested geometry cannot be produced from the decoded image.
    #[error("{message}")]
    Geometry { message: String },

    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to walk {path:?}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("image error for {path:?}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to parse SVG {path:?}: {source}")]
    Svg {
        path: PathBuf,
        #[source]
        source: resvg::usvg::Error,
    },

    #[error("request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} returned {status}")]
    HttpStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("archive error for {path:?}: {source}")]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn geometry(message: impl Into<String>) -> Self {
        Self::Geometry {
            message: message.into(),
        }
    }

    /// Returns true for errors that only invalidate a single output size.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Geometry { .. })
    }
}

/// Wraps an I/O error with the path that produced it.
pub(crate) fn io_error(path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_geometry_is_recoverable() {
        assert!(Error::geometry("too big").is_recoverable());
        assert!(!Error::validation("bad margin").is_recoverable());
        assert!(
            !Error::UnknownProvider {
                kind: "source",
                key: "ftp".into()
            }
            .is_recoverable()
        );
    }

    #[test]
    fn unknown_provider_names_the_key() {
        let err = Error::UnknownProvider {
            kind: "output",
            key: "webp".into(),
        };
        assert_eq!(err.to_string(), "no output builder registered for \"webp\"");
    }
}
