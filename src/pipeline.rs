//! Orchestration: sources to assets to inputs to written outputs.

use std::ops::{Add, AddAssign};
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde_yaml::Value;
use tracing::{debug, info, warn};

use crate::config::{IconsConfig, SourceEntry};
use crate::error::Error;
use crate::geometry::SizePair;
use crate::input::{self, IngestRequest, Input};
use crate::output::{self, GeneratedArtifact, Output};
use crate::registry::{Fragment, Registry, entry};
use crate::source::{self, Asset, Fetch, HttpFetcher, Source};

// ============================================================================
// Providers
// ============================================================================

/// The registration table for every entity kind.
#[derive(Debug)]
pub struct Providers {
    pub sources: Registry<Source>,
    pub inputs: Registry<Input>,
    pub outputs: Registry<Output>,
}

impl Providers {
    /// Registers the built-in sources, inputs and outputs.
    pub fn standard() -> Self {
        Self {
            sources: source::registry(),
            inputs: input::registry(),
            outputs: output::registry(),
        }
    }
}

impl Default for Providers {
    fn default() -> Self {
        Self::standard()
    }
}

// ============================================================================
// Settings
// ============================================================================

/// How assets are scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    /// One asset per task on a worker pool. `None` sizes the pool to the host.
    Parallel { jobs: Option<usize> },
    /// Every asset in the calling thread.
    Sequential,
}

/// Run-wide values handed to every source, output and job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Folder that local source paths are relative to.
    pub source_folder: PathBuf,
    /// Folder generated images are written under.
    pub output_folder: PathBuf,
    /// Where remote sources are downloaded and extracted.
    pub cache_dir: PathBuf,
    pub execution: Execution,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            source_folder: PathBuf::from("."),
            output_folder: PathBuf::from("dist"),
            cache_dir: std::env::temp_dir(),
            execution: Execution::Parallel { jobs: None },
        }
    }
}

fn path_value(path: &Path) -> Value {
    Value::from(path.to_string_lossy().into_owned())
}

// ============================================================================
// RunReport
// ============================================================================

/// Counts gathered over a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunReport {
    pub assets: usize,
    /// Images written to disk.
    pub written: usize,
    /// Sizes skipped because of their geometry.
    pub skipped: usize,
}

impl Add for RunReport {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            assets: self.assets + other.assets,
            written: self.written + other.written,
            skipped: self.skipped + other.skipped,
        }
    }
}

impl AddAssign for RunReport {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Drives a configuration through resolution, ingestion and generation.
pub struct Pipeline {
    providers: Providers,
    settings: Settings,
    fetcher: Box<dyn Fetch>,
}

impl Pipeline {
    pub fn new(settings: Settings) -> Self {
        Self {
            providers: Providers::standard(),
            settings,
            fetcher: Box::new(HttpFetcher::default()),
        }
    }

    /// Replaces the fetcher used by remote sources.
    pub fn with_fetcher(mut self, fetcher: impl Fetch + 'static) -> Self {
        self.fetcher = Box::new(fetcher);
        self
    }

    pub fn providers_mut(&mut self) -> &mut Providers {
        &mut self.providers
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Processes every source in `config`.
    ///
    /// Geometry problems skip single sizes; any other error stops the run.
    pub fn run(&self, config: &IconsConfig) -> Result<RunReport, Error> {
        let pool = match self.settings.execution {
            Execution::Parallel { jobs: Some(jobs) } => {
                Some(rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?)
            }
            _ => None,
        };

        let mut report = RunReport::default();
        for source_entry in config.entries()? {
            report += match &pool {
                Some(pool) => pool.install(|| self.run_source(source_entry))?,
                None => self.run_source(source_entry)?,
            };
        }

        info!(
            assets = report.assets,
            written = report.written,
            skipped = report.skipped,
            "generation finished"
        );
        Ok(report)
    }

    fn run_source(&self, source_entry: SourceEntry) -> Result<RunReport, Error> {
        let SourceEntry {
            source,
            outputs,
            rasterize,
        } = source_entry;
        debug!(config = ?source, "processing source");

        let mut overrides = entry("base_path", path_value(&self.settings.source_folder));
        overrides.insert("cache_dir".into(), path_value(&self.settings.cache_dir));
        let source = self.providers.sources.build(source, overrides)?;

        let outputs = outputs
            .into_iter()
            .map(|fragment| {
                self.providers
                    .outputs
                    .build(fragment, entry("base_path", path_value(&self.settings.output_folder)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        // Resolved here, before any parallel work, so a remote source is
        // downloaded exactly once per run.
        let assets = source
            .resolve(self.fetcher.as_ref())?
            .collect::<Result<Vec<_>, _>>()?;

        let job = |asset: &Asset| {
            AssetJob {
                asset,
                outputs: &outputs,
                inputs: &self.providers.inputs,
                rasterize: &rasterize,
            }
            .run()
        };

        match self.settings.execution {
            Execution::Sequential => assets
                .iter()
                .map(job)
                .try_fold(RunReport::default(), |total, report| report.map(|report| total + report)),
            Execution::Parallel { .. } => assets
                .par_iter()
                .map(job)
                .try_reduce(RunReport::default, |a, b| Ok(a + b)),
        }
    }
}

// ============================================================================
// AssetJob
// ============================================================================

/// Everything needed to process one asset, with no shared mutable state.
struct AssetJob<'a> {
    asset: &'a Asset,
    outputs: &'a [Output],
    inputs: &'a Registry<Input>,
    rasterize: &'a Fragment,
}

impl AssetJob<'_> {
    fn run(self) -> Result<RunReport, Error> {
        debug!(format = %self.asset.format, path = %self.asset.path.display(), "found image");
        let input = self
            .inputs
            .build(self.asset.to_fragment()?, self.rasterize.clone())?;

        let mut report = RunReport {
            assets: 1,
            ..RunReport::default()
        };

        for output in self.outputs {
            if !output.selects(input.asset().stem()) {
                debug!(
                    path = %input.asset().path.display(),
                    format = %output.format,
                    "skipping output, asset not in selectors"
                );
                continue;
            }

            for sizes in output.generate_sizes() {
                debug!(size = sizes.target, core = sizes.core, "generating image");
                let artifact = match generate(&input, output, sizes) {
                    Ok(artifact) => artifact,
                    Err(err) if err.is_recoverable() => {
                        warn!(
                            size = sizes.target,
                            path = %input.asset().path.display(),
                            "{err}, skipping image"
                        );
                        report.skipped += 1;
                        continue;
                    }
                    Err(err) => return Err(err),
                };

                info!(path = %artifact.destination.display(), "saving generated image");
                artifact.write(output.image_format)?;
                report.written += 1;
            }
        }

        Ok(report)
    }
}

/// Ingests `input` for one size pair and composites the result.
fn generate(input: &Input, output: &Output, sizes: SizePair) -> Result<GeneratedArtifact, Error> {
    let request = IngestRequest {
        color: output.color,
        size: input.is_vector().then_some(sizes.core),
    };
    let img = input.ingest(request)?;
    output.generate(&img, input, sizes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::svg::tests::SQUARE_SVG;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::fs;

    struct Workspace {
        _dir: tempfile::TempDir,
        src: PathBuf,
        dist: PathBuf,
        cache: PathBuf,
    }

    impl Workspace {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let src = dir.path().join("src");
            let dist = dir.path().join("dist");
            let cache = dir.path().join("cache");
            fs::create_dir_all(&src).unwrap();
            Self {
                _dir: dir,
                src,
                dist,
                cache,
            }
        }

        fn add_png(&self, relative: &str, img: &RgbaImage) {
            let path = self.src.join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            img.save_with_format(path, ImageFormat::Png).unwrap();
        }

        fn add_svg(&self, relative: &str) {
            let path = self.src.join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, SQUARE_SVG).unwrap();
        }

        fn pipeline(&self, execution: Execution) -> Pipeline {
            Pipeline::new(Settings {
                source_folder: self.src.clone(),
                output_folder: self.dist.clone(),
                cache_dir: self.cache.clone(),
                execution,
            })
        }

        fn run(&self, yaml: &str, execution: Execution) -> Result<RunReport, Error> {
            let config = IconsConfig::from_yaml(yaml).unwrap();
            self.pipeline(execution).run(&config)
        }
    }

    #[test]
    fn single_size_end_to_end() {
        let ws = Workspace::new();
        ws.add_png("icons/home.png", &RgbaImage::from_pixel(96, 96, Rgba([200, 30, 30, 255])));

        let report = ws
            .run(
                r#"
sources:
  - type: directory
    format: png
    path: icons
    outputs:
      - format: png
        sizes: [48]
        background: black
"#,
                Execution::Sequential,
            )
            .unwrap();

        assert_eq!(
            report,
            RunReport {
                assets: 1,
                written: 1,
                skipped: 0
            }
        );

        let out = image::open(ws.dist.join("icons/home-48.png")).unwrap().into_rgba8();
        assert_eq!(out.dimensions(), (48, 48));
        assert!(out.pixels().all(|p| p.0 == [200, 30, 30, 255]));
    }

    #[test]
    fn oversized_core_is_skipped_not_fatal() {
        let ws = Workspace::new();
        ws.add_png("icons/small.png", &RgbaImage::from_pixel(32, 32, Rgba([0, 0, 0, 255])));

        let report = ws
            .run(
                r#"
sources:
  - type: folder
    format: png
    path: icons
    outputs:
      - format: png
        sizes: [16, 64, 24]
"#,
                Execution::Sequential,
            )
            .unwrap();

        assert_eq!(report.written, 2);
        assert_eq!(report.skipped, 1);
        assert!(ws.dist.join("icons/small-16.png").exists());
        assert!(!ws.dist.join("icons/small-64.png").exists());
        assert!(ws.dist.join("icons/small-24.png").exists());
    }

    #[test]
    fn selectors_filter_outputs_per_asset() {
        let ws = Workspace::new();
        ws.add_svg("icons/home.svg");
        ws.add_svg("icons/settings.svg");

        ws.run(
            r##"
output-defaults:
  sizes: [32]
  margin: 4px
sources:
  - type: directory
    format: svg
    path: icons
    outputs:
      - format: png
        selectors: [home]
        file-prefix: only
      - format: png
        selectors: "*"
        color: "#ff0000"
"##,
            Execution::Parallel { jobs: Some(2) },
        )
        .unwrap();

        assert!(ws.dist.join("icons/only-home-32.png").exists());
        assert!(!ws.dist.join("icons/only-settings-32.png").exists());

        let recolored = image::open(ws.dist.join("icons/settings-32.png")).unwrap().into_rgba8();
        assert_eq!(recolored.get_pixel(16, 16).0, [255, 0, 0, 255]);
        // 4 px margin on a transparent background
        assert_eq!(recolored.get_pixel(1, 1).0[3], 0);
    }

    #[test]
    fn file_source_with_directory_override() {
        let ws = Workspace::new();
        ws.add_png("brand/logo.png", &RgbaImage::from_pixel(40, 20, Rgba([0, 0, 0, 255])));

        ws.run(
            r#"
sources:
  - type: file
    format: png
    path: brand/logo.png
    outputs:
      - format: jpg
        sizes: [20]
        background: white
        directory-override: web
"#,
            Execution::Parallel { jobs: None },
        )
        .unwrap();

        let out = image::open(ws.dist.join("web/logo-20.jpg")).unwrap();
        assert_eq!((out.width(), out.height()), (20, 20));
    }

    #[test]
    fn unknown_output_format_aborts() {
        let ws = Workspace::new();
        ws.add_svg("icons/home.svg");

        let err = ws
            .run(
                r#"
sources:
  - type: directory
    format: svg
    path: icons
    outputs:
      - format: webp
        sizes: [16]
"#,
                Execution::Sequential,
            )
            .unwrap_err();
        assert!(matches!(err, Error::UnknownProvider { kind: "output", .. }));
    }

    #[test]
    fn remote_sources_use_the_fetcher_once() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct Static(Arc<AtomicUsize>);
        impl Fetch for Static {
            fn fetch(&self, _url: &str) -> Result<Vec<u8>, Error> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(SQUARE_SVG.as_bytes().to_vec())
            }
        }

        let ws = Workspace::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let pipeline = ws
            .pipeline(Execution::Sequential)
            .with_fetcher(Static(calls.clone()));
        let config = IconsConfig::from_yaml(
            r#"
sources:
  - type: url
    format: svg
    path: https://example.com/icons/star.svg
    outputs:
      - format: png
        sizes: [24]
"#,
        )
        .unwrap();

        pipeline.run(&config).unwrap();
        pipeline.run(&config).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(ws.dist.join("star-24.png").exists());
    }
}
