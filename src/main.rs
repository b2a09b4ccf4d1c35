//! Command-line interface for the iconsmith binary.
//!
//! Reads an icons configuration file and generates every configured output
//! image below the output folder.

use std::path::PathBuf;
use std::process;

use clap::{ArgAction, Parser};
use iconsmith::{Error, Execution, IconsConfig, Pipeline, Settings};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Generate resized, recolored and padded icons from a configuration file.
#[derive(Debug, Parser)]
#[command(name = "iconsmith", version, about)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long, value_name = "PATH", default_value = "icons-config.yaml")]
    config: PathBuf,

    /// Folder that local source paths are relative to.
    #[arg(long, value_name = "DIR", default_value = ".")]
    source_folder: PathBuf,

    /// Folder generated images are written under.
    #[arg(long, value_name = "DIR", default_value = "dist")]
    output_folder: PathBuf,

    /// Folder remote sources are downloaded to. Defaults to the system temp dir.
    #[arg(long, value_name = "DIR")]
    cache_dir: Option<PathBuf>,

    /// Process every asset in a single thread.
    #[arg(short, long, action = ArgAction::SetTrue)]
    single_processing: bool,

    /// Number of worker threads for parallel processing.
    #[arg(short, long, value_name = "N", conflicts_with = "single_processing")]
    jobs: Option<usize>,

    /// Log progress at info level.
    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    /// Log everything at debug level.
    #[arg(short, long, action = ArgAction::SetTrue)]
    debug: bool,
}

impl Cli {
    fn log_level(&self) -> &'static str {
        if self.debug {
            "debug"
        } else if self.verbose {
            "info"
        } else {
            "warn"
        }
    }

    fn settings(&self) -> Settings {
        let execution = if self.single_processing {
            Execution::Sequential
        } else {
            Execution::Parallel { jobs: self.jobs }
        };

        Settings {
            source_folder: self.source_folder.clone(),
            output_folder: self.output_folder.clone(),
            cache_dir: self.cache_dir.clone().unwrap_or_else(std::env::temp_dir),
            execution,
        }
    }
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{error}");
        process::exit(1);
    }
}

fn run() -> Result<(), Error> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| cli.log_level().into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = IconsConfig::load(&cli.config)?;
    Pipeline::new(cli.settings()).run(&config)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn defaults() {
        let cli = Cli::parse_from(["iconsmith"]);
        assert_eq!(cli.config, PathBuf::from("icons-config.yaml"));
        assert_eq!(cli.log_level(), "warn");

        let settings = cli.settings();
        assert_eq!(settings.output_folder, PathBuf::from("dist"));
        assert_eq!(settings.execution, Execution::Parallel { jobs: None });
    }

    #[test]
    fn flags() {
        let cli = Cli::parse_from(["iconsmith", "-c", "x.yaml", "-s", "-d", "--output-folder", "out"]);
        assert_eq!(cli.config, PathBuf::from("x.yaml"));
        assert_eq!(cli.log_level(), "debug");
        assert_eq!(cli.settings().execution, Execution::Sequential);
        assert_eq!(cli.settings().output_folder, PathBuf::from("out"));

        let cli = Cli::parse_from(["iconsmith", "-j", "3", "-v"]);
        assert_eq!(cli.settings().execution, Execution::Parallel { jobs: Some(3) });
        assert_eq!(cli.log_level(), "info");
    }
}
