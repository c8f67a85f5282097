//! CLI argument definitions for `arrow-shade`.
//!
//! This module defines the command-line interface using clap. It is separated
//! from the main entrypoint so tests can parse arguments without running a
//! merge.

use arrow_shade_engine::{ArchiveSource, DirectorySource, ZipSource};
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use log::LevelFilter;
use std::convert::Infallible;
use std::str::FromStr;

use crate::config::IdentityOverrides;

/// Build a shaded library jar from compiled output and dependency jars.
#[derive(Parser, Debug, Clone)]
#[command(name = "arrow-shade")]
#[command(about)]
#[command(long_about = concat!(
    "Build a shaded library jar from compiled output and dependency jars.\n\n",
    "Inputs are merged in the order given, so list the module's own output ",
    "first: earlier inputs win when two supply the same path. Packages the ",
    "host server runtime already provides are excluded, and namespaces named ",
    "in shade.toml are relocated under <group>.dependencies.<package>.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Shade a module with its dependencies:\n",
    "    $ arrow-shade -o build/libs module=build/classes item-nbt-api.jar\n\n",
    "  Produce a classified jar and a JSON report:\n",
    "    $ arrow-shade -o build/libs --classifier all --json build/classes deps/*.jar",
))]
pub struct Cli {
    /// Shading configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "shade.toml")]
    pub config: Utf8PathBuf,

    /// Directory the shaded archive is written to (created if missing).
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Utf8PathBuf,

    /// Classifier appended to the archive name, overriding the file.
    #[arg(long, value_name = "CLASSIFIER")]
    pub classifier: Option<String>,

    /// Project name, overriding `[project].name`.
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Project version, overriding `[project].version`.
    #[arg(long = "version", value_name = "VERSION")]
    pub project_version: Option<String>,

    /// Project group, overriding `[project].group`.
    #[arg(long, value_name = "GROUP")]
    pub group: Option<String>,

    /// Print a JSON report instead of the archive path.
    #[arg(long)]
    pub json: bool,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Only log errors.
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,

    /// Inputs in merge order: `[logical-name=]path` to a jar, zip, or
    /// compiled output directory.
    #[arg(required = true, value_name = "INPUT")]
    pub inputs: Vec<InputSpec>,
}

impl Cli {
    /// Log level selected by `-q` and `-v` flags.
    ///
    /// # Examples
    ///
    /// ```
    /// use arrow_shade::cli::Cli;
    /// use clap::Parser;
    /// use log::LevelFilter;
    ///
    /// let cli = Cli::parse_from(["arrow-shade", "-o", "out", "-vv", "a.jar"]);
    /// assert_eq!(cli.log_level(), LevelFilter::Debug);
    /// ```
    #[must_use]
    pub const fn log_level(&self) -> LevelFilter {
        if self.quiet {
            return LevelFilter::Error;
        }
        match self.verbosity {
            0 => LevelFilter::Warn,
            1 => LevelFilter::Info,
            2 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    }

    /// Identity values given on the command line.
    #[must_use]
    pub fn identity_overrides(&self) -> IdentityOverrides {
        IdentityOverrides {
            name: self.name.clone(),
            version: self.project_version.clone(),
            group: self.group.clone(),
        }
    }
}

/// One positional input: an optional logical name and a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSpec {
    /// Name used in logs and error messages; defaults to the file name.
    pub name: Option<String>,
    /// Jar, zip, or directory path.
    pub path: Utf8PathBuf,
}

impl FromStr for InputSpec {
    type Err = Infallible;

    /// Parse `name=path` or a bare path.
    ///
    /// An input that names an existing file or directory is always a bare
    /// path, so `lib=1.0.jar` in the working directory is read whole. A
    /// prefix containing a path separator is also treated as part of the
    /// path.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse_with(input, |path| path.exists()))
    }
}

impl InputSpec {
    fn parse_with(input: &str, exists: impl Fn(&Utf8Path) -> bool) -> Self {
        let bare = || Self {
            name: None,
            path: Utf8PathBuf::from(input),
        };
        if exists(Utf8Path::new(input)) {
            return bare();
        }
        match input.split_once('=') {
            Some((name, path))
                if !name.is_empty() && !path.is_empty() && !name.contains(['/', '\\']) =>
            {
                Self {
                    name: Some(name.to_owned()),
                    path: Utf8PathBuf::from(path),
                }
            }
            _ => bare(),
        }
    }

    /// Open the input as an archive source. Directories are read as
    /// compiled output; anything else as a zip archive.
    #[must_use]
    pub fn to_source(&self) -> Box<dyn ArchiveSource> {
        let path = self.path.clone();
        match (&self.name, path.is_dir()) {
            (Some(name), true) => Box::new(DirectorySource::named(name.as_str(), path)),
            (None, true) => Box::new(DirectorySource::new(path)),
            (Some(name), false) => Box::new(ZipSource::named(name.as_str(), path)),
            (None, false) => Box::new(ZipSource::new(path)),
        }
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
