//! Wiring between the command line, `shade.toml`, and the engine.

use crate::cli::Cli;
use crate::config::{ConfigError, ShadeFile};
use arrow_shade_engine::{ArchiveSource, PackagingError, ShadeEngine, ShadedArtifact};
use camino::Utf8PathBuf;
use log::{debug, info};
use std::fs;
use thiserror::Error;

/// Errors surfaced by the `arrow-shade` binary.
#[derive(Debug, Error)]
pub enum CliError {
    /// The configuration could not be loaded or applied.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The merge failed.
    #[error(transparent)]
    Packaging(#[from] PackagingError),

    /// The output directory could not be created.
    #[error("cannot create output directory {path}: {source}")]
    OutputDir {
        /// Directory that was being created.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The JSON report could not be rendered.
    #[error("cannot render report: {0}")]
    Report(#[from] serde_json::Error),
}

/// Load the configuration named by `cli` and shade its inputs.
///
/// # Errors
///
/// Returns [`CliError`] when the configuration is missing or invalid, the
/// output directory cannot be created, or the merge fails. No archive is
/// left behind on failure.
pub fn run(cli: &Cli) -> Result<ShadedArtifact, CliError> {
    let file = ShadeFile::load(&cli.config)?;
    let identity = file.identity(&cli.identity_overrides())?;
    let config = file.to_configuration(identity, cli.classifier.as_deref())?;
    info!(
        "shading {} inputs into {}",
        cli.inputs.len(),
        config.archive_name()
    );

    fs::create_dir_all(&cli.output_dir).map_err(|source| CliError::OutputDir {
        path: cli.output_dir.clone(),
        source,
    })?;

    let sources: Vec<Box<dyn ArchiveSource>> = cli
        .inputs
        .iter()
        .inspect(|input| debug!("input {}", input.path))
        .map(crate::cli::InputSpec::to_source)
        .collect();
    let mut engine = ShadeEngine::new(config);
    Ok(engine.merge(sources, &cli.output_dir)?)
}

/// Render the line printed on success: the archive path, or a JSON report.
///
/// # Errors
///
/// Returns [`CliError::Report`] if the report cannot be serialised.
pub fn render_report(artifact: &ShadedArtifact, json: bool) -> Result<String, CliError> {
    if json {
        Ok(serde_json::to_string_pretty(artifact)?)
    } else {
        Ok(artifact.path.to_string())
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
