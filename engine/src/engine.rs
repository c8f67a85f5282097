//! The shade engine: merge, filter, relocate, finalize.
//!
//! A [`ShadeEngine`] runs exactly once. It walks the inputs in the order
//! the caller supplied them, since that order decides which copy of a
//! duplicated path survives, and moves through
//! `Idle -> Merging -> Finalizing -> Done`, or into `Failed` on the first
//! error. A spent engine refuses to run again.

use crate::configuration::ShadeConfiguration;
use crate::duplicates::DuplicatePolicy;
use crate::error::{PackagingError, Result};
use crate::merged::{InsertOutcome, MergedArchive};
use crate::source::ArchiveSource;
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info, trace};
use serde::Serialize;
use std::borrow::Cow;
use std::fmt;

/// Lifecycle of a [`ShadeEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineState {
    /// Constructed, not yet run.
    Idle,
    /// Reading and filtering inputs.
    Merging,
    /// Writing the output archive.
    Finalizing,
    /// The archive was written successfully.
    Done,
    /// The run aborted; no archive was left behind.
    Failed,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Merging => "merging",
            Self::Finalizing => "finalizing",
            Self::Done => "done",
            Self::Failed => "failed",
        })
    }
}

/// Counters describing what a merge did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    /// Inputs read.
    pub inputs: usize,
    /// File entries dropped by exclusion patterns.
    pub excluded: usize,
    /// File entries whose path or payload was rewritten.
    pub relocated: usize,
    /// Collisions resolved by a duplicate policy.
    pub duplicates_resolved: usize,
    /// Directory entries skipped in favour of synthesized ones.
    pub directories_skipped: usize,
}

/// The finished archive, handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShadedArtifact {
    /// Archive file name.
    pub file_name: String,
    /// Full path of the archive.
    pub path: Utf8PathBuf,
    /// Lowercase hex SHA-256 of the archive.
    pub sha256: String,
    /// Every path written, directories included, in archive order.
    pub entries: Vec<String>,
    /// What the merge did.
    pub stats: MergeStats,
}

/// Merges inputs into one shaded archive according to a configuration.
#[derive(Debug)]
pub struct ShadeEngine {
    config: ShadeConfiguration,
    state: EngineState,
}

impl ShadeEngine {
    /// Create an idle engine that owns `config`.
    #[must_use]
    pub const fn new(config: ShadeConfiguration) -> Self {
        Self {
            config,
            state: EngineState::Idle,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> EngineState {
        self.state
    }

    /// The configuration this engine runs with.
    #[must_use]
    pub const fn config(&self) -> &ShadeConfiguration {
        &self.config
    }

    /// Merge `inputs` into `output_dir/<archive name>`.
    ///
    /// Inputs are read one at a time and released before the next is
    /// opened. Earlier inputs take precedence under `keep-first`.
    ///
    /// # Errors
    ///
    /// - [`PackagingError::EngineSpent`] if this engine already ran.
    /// - [`PackagingError::ArchiveRead`] if an input cannot be read.
    /// - [`PackagingError::MalformedClass`] if a relocated class is corrupt.
    /// - [`PackagingError::DuplicateEntry`] on a collision under `fail`.
    /// - [`PackagingError::ArchiveWrite`] if the output cannot be written.
    ///
    /// In every case no archive is left at the output path.
    pub fn merge<I>(&mut self, inputs: I, output_dir: &Utf8Path) -> Result<ShadedArtifact>
    where
        I: IntoIterator,
        I::Item: ArchiveSource,
    {
        if self.state != EngineState::Idle {
            return Err(PackagingError::EngineSpent { state: self.state });
        }

        let outcome = self.run(inputs, output_dir);
        self.state = if outcome.is_ok() {
            EngineState::Done
        } else {
            EngineState::Failed
        };
        outcome
    }

    fn run<I>(&mut self, inputs: I, output_dir: &Utf8Path) -> Result<ShadedArtifact>
    where
        I: IntoIterator,
        I::Item: ArchiveSource,
    {
        self.state = EngineState::Merging;
        let mut merged = MergedArchive::new();
        let mut stats = MergeStats::default();
        for mut source in inputs {
            self.merge_source(&mut source, &mut merged, &mut stats)?;
        }

        self.state = EngineState::Finalizing;
        let file_name = self.config.archive_name().filename();
        let path = output_dir.join(&file_name);
        debug!("finalizing {} file entries into {path}", merged.len());
        let finalized = merged.finalize(&path)?;

        info!(
            "wrote {path}: {} entries from {} inputs ({} excluded, {} relocated, {} duplicates resolved)",
            finalized.written.len(),
            stats.inputs,
            stats.excluded,
            stats.relocated,
            stats.duplicates_resolved
        );
        Ok(ShadedArtifact {
            file_name,
            path,
            sha256: finalized.sha256,
            entries: finalized.written,
            stats,
        })
    }

    fn merge_source<S: ArchiveSource>(
        &self,
        source: &mut S,
        merged: &mut MergedArchive,
        stats: &mut MergeStats,
    ) -> Result<()> {
        let origin = source.name().to_owned();
        let entries = source.read_entries()?;
        stats.inputs += 1;
        debug!("merging {} entries from {origin}", entries.len());

        let patterns = self.config.patterns();
        let relocations = self.config.relocations();
        for entry in entries {
            if entry.is_directory() {
                stats.directories_skipped += 1;
                continue;
            }
            let (path, content) = entry.into_parts();
            if patterns.should_exclude(&path) {
                trace!("excluded {path} from {origin}");
                stats.excluded += 1;
                continue;
            }

            let rewritten_content = match relocations.rewrite_payload(&path, &content) {
                Ok(Cow::Owned(bytes)) => Some(bytes),
                Ok(Cow::Borrowed(_)) => None,
                Err(e) => {
                    return Err(PackagingError::MalformedClass {
                        archive: origin,
                        path,
                        reason: e.to_string(),
                    });
                }
            };
            let rewritten_path = match relocations.rewrite_path(&path) {
                Cow::Owned(new_path) => Some(new_path),
                Cow::Borrowed(_) => None,
            };
            if rewritten_path.is_some() || rewritten_content.is_some() {
                trace!("relocated {path} from {origin}");
                stats.relocated += 1;
            }

            let target = rewritten_path.unwrap_or(path);
            let payload = rewritten_content.unwrap_or(content);
            let policy = self.config.duplicates().policy_for(&target);
            let outcome = merged.insert(target, payload, &origin, policy)?;
            if outcome != InsertOutcome::Added {
                stats.duplicates_resolved += 1;
                if policy != DuplicatePolicy::Merge {
                    debug!("duplicate entry from {origin} resolved by {policy}");
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
