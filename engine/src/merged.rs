//! The merged output archive.
//!
//! [`MergedArchive`] accumulates entries in first-insertion order and
//! resolves collisions according to a [`DuplicatePolicy`]. Finalizing writes
//! a zip file with fixed timestamps and permissions, so identical inputs
//! always produce identical bytes. The archive is written to a temporary
//! file beside the destination and only renamed into place once complete;
//! on any failure the temporary file is removed and nothing is left under
//! the final name.

use crate::duplicates::{DuplicatePolicy, merge_lines};
use crate::error::{PackagingError, Result};
use camino::Utf8Path;
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{Read, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// Jar manifest, which readers expect at the start of the archive.
pub const MANIFEST_PATH: &str = "META-INF/MANIFEST.MF";

const FILE_PERMISSIONS: u32 = 0o644;
const DIRECTORY_PERMISSIONS: u32 = 0o755;

/// What happened when an entry was offered to the archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The path was new and the entry was added.
    Added,
    /// The path existed; the earlier entry was kept.
    KeptFirst,
    /// The path existed; the new entry replaced it.
    Overwritten,
    /// The path existed; both payloads were merged line by line.
    Merged,
}

#[derive(Debug)]
struct MergedEntry {
    path: String,
    content: Vec<u8>,
    origin: String,
}

/// The in-progress output of a merge.
#[derive(Debug, Default)]
pub struct MergedArchive {
    entries: Vec<MergedEntry>,
    index: HashMap<String, usize>,
}

/// Result of writing a [`MergedArchive`] to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedArchive {
    /// Every path written, directories included, in archive order.
    pub written: Vec<String>,
    /// Lowercase hex SHA-256 of the archive file.
    pub sha256: String,
}

impl MergedArchive {
    /// Create an empty archive.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of file entries held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no file entry has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Payload currently stored for `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&[u8]> {
        self.index
            .get(path)
            .and_then(|&slot| self.entries.get(slot))
            .map(|entry| entry.content.as_slice())
    }

    /// File paths in insertion order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.path.as_str())
    }

    /// Offer an entry from the input named `origin`.
    ///
    /// # Errors
    ///
    /// Returns [`PackagingError::DuplicateEntry`] when `path` is already
    /// present and `policy` is [`DuplicatePolicy::Fail`].
    pub fn insert(
        &mut self,
        path: String,
        content: Vec<u8>,
        origin: &str,
        policy: DuplicatePolicy,
    ) -> Result<InsertOutcome> {
        let Some(existing) = self
            .index
            .get(&path)
            .and_then(|&slot| self.entries.get_mut(slot))
        else {
            self.index.insert(path.clone(), self.entries.len());
            self.entries.push(MergedEntry {
                path,
                content,
                origin: origin.to_owned(),
            });
            return Ok(InsertOutcome::Added);
        };

        match policy {
            DuplicatePolicy::KeepFirst => Ok(InsertOutcome::KeptFirst),
            DuplicatePolicy::Overwrite => {
                existing.content = content;
                origin.clone_into(&mut existing.origin);
                Ok(InsertOutcome::Overwritten)
            }
            DuplicatePolicy::Merge => {
                existing.content = merge_lines(&existing.content, &content);
                Ok(InsertOutcome::Merged)
            }
            DuplicatePolicy::Fail => Err(PackagingError::DuplicateEntry {
                path,
                first: existing.origin.clone(),
                second: origin.to_owned(),
            }),
        }
    }

    /// Write the archive to `destination` and close it.
    ///
    /// Parent directory entries are synthesized for every file; the jar
    /// manifest, when present, is written first.
    ///
    /// # Errors
    ///
    /// Returns [`PackagingError::ArchiveWrite`] if the archive cannot be
    /// written or moved into place. No file is left at `destination` in
    /// that case.
    pub fn finalize(self, destination: &Utf8Path) -> Result<FinalizedArchive> {
        let write_error = |reason: String| PackagingError::ArchiveWrite {
            path: destination.to_path_buf(),
            reason,
        };

        let parent = destination
            .parent()
            .filter(|p| !p.as_str().is_empty())
            .unwrap_or_else(|| Utf8Path::new("."));
        let temp = tempfile::Builder::new()
            .prefix(".arrow-shade-")
            .suffix(".tmp")
            .tempfile_in(parent)
            .map_err(|e| write_error(e.to_string()))?;

        let mut writer = ZipWriter::new(temp);
        let written = self
            .write_entries(&mut writer)
            .map_err(|e| write_error(e.to_string()))?;
        let temp = writer.finish().map_err(|e| write_error(e.to_string()))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| write_error(e.to_string()))?;
        let sha256 = temp
            .reopen()
            .and_then(sha256_of)
            .map_err(|e| write_error(e.to_string()))?;
        temp.persist(destination)
            .map_err(|e| write_error(e.error.to_string()))?;

        Ok(FinalizedArchive { written, sha256 })
    }

    fn write_entries<W: Write + std::io::Seek>(
        &self,
        writer: &mut ZipWriter<W>,
    ) -> zip::result::ZipResult<Vec<String>> {
        let file_options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default())
            .unix_permissions(FILE_PERMISSIONS);
        let directory_options = file_options.unix_permissions(DIRECTORY_PERMISSIONS);

        let manifest = self.entries.iter().filter(|e| e.path == MANIFEST_PATH);
        let rest = self.entries.iter().filter(|e| e.path != MANIFEST_PATH);

        let mut directories: HashSet<&str> = HashSet::new();
        let mut written = Vec::new();
        for entry in manifest.chain(rest) {
            for directory in parent_directories(&entry.path) {
                if directories.insert(directory) {
                    writer.add_directory(directory, directory_options)?;
                    written.push(directory.to_owned());
                }
            }
            writer.start_file(entry.path.as_str(), file_options)?;
            writer.write_all(&entry.content)?;
            written.push(entry.path.clone());
        }
        Ok(written)
    }
}

/// Ancestor directories of `path`, outermost first, each ending in `/`.
fn parent_directories(path: &str) -> impl Iterator<Item = &str> {
    path.match_indices('/')
        .filter_map(move |(slash, _)| path.get(..=slash))
}

/// Compute the SHA-256 digest of a file as lowercase hex.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read.
pub fn compute_sha256(path: &Utf8Path) -> std::io::Result<String> {
    sha256_of(fs::File::open(path)?)
}

/// SHA-256 of everything `reader` yields, as lowercase hex.
fn sha256_of(mut reader: impl Read) -> std::io::Result<String> {
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = reader.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(buffer.get(..bytes_read).unwrap_or_default());
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
#[path = "merged_tests.rs"]
mod tests;
