//! Input archives for the shade engine.
//!
//! Every input, whether a dependency jar or the module's own compiled
//! output directory, is read through the [`ArchiveSource`] trait. Sources
//! yield entries in a stable order so that merges are reproducible, and
//! reject entry paths that would escape the archive root.

use crate::error::{PackagingError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use log::trace;
use std::fs;
use std::io::Read;

/// A single named payload read from an input archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    path: String,
    content: Vec<u8>,
    is_directory: bool,
}

impl ArchiveEntry {
    /// Create a file entry.
    #[must_use]
    pub fn file(path: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            is_directory: false,
        }
    }

    /// Create a directory entry. Paths end with `/`.
    #[must_use]
    pub fn directory(path: impl Into<String>) -> Self {
        let mut path = path.into();
        if !path.ends_with('/') {
            path.push('/');
        }
        Self {
            path,
            content: Vec::new(),
            is_directory: true,
        }
    }

    /// Slash-separated virtual path inside the archive.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Entry payload.
    #[must_use]
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// Whether the entry is a directory marker.
    #[must_use]
    pub const fn is_directory(&self) -> bool {
        self.is_directory
    }

    /// Split the entry into its path and payload.
    #[must_use]
    pub fn into_parts(self) -> (String, Vec<u8>) {
        (self.path, self.content)
    }
}

/// Trait for reading input archives, enabling test mocking.
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveSource {
    /// Logical name used in logs and error messages.
    fn name(&self) -> &str;

    /// Read every entry of the archive, in archive order.
    ///
    /// # Errors
    ///
    /// Returns [`PackagingError::ArchiveRead`] when the archive cannot be
    /// opened or is corrupt, including entries whose paths escape the
    /// archive root.
    fn read_entries(&mut self) -> Result<Vec<ArchiveEntry>>;
}

impl<T: ArchiveSource + ?Sized> ArchiveSource for Box<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn read_entries(&mut self) -> Result<Vec<ArchiveEntry>> {
        (**self).read_entries()
    }
}

/// A zip or jar file on disk.
#[derive(Debug, Clone)]
pub struct ZipSource {
    name: String,
    path: Utf8PathBuf,
}

impl ZipSource {
    /// Create a source named after the file name of `path`.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        let path = path.into();
        let name = path.file_name().unwrap_or(path.as_str()).to_owned();
        Self { name, path }
    }

    /// Create a source with an explicit logical name.
    #[must_use]
    pub fn named(name: impl Into<String>, path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    /// Location of the archive on disk.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn read_error(&self, reason: impl ToString) -> PackagingError {
        PackagingError::ArchiveRead {
            archive: self.name.clone(),
            reason: reason.to_string(),
        }
    }
}

impl ArchiveSource for ZipSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_entries(&mut self) -> Result<Vec<ArchiveEntry>> {
        let file = fs::File::open(&self.path).map_err(|e| self.read_error(e))?;
        let mut archive = zip::ZipArchive::new(file).map_err(|e| self.read_error(e))?;
        let mut entries = Vec::with_capacity(archive.len());

        for index in 0..archive.len() {
            let mut file = archive.by_index(index).map_err(|e| self.read_error(e))?;
            let path = file.name().to_owned();
            validate_entry_path(&path).map_err(|reason| self.read_error(reason))?;

            if file.is_dir() {
                entries.push(ArchiveEntry::directory(path));
                continue;
            }

            let capacity = usize::try_from(file.size()).unwrap_or_default();
            let mut content = Vec::with_capacity(capacity);
            file.read_to_end(&mut content)
                .map_err(|e| self.read_error(format!("{path}: {e}")))?;
            trace!("read {path} ({} bytes) from {}", content.len(), self.name);
            entries.push(ArchiveEntry::file(path, content));
        }

        Ok(entries)
    }
}

/// A directory tree, such as a module's compiled class output.
///
/// Entries are produced in lexicographic path order.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    name: String,
    root: Utf8PathBuf,
}

impl DirectorySource {
    /// Create a source named after the directory.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        let root = root.into();
        let name = root.file_name().unwrap_or(root.as_str()).to_owned();
        Self { name, root }
    }

    /// Create a source with an explicit logical name.
    #[must_use]
    pub fn named(name: impl Into<String>, root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
        }
    }

    fn read_error(&self, reason: impl ToString) -> PackagingError {
        PackagingError::ArchiveRead {
            archive: self.name.clone(),
            reason: reason.to_string(),
        }
    }

    fn walk(&self, dir: &Utf8Path, prefix: &str, entries: &mut Vec<ArchiveEntry>) -> Result<()> {
        let mut children = Vec::new();
        for entry in dir.read_dir_utf8().map_err(|e| self.read_error(e))? {
            let entry = entry.map_err(|e| self.read_error(e))?;
            let file_type = entry.file_type().map_err(|e| self.read_error(e))?;
            children.push((entry.file_name().to_owned(), file_type.is_dir()));
        }
        children.sort();

        for (name, is_dir) in children {
            let path = format!("{prefix}{name}");
            let location = dir.join(&name);
            if is_dir {
                entries.push(ArchiveEntry::directory(path.as_str()));
                self.walk(&location, &format!("{path}/"), entries)?;
            } else {
                let content = fs::read(&location).map_err(|e| self.read_error(format!("{location}: {e}")))?;
                entries.push(ArchiveEntry::file(path, content));
            }
        }
        Ok(())
    }
}

impl ArchiveSource for DirectorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_entries(&mut self) -> Result<Vec<ArchiveEntry>> {
        if !self.root.is_dir() {
            return Err(self.read_error(format!("{} is not a directory", self.root)));
        }
        let mut entries = Vec::new();
        self.walk(&self.root, "", &mut entries)?;
        Ok(entries)
    }
}

/// Validate that an entry path stays inside the archive root.
fn validate_entry_path(path: &str) -> std::result::Result<(), String> {
    if path.starts_with('/') || path.starts_with('\\') {
        return Err(format!("absolute entry path: {path}"));
    }
    if path.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(format!("path traversal detected: {path}"));
    }
    Ok(())
}
