//! Builders and readers shared by unit and behaviour tests.
//!
//! Only compiled for tests or with the `test-support` feature.

use crate::class_file::{CLASS_MAGIC, ClassFormatError, rewrite_utf8_constants};
use crate::error::Result;
use crate::source::{ArchiveEntry, ArchiveSource};
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;

/// Builds minimal but structurally valid class files.
///
/// The constant pool holds the class name, `java/lang/Object`, any extra
/// strings (each with a `CONSTANT_String` pointing at it) and optional long
/// constants, so tests exercise two-slot entries too.
#[derive(Debug, Clone)]
pub struct ClassFileBuilder {
    this_class: String,
    constants: Vec<Constant>,
}

#[derive(Debug, Clone)]
enum Constant {
    Text(String),
    Long(i64),
}

impl ClassFileBuilder {
    /// Bytes after the constant pool: flags, this/super, and empty tables.
    pub const TRAILER_LEN: usize = 14;

    /// Start a class named `this_class` (slashed internal form).
    #[must_use]
    pub fn new(this_class: &str) -> Self {
        Self {
            this_class: this_class.to_owned(),
            constants: Vec::new(),
        }
    }

    /// Add a string literal constant.
    #[must_use]
    pub fn with_string(mut self, text: &str) -> Self {
        self.constants.push(Constant::Text(text.to_owned()));
        self
    }

    /// Add a long constant.
    #[must_use]
    pub fn with_long(mut self, value: i64) -> Self {
        self.constants.push(Constant::Long(value));
        self
    }

    /// Encode the class.
    #[must_use]
    pub fn build(&self) -> Vec<u8> {
        let mut pool = Vec::new();
        let mut slots: u16 = 0;

        push_utf8(&mut pool, &self.this_class);
        pool.extend_from_slice(&[7, 0, 1]);
        push_utf8(&mut pool, "java/lang/Object");
        pool.extend_from_slice(&[7, 0, 3]);
        slots += 4;

        for constant in &self.constants {
            match constant {
                Constant::Text(text) => {
                    push_utf8(&mut pool, text);
                    let utf8_index = slots + 1;
                    pool.push(8);
                    pool.extend_from_slice(&utf8_index.to_be_bytes());
                    slots += 2;
                }
                Constant::Long(value) => {
                    pool.push(5);
                    pool.extend_from_slice(&value.to_be_bytes());
                    slots += 2;
                }
            }
        }

        let mut class = CLASS_MAGIC.to_vec();
        class.extend_from_slice(&[0, 0, 0, 52]);
        class.extend_from_slice(&(slots + 1).to_be_bytes());
        class.extend_from_slice(&pool);
        // public super class, this = #2, super = #4, no interfaces,
        // fields, methods, or attributes.
        class.extend_from_slice(&[0, 0x21, 0, 2, 0, 4, 0, 0, 0, 0, 0, 0, 0, 0]);
        class
    }
}

fn push_utf8(pool: &mut Vec<u8>, text: &str) {
    pool.push(1);
    let len = u16::try_from(text.len()).unwrap_or(u16::MAX);
    pool.extend_from_slice(&len.to_be_bytes());
    pool.extend_from_slice(text.as_bytes());
}

/// List the `CONSTANT_Utf8` values of a class, in pool order.
///
/// # Errors
///
/// Returns [`ClassFormatError`] when the class cannot be parsed.
pub fn utf8_constants(class: &[u8]) -> std::result::Result<Vec<String>, ClassFormatError> {
    let mut constants = Vec::new();
    rewrite_utf8_constants(class, |bytes| {
        constants.push(String::from_utf8_lossy(bytes).into_owned());
        None
    })?;
    Ok(constants)
}

/// Write a jar at `path`. Paths ending in `/` become directory entries.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be written.
pub fn write_jar(path: &Path, entries: &[(&str, &[u8])]) -> std::io::Result<()> {
    let file = fs::File::create(path)?;
    let mut writer = zip::ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    for (name, content) in entries {
        if name.ends_with('/') {
            writer.add_directory(*name, options)?;
        } else {
            writer.start_file(*name, options)?;
            writer.write_all(content)?;
        }
    }
    writer.finish()?;
    Ok(())
}

/// Read every entry of a jar as `(path, content)` pairs, in archive order.
///
/// # Errors
///
/// Returns an I/O error if the archive cannot be read.
pub fn read_jar(path: &Path) -> std::io::Result<Vec<(String, Vec<u8>)>> {
    let file = fs::File::open(path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let mut content = Vec::new();
        entry.read_to_end(&mut content)?;
        entries.push((entry.name().to_owned(), content));
    }
    Ok(entries)
}

/// An in-memory input archive.
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    entries: Vec<ArchiveEntry>,
}

impl MemorySource {
    /// Create an empty source.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            entries: Vec::new(),
        }
    }

    /// Add a file entry.
    #[must_use]
    pub fn with_file(mut self, path: &str, content: impl Into<Vec<u8>>) -> Self {
        self.entries.push(ArchiveEntry::file(path, content));
        self
    }

    /// Add a directory entry.
    #[must_use]
    pub fn with_directory(mut self, path: &str) -> Self {
        self.entries.push(ArchiveEntry::directory(path));
        self
    }
}

impl ArchiveSource for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn read_entries(&mut self) -> Result<Vec<ArchiveEntry>> {
        Ok(self.entries.clone())
    }
}
