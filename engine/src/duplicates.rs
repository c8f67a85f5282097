//! Duplicate-entry policies.
//!
//! When two inputs contribute the same (rewritten) path, the policy chosen
//! for that path decides the outcome. A single default applies everywhere
//! unless a path-glob override says otherwise; the stock configuration
//! merges service-registration files and keeps the first copy of
//! everything else.

use crate::error::{PackagingError, Result};
use glob::{MatchOptions, Pattern};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Glob matched against service-registration files.
pub const SERVICE_FILES_GLOB: &str = "META-INF/services/**";

const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// How to resolve two entries that land on the same output path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DuplicatePolicy {
    /// Keep the entry from the earliest input.
    #[default]
    KeepFirst,
    /// Replace the kept entry with the later one.
    Overwrite,
    /// Concatenate logical lines, dropping repeats, in first-seen order.
    Merge,
    /// Abort the whole merge.
    Fail,
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::KeepFirst => "keep-first",
            Self::Overwrite => "overwrite",
            Self::Merge => "merge",
            Self::Fail => "fail",
        })
    }
}

/// A default policy plus ordered per-glob overrides.
#[derive(Debug, Clone, Default)]
pub struct DuplicateRules {
    default: DuplicatePolicy,
    overrides: Vec<(Pattern, DuplicatePolicy)>,
}

impl DuplicateRules {
    /// Rules that apply `default` to every path.
    #[must_use]
    pub const fn new(default: DuplicatePolicy) -> Self {
        Self {
            default,
            overrides: Vec::new(),
        }
    }

    /// `keep-first` everywhere except service files, which are merged.
    #[must_use]
    pub fn standard() -> Self {
        let mut rules = Self::new(DuplicatePolicy::KeepFirst);
        if let Ok(pattern) = Pattern::new(SERVICE_FILES_GLOB) {
            rules.overrides.push((pattern, DuplicatePolicy::Merge));
        }
        rules
    }

    /// Change the policy used when no override matches.
    pub fn set_default(&mut self, policy: DuplicatePolicy) {
        self.default = policy;
    }

    /// Add an override for paths matching `glob`.
    ///
    /// Overrides are consulted in insertion order; the first match wins.
    ///
    /// # Errors
    ///
    /// Returns [`PackagingError::InvalidPattern`] if `glob` is malformed.
    pub fn add_override(&mut self, glob: &str, policy: DuplicatePolicy) -> Result<()> {
        let pattern = Pattern::new(glob).map_err(|e| PackagingError::InvalidPattern {
            pattern: glob.to_owned(),
            reason: e.to_string(),
        })?;
        self.overrides.push((pattern, policy));
        Ok(())
    }

    /// Return the policy that governs `path`.
    #[must_use]
    pub fn policy_for(&self, path: &str) -> DuplicatePolicy {
        self.overrides
            .iter()
            .find(|(pattern, _)| pattern.matches_with(path, GLOB_OPTIONS))
            .map_or(self.default, |(_, policy)| *policy)
    }
}

/// Merge two listing payloads line by line.
///
/// Lines are split on `\n` with a trailing `\r` removed; blank lines are
/// dropped and repeated lines keep their first position. The result is
/// newline-terminated.
///
/// # Examples
///
/// ```
/// use arrow_shade_engine::duplicates::merge_lines;
///
/// assert_eq!(merge_lines(b"x\ny\n", b"y\nz\n"), b"x\ny\nz\n");
/// ```
#[must_use]
pub fn merge_lines(first: &[u8], second: &[u8]) -> Vec<u8> {
    let mut seen: Vec<&[u8]> = Vec::new();
    for line in logical_lines(first).chain(logical_lines(second)) {
        if !seen.contains(&line) {
            seen.push(line);
        }
    }

    let mut out = Vec::with_capacity(first.len() + second.len());
    for line in seen {
        out.extend_from_slice(line);
        out.push(b'\n');
    }
    out
}

fn logical_lines(content: &[u8]) -> impl Iterator<Item = &[u8]> {
    content
        .split(|b| *b == b'\n')
        .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
        .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
}
