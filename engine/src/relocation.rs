//! Namespace relocation for entry paths and payloads.
//!
//! A [`RelocationRule`] moves every name under a source namespace (for
//! example `de.tr7zw.changeme.nbtapi`) to a target namespace. Rules are
//! accepted in dotted or slashed form and kept in both, because archive
//! paths and class descriptors use slashes while reflection strings and
//! service registrations use dots.
//!
//! [`RelocationMap`] keeps rules ordered longest source first, so the most
//! specific rule wins whenever several prefixes apply.

use crate::class_file::{self, ClassFormatError};
use crate::error::{PackagingError, Result};
use std::borrow::Cow;
use std::fmt;

/// Directory holding service-registration files named after dotted types.
const SERVICES_DIR: &str = "META-INF/services/";

/// A single source-to-target namespace rewrite.
///
/// # Examples
///
/// ```
/// use arrow_shade_engine::relocation::RelocationRule;
///
/// let rule = RelocationRule::new(
///     "de.tr7zw.changeme.nbtapi",
///     "org/broken/arrow/library/dependencies/nbt",
/// )
/// .expect("valid rule");
/// assert_eq!(rule.to_namespace(), "org.broken.arrow.library.dependencies.nbt");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocationRule {
    from_dotted: String,
    from_slashed: String,
    to_dotted: String,
    to_slashed: String,
}

impl RelocationRule {
    /// Create a rule from dotted or slashed namespaces.
    ///
    /// # Errors
    ///
    /// Returns [`PackagingError::InvalidRelocation`] when either namespace
    /// is empty, contains whitespace, or has an empty segment.
    pub fn new(from: &str, to: &str) -> Result<Self> {
        let invalid = |reason: &str| PackagingError::InvalidRelocation {
            from: from.to_owned(),
            to: to.to_owned(),
            reason: reason.to_owned(),
        };
        let from_dotted = normalise_namespace(from).map_err(|reason| invalid(reason))?;
        let to_dotted = normalise_namespace(to).map_err(|reason| invalid(reason))?;

        Ok(Self {
            from_slashed: from_dotted.replace('.', "/"),
            to_slashed: to_dotted.replace('.', "/"),
            from_dotted,
            to_dotted,
        })
    }

    /// Source namespace in dotted form.
    #[must_use]
    pub fn from_namespace(&self) -> &str {
        &self.from_dotted
    }

    /// Target namespace in dotted form.
    #[must_use]
    pub fn to_namespace(&self) -> &str {
        &self.to_dotted
    }

    /// Source namespace in slashed (path) form.
    #[must_use]
    pub fn from_path(&self) -> &str {
        &self.from_slashed
    }

    /// Target namespace in slashed (path) form.
    #[must_use]
    pub fn to_path(&self) -> &str {
        &self.to_slashed
    }

    /// The `(from, to)` byte pairs searched for in payloads.
    fn forms(&self) -> impl Iterator<Item = (&[u8], &[u8])> {
        let dotted = (self.from_dotted.as_bytes(), self.to_dotted.as_bytes());
        let slashed = (self.from_slashed.as_bytes(), self.to_slashed.as_bytes());
        // Single-segment namespaces read the same in both forms.
        let second = (self.from_slashed != self.from_dotted).then_some(slashed);
        std::iter::once(dotted).chain(second)
    }
}

impl fmt::Display for RelocationRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.from_dotted, self.to_dotted)
    }
}

/// Convert a namespace to dotted form, rejecting malformed input.
fn normalise_namespace(raw: &str) -> std::result::Result<String, &'static str> {
    let trimmed = raw.trim().trim_end_matches(['.', '/']);
    if trimmed.is_empty() {
        return Err("namespace is empty");
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err("namespace contains whitespace");
    }
    let dotted = trimmed.replace('/', ".");
    if dotted.split('.').any(str::is_empty) {
        return Err("namespace has an empty segment");
    }
    Ok(dotted)
}

/// Ordered relocation rules applied to every surviving entry.
#[derive(Debug, Clone, Default)]
pub struct RelocationMap {
    /// Sorted by descending source length; ties keep insertion order.
    rules: Vec<RelocationRule>,
}

impl RelocationMap {
    /// Create a map with no rules; everything passes through unchanged.
    #[must_use]
    pub const fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Build a map from rules, rejecting conflicting sources.
    ///
    /// # Errors
    ///
    /// Returns [`PackagingError::RelocationConflict`] if two rules share a
    /// source namespace but disagree on the target.
    pub fn from_rules<I>(rules: I) -> Result<Self>
    where
        I: IntoIterator<Item = RelocationRule>,
    {
        let mut map = Self::new();
        for rule in rules {
            map.insert(rule)?;
        }
        Ok(map)
    }

    /// Add a rule. Exact duplicates are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`PackagingError::RelocationConflict`] if a rule with the same
    /// source namespace and a different target is already present.
    pub fn insert(&mut self, rule: RelocationRule) -> Result<()> {
        if let Some(existing) = self
            .rules
            .iter()
            .find(|r| r.from_dotted == rule.from_dotted)
        {
            if existing.to_dotted == rule.to_dotted {
                return Ok(());
            }
            return Err(PackagingError::RelocationConflict {
                namespace: rule.from_dotted,
                first: existing.to_dotted.clone(),
                second: rule.to_dotted,
            });
        }

        let position = self
            .rules
            .iter()
            .position(|r| r.from_dotted.len() < rule.from_dotted.len())
            .unwrap_or(self.rules.len());
        self.rules.insert(position, rule);
        Ok(())
    }

    /// Whether the map holds no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Iterate over rules, most specific first.
    pub fn iter(&self) -> impl Iterator<Item = &RelocationRule> {
        self.rules.iter()
    }

    /// Rewrite an entry path.
    ///
    /// The longest rule whose slashed source prefixes `path` replaces that
    /// prefix. Service-registration files additionally have their dotted
    /// file name relocated.
    ///
    /// # Examples
    ///
    /// ```
    /// use arrow_shade_engine::relocation::{RelocationMap, RelocationRule};
    ///
    /// let map = RelocationMap::from_rules([RelocationRule::new(
    ///     "de.tr7zw.changeme.nbtapi",
    ///     "org.broken.arrow.library.dependencies.nbt",
    /// )
    /// .expect("valid rule")])
    /// .expect("no conflicts");
    ///
    /// assert_eq!(
    ///     map.rewrite_path("de/tr7zw/changeme/nbtapi/NBTItem.class"),
    ///     "org/broken/arrow/library/dependencies/nbt/NBTItem.class"
    /// );
    /// ```
    #[must_use]
    pub fn rewrite_path<'a>(&self, path: &'a str) -> Cow<'a, str> {
        if let Some(service) = path.strip_prefix(SERVICES_DIR) {
            return self
                .rules
                .iter()
                .find_map(|rule| {
                    service
                        .strip_prefix(rule.from_dotted.as_str())
                        .map(|rest| format!("{SERVICES_DIR}{}{rest}", rule.to_dotted))
                })
                .map_or(Cow::Borrowed(path), Cow::Owned);
        }

        self.rules
            .iter()
            .find_map(|rule| {
                path.strip_prefix(rule.from_slashed.as_str())
                    .map(|rest| format!("{}{rest}", rule.to_slashed))
            })
            .map_or(Cow::Borrowed(path), Cow::Owned)
    }

    /// Replace every dotted and slashed occurrence of a source namespace.
    ///
    /// Scans left to right; at each position the longest matching rule is
    /// applied and scanning resumes after the replaced text, so targets are
    /// never rewritten twice.
    #[must_use]
    pub fn rewrite_references<'a>(&self, content: &'a [u8]) -> Cow<'a, [u8]> {
        self.replace_namespaces(content)
            .map_or(Cow::Borrowed(content), Cow::Owned)
    }

    /// Rewrite an entry payload according to its kind.
    ///
    /// Compiled classes are rewritten through their constant pool; other
    /// payloads that pass [`is_text_payload`] are rewritten as text; anything
    /// else is returned unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ClassFormatError`] when a class payload is malformed.
    pub fn rewrite_payload<'a>(
        &self,
        path: &str,
        content: &'a [u8],
    ) -> std::result::Result<Cow<'a, [u8]>, ClassFormatError> {
        if self.is_empty() {
            return Ok(Cow::Borrowed(content));
        }
        if class_file::is_class_file(path, content) {
            let rewritten =
                class_file::rewrite_utf8_constants(content, |bytes| self.replace_namespaces(bytes))?;
            return Ok(rewritten.map_or(Cow::Borrowed(content), Cow::Owned));
        }
        if is_text_payload(content) {
            return Ok(self.rewrite_references(content));
        }
        Ok(Cow::Borrowed(content))
    }

    fn replace_namespaces(&self, content: &[u8]) -> Option<Vec<u8>> {
        let mut out: Option<Vec<u8>> = None;
        let mut copied = 0;
        let mut pos = 0;

        while let Some(window) = content.get(pos..) {
            if window.is_empty() {
                break;
            }
            let Some((from, to)) = self.match_at(window) else {
                pos += 1;
                continue;
            };
            let buffer = out.get_or_insert_with(|| Vec::with_capacity(content.len()));
            buffer.extend_from_slice(content.get(copied..pos).unwrap_or_default());
            buffer.extend_from_slice(to);
            pos += from.len();
            copied = pos;
        }

        out.map(|mut buffer| {
            buffer.extend_from_slice(content.get(copied..).unwrap_or_default());
            buffer
        })
    }

    fn match_at(&self, window: &[u8]) -> Option<(&[u8], &[u8])> {
        self.rules
            .iter()
            .flat_map(|rule| rule.forms())
            .find(|(from, _)| window.starts_with(from))
    }
}

/// Whether a payload is text: valid UTF-8 with no control bytes other than
/// tab, carriage return, and line feed.
///
/// Length-prefixed binary formats such as `.kotlin_module` are often pure
/// ASCII but carry control bytes in their framing, so they are left alone.
#[must_use]
pub fn is_text_payload(content: &[u8]) -> bool {
    std::str::from_utf8(content).is_ok()
        && !content
            .iter()
            .any(|&byte| byte.is_ascii_control() && !matches!(byte, b'\t' | b'\r' | b'\n'))
}

#[cfg(test)]
#[path = "relocation_tests.rs"]
mod tests;
