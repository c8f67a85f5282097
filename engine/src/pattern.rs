//! Exclusion patterns for archive entry paths.
//!
//! A [`PatternSet`] answers one question: should an entry path be dropped
//! from the merged archive? Patterns come in three forms:
//!
//! - `*suffix`: the path ends with `suffix` (for example `*exclude.jar`).
//! - `prefix/`: the path starts with the literal text (for example
//!   `org/bukkit/`). Patterns without wildcards always use this form.
//! - anything else containing `*`, `?` or `[`: a glob whose wildcards do
//!   not cross `/`, except `**`.
//!
//! Matching is case-sensitive and has set semantics, so the order patterns
//! were added in never changes the answer.

use crate::error::{PackagingError, Result};
use glob::{MatchOptions, Pattern};
use std::fmt;

/// Globs treat `/` as a literal separator so `META-INF/*.SF` stays shallow.
const GLOB_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Exclusions applied by every module of the library build.
///
/// These cover packages the host server runtime already provides, plus
/// multi-release and build metadata that must not leak into shaded output.
const HOST_RUNTIME_EXCLUSIONS: &[&str] = &[
    "*exclude.jar",
    "com/github/angeschossen/",
    "org/spigotmc/",
    "org/bukkit/",
    "org/yaml/snakeyaml/",
    "com/google/",
    "net/md_5/bungee/",
    "org/apache/commons/",
    "mojang-translations/",
    "javax/annotation/",
    "org/joml/",
    "org/checkerframework/",
    "META-INF/proguard/",
    "META-INF/versions/",
    "META-INF/maven/com.google.code.findbugs/",
    "META-INF/maven/com.google.code.gson/",
    "META-INF/maven/com.google.errorprone/",
    "META-INF/maven/com.google.guava/",
    "META-INF/maven/net.md-5/",
    "META-INF/maven/org.joml/",
    "META-INF/maven/org.spigotmc/",
    "META-INF/maven/org.yaml/",
];

/// Signature files that relocation would invalidate.
pub(crate) const SIGNATURE_EXCLUSIONS: &[&str] =
    &["META-INF/*.SF", "META-INF/*.DSA", "META-INF/*.RSA"];

/// A single parsed exclusion pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExclusionPattern {
    /// Matches paths ending with the stored text.
    Suffix(String),
    /// Matches paths starting with the stored text.
    Prefix(String),
    /// Matches paths against a glob.
    Glob(Pattern),
}

impl ExclusionPattern {
    /// Parse a pattern string into its matching form.
    ///
    /// # Errors
    ///
    /// Returns [`PackagingError::InvalidPattern`] if the text is empty or is
    /// a malformed glob.
    pub fn parse(text: &str) -> Result<Self> {
        if text.is_empty() {
            return Err(PackagingError::InvalidPattern {
                pattern: text.to_owned(),
                reason: "pattern is empty".to_owned(),
            });
        }

        if let Some(suffix) = text.strip_prefix('*') {
            if !suffix.is_empty() && !has_wildcard(suffix) {
                return Ok(Self::Suffix(suffix.to_owned()));
            }
        }

        if has_wildcard(text) {
            return Pattern::new(text)
                .map(Self::Glob)
                .map_err(|e| PackagingError::InvalidPattern {
                    pattern: text.to_owned(),
                    reason: e.to_string(),
                });
        }

        Ok(Self::Prefix(text.to_owned()))
    }

    /// Return whether `path` matches this pattern.
    #[must_use]
    pub fn matches(&self, path: &str) -> bool {
        match self {
            Self::Suffix(suffix) => path.ends_with(suffix.as_str()),
            Self::Prefix(prefix) => path.starts_with(prefix.as_str()),
            Self::Glob(pattern) => pattern.matches_with(path, GLOB_OPTIONS),
        }
    }
}

impl fmt::Display for ExclusionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Suffix(suffix) => write!(f, "*{suffix}"),
            Self::Prefix(prefix) => f.write_str(prefix),
            Self::Glob(pattern) => f.write_str(pattern.as_str()),
        }
    }
}

fn has_wildcard(text: &str) -> bool {
    text.contains(['*', '?', '['])
}

/// The set of exclusion patterns consulted for every input entry.
///
/// # Examples
///
/// ```
/// use arrow_shade_engine::pattern::PatternSet;
///
/// let set = PatternSet::from_patterns(["org/bukkit/", "*exclude.jar"])
///     .expect("valid patterns");
/// assert!(set.should_exclude("org/bukkit/Bukkit.class"));
/// assert!(set.should_exclude("libs/please-exclude.jar"));
/// assert!(!set.should_exclude("org/broken/arrow/Plugin.class"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<ExclusionPattern>,
}

impl PatternSet {
    /// Create an empty set that excludes nothing.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Build a set from pattern strings.
    ///
    /// # Errors
    ///
    /// Returns [`PackagingError::InvalidPattern`] for the first pattern that
    /// fails to parse.
    pub fn from_patterns<I, S>(patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for pattern in patterns {
            set.insert(pattern.as_ref())?;
        }
        Ok(set)
    }

    /// The exclusions shared by every module of the library build.
    #[must_use]
    pub fn host_runtime_defaults() -> Self {
        Self {
            patterns: HOST_RUNTIME_EXCLUSIONS
                .iter()
                .map(|p| {
                    if let Some(suffix) = p.strip_prefix('*') {
                        ExclusionPattern::Suffix((*suffix).to_owned())
                    } else {
                        ExclusionPattern::Prefix((*p).to_owned())
                    }
                })
                .collect(),
        }
    }

    /// Parse and add a pattern. Duplicates are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`PackagingError::InvalidPattern`] if the pattern is invalid.
    pub fn insert(&mut self, pattern: &str) -> Result<()> {
        let parsed = ExclusionPattern::parse(pattern)?;
        if !self.patterns.contains(&parsed) {
            self.patterns.push(parsed);
        }
        Ok(())
    }

    /// Add every pattern of `other` to this set.
    pub fn extend(&mut self, other: Self) {
        for pattern in other.patterns {
            if !self.patterns.contains(&pattern) {
                self.patterns.push(pattern);
            }
        }
    }

    /// Return whether an entry at `path` must be dropped.
    #[must_use]
    pub fn should_exclude(&self, path: &str) -> bool {
        self.patterns.iter().any(|pattern| pattern.matches(path))
    }

    /// Number of patterns held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Whether the set holds no patterns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Iterate over the parsed patterns.
    pub fn iter(&self) -> impl Iterator<Item = &ExclusionPattern> {
        self.patterns.iter()
    }
}
