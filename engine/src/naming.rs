//! Output archive naming policy.
//!
//! Constructs deterministic archive names from the project identity:
//! `<name>-<version>.<ext>`, or `<name>-<version>-<classifier>.<ext>` when a
//! classifier distinguishes a variant such as the `all` fat archive.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The default extension for shaded archives.
pub const DEFAULT_EXTENSION: &str = "jar";

/// Identity of the project whose archive is being produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProjectIdentity {
    /// Project (module) name, e.g. `nbt`.
    pub name: String,
    /// Project version, e.g. `1.0`.
    pub version: String,
    /// Group the project publishes under, e.g. `org.broken.arrow.library`.
    pub group: String,
}

impl ProjectIdentity {
    /// Create an identity from its components.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            group: group.into(),
        }
    }

    /// The project-private namespace a dependency package is relocated to.
    ///
    /// # Examples
    ///
    /// ```
    /// use arrow_shade_engine::naming::ProjectIdentity;
    ///
    /// let identity = ProjectIdentity::new("nbt", "1.0", "org.broken.arrow.library");
    /// assert_eq!(
    ///     identity.dependency_namespace("nbt"),
    ///     "org.broken.arrow.library.dependencies.nbt"
    /// );
    /// ```
    #[must_use]
    pub fn dependency_namespace(&self, package_name: &str) -> String {
        format!("{}.dependencies.{package_name}", self.group)
    }
}

/// A fully-qualified output archive name.
///
/// # Examples
///
/// ```
/// use arrow_shade_engine::naming::{ArchiveNamer, ProjectIdentity};
///
/// let identity = ProjectIdentity::new("nbt", "1.0", "org.broken.arrow.library");
/// let namer = ArchiveNamer::default();
///
/// assert_eq!(namer.compute_name(&identity, None).to_string(), "nbt-1.0.jar");
/// assert_eq!(
///     namer.compute_name(&identity, Some("all")).to_string(),
///     "nbt-1.0-all.jar"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveName {
    name: String,
    version: String,
    classifier: Option<String>,
    extension: String,
}

impl ArchiveName {
    /// Return the classifier component, if any.
    #[must_use]
    pub fn classifier(&self) -> Option<&str> {
        self.classifier.as_deref()
    }

    /// Return the file extension without the leading dot.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Return the filename as a string without consuming the value.
    #[must_use]
    pub fn filename(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ArchiveName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)?;
        if let Some(classifier) = &self.classifier {
            write!(f, "-{classifier}")?;
        }
        write!(f, ".{}", self.extension)
    }
}

/// Derives output archive names; pure, so identical input gives identical
/// names on every run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveNamer {
    extension: String,
}

impl ArchiveNamer {
    /// Create a namer producing files with `extension` (leading dots are
    /// ignored).
    #[must_use]
    pub fn new(extension: &str) -> Self {
        Self {
            extension: extension.trim_start_matches('.').to_owned(),
        }
    }

    /// Compute the archive name for `identity` and an optional classifier.
    ///
    /// Blank classifiers are treated as absent.
    #[must_use]
    pub fn compute_name(&self, identity: &ProjectIdentity, classifier: Option<&str>) -> ArchiveName {
        ArchiveName {
            name: identity.name.clone(),
            version: identity.version.clone(),
            classifier: classifier
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_owned),
            extension: self.extension.clone(),
        }
    }
}

impl Default for ArchiveNamer {
    fn default() -> Self {
        Self::new(DEFAULT_EXTENSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn nbt() -> ProjectIdentity {
        ProjectIdentity::new("nbt", "1.0", "org.broken.arrow.library")
    }

    #[rstest]
    fn default_name_has_no_classifier(nbt: ProjectIdentity) {
        let name = ArchiveNamer::default().compute_name(&nbt, None);
        assert_eq!(name.to_string(), "nbt-1.0.jar");
        assert!(name.classifier().is_none());
    }

    #[rstest]
    fn classifier_is_appended(nbt: ProjectIdentity) {
        let name = ArchiveNamer::default().compute_name(&nbt, Some("all"));
        assert_eq!(name.to_string(), "nbt-1.0-all.jar");
        assert_eq!(name.classifier(), Some("all"));
    }

    #[rstest]
    #[case::empty("")]
    #[case::whitespace("   ")]
    fn blank_classifier_is_ignored(nbt: ProjectIdentity, #[case] classifier: &str) {
        let name = ArchiveNamer::default().compute_name(&nbt, Some(classifier));
        assert_eq!(name.filename(), "nbt-1.0.jar");
    }

    #[rstest]
    #[case::bare("zip")]
    #[case::dotted(".zip")]
    fn custom_extension(nbt: ProjectIdentity, #[case] extension: &str) {
        let name = ArchiveNamer::new(extension).compute_name(&nbt, None);
        assert_eq!(name.filename(), "nbt-1.0.zip");
        assert_eq!(name.extension(), "zip");
    }

    #[rstest]
    fn naming_is_deterministic(nbt: ProjectIdentity) {
        let namer = ArchiveNamer::default();
        assert_eq!(
            namer.compute_name(&nbt, Some("all")),
            namer.compute_name(&nbt, Some("all"))
        );
    }

    #[rstest]
    fn dependency_namespace_uses_group(nbt: ProjectIdentity) {
        assert_eq!(
            nbt.dependency_namespace("nbt"),
            "org.broken.arrow.library.dependencies.nbt"
        );
    }
}
