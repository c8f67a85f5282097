//! Per-invocation shading configuration.
//!
//! A [`ShadeConfiguration`] bundles everything one packaging run needs:
//! the output name, the exclusion patterns, the relocation rules, and the
//! duplicate-entry policies. It is built once from a [`ProjectIdentity`]
//! plus caller customisations and then handed to the engine, which owns it
//! for the rest of the run.

use crate::duplicates::{DuplicatePolicy, DuplicateRules};
use crate::error::Result;
use crate::naming::{ArchiveName, ArchiveNamer, ProjectIdentity};
use crate::pattern::{PatternSet, SIGNATURE_EXCLUSIONS};
use crate::relocation::{RelocationMap, RelocationRule};

/// Everything the engine needs for a single merge.
#[derive(Debug, Clone)]
pub struct ShadeConfiguration {
    identity: ProjectIdentity,
    archive_name: ArchiveName,
    patterns: PatternSet,
    relocations: RelocationMap,
    duplicates: DuplicateRules,
}

impl ShadeConfiguration {
    /// Start building a configuration for `identity`.
    ///
    /// # Examples
    ///
    /// ```
    /// use arrow_shade_engine::configuration::ShadeConfiguration;
    /// use arrow_shade_engine::naming::ProjectIdentity;
    ///
    /// let identity = ProjectIdentity::new("nbt", "1.0", "org.broken.arrow.library");
    /// let config = ShadeConfiguration::builder(identity)
    ///     .relocate_dependency("de.tr7zw.changeme.nbtapi", "nbt")
    ///     .expect("valid rule")
    ///     .build();
    ///
    /// assert_eq!(config.archive_name().filename(), "nbt-1.0.jar");
    /// assert!(config.patterns().should_exclude("org/bukkit/Bukkit.class"));
    /// ```
    #[must_use]
    pub fn builder(identity: ProjectIdentity) -> ShadeConfigurationBuilder {
        ShadeConfigurationBuilder::new(identity)
    }

    /// Identity of the project being packaged.
    #[must_use]
    pub const fn identity(&self) -> &ProjectIdentity {
        &self.identity
    }

    /// Name of the archive the engine writes.
    #[must_use]
    pub const fn archive_name(&self) -> &ArchiveName {
        &self.archive_name
    }

    /// Exclusion patterns.
    #[must_use]
    pub const fn patterns(&self) -> &PatternSet {
        &self.patterns
    }

    /// Relocation rules.
    #[must_use]
    pub const fn relocations(&self) -> &RelocationMap {
        &self.relocations
    }

    /// Duplicate-entry policies.
    #[must_use]
    pub const fn duplicates(&self) -> &DuplicateRules {
        &self.duplicates
    }
}

/// Builder for [`ShadeConfiguration`].
#[derive(Debug, Clone)]
pub struct ShadeConfigurationBuilder {
    identity: ProjectIdentity,
    namer: ArchiveNamer,
    classifier: Option<String>,
    host_runtime_exclusions: bool,
    patterns: PatternSet,
    relocations: RelocationMap,
    duplicates: DuplicateRules,
}

impl ShadeConfigurationBuilder {
    fn new(identity: ProjectIdentity) -> Self {
        Self {
            identity,
            namer: ArchiveNamer::default(),
            classifier: None,
            host_runtime_exclusions: true,
            patterns: PatternSet::new(),
            relocations: RelocationMap::new(),
            duplicates: DuplicateRules::standard(),
        }
    }

    /// Set the classifier appended to the archive name.
    #[must_use]
    pub fn classifier(mut self, classifier: impl Into<String>) -> Self {
        self.classifier = Some(classifier.into());
        self
    }

    /// Set the archive file extension (default `jar`).
    #[must_use]
    pub fn extension(mut self, extension: &str) -> Self {
        self.namer = ArchiveNamer::new(extension);
        self
    }

    /// Toggle the shared host-runtime exclusion list (on by default).
    #[must_use]
    pub const fn host_runtime_exclusions(mut self, enabled: bool) -> Self {
        self.host_runtime_exclusions = enabled;
        self
    }

    /// Exclude entries matching `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PackagingError::InvalidPattern`] for malformed
    /// patterns.
    pub fn exclude(mut self, pattern: &str) -> Result<Self> {
        self.patterns.insert(pattern)?;
        Ok(self)
    }

    /// Relocate `from` to an explicit `to` namespace.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PackagingError::InvalidRelocation`] for malformed
    /// namespaces or [`crate::PackagingError::RelocationConflict`] when
    /// `from` is already relocated elsewhere.
    pub fn relocate(mut self, from: &str, to: &str) -> Result<Self> {
        self.relocations.insert(RelocationRule::new(from, to)?)?;
        Ok(self)
    }

    /// Relocate `from` under the project's private dependency namespace,
    /// `<group>.dependencies.<package_name>`.
    ///
    /// # Errors
    ///
    /// Same as [`Self::relocate`].
    pub fn relocate_dependency(self, from: &str, package_name: &str) -> Result<Self> {
        let to = self.identity.dependency_namespace(package_name);
        self.relocate(from, &to)
    }

    /// Set the duplicate policy used when no override matches.
    #[must_use]
    pub fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicates.set_default(policy);
        self
    }

    /// Use `policy` for duplicate paths matching `glob`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::PackagingError::InvalidPattern`] for malformed globs.
    pub fn duplicate_override(mut self, glob: &str, policy: DuplicatePolicy) -> Result<Self> {
        self.duplicates.add_override(glob, policy)?;
        Ok(self)
    }

    /// Finish the configuration.
    ///
    /// Signature files are always excluded because relocated classes no
    /// longer match their digests.
    #[must_use]
    pub fn build(self) -> ShadeConfiguration {
        let mut patterns = if self.host_runtime_exclusions {
            PatternSet::host_runtime_defaults()
        } else {
            PatternSet::new()
        };
        patterns.extend(self.patterns);
        if let Ok(signatures) = PatternSet::from_patterns(SIGNATURE_EXCLUSIONS) {
            patterns.extend(signatures);
        }

        let archive_name = self
            .namer
            .compute_name(&self.identity, self.classifier.as_deref());

        ShadeConfiguration {
            identity: self.identity,
            archive_name,
            patterns,
            relocations: self.relocations,
            duplicates: self.duplicates,
        }
    }
}
