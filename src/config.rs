//! `shade.toml` configuration loader.
//!
//! A project keeps its shading rules in a single TOML file. `ShadeFile`
//! mirrors that file, rejects unknown keys, and converts into the engine's
//! [`ShadeConfiguration`] once the project identity is known. Identity
//! fields may come from the file's `[project]` table or from the command
//! line; command-line values win.
//!
//! ```toml
//! [project]
//! name = "nbt"
//! version = "1.0"
//! group = "org.broken.arrow.library"
//!
//! [output]
//! classifier = "all"
//!
//! [[rules]]
//! kind = "relocate"
//! from = "de.tr7zw.changeme.nbtapi"
//! package = "nbt"
//!
//! [[rules]]
//! kind = "exclude"
//! pattern = "com/example/internal/"
//!
//! [duplicates]
//! default = "keep-first"
//! rules = [{ pattern = "*.yml", policy = "overwrite" }]
//! ```

use arrow_shade_engine::{
    DuplicatePolicy, PackagingError, ProjectIdentity, ShadeConfiguration,
    ShadeConfigurationBuilder,
};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;
use std::fs;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised while loading or applying `shade.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("cannot read configuration {path}: {source}")]
    Read {
        /// Path that was being read.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or does not match the expected shape.
    #[error("cannot parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A project identity field was set neither in the file nor on the
    /// command line.
    #[error("project {field} is not set; add it to [project] or pass --{field}")]
    MissingProjectField {
        /// Name of the missing field.
        field: &'static str,
    },

    /// A rule parsed but was rejected by the engine.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] PackagingError),
}

/// Contents of a `shade.toml` file.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ShadeFile {
    /// Project identity; any field may instead come from the command line.
    pub project: ProjectSection,
    /// Output naming.
    pub output: OutputSection,
    /// Whether the shared host-runtime exclusions apply. Defaults to `true`.
    pub host_runtime_exclusions: bool,
    /// Exclusion and relocation rules, in file order.
    pub rules: Vec<Rule>,
    /// Duplicate-entry handling.
    pub duplicates: DuplicatesSection,
}

impl Default for ShadeFile {
    fn default() -> Self {
        Self {
            project: ProjectSection::default(),
            output: OutputSection::default(),
            host_runtime_exclusions: true,
            rules: Vec::new(),
            duplicates: DuplicatesSection::default(),
        }
    }
}

/// The `[project]` table.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectSection {
    /// Project (module) name.
    pub name: Option<String>,
    /// Project version.
    pub version: Option<String>,
    /// Publishing group, the root of relocated dependency namespaces.
    pub group: Option<String>,
}

/// The `[output]` table.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    /// Classifier appended to the archive name.
    pub classifier: Option<String>,
    /// Archive extension; `jar` when omitted.
    pub extension: Option<String>,
}

/// One `[[rules]]` entry.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(tag = "kind", rename_all = "kebab-case", deny_unknown_fields)]
pub enum Rule {
    /// Drop entries matching `pattern`.
    Exclude {
        /// Prefix, `*suffix`, or glob pattern.
        pattern: String,
    },
    /// Move the `from` namespace.
    ///
    /// Exactly one of `to` (an explicit namespace) or `package` (a name
    /// under `<group>.dependencies`) must be set.
    Relocate {
        /// Source namespace, dotted or slashed.
        from: String,
        /// Explicit target namespace.
        #[serde(default)]
        to: Option<String>,
        /// Package name under the project's dependency namespace.
        #[serde(default)]
        package: Option<String>,
    },
}

/// The `[duplicates]` table.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct DuplicatesSection {
    /// Policy applied when no override matches.
    pub default: DuplicatePolicy,
    /// Per-glob overrides, first match wins.
    pub rules: Vec<DuplicateOverride>,
}

/// A single duplicate-policy override.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DuplicateOverride {
    /// Glob matched against output paths.
    pub pattern: String,
    /// Policy for matching paths.
    pub policy: DuplicatePolicy,
}

/// Identity values supplied on the command line.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct IdentityOverrides {
    /// Overrides `[project].name`.
    pub name: Option<String>,
    /// Overrides `[project].version`.
    pub version: Option<String>,
    /// Overrides `[project].group`.
    pub group: Option<String>,
}

impl FromStr for ShadeFile {
    type Err = ConfigError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        Ok(toml::from_str(source)?)
    }
}

impl ShadeFile {
    /// Read and parse the configuration at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is not a valid configuration.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file = source.parse::<Self>()?;
        log::debug!("loaded {} rules from {path}", file.rules.len());
        Ok(file)
    }

    /// Resolve the project identity, preferring command-line values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingProjectField`] for the first field set
    /// in neither place. Blank values count as unset.
    pub fn identity(&self, overrides: &IdentityOverrides) -> Result<ProjectIdentity, ConfigError> {
        let name = pick("name", overrides.name.as_ref(), self.project.name.as_ref())?;
        let version = pick(
            "version",
            overrides.version.as_ref(),
            self.project.version.as_ref(),
        )?;
        let group = pick("group", overrides.group.as_ref(), self.project.group.as_ref())?;
        Ok(ProjectIdentity::new(name, version, group))
    }

    /// Build the engine configuration for `identity`.
    ///
    /// `classifier` overrides `[output].classifier` when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a pattern or relocation rule is
    /// rejected, including relocations that set both or neither of `to` and
    /// `package`.
    pub fn to_configuration(
        &self,
        identity: ProjectIdentity,
        classifier: Option<&str>,
    ) -> Result<ShadeConfiguration, ConfigError> {
        let mut builder = ShadeConfiguration::builder(identity)
            .host_runtime_exclusions(self.host_runtime_exclusions)
            .duplicate_policy(self.duplicates.default);

        if let Some(extension) = &self.output.extension {
            builder = builder.extension(extension);
        }
        if let Some(classifier) = classifier.or(self.output.classifier.as_deref()) {
            builder = builder.classifier(classifier);
        }
        for rule in &self.rules {
            builder = apply_rule(builder, rule)?;
        }
        for entry in &self.duplicates.rules {
            builder = builder.duplicate_override(&entry.pattern, entry.policy)?;
        }
        Ok(builder.build())
    }
}

fn pick(
    field: &'static str,
    preferred: Option<&String>,
    fallback: Option<&String>,
) -> Result<String, ConfigError> {
    preferred
        .into_iter()
        .chain(fallback)
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .map(str::to_owned)
        .ok_or(ConfigError::MissingProjectField { field })
}

fn apply_rule(
    builder: ShadeConfigurationBuilder,
    rule: &Rule,
) -> Result<ShadeConfigurationBuilder, PackagingError> {
    match rule {
        Rule::Exclude { pattern } => builder.exclude(pattern),
        Rule::Relocate {
            from,
            to: Some(to),
            package: None,
        } => builder.relocate(from, to),
        Rule::Relocate {
            from,
            to: None,
            package: Some(package),
        } => builder.relocate_dependency(from, package),
        Rule::Relocate { from, to, package } => Err(PackagingError::InvalidRelocation {
            from: from.clone(),
            to: to.clone().or_else(|| package.clone()).unwrap_or_default(),
            reason: "set exactly one of `to` or `package`".to_owned(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    const FULL: &str = r#"
host_runtime_exclusions = false

[project]
name = "nbt"
version = "1.0"
group = "org.broken.arrow.library"

[output]
classifier = "all"

[[rules]]
kind = "relocate"
from = "de.tr7zw.changeme.nbtapi"
package = "nbt"

[[rules]]
kind = "relocate"
from = "com.example.lib"
to = "org.example.shaded.lib"

[[rules]]
kind = "exclude"
pattern = "com/example/internal/"

[duplicates]
default = "fail"
rules = [{ pattern = "*.yml", policy = "overwrite" }]
"#;

    #[fixture]
    fn full() -> ShadeFile {
        FULL.parse().expect("expected configuration to parse successfully")
    }

    #[rstest]
    fn defaults_apply_when_the_file_is_empty() {
        let file: ShadeFile = "".parse().expect("empty configuration parses");

        assert_eq!(file, ShadeFile::default());
        assert!(file.host_runtime_exclusions);
        assert_eq!(file.duplicates.default, DuplicatePolicy::KeepFirst);
    }

    #[rstest]
    fn parses_every_section(full: ShadeFile) {
        assert!(!full.host_runtime_exclusions);
        assert_eq!(full.output.classifier.as_deref(), Some("all"));
        assert_eq!(full.rules.len(), 3);
        assert_eq!(
            full.rules.get(2),
            Some(&Rule::Exclude {
                pattern: "com/example/internal/".to_owned()
            })
        );
        assert_eq!(full.duplicates.default, DuplicatePolicy::Fail);
    }

    #[rstest]
    fn converts_into_engine_configuration(full: ShadeFile) {
        let identity = full
            .identity(&IdentityOverrides::default())
            .expect("identity is complete");
        let config = full
            .to_configuration(identity, None)
            .expect("rules are valid");

        assert_eq!(config.archive_name().filename(), "nbt-1.0-all.jar");
        assert!(!config.patterns().should_exclude("org/bukkit/Bukkit.class"));
        assert!(config.patterns().should_exclude("com/example/internal/A.class"));
        assert_eq!(
            config.relocations().rewrite_path("de/tr7zw/changeme/nbtapi/NBT.class"),
            "org/broken/arrow/library/dependencies/nbt/NBT.class"
        );
        assert_eq!(
            config.relocations().rewrite_path("com/example/lib/Util.class"),
            "org/example/shaded/lib/Util.class"
        );
        assert_eq!(config.duplicates().policy_for("plugin.yml"), DuplicatePolicy::Overwrite);
        assert_eq!(config.duplicates().policy_for("a/B.class"), DuplicatePolicy::Fail);
    }

    #[rstest]
    fn command_line_classifier_wins(full: ShadeFile) {
        let identity = ProjectIdentity::new("nbt", "1.0", "org.broken.arrow.library");
        let config = full
            .to_configuration(identity, Some("shaded"))
            .expect("rules are valid");

        assert_eq!(config.archive_name().filename(), "nbt-1.0-shaded.jar");
    }

    #[rstest]
    fn command_line_identity_overrides_the_file(full: ShadeFile) {
        let overrides = IdentityOverrides {
            version: Some("2.0".to_owned()),
            ..IdentityOverrides::default()
        };

        let identity = full.identity(&overrides).expect("identity is complete");

        assert_eq!(identity, ProjectIdentity::new("nbt", "2.0", "org.broken.arrow.library"));
    }

    #[rstest]
    #[case::absent("[project]\nname = \"nbt\"\nversion = \"1.0\"\n")]
    #[case::blank("[project]\nname = \"nbt\"\nversion = \"1.0\"\ngroup = \"  \"\n")]
    fn missing_identity_fields_are_reported(#[case] source: &str) {
        let file: ShadeFile = source.parse().expect("configuration parses");

        let outcome = file.identity(&IdentityOverrides::default());

        assert!(matches!(
            outcome,
            Err(ConfigError::MissingProjectField { field: "group" })
        ));
    }

    #[rstest]
    #[case::both("[[rules]]\nkind = \"relocate\"\nfrom = \"a.b\"\nto = \"c.d\"\npackage = \"b\"\n")]
    #[case::neither("[[rules]]\nkind = \"relocate\"\nfrom = \"a.b\"\n")]
    fn relocations_need_exactly_one_target(#[case] source: &str) {
        let file: ShadeFile = source.parse().expect("configuration parses");
        let identity = ProjectIdentity::new("nbt", "1.0", "org.broken.arrow.library");

        let outcome = file.to_configuration(identity, None);

        assert!(matches!(
            outcome,
            Err(ConfigError::Invalid(PackagingError::InvalidRelocation { .. }))
        ));
    }

    #[rstest]
    #[case::unknown_top_level("unexpected = true\n")]
    #[case::unknown_rule_kind("[[rules]]\nkind = \"rename\"\nfrom = \"a\"\n")]
    #[case::unknown_policy("[duplicates]\ndefault = \"newest\"\n")]
    #[case::wrong_type("host_runtime_exclusions = \"yes\"\n")]
    fn rejects_malformed_files(#[case] source: &str) {
        let outcome = source.parse::<ShadeFile>();

        assert!(
            matches!(outcome, Err(ConfigError::Parse(_))),
            "expected a parse error for {source:?}"
        );
    }

    #[rstest]
    fn load_reports_missing_files() {
        let outcome = ShadeFile::load(Utf8Path::new("/nonexistent/shade.toml"));

        assert!(matches!(outcome, Err(ConfigError::Read { .. })));
    }
}
