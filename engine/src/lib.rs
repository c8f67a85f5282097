//! Arrow shade engine.
//!
//! This crate merges a module's compiled output and its dependency archives
//! into a single distributable jar, relocating third-party namespaces under
//! a project-private prefix and dropping packages the host runtime already
//! provides. It is used by the `arrow-shade` CLI and can be driven directly
//! by build tooling or tests.
//!
//! # Modules
//!
//! - [`class_file`] - Constant-pool rewriting for compiled classes
//! - [`configuration`] - Per-invocation shading configuration and builder
//! - [`duplicates`] - Policies for entries supplied by several inputs
//! - [`engine`] - The merge state machine and its result
//! - [`error`] - Semantic error types
//! - [`merged`] - The merged output archive and its finalization
//! - [`naming`] - Project identity and archive file naming
//! - [`pattern`] - Exclusion patterns
//! - [`relocation`] - Namespace relocation rules
//! - [`source`] - Input archives (jars and directories)

pub mod class_file;
pub mod configuration;
pub mod duplicates;
pub mod engine;
pub mod error;
pub mod merged;
pub mod naming;
pub mod pattern;
pub mod relocation;
pub mod source;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use configuration::{ShadeConfiguration, ShadeConfigurationBuilder};
pub use duplicates::{DuplicatePolicy, DuplicateRules};
pub use engine::{EngineState, MergeStats, ShadeEngine, ShadedArtifact};
pub use error::{PackagingError, Result};
pub use naming::{ArchiveName, ArchiveNamer, ProjectIdentity};
pub use pattern::PatternSet;
pub use relocation::{RelocationMap, RelocationRule};
pub use source::{ArchiveEntry, ArchiveSource, DirectorySource, ZipSource};
