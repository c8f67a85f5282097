//! Error types for shading operations.
//!
//! Covers unreadable inputs, malformed class payloads, duplicate-entry
//! collisions, relocation misconfiguration, and failures while writing the
//! merged archive. Every variant is fatal to the invocation that raised it;
//! nothing is retried.

use crate::engine::EngineState;
use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors arising from shading and packaging operations.
#[derive(Debug, Error)]
pub enum PackagingError {
    /// An input archive could not be opened, listed, or read.
    #[error("cannot read input archive {archive}: {reason}")]
    ArchiveRead {
        /// Logical name of the offending input.
        archive: String,
        /// Description of the underlying failure.
        reason: String,
    },

    /// A compiled class payload has a corrupt or unsupported layout.
    #[error("malformed class file {path} in {archive}: {reason}")]
    MalformedClass {
        /// Logical name of the input that supplied the class.
        archive: String,
        /// Entry path of the class inside the input.
        path: String,
        /// Description of the structural problem.
        reason: String,
    },

    /// Two inputs supplied the same path under the `fail` duplicate policy.
    #[error("duplicate entry {path} (first seen in {first}, again in {second})")]
    DuplicateEntry {
        /// Rewritten path that collided.
        path: String,
        /// Logical name of the input that supplied the kept entry.
        first: String,
        /// Logical name of the input that supplied the colliding entry.
        second: String,
    },

    /// Two relocation rules claim the same source namespace.
    #[error("conflicting relocations for {namespace}: {first} vs {second}")]
    RelocationConflict {
        /// The shared source namespace.
        namespace: String,
        /// Target of the first rule.
        first: String,
        /// Target of the second rule.
        second: String,
    },

    /// A relocation rule has an empty or malformed namespace.
    #[error("invalid relocation rule {from} -> {to}: {reason}")]
    InvalidRelocation {
        /// Source namespace as supplied.
        from: String,
        /// Target namespace as supplied.
        to: String,
        /// Description of the validation failure.
        reason: String,
    },

    /// An exclusion or duplicate-policy glob could not be parsed.
    #[error("invalid pattern \"{pattern}\": {reason}")]
    InvalidPattern {
        /// The rejected pattern text.
        pattern: String,
        /// Description of the parse failure.
        reason: String,
    },

    /// Writing or publishing the merged archive failed.
    #[error("cannot write merged archive {path}: {reason}")]
    ArchiveWrite {
        /// Destination the archive was being written to.
        path: Utf8PathBuf,
        /// Description of the underlying failure.
        reason: String,
    },

    /// The engine has already run; a new invocation needs a new engine.
    #[error("shade engine cannot merge again from state {state}")]
    EngineSpent {
        /// The state the engine was left in.
        state: EngineState,
    },
}

/// Result type alias using [`PackagingError`].
pub type Result<T> = std::result::Result<T, PackagingError>;
