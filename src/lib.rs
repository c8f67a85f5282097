//! Command-line front end for the arrow shade engine.
//!
//! This crate loads a project's `shade.toml`, turns command-line inputs into
//! archive sources, and runs [`arrow_shade_engine::ShadeEngine`] to produce
//! the shaded library jar.
//!
//! # Modules
//!
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - `shade.toml` loading and conversion
//! - [`run`] - End-to-end invocation and reporting

pub mod cli;
pub mod config;
pub mod run;

pub use config::{ConfigError, IdentityOverrides, ShadeFile};
pub use run::{CliError, render_report, run};
