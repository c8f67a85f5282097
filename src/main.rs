//! `arrow-shade` CLI entrypoint.
//!
//! Merges a module's compiled output with its dependency jars into a single
//! shaded library jar and prints where it was written.

use arrow_shade::cli::Cli;
use arrow_shade::{CliError, render_report, run};
use clap::Parser;
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .format_timestamp(None)
        .init();

    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let outcome = run(&cli).and_then(|artifact| render_report(&artifact, cli.json));
    let exit_code = exit_code_for_outcome(outcome, &mut stdout, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn exit_code_for_outcome(
    outcome: Result<String, CliError>,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> i32 {
    match outcome {
        Ok(report) => {
            write_line(stdout, report);
            0
        }
        Err(err) => {
            write_line(stderr, format_args!("error: {err}"));
            1
        }
    }
}

fn write_line(out: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(out, "{message}").is_err() {
        // Best-effort output; ignore write failures.
    }
}
