//! Lau command-line interface.
//!
//! An application registers its pages in a binary and hands them to
//! [`run_cli`], which provides the commands:
//! - `run`: serve the application
//! - `dev`: serve with detailed error responses and info logging
//! - `build`: render every page to static files
//!
//! ```ignore
//! use std::process::ExitCode;
//! use lau::Site;
//!
//! fn main() -> ExitCode {
//!     lau::run_cli(|| Site::new(pages::registry()))
//! }
//! ```

mod commands;
mod error;
mod output;

use std::ffi::OsString;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

pub use lau_server::{App, ServerConfig, Site};

use commands::{BuildArgs, DevArgs, RunArgs};
use output::Output;

/// Lau - file-routed pages.
#[derive(Parser, Debug)]
#[command(name = "lau", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the application.
    Run(RunArgs),
    /// Serve the application for development.
    Dev(DevArgs),
    /// Render all pages into a static site.
    Build(BuildArgs),
}

/// Parse the process arguments and run the selected command.
///
/// `site` is called once, after logging is set up.
pub fn run_cli<F>(site: F) -> ExitCode
where
    F: FnOnce() -> Site,
{
    run_cli_from(std::env::args_os(), site)
}

/// [`run_cli`] with explicit arguments.
pub fn run_cli_from<I, T, F>(args: I, site: F) -> ExitCode
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    F: FnOnce() -> Site,
{
    let cli = Cli::parse_from(args);
    let output = Output::new();

    // RUST_LOG wins; otherwise dev logs at INFO and everything else at WARN
    let default_level = if matches!(cli.command, Commands::Dev(_)) {
        "info"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let result = match cli.command {
        Commands::Run(args) => args.execute(site),
        Commands::Dev(args) => args.execute(site),
        Commands::Build(args) => args.execute(site),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            output.error(&format!("Error: {err}"));
            ExitCode::FAILURE
        }
    }
}
