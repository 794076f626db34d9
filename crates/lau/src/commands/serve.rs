//! `lau run` and `lau dev` command implementations.

use std::path::PathBuf;

use clap::Args;
use lau_config::{CliSettings, Config};
use lau_server::{ServerConfig, Site, run_server, server_config_from_lau_config};

use super::runtime;
use crate::error::CliError;
use crate::output::Output;

/// Options shared by `run` and `dev`.
#[derive(Args, Debug)]
pub(crate) struct ServerArgs {
    /// Path to configuration file (default: auto-discover lau.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// The host to serve on (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// The port to serve on (overrides config and PORT).
    #[arg(short, long)]
    port: Option<u16>,

    /// Path prefix the app is served under behind a proxy.
    #[arg(long)]
    root_path: Option<String>,

    /// Trust X-Forwarded-Proto and X-Forwarded-For (default: enabled).
    #[arg(long)]
    proxy_headers: Option<bool>,

    /// Ignore X-Forwarded-* headers.
    #[arg(long, conflicts_with = "proxy_headers")]
    no_proxy_headers: bool,
}

impl ServerArgs {
    fn settings(&self) -> CliSettings {
        CliSettings {
            host: self.host.clone(),
            port: self.port,
            root_path: self.root_path.clone(),
            proxy_headers: self.no_proxy_headers.then_some(false).or(self.proxy_headers),
            ..CliSettings::default()
        }
    }
}

/// Arguments for the run command.
#[derive(Args, Debug)]
pub(crate) struct RunArgs {
    #[command(flatten)]
    server: ServerArgs,

    /// Worker threads (default: a single-threaded runtime).
    #[arg(long)]
    workers: Option<usize>,
}

impl RunArgs {
    /// Execute the run command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) fn execute(self, site: impl FnOnce() -> Site) -> Result<(), CliError> {
        let settings = CliSettings {
            workers: self.workers,
            ..self.server.settings()
        };
        serve(self.server.config.as_deref(), &settings, site)
    }
}

/// Arguments for the dev command.
#[derive(Args, Debug)]
pub(crate) struct DevArgs {
    #[command(flatten)]
    server: ServerArgs,
}

impl DevArgs {
    /// Execute the dev command: `run` with debug error responses.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the server fails to start.
    pub(crate) fn execute(self, site: impl FnOnce() -> Site) -> Result<(), CliError> {
        let settings = CliSettings {
            debug: Some(true),
            ..self.server.settings()
        };
        serve(self.server.config.as_deref(), &settings, site)
    }
}

fn serve(
    config_path: Option<&std::path::Path>,
    settings: &CliSettings,
    site: impl FnOnce() -> Site,
) -> Result<(), CliError> {
    let output = Output::new();

    let config = Config::load(config_path, Some(settings))?;
    tracing::debug!(config_file = ?config.config_path, "Configuration loaded");
    let server_config = server_config_from_lau_config(&config);
    let app = site().into_app(&server_config)?;

    print_startup(&output, &config, &server_config, app.routes().len());

    runtime(config.server.workers)?.block_on(run_server(app, &server_config))?;
    Ok(())
}

fn print_startup(output: &Output, config: &Config, server: &ServerConfig, routes: usize) {
    output.highlight(&format!(
        "Starting server on http://{}:{}{}",
        server.host, server.port, server.root_path
    ));
    output.info(&format!("Routes: {routes}"));
    output.info(&format!("Static directory: {}", server.static_dir.display()));
    if let Some(workers) = config.server.workers {
        output.info(&format!("Workers: {workers}"));
    }
    if server.debug {
        output.warning("Debug mode: error responses include details");
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Parser)]
    struct RunCli {
        #[command(flatten)]
        args: RunArgs,
    }

    #[test]
    fn test_run_settings() {
        let cli = RunCli::parse_from([
            "run",
            "--host",
            "0.0.0.0",
            "--port",
            "9000",
            "--root-path",
            "/app",
            "--workers",
            "4",
        ]);
        let settings = CliSettings {
            workers: cli.args.workers,
            ..cli.args.server.settings()
        };

        assert_eq!(settings.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(settings.port, Some(9000));
        assert_eq!(settings.root_path.as_deref(), Some("/app"));
        assert_eq!(settings.workers, Some(4));
        assert_eq!(settings.proxy_headers, None);
    }

    #[test]
    fn test_no_proxy_headers() {
        let cli = RunCli::parse_from(["run", "--no-proxy-headers"]);
        assert_eq!(cli.args.server.settings().proxy_headers, Some(false));

        let cli = RunCli::parse_from(["run", "--proxy-headers", "true"]);
        assert_eq!(cli.args.server.settings().proxy_headers, Some(true));
    }

    #[test]
    fn test_conflicting_proxy_flags() {
        let result = RunCli::try_parse_from(["run", "--proxy-headers", "true", "--no-proxy-headers"]);
        assert!(result.is_err());
    }
}
