//! Configuration management for Lau.
//!
//! Parses `lau.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Defaults from the environment
//!
//! When the file does not set them, `PORT` provides `server.port` and
//! `DEBUG` provides `server.debug`.
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `server.host`
//! - `server.root_path`
//! - `paths.static_dir`
//! - `paths.target_dir`

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "lau.toml";

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_STATIC_DIR: &str = "static";
const DEFAULT_TARGET_DIR: &str = "dist";

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub root_path: Option<String>,
    pub proxy_headers: Option<bool>,
    pub workers: Option<usize>,
    pub debug: Option<bool>,
    pub target_dir: Option<PathBuf>,
}

/// Defaults read from `PORT` and `DEBUG`.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct EnvDefaults {
    pub port: Option<u16>,
    pub debug: Option<bool>,
}

impl EnvDefaults {
    /// Read the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::parse(
            std::env::var("PORT").ok().as_deref(),
            std::env::var("DEBUG").ok().as_deref(),
        )
    }

    /// Parse raw variable values. Empty values count as unset.
    pub fn parse(port: Option<&str>, debug: Option<&str>) -> Result<Self, ConfigError> {
        let port = port
            .filter(|v| !v.is_empty())
            .map(|v| {
                v.parse::<u16>().map_err(|_| ConfigError::EnvVar {
                    field: "server.port".to_owned(),
                    message: format!("PORT must be a port number, got {v:?}"),
                })
            })
            .transpose()?;
        let debug = debug
            .filter(|v| !v.is_empty())
            .map(|v| {
                parse_bool(v).ok_or_else(|| ConfigError::EnvVar {
                    field: "server.debug".to_owned(),
                    message: format!("DEBUG must be a boolean, got {v:?}"),
                })
            })
            .transpose()?;
        Ok(Self { port, debug })
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Application configuration.
#[derive(Debug)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Resolved paths.
    pub paths: PathsConfig,
    /// Path to the config file, if one was loaded.
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Path prefix the app is mounted under behind a proxy (empty for none).
    pub root_path: String,
    /// Trust `X-Forwarded-*` headers for client address and scheme.
    pub proxy_headers: bool,
    /// Runtime worker threads; `None` runs a single-threaded runtime.
    pub workers: Option<usize>,
    /// Debug mode.
    pub debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_owned(),
            port: DEFAULT_PORT,
            root_path: String::new(),
            proxy_headers: true,
            workers: None,
            debug: false,
        }
    }
}

/// Resolved directories with absolute or config-relative paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathsConfig {
    /// Directory served under `/static`.
    pub static_dir: PathBuf,
    /// Static build output directory.
    pub target_dir: PathBuf,
}

/// `lau.toml` as written.
#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    server: ServerSection,
    paths: PathsSection,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct ServerSection {
    host: Option<String>,
    port: Option<u16>,
    root_path: Option<String>,
    proxy_headers: Option<bool>,
    workers: Option<usize>,
    debug: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
struct PathsSection {
    static_dir: Option<String>,
    target_dir: Option<String>,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`server.host`").
        field: String,
        /// Error message (e.g., "${`HOST`} is not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `lau.toml` in current directory and parents.
    /// CLI settings take precedence over file values, which take precedence
    /// over `PORT`/`DEBUG`.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails
    /// or the result is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let env = EnvDefaults::from_env()?;

        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path, &env)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered, &env)?
        } else {
            let cwd = std::env::current_dir()?;
            Self::from_file(ConfigFile::default(), &cwd, &env)?
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse configuration text, resolving paths against `base`.
    ///
    /// # Errors
    ///
    /// Returns error if parsing, expansion or validation fails.
    pub fn from_toml(content: &str, base: &Path, env: &EnvDefaults) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(content)?;
        let config = Self::from_file(file, base, env)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(root_path) = &settings.root_path {
            self.server.root_path.clone_from(root_path);
        }
        if let Some(proxy_headers) = settings.proxy_headers {
            self.server.proxy_headers = proxy_headers;
        }
        if let Some(workers) = settings.workers {
            self.server.workers = Some(workers);
        }
        if let Some(debug) = settings.debug {
            self.server.debug = debug;
        }
        if let Some(target_dir) = &settings.target_dir {
            self.paths.target_dir.clone_from(target_dir);
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Default config with paths relative to the given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            server: ServerConfig::default(),
            paths: PathsConfig {
                static_dir: base.join(DEFAULT_STATIC_DIR),
                target_dir: base.join(DEFAULT_TARGET_DIR),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path, env: &EnvDefaults) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let file: ConfigFile = toml::from_str(&content)?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        let mut config = Self::from_file(file, config_dir, env)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Expand, apply defaults and resolve paths.
    fn from_file(file: ConfigFile, base: &Path, env: &EnvDefaults) -> Result<Self, ConfigError> {
        let ConfigFile { server, paths } = file.expand_env_vars(|var| std::env::var(var).ok())?;
        let defaults = ServerConfig::default();

        let resolve = |path: Option<String>, default: &str| {
            base.join(path.unwrap_or_else(|| default.to_owned()))
        };

        Ok(Self {
            server: ServerConfig {
                host: server.host.unwrap_or(defaults.host),
                port: server.port.or(env.port).unwrap_or(defaults.port),
                root_path: server.root_path.unwrap_or(defaults.root_path),
                proxy_headers: server.proxy_headers.unwrap_or(defaults.proxy_headers),
                workers: server.workers.or(defaults.workers),
                debug: server.debug.or(env.debug).unwrap_or(defaults.debug),
            },
            paths: PathsConfig {
                static_dir: resolve(paths.static_dir, DEFAULT_STATIC_DIR),
                target_dir: resolve(paths.target_dir, DEFAULT_TARGET_DIR),
            },
            config_path: None,
        })
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;

        // Port 0 lets the OS pick a port, which is never what a config file means
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }

        if self.server.workers == Some(0) {
            return Err(ConfigError::Validation(
                "server.workers must be greater than 0".to_owned(),
            ));
        }

        let root_path = &self.server.root_path;
        if !root_path.is_empty() && !root_path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "server.root_path must start with '/', got {root_path:?}"
            )));
        }

        Ok(())
    }
}

impl ConfigFile {
    /// Expand `${VAR}` and `${VAR:-default}` in the string fields, resolving
    /// variables through `lookup`.
    fn expand_env_vars(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let fields = [
            ("server.host", &mut self.server.host),
            ("server.root_path", &mut self.server.root_path),
            ("paths.static_dir", &mut self.paths.static_dir),
            ("paths.target_dir", &mut self.paths.target_dir),
        ];

        for (field, value) in fields {
            // Values without `${` keep bare `$` characters untouched
            if let Some(raw) = value.as_deref()
                && raw.contains("${")
            {
                let expanded =
                    shellexpand::env_with_context(raw, |var| lookup(var).map(Some).ok_or(()))
                        .map_err(|e| ConfigError::EnvVar {
                            field: field.to_owned(),
                            message: format!("${{{}}} is not set", e.var_name),
                        })?
                        .into_owned();
                *value = Some(expanded);
            }
        }

        Ok(self)
    }
}
