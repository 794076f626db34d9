//! `lau build` command implementation.

use std::path::{Path, PathBuf};

use clap::Args;
use lau_build::{BuildEvent, StaticSiteBuilder};
use lau_config::{CliSettings, Config};
use lau_server::{Site, server_config_from_lau_config};

use super::runtime;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the build command.
#[derive(Args, Debug)]
pub(crate) struct BuildArgs {
    /// Target directory of the build result (default: dist).
    #[arg(short, long)]
    target: Option<PathBuf>,

    /// Replace the target directory without asking.
    #[arg(short, long)]
    force: bool,

    /// Path to configuration file (default: auto-discover lau.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

impl BuildArgs {
    /// Execute the build command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration, application setup or any page
    /// fails.
    pub(crate) fn execute(self, site: impl FnOnce() -> Site) -> Result<(), CliError> {
        let output = Output::new();

        let settings = CliSettings {
            target_dir: self.target,
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&settings))?;
        let target = config.paths.target_dir.clone();
        tracing::debug!(config_file = ?config.config_path, target = %target.display(), "Configuration loaded");

        let proceed = prepare_target(&target, self.force, || {
            output.confirm("Target directory already exists, are you sure you want to continue?")
        })?;
        if !proceed {
            output.warning("Build cancelled");
            return Ok(());
        }

        let app = site().into_app(&server_config_from_lau_config(&config))?;
        output.info(&format!("Output: {}", target.display()));

        let progress = Output::new();
        let builder = StaticSiteBuilder::new(&app).on_event(move |event| match event {
            BuildEvent::Route(route) => progress.info(&format!("[*] Building {}", route.pattern())),
            BuildEvent::Skipped(_) => progress.warning(
                "    Skipped: route has parameters but no static paths",
            ),
            BuildEvent::Page(page) => progress.success(&format!(
                "    [*] Page {} built to {}",
                page.url,
                page.path.display()
            )),
        });
        let report = runtime(None)?.block_on(builder.build(&target))?;

        output.success(&format!(
            "Built {} pages to {} ({} routes skipped)",
            report.pages.len(),
            target.display(),
            report.skipped.len()
        ));
        Ok(())
    }
}

/// Clear an existing target directory, asking first unless `force` is set.
///
/// Returns `false` if the user declined.
fn prepare_target(
    target: &Path,
    force: bool,
    confirm: impl FnOnce() -> std::io::Result<bool>,
) -> Result<bool, CliError> {
    if !target.exists() {
        return Ok(true);
    }
    if !force && !confirm()? {
        return Ok(false);
    }
    std::fs::remove_dir_all(target)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_missing_target() {
        let temp_dir = tempfile::tempdir().unwrap();
        let target = temp_dir.path().join("dist");

        let proceed = prepare_target(&target, false, || panic!("should not ask")).unwrap();

        assert!(proceed);
    }

    #[test]
    fn test_prepare_declined_keeps_target() {
        let temp_dir = tempfile::tempdir().unwrap();
        std::fs::write(temp_dir.path().join("index.html"), "old").unwrap();

        let proceed = prepare_target(temp_dir.path(), false, || Ok(false)).unwrap();

        assert!(!proceed);
        assert!(temp_dir.path().join("index.html").exists());
    }

    #[test]
    fn test_prepare_confirmed_removes_target() {
        let temp_dir = tempfile::tempdir().unwrap();
        let target = temp_dir.path().join("dist");
        std::fs::create_dir(&target).unwrap();

        let proceed = prepare_target(&target, false, || Ok(true)).unwrap();

        assert!(proceed);
        assert!(!target.exists());
    }

    #[test]
    fn test_prepare_force_skips_question() {
        let temp_dir = tempfile::tempdir().unwrap();
        let target = temp_dir.path().join("dist");
        std::fs::create_dir(&target).unwrap();

        let proceed = prepare_target(&target, true, || panic!("should not ask")).unwrap();

        assert!(proceed);
        assert!(!target.exists());
    }
}
