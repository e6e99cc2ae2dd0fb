use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;

mod app;
mod config;
mod domain;
mod infra;
mod platform;
mod ui;
mod usecase;

#[cfg(test)]
mod tests;

use crate::app::App;
use crate::config::AppConfig;
use crate::ui::state::app_state::Services;

fn ensure_webview_data_dir(base_data_dir: &Path) -> Result<PathBuf> {
    let webview_data_dir = base_data_dir.join("webview");
    std::fs::create_dir_all(&webview_data_dir).with_context(|| {
        format!(
            "failed to create webview dir: {}",
            webview_data_dir.display()
        )
    })?;
    Ok(webview_data_dir)
}

fn default_webview_data_dir() -> Result<PathBuf> {
    let project_dirs = ProjectDirs::from("in", "pressrelease", "intool-admin")
        .ok_or_else(|| anyhow!("unable to resolve data directory"))?;
    ensure_webview_data_dir(project_dirs.data_local_dir())
}

fn init_logging(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    // A second init (tests, hot reload) is harmless.
    let _ = env_logger::Builder::from_env(env).try_init();
}

fn bootstrap() -> Result<(Services, PathBuf)> {
    let config = AppConfig::load().context("failed to load configuration")?;
    init_logging(&config.log_level);
    config.validate()?;
    log::info!(
        "starting with database {} and storage {}",
        config.db_path.display(),
        config.storage_dir.display()
    );
    let services = Services::build(config).context("failed to open backend")?;
    let webview_data_dir = default_webview_data_dir()?;
    Ok((services, webview_data_dir))
}

fn main() {
    let (services, webview_data_dir) = match bootstrap() {
        Ok(ready) => ready,
        Err(err) => {
            init_logging("error");
            log::error!("{err:#}");
            eprintln!("intool-admin: {err:#}");
            std::process::exit(1);
        }
    };

    dioxus::LaunchBuilder::desktop()
        .with_cfg(
            dioxus::desktop::Config::new()
                .with_window(dioxus::desktop::WindowBuilder::new().with_title("InTool Admin"))
                .with_data_directory(webview_data_dir),
        )
        .with_context(services)
        .launch(App);
}
