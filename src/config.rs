use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::domain::entities::query::DEFAULT_PAGE_SIZE;
use crate::usecase::services::table_controller::DEFAULT_PAGE_SIZE_OPTIONS;

const ENV_PREFIX: &str = "INTOOL_";
const CONFIG_FILE: &str = "config.toml";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("in", "pressrelease", "intool-admin")
}

fn default_data_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_local_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".intool-admin"))
}

pub fn default_config_path() -> Result<PathBuf> {
    let dirs = project_dirs().ok_or_else(|| anyhow!("unable to resolve config directory"))?;
    Ok(dirs.config_dir().join(CONFIG_FILE))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub storage_dir: PathBuf,
    pub page_size: i64,
    pub page_size_options: Vec<i64>,
    pub search_debounce_ms: u64,
    pub currency: String,
    pub locale: String,
    pub acting_user_id: Option<String>,
    pub newsroom_base_url: String,
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = default_data_dir();
        Self {
            db_path: data_dir.join("intool.sqlite"),
            storage_dir: data_dir.join("storage"),
            page_size: DEFAULT_PAGE_SIZE,
            page_size_options: DEFAULT_PAGE_SIZE_OPTIONS.to_vec(),
            search_debounce_ms: 300,
            currency: "INR".to_string(),
            locale: "en-IN".to_string(),
            acting_user_id: None,
            newsroom_base_url: "https://pressrelease.in".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// Reads `config.toml` from the platform config dir (if present), then
    /// applies `INTOOL_*` environment overrides.
    pub fn load() -> Result<Self> {
        let path = default_config_path()?;
        Self::load_from(&path, std::env::vars())
    }

    pub fn load_from(
        path: &Path,
        env: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self> {
        let text = if path.exists() {
            Some(
                std::fs::read_to_string(path)
                    .with_context(|| format!("failed to read config: {}", path.display()))?,
            )
        } else {
            log::debug!("no config at {}, using defaults", path.display());
            None
        };
        Self::from_sources(text.as_deref(), env)
            .with_context(|| format!("invalid config: {}", path.display()))
    }

    pub fn from_sources(
        toml_text: Option<&str>,
        env: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self> {
        let mut config = match toml_text {
            Some(text) => toml::from_str::<AppConfig>(text).context("failed to parse toml")?,
            None => AppConfig::default(),
        };
        for (key, value) in env {
            if let Some(name) = key.strip_prefix(ENV_PREFIX) {
                config.apply_override(&name.to_ascii_lowercase(), &value)?;
            }
        }
        config.validate()?;
        Ok(config)
    }

    fn apply_override(&mut self, name: &str, value: &str) -> Result<()> {
        match name {
            "db_path" => self.db_path = PathBuf::from(value),
            "storage_dir" => self.storage_dir = PathBuf::from(value),
            "page_size" => {
                self.page_size = value
                    .trim()
                    .parse()
                    .with_context(|| format!("INTOOL_PAGE_SIZE is not a number: {value}"))?
            }
            "page_size_options" => {
                self.page_size_options = value
                    .split(',')
                    .map(|item| item.trim().parse::<i64>())
                    .collect::<Result<_, _>>()
                    .with_context(|| format!("INTOOL_PAGE_SIZE_OPTIONS is invalid: {value}"))?
            }
            "search_debounce_ms" => {
                self.search_debounce_ms = value.trim().parse().with_context(|| {
                    format!("INTOOL_SEARCH_DEBOUNCE_MS is not a number: {value}")
                })?
            }
            "currency" => self.currency = value.trim().to_ascii_uppercase(),
            "locale" => self.locale = value.trim().to_string(),
            "acting_user_id" => {
                self.acting_user_id = Some(value.trim().to_string()).filter(|id| !id.is_empty())
            }
            "newsroom_base_url" => self.newsroom_base_url = value.trim().to_string(),
            "log_level" => self.log_level = value.trim().to_string(),
            other => log::warn!("ignoring unknown setting {ENV_PREFIX}{}", other.to_uppercase()),
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.page_size <= 0 {
            bail!("page_size must be positive, got {}", self.page_size);
        }
        if self.page_size_options.is_empty() || self.page_size_options.iter().any(|size| *size <= 0)
        {
            bail!("page_size_options must be a non-empty list of positive sizes");
        }
        if self.currency.len() != 3 {
            bail!("currency must be a three-letter code, got {:?}", self.currency);
        }
        if !self.newsroom_base_url.starts_with("http://")
            && !self.newsroom_base_url.starts_with("https://")
        {
            bail!("newsroom_base_url must be an http(s) url");
        }
        Ok(())
    }
}
