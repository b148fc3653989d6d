// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use europharm_app::SectionKind;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const CONFIG_VERSION: i64 = 1;
const DEFAULT_REMOTE_TIMEOUT: &str = "10s";
const DEFAULT_LOG_FILTER: &str = "info";
const DEFAULT_CACHE_TTL_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Sqlite,
    Remote,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub store: StoreSection,
    #[serde(default)]
    pub remote: RemoteSection,
    #[serde(default)]
    pub ui: UiSection,
    #[serde(default)]
    pub log: LogSection,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            store: StoreSection::default(),
            remote: RemoteSection::default(),
            ui: UiSection::default(),
            log: LogSection::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoreSection {
    #[serde(default)]
    pub backend: Backend,
    pub db_path: Option<String>,
    pub max_brochure_size: Option<i64>,
    pub cache_ttl_days: Option<i64>,
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: Backend::Sqlite,
            db_path: None,
            max_brochure_size: Some(europharm_db::MAX_BROCHURE_SIZE),
            cache_ttl_days: Some(DEFAULT_CACHE_TTL_DAYS),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RemoteSection {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UiSection {
    pub start_section: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogSection {
    pub path: Option<String>,
    pub filter: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("EUROPHARM_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set EUROPHARM_CONFIG_PATH to the config file")
        })?;

        let app_dir = config_root.join(europharm_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` and keep values under [store], [remote], [ui], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(db_path) = &self.store.db_path {
            europharm_db::validate_db_path(db_path)?;
        }

        if let Some(max_size) = self.store.max_brochure_size
            && max_size <= 0
        {
            bail!(
                "store.max_brochure_size in {} must be positive, got {}",
                path.display(),
                max_size
            );
        }

        if let Some(ttl_days) = self.store.cache_ttl_days
            && ttl_days < 0
        {
            bail!(
                "store.cache_ttl_days in {} must be non-negative, got {}",
                path.display(),
                ttl_days
            );
        }

        if let Some(timeout) = &self.remote.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "remote.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if self.store.backend == Backend::Remote && self.remote_base_url().is_none() {
            bail!(
                "store.backend = \"remote\" in {} needs [remote].base_url -- set it and retry",
                path.display()
            );
        }

        if let Some(section) = &self.ui.start_section
            && SectionKind::parse(section).is_none()
        {
            bail!(
                "ui.start_section in {} must be one of cycles, items, brochures, reports; got {:?}",
                path.display(),
                section
            );
        }

        if let Some(filter) = &self.log.filter {
            EnvFilter::try_new(filter)
                .with_context(|| format!("log.filter in {} is not a valid filter", path.display()))?;
        }

        Ok(())
    }

    pub fn backend(&self) -> Backend {
        self.store.backend
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.store.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => europharm_db::default_db_path(),
        }
    }

    pub fn max_brochure_size(&self) -> i64 {
        self.store
            .max_brochure_size
            .unwrap_or(europharm_db::MAX_BROCHURE_SIZE)
    }

    pub fn cache_ttl_days(&self) -> i64 {
        self.store.cache_ttl_days.unwrap_or(DEFAULT_CACHE_TTL_DAYS)
    }

    pub fn remote_base_url(&self) -> Option<&str> {
        self.remote
            .base_url
            .as_deref()
            .map(|url| url.trim().trim_end_matches('/'))
            .filter(|url| !url.is_empty())
    }

    /// `EUROPHARM_API_KEY` wins over the file so keys can stay out of it.
    pub fn remote_api_key(&self) -> Option<String> {
        if let Ok(key) = env::var("EUROPHARM_API_KEY")
            && !key.trim().is_empty()
        {
            return Some(key);
        }
        self.remote
            .api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
    }

    pub fn remote_timeout(&self) -> Result<Duration> {
        parse_duration(
            self.remote
                .timeout
                .as_deref()
                .unwrap_or(DEFAULT_REMOTE_TIMEOUT),
        )
    }

    pub fn start_section(&self) -> SectionKind {
        self.ui
            .start_section
            .as_deref()
            .and_then(SectionKind::parse)
            .unwrap_or(SectionKind::Items)
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.log.path {
            return Ok(PathBuf::from(path));
        }
        let state_root = dirs::state_dir()
            .or_else(dirs::cache_dir)
            .ok_or_else(|| anyhow!("cannot resolve log directory; set [log].path in the config"))?;
        Ok(state_root.join(europharm_db::APP_NAME).join("europharm.log"))
    }

    pub fn log_filter(&self) -> &str {
        self.log.filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# europharm config\n# Place this file at: {}\n\nversion = 1\n\n[store]\n# \"sqlite\" keeps items in the local database; \"remote\" reads them from [remote]\nbackend = \"sqlite\"\n# Optional. Default is platform data dir (for example ~/.local/share/europharm/europharm.db)\n# db_path = \"/absolute/path/to/europharm.db\"\nmax_brochure_size = {}\ncache_ttl_days = {}\n\n[remote]\n# base_url = \"https://project.example.co\"\n# api_key = \"\" # or set EUROPHARM_API_KEY\ntimeout = \"{}\"\n\n[ui]\nstart_section = \"items\"\n\n[log]\n# path = \"/absolute/path/to/europharm.log\"\nfilter = \"{}\"\n",
            path.display(),
            europharm_db::MAX_BROCHURE_SIZE,
            DEFAULT_CACHE_TTL_DAYS,
            DEFAULT_REMOTE_TIMEOUT,
            DEFAULT_LOG_FILTER,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 10s)")
}
