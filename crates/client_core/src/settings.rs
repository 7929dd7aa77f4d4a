use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{bail, Context};
use url::Url;

pub const DEFAULT_SETTINGS_FILE: &str = "client.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSettings {
    pub api_base_url: String,
    pub download_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub notification_ttl_ms: u64,
    pub log_level: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8081".into(),
            download_dir: default_download_dir(),
            request_timeout_secs: 30,
            notification_ttl_ms: 5000,
            log_level: "info".into(),
        }
    }
}

impl ClientSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    pub fn notification_ttl(&self) -> Duration {
        Duration::from_millis(self.notification_ttl_ms)
    }
}

fn default_download_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| PathBuf::from("./downloads"))
}

/// Defaults, then `client.toml` in the working directory, then environment.
pub fn load_settings() -> anyhow::Result<ClientSettings> {
    load_settings_from(Path::new(DEFAULT_SETTINGS_FILE))
}

pub fn load_settings_from(path: &Path) -> anyhow::Result<ClientSettings> {
    let mut settings = ClientSettings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        let file_cfg = toml::from_str::<HashMap<String, toml::Value>>(&raw)
            .with_context(|| format!("failed to parse settings file '{}'", path.display()))?;
        apply_file_values(&mut settings, &file_cfg)?;
    }

    apply_env_overrides(&mut settings, |key| std::env::var(key).ok())?;
    settings.api_base_url = prepare_base_url(&settings.api_base_url)?;
    Ok(settings)
}

fn apply_file_values(
    settings: &mut ClientSettings,
    file_cfg: &HashMap<String, toml::Value>,
) -> anyhow::Result<()> {
    if let Some(v) = file_cfg.get("api_base_url").and_then(toml::Value::as_str) {
        settings.api_base_url = v.to_string();
    }
    if let Some(v) = file_cfg.get("download_dir").and_then(toml::Value::as_str) {
        settings.download_dir = PathBuf::from(v);
    }
    if let Some(v) = file_cfg.get("request_timeout_secs") {
        settings.request_timeout_secs = positive_integer("request_timeout_secs", v)?;
    }
    if let Some(v) = file_cfg.get("notification_ttl_ms") {
        settings.notification_ttl_ms = positive_integer("notification_ttl_ms", v)?;
    }
    if let Some(v) = file_cfg.get("log_level").and_then(toml::Value::as_str) {
        settings.log_level = v.to_string();
    }
    Ok(())
}

fn positive_integer(key: &str, value: &toml::Value) -> anyhow::Result<u64> {
    match value.as_integer() {
        Some(v) if v > 0 => Ok(v as u64),
        _ => bail!("settings key '{key}' must be a positive integer, got {value}"),
    }
}

fn positive_env(key: &str, raw: &str) -> anyhow::Result<u64> {
    let value: u64 = raw
        .trim()
        .parse()
        .with_context(|| format!("{key} is not a number: {raw}"))?;
    if value == 0 {
        bail!("{key} must be a positive integer, got {raw}");
    }
    Ok(value)
}

fn apply_env_overrides(
    settings: &mut ClientSettings,
    lookup: impl Fn(&str) -> Option<String>,
) -> anyhow::Result<()> {
    if let Some(v) = lookup("API_BASE_URL") {
        settings.api_base_url = v;
    }
    if let Some(v) = lookup("APP__API_BASE_URL") {
        settings.api_base_url = v;
    }

    if let Some(v) = lookup("APP__DOWNLOAD_DIR") {
        settings.download_dir = PathBuf::from(v);
    }

    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        settings.request_timeout_secs = positive_env("APP__REQUEST_TIMEOUT_SECS", &v)?;
    }
    if let Some(v) = lookup("APP__NOTIFICATION_TTL_MS") {
        settings.notification_ttl_ms = positive_env("APP__NOTIFICATION_TTL_MS", &v)?;
    }

    if let Some(v) = lookup("APP__LOG_LEVEL") {
        settings.log_level = v;
    }

    Ok(())
}

/// Validates the API origin and strips trailing slashes.
pub fn prepare_base_url(raw: &str) -> anyhow::Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Ok(ClientSettings::default().api_base_url);
    }

    let url = Url::parse(trimmed).with_context(|| format!("invalid api base url '{raw}'"))?;
    if !matches!(url.scheme(), "http" | "https") {
        bail!("api base url must start with http:// or https://, got '{raw}'");
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
#[path = "tests/settings_tests.rs"]
mod tests;
