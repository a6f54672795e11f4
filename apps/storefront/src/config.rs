use std::{collections::HashMap, fs, path::Path};

use anyhow::Context;
use tracing::warn;

pub const SETTINGS_FILE: &str = "storefront.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub api_base_url: String,
    pub page_size: u32,
    pub featured_limit: u32,
    pub request_timeout_secs: u64,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8080".into(),
            page_size: client_core::DEFAULT_PAGE_SIZE,
            featured_limit: client_core::DEFAULT_FEATURED_LIMIT,
            request_timeout_secs: 10,
            log_level: "info".into(),
        }
    }
}

/// A value that failed to parse and was skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedSetting {
    pub key: String,
    pub value: String,
}

impl RejectedSetting {
    fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }

    /// Called once tracing is initialized.
    pub fn log(&self) {
        warn!(key = %self.key, value = %self.value, "ignoring invalid setting");
    }
}

/// Defaults, then `storefront.toml` in the working directory, then the
/// environment. CLI flags are applied by the caller.
pub fn load_settings() -> anyhow::Result<(Settings, Vec<RejectedSetting>)> {
    let mut settings = Settings::default();
    let mut rejected = Vec::new();

    let path = Path::new(SETTINGS_FILE);
    if path.exists() {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        rejected.extend(settings.apply_file(&raw)?);
    }

    rejected.extend(settings.apply_env(|key| std::env::var(key).ok()));
    Ok((settings, rejected))
}

impl Settings {
    pub fn apply_file(&mut self, raw: &str) -> anyhow::Result<Vec<RejectedSetting>> {
        let table: HashMap<String, toml::Value> =
            toml::from_str(raw).context("storefront.toml is not valid TOML")?;
        let text = |key: &str| match table.get(key) {
            Some(toml::Value::String(v)) => Some(v.clone()),
            Some(toml::Value::Integer(v)) => Some(v.to_string()),
            _ => None,
        };
        let mut rejected = Vec::new();

        if let Some(v) = text("api_base_url") {
            self.api_base_url = v;
        }
        if let Some(v) = text("page_size") {
            rejected.extend(self.set_page_size("page_size", &v));
        }
        if let Some(v) = text("featured_limit") {
            rejected.extend(self.set_featured_limit("featured_limit", &v));
        }
        if let Some(v) = text("request_timeout_secs") {
            rejected.extend(self.set_timeout("request_timeout_secs", &v));
        }
        if let Some(v) = text("log_level") {
            self.log_level = v;
        }
        Ok(rejected)
    }

    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Vec<RejectedSetting> {
        let mut rejected = Vec::new();
        if let Some(v) = var("STOREFRONT_API_URL") {
            self.api_base_url = v;
        }
        if let Some(v) = var("APP__API_BASE_URL") {
            self.api_base_url = v;
        }
        if let Some(v) = var("APP__PAGE_SIZE") {
            rejected.extend(self.set_page_size("APP__PAGE_SIZE", &v));
        }
        if let Some(v) = var("APP__FEATURED_LIMIT") {
            rejected.extend(self.set_featured_limit("APP__FEATURED_LIMIT", &v));
        }
        if let Some(v) = var("APP__REQUEST_TIMEOUT_SECS") {
            rejected.extend(self.set_timeout("APP__REQUEST_TIMEOUT_SECS", &v));
        }
        if let Some(v) = var("APP__LOG_LEVEL") {
            self.log_level = v;
        }
        rejected
    }

    fn set_page_size(&mut self, key: &str, raw: &str) -> Option<RejectedSetting> {
        match parse_positive(raw) {
            Some(v) => {
                self.page_size = v;
                None
            }
            None => Some(RejectedSetting::new(key, raw)),
        }
    }

    fn set_featured_limit(&mut self, key: &str, raw: &str) -> Option<RejectedSetting> {
        match parse_positive(raw) {
            Some(v) => {
                self.featured_limit = v;
                None
            }
            None => Some(RejectedSetting::new(key, raw)),
        }
    }

    fn set_timeout(&mut self, key: &str, raw: &str) -> Option<RejectedSetting> {
        match raw.trim().parse::<u64>() {
            Ok(v) if v > 0 => {
                self.request_timeout_secs = v;
                None
            }
            _ => Some(RejectedSetting::new(key, raw)),
        }
    }
}

fn parse_positive(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|v| *v > 0)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
