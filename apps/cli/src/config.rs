use std::{fs, path::Path, time::Duration};

use client_core::{ReorderPolicy, DEFAULT_BASE_URL};
use tracing::warn;
use url::Url;

pub const SETTINGS_FILE: &str = "posts.toml";

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub base_url: String,
    pub reorder_policy: ReorderPolicy,
    pub request_timeout: Option<Duration>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            reorder_policy: ReorderPolicy::default(),
            request_timeout: None,
        }
    }
}

impl Settings {
    pub fn parsed_base_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.base_url)
    }
}

/// Defaults, then `posts.toml` in the working directory, then environment.
pub fn load_settings() -> Settings {
    let mut settings = Settings::default();
    if let Ok(raw) = fs::read_to_string(Path::new(SETTINGS_FILE)) {
        apply_file(&mut settings, &raw);
    }
    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

pub fn apply_file(settings: &mut Settings, raw: &str) {
    let file_cfg = match toml::from_str::<toml::Table>(raw) {
        Ok(file_cfg) => file_cfg,
        Err(err) => {
            warn!(file = SETTINGS_FILE, error = %err, "ignoring unreadable settings file");
            return;
        }
    };

    if let Some(v) = file_value(&file_cfg, "base_url") {
        set_base_url(settings, &v);
    }
    if let Some(v) = file_value(&file_cfg, "reorder_policy") {
        set_reorder_policy(settings, &v);
    }
    if let Some(v) = file_value(&file_cfg, "request_timeout_secs") {
        set_request_timeout(settings, &v);
    }
}

/// Strings and integers are accepted; anything else is skipped.
fn file_value(table: &toml::Table, key: &str) -> Option<String> {
    match table.get(key)? {
        toml::Value::String(v) => Some(v.clone()),
        toml::Value::Integer(v) => Some(v.to_string()),
        other => {
            warn!(key, value = %other, "ignoring settings value of unexpected type");
            None
        }
    }
}

pub fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("POSTS_BASE_URL") {
        set_base_url(settings, &v);
    }
    if let Some(v) = lookup("APP__BASE_URL") {
        set_base_url(settings, &v);
    }

    if let Some(v) = lookup("APP__REORDER_POLICY") {
        set_reorder_policy(settings, &v);
    }

    if let Some(v) = lookup("APP__REQUEST_TIMEOUT_SECS") {
        set_request_timeout(settings, &v);
    }
}

pub fn set_base_url(settings: &mut Settings, raw: &str) -> bool {
    match Url::parse(raw.trim()) {
        Ok(url) if !url.cannot_be_a_base() => {
            settings.base_url = url.into();
            true
        }
        Ok(_) => {
            warn!(value = raw, "ignoring base url that cannot carry a path");
            false
        }
        Err(err) => {
            warn!(value = raw, error = %err, "ignoring invalid base url");
            false
        }
    }
}

fn set_reorder_policy(settings: &mut Settings, raw: &str) {
    match raw.parse::<ReorderPolicy>() {
        Ok(policy) => settings.reorder_policy = policy,
        Err(err) => warn!(error = %err, "ignoring reorder policy"),
    }
}

/// `0` disables the timeout.
fn set_request_timeout(settings: &mut Settings, raw: &str) {
    match raw.trim().parse::<u64>() {
        Ok(0) => settings.request_timeout = None,
        Ok(secs) => settings.request_timeout = Some(Duration::from_secs(secs)),
        Err(err) => warn!(value = raw, error = %err, "ignoring request timeout"),
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
